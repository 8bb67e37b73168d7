use crate::{models::ApodEntry, Result};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Where entries come from - makes testing easier and keeps the service
/// independent of the HTTP client.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApodSource: Send + Sync {
    /// Today's entry, as the upstream defines today
    async fn today(&self) -> Result<ApodEntry>;

    /// The entry for one archive day
    async fn by_date(&self, date: NaiveDate) -> Result<ApodEntry>;

    /// All entries in the inclusive range, ascending by date
    async fn range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ApodEntry>>;
}
