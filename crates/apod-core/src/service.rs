// Data service: date validation plus a cache-first strategy in front of the source
use crate::{
    dates::{self, DateRange},
    models::ApodEntry,
    source::ApodSource,
    Result,
};
use apod_cache::CacheManager;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const TODAY_KEY: &str = "today";

/// Everything the views fetch goes through here
pub struct ApodService {
    source: Box<dyn ApodSource>,
    cache: Option<Arc<CacheManager>>,
    today_ttl: Duration,
    fixed_today: Option<NaiveDate>,
}

impl ApodService {
    pub fn new(source: Box<dyn ApodSource>) -> Self {
        Self {
            source,
            cache: None,
            today_ttl: Duration::from_secs(6 * 3600),
            fixed_today: None,
        }
    }

    /// Serve past days from `cache`; today's entry is reused for `today_ttl`
    pub fn with_cache(mut self, cache: Arc<CacheManager>, today_ttl: Duration) -> Self {
        self.cache = Some(cache);
        self.today_ttl = today_ttl;
        self
    }

    /// Pin the archive's "today" instead of reading the clock
    pub fn with_fixed_today(mut self, today: NaiveDate) -> Self {
        self.fixed_today = Some(today);
        self
    }

    pub fn archive_today(&self) -> NaiveDate {
        self.fixed_today.unwrap_or_else(dates::archive_today)
    }

    /// Map a requested day onto the archive calendar before validating it
    fn resolve(&self, date: NaiveDate) -> NaiveDate {
        match self.fixed_today {
            Some(_) => date,
            None => dates::resolve_requested_now(date, self.archive_today()),
        }
    }

    /// Today's entry
    pub async fn today(&self) -> Result<ApodEntry> {
        // A row cached before midnight Eastern belongs to yesterday
        let current = dates::format_date(self.archive_today());
        if let Some(entry) = self
            .cache_get(TODAY_KEY, Some(self.today_ttl))
            .filter(|entry| entry.date == current)
        {
            info!("Cache hit for today ({})", entry.date);
            return Ok(entry);
        }

        let entry = self.source.today().await?;
        self.cache_put(TODAY_KEY, &entry);
        self.cache_put(&entry.date, &entry);
        Ok(entry)
    }

    /// The entry for one day
    pub async fn by_date(&self, date: NaiveDate) -> Result<ApodEntry> {
        let date = dates::validate_date(self.resolve(date), self.archive_today())?;
        let key = dates::format_date(date);

        // Past days never change, so any cached copy is good
        if let Some(entry) = self.cache_get(&key, None) {
            info!("Cache hit for {}", key);
            return Ok(entry);
        }

        let entry = self.source.by_date(date).await?;
        self.cache_put(&key, &entry);
        Ok(entry)
    }

    /// `by_date` for user input
    pub async fn by_date_str(&self, date: &str) -> Result<ApodEntry> {
        self.by_date(dates::parse_date(date)?).await
    }

    /// The archive day a typed date refers to, after the same resolution and
    /// checks `by_date` applies
    pub fn requested_day(&self, input: &str) -> Result<NaiveDate> {
        let date = dates::parse_date(input)?;
        dates::validate_date(self.resolve(date), self.archive_today())
    }

    /// Every entry in the inclusive range, ascending by date
    pub async fn range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ApodEntry>> {
        let range = DateRange::new(start, self.resolve(end), self.archive_today())?;
        self.fetch_range(range).await
    }

    /// `range` for user input
    pub async fn range_str(&self, start: &str, end: &str) -> Result<Vec<ApodEntry>> {
        self.range(dates::parse_date(start)?, dates::parse_date(end)?)
            .await
    }

    /// The rolling gallery: the last `days` days up to today, ascending
    pub async fn gallery(&self, days: u32) -> Result<Vec<ApodEntry>> {
        let window = DateRange::trailing(self.archive_today(), days);
        self.fetch_range(window).await
    }

    async fn fetch_range(&self, range: DateRange) -> Result<Vec<ApodEntry>> {
        if let Some(entries) = self.cached_range(&range) {
            info!(
                "Cache hit for {}..{} ({} entries)",
                range.start(),
                range.end(),
                entries.len()
            );
            return Ok(entries);
        }

        info!("Fetching {}..{} from source", range.start(), range.end());
        let entries = self.source.range(range.start(), range.end()).await?;
        for entry in &entries {
            self.cache_put(&entry.date, entry);
        }
        Ok(entries)
    }

    /// A range is served from cache only when every one of its days is there
    fn cached_range(&self, range: &DateRange) -> Option<Vec<ApodEntry>> {
        self.cache.as_ref()?;
        range
            .days()
            .map(|day| self.cache_get(&dates::format_date(day), None))
            .collect()
    }

    fn cache_get(&self, key: &str, max_age: Option<Duration>) -> Option<ApodEntry> {
        let cache = self.cache.as_ref()?;
        match cache.get::<ApodEntry>(key, max_age) {
            Ok(hit) => hit,
            Err(e) => {
                debug!("Cache error reading {}: {}", key, e);
                None
            }
        }
    }

    fn cache_put(&self, key: &str, entry: &ApodEntry) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(key, entry) {
                debug!("Failed to cache {}: {}", key, e);
            }
        }
    }
}
