// HTTP provider - bridges the API client with the ApodSource trait
use apod_api::{ApodClient, ApodResponse};
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    models::{ApodEntry, MediaType},
    source::ApodSource,
    Result,
};

/// Wrapper around ApodClient that implements ApodSource
pub struct ApiProvider {
    client: ApodClient,
}

impl ApiProvider {
    pub fn new(client: ApodClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ApodSource for ApiProvider {
    async fn today(&self) -> Result<ApodEntry> {
        let response = self.client.today().await?;
        Ok(response_to_entry(response))
    }

    async fn by_date(&self, date: NaiveDate) -> Result<ApodEntry> {
        let response = self.client.by_date(date).await?;
        Ok(response_to_entry(response))
    }

    async fn range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ApodEntry>> {
        let responses = self.client.range(start, end).await?;
        Ok(responses.into_iter().map(response_to_entry).collect())
    }
}

/// Convert a wire record into our entry model
pub fn response_to_entry(response: ApodResponse) -> ApodEntry {
    let media_type = MediaType::from_wire(&response.media_type);

    // Videos sometimes come without a url but with a thumbnail
    let url = response
        .url
        .filter(|u| !u.is_empty())
        .or(response.thumbnail_url)
        .unwrap_or_default();

    ApodEntry {
        date: response.date,
        title: response.title.trim().to_string(),
        explanation: response.explanation,
        media_type,
        url,
        hd_url: response.hdurl.filter(|u| !u.is_empty()),
        // NASA pads credits with newlines
        copyright: response
            .copyright
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response() -> ApodResponse {
        ApodResponse {
            date: "2024-01-01".into(),
            title: " Galaxy ".into(),
            explanation: "Spiral.".into(),
            media_type: "image".into(),
            url: Some("https://apod.nasa.gov/s.jpg".into()),
            hdurl: Some("https://apod.nasa.gov/b.jpg".into()),
            copyright: Some("\nJane Doe\n".into()),
            thumbnail_url: None,
            service_version: Some("v1".into()),
        }
    }

    #[test]
    fn test_response_to_entry() {
        let entry = response_to_entry(response());
        assert_eq!(entry.date, "2024-01-01");
        assert_eq!(entry.title, "Galaxy");
        assert_eq!(entry.media_type, MediaType::Image);
        assert_eq!(entry.url, "https://apod.nasa.gov/s.jpg");
        assert_eq!(entry.hd_url.as_deref(), Some("https://apod.nasa.gov/b.jpg"));
        assert_eq!(entry.copyright.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_video_without_url_uses_thumbnail() {
        let mut r = response();
        r.media_type = "video".into();
        r.url = None;
        r.hdurl = Some(String::new());
        r.copyright = Some("   ".into());
        r.thumbnail_url = Some("https://img.youtube.com/t.jpg".into());

        let entry = response_to_entry(r);
        assert_eq!(entry.media_type, MediaType::Video);
        assert_eq!(entry.url, "https://img.youtube.com/t.jpg");
        assert!(entry.hd_url.is_none());
        assert!(entry.copyright.is_none());
    }

    #[test]
    fn test_other_media_maps_to_video() {
        let mut r = response();
        r.media_type = "other".into();
        assert_eq!(response_to_entry(r).media_type, MediaType::Video);
    }
}
