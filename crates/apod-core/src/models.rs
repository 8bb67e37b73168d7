use serde::{Deserialize, Serialize};

/// What kind of media an entry points at
///
/// NASA occasionally reports something other than image or video; all of
/// those are treated like video, i.e. not renderable as a picture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Image,
    #[serde(other)]
    Video,
}

impl MediaType {
    /// Map the free-form wire value; a missing value means image
    pub fn from_wire(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "image" => MediaType::Image,
            _ => MediaType::Video,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One day of the archive
///
/// Serialized in the camelCase shape of the favorites record. The snake-case
/// spellings are accepted too so records saved from raw API payloads still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApodEntry {
    /// `YYYY-MM-DD`; the identity of the entry
    pub date: String,
    pub title: String,
    pub explanation: String,
    #[serde(alias = "media_type")]
    pub media_type: MediaType,
    pub url: String,
    #[serde(default, alias = "hdurl", skip_serializing_if = "Option::is_none")]
    pub hd_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
}

/// A favorite is a snapshot of the entry the user chose to keep
pub type FavoriteItem = ApodEntry;

impl ApodEntry {
    pub fn is_image(&self) -> bool {
        self.media_type == MediaType::Image
    }

    /// Best URL for viewing: the HD image when there is one
    pub fn best_url(&self) -> &str {
        match (&self.media_type, &self.hd_url) {
            (MediaType::Image, Some(hd)) if !hd.is_empty() => hd,
            _ => &self.url,
        }
    }
}
