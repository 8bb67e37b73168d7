// Core logic for the APOD explorer: favorites, dates, data service, view state
pub mod config;
pub mod dates;
pub mod error;
pub mod favorites;
pub mod models;
pub mod providers;
pub mod service;
pub mod source;
pub mod storage;
pub mod views;

pub use config::Config;
pub use error::Error;
pub use favorites::{FavoritesStore, FAVORITES_KEY};
pub use models::{ApodEntry, FavoriteItem, MediaType};
pub use providers::ApiProvider;
pub use service::ApodService;
pub use source::ApodSource;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use views::{most_recent_first, FetchSlot, LatestRequest, Ticket, ViewState};

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
