// SQLite-based caching layer
// Past archive days never change, so once fetched they can be served offline

pub mod cache;

pub use cache::{CacheError, CacheManager, CacheStats};
