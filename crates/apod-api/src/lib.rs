// API client for the Astronomy Picture of the Day feed
pub mod apod;
pub mod retry;

// Re-export common types
pub use apod::{ApodApiError, ApodClient, ApodResponse, RequestTarget, Upstream};
pub use retry::RetryConfig;
