// Source implementations
pub mod api;

pub use api::ApiProvider;
