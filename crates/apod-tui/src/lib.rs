// Terminal UI for browsing the picture archive and managing favorites

pub mod app;
pub mod runner;
pub mod ui;

pub use app::{App, DateField, FetchOutcome, FetchRequest, InputMode, Page};
pub use runner::run_tui;
