pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod pipeline;
pub mod scrapers;
pub mod sink;

pub use config::Settings;
pub use error::{ConfigError, DecodeError, ScrapeError, SinkError};
pub use filter::StarFilter;
pub use models::Review;
pub use pipeline::RunSummary;
pub use sink::{OutputFormat, ReviewSink};
