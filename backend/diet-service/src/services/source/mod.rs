mod csv_file;
mod memory;
mod usda;

use crate::models::RawFood;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use csv_file::{CsvFoodSource, CsvRow};
pub use memory::StaticFoodSource;
pub use usda::UsdaClient;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned status {0}")]
    Status(u16),

    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// External nutrition data source
///
/// Implementations may return loose matches; the loader narrows them down
/// to records that actually mention the query.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FoodSource: Send + Sync {
    async fn fetch(&self, query: &str) -> Result<Vec<RawFood>, SourceError>;
}
