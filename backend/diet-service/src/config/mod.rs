use crate::services::clustering::KMeansConfig;
use crate::services::features::Normalization;
use crate::services::recommender::RecommenderConfig;
use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceKind {
    Usda,
    Csv,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // HTTP server config
    pub http_host: String,
    pub http_port: u16,

    // Data source
    pub data_source: DataSourceKind,
    pub usda_api_url: String,
    pub usda_api_key: String,
    pub usda_page_size: u32,
    pub csv_path: Option<PathBuf>,
    pub fetch_timeout_ms: u64,

    // Model
    pub normalization: Normalization,
    pub max_clusters: usize,
    pub cluster_seed: u64,
    pub max_iterations: usize,
    pub default_top_n: usize,

    // Optional dataset backup written after each load
    pub backup_path: Option<PathBuf>,

    // Observability
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .set_default("http_host", "0.0.0.0")?
            .set_default("http_port", 8020)?
            .set_default("data_source", "usda")?
            .set_default("usda_api_url", "https://api.nal.usda.gov/fdc/v1")?
            .set_default("usda_api_key", "DEMO_KEY")?
            .set_default("usda_page_size", 50)?
            .set_default("fetch_timeout_ms", 10_000)? // 10 seconds
            .set_default("normalization", "min_max")?
            .set_default("max_clusters", 8)?
            .set_default("cluster_seed", 42)?
            .set_default("max_iterations", 100)?
            .set_default("default_top_n", 10)?
            .set_default("backup_path", "data/backup_foods.csv")?
            .set_default("log_level", "info")?
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        config.try_deserialize()
    }

    pub fn validate(&self) -> Result<()> {
        if self.http_port == 0 {
            return Err(anyhow!("HTTP port must be greater than 0"));
        }

        if self.fetch_timeout_ms == 0 {
            return Err(anyhow!("Fetch timeout must be greater than 0"));
        }

        if self.usda_page_size == 0 || self.usda_page_size > 200 {
            return Err(anyhow!("USDA page size must be between 1 and 200"));
        }

        match self.data_source {
            DataSourceKind::Usda if self.usda_api_url.is_empty() => {
                return Err(anyhow!("USDA API URL is required"));
            }
            DataSourceKind::Csv if self.csv_path.is_none() => {
                return Err(anyhow!("CSV path is required when data_source=csv"));
            }
            _ => {}
        }

        if self.max_clusters < 2 {
            return Err(anyhow!("max_clusters must be at least 2"));
        }

        if self.max_iterations == 0 {
            return Err(anyhow!("max_iterations must be greater than 0"));
        }

        if self.default_top_n == 0 {
            return Err(anyhow!("default_top_n must be greater than 0"));
        }

        Ok(())
    }

    pub fn recommender(&self) -> RecommenderConfig {
        RecommenderConfig {
            fetch_timeout: Duration::from_millis(self.fetch_timeout_ms),
            normalization: self.normalization,
            kmeans: KMeansConfig {
                max_clusters: self.max_clusters,
                seed: self.cluster_seed,
                max_iterations: self.max_iterations,
                ..Default::default()
            },
        }
    }
}
