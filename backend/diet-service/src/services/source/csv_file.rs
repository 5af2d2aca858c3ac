use super::{FoodSource, SourceError};
use crate::models::{FoodRecord, Nutrients, RawFood};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One line of the delimited food file (also the backup layout)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvRow {
    pub source_id: String,
    pub description: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub calories: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub protein: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub fat: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub carbohydrate: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub sugar: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub sodium: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub fiber: Option<f64>,
}

impl From<&FoodRecord> for CsvRow {
    fn from(record: &FoodRecord) -> Self {
        let n = &record.nutrients;
        Self {
            source_id: record.source_id.clone(),
            description: record.description.clone(),
            brand: record.brand.clone(),
            category: record.category.clone(),
            calories: n.calories,
            protein: n.protein,
            fat: n.fat,
            carbohydrate: n.carbohydrate,
            sugar: n.sugar,
            sodium: n.sodium,
            fiber: n.fiber,
        }
    }
}

impl From<CsvRow> for RawFood {
    fn from(row: CsvRow) -> Self {
        RawFood {
            source_id: row.source_id,
            description: row.description,
            brand: row.brand,
            category: row.category,
            nutrients: Nutrients {
                calories: row.calories,
                protein: row.protein,
                fat: row.fat,
                carbohydrate: row.carbohydrate,
                sugar: row.sugar,
                sodium: row.sodium,
                fiber: row.fiber,
            },
        }
    }
}

/// Reads foods from a local delimited file on every fetch
#[derive(Debug, Clone)]
pub struct CsvFoodSource {
    path: PathBuf,
}

impl CsvFoodSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(path: &Path) -> Result<Vec<RawFood>, SourceError> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;

        let mut foods = Vec::new();
        for row in reader.deserialize::<CsvRow>() {
            foods.push(RawFood::from(row?));
        }
        Ok(foods)
    }
}

#[async_trait]
impl FoodSource for CsvFoodSource {
    async fn fetch(&self, query: &str) -> Result<Vec<RawFood>, SourceError> {
        let path = self.path.clone();
        let foods = tokio::task::spawn_blocking(move || Self::read_all(&path))
            .await
            .map_err(|e| SourceError::Decode(format!("CSV reader task failed: {}", e)))??;

        debug!(
            "Read {} rows from {} for query '{}'",
            foods.len(),
            self.path.display(),
            query
        );
        Ok(foods)
    }
}
