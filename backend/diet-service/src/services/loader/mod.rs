use crate::models::{FoodRecord, RawFood};
use crate::services::source::{FoodSource, SourceError};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("No foods found for query '{0}'")]
    NoDataFound(String),

    #[error("Data source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),
}

/// Fetches and normalizes the working dataset for a search query
pub struct DataLoader {
    source: Arc<dyn FoodSource>,
    fetch_timeout: Duration,
}

impl DataLoader {
    pub fn new(source: Arc<dyn FoodSource>, fetch_timeout: Duration) -> Self {
        Self {
            source,
            fetch_timeout,
        }
    }

    /// Fetch candidates for `query` within the configured timeout and turn
    /// them into dataset records. Zero matches is `NoDataFound`.
    pub async fn load(&self, query: &str) -> Result<Vec<FoodRecord>, LoadError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(LoadError::NoDataFound(String::new()));
        }

        let raw = tokio::time::timeout(self.fetch_timeout, self.source.fetch(query))
            .await
            .map_err(|_| SourceError::Timeout(self.fetch_timeout))??;

        let fetched = raw.len();
        let records = normalize(raw, query);

        debug!(
            "Normalized query '{}': fetched={}, kept={}",
            query,
            fetched,
            records.len()
        );

        if records.is_empty() {
            info!("No foods matched query '{}'", query);
            return Err(LoadError::NoDataFound(query.to_string()));
        }

        Ok(records)
    }
}

/// Keep candidates mentioning `query`, drop repeated source ids (first wins)
/// and assign dataset indices in the resulting order.
pub fn normalize(raw: Vec<RawFood>, query: &str) -> Vec<FoodRecord> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut records: Vec<FoodRecord> = Vec::new();

    for food in raw {
        let mentions = food.description.to_lowercase().contains(&needle)
            || food.brand.to_lowercase().contains(&needle)
            || food.category.to_lowercase().contains(&needle);
        if !mentions || !seen.insert(food.source_id.clone()) {
            continue;
        }

        records.push(FoodRecord {
            id: records.len(),
            source_id: food.source_id,
            description: food.description.trim().to_string(),
            brand: food.brand.trim().to_string(),
            category: food.category.trim().to_string(),
            nutrients: food.nutrients.sanitized(),
        });
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NutrientKind, Nutrients};
    use crate::services::source::MockFoodSource;

    fn raw(id: &str, description: &str, category: &str) -> RawFood {
        RawFood {
            source_id: id.to_string(),
            description: description.to_string(),
            brand: "Brand".to_string(),
            category: category.to_string(),
            nutrients: Nutrients::default().with(NutrientKind::Calories, 100.0),
        }
    }

    #[test]
    fn test_normalize_dedupes_and_indexes() {
        let records = normalize(
            vec![
                raw("a", "Chicken breast", "Poultry"),
                raw("b", "Beef", "Meat"),
                raw("a", "Chicken breast (dup)", "Poultry"),
                raw("c", "Roast", "Chicken dishes"),
            ],
            "CHICKEN",
        );

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source_id, "a");
        assert_eq!(records[0].description, "Chicken breast");
        assert_eq!(records[1].source_id, "c");
        assert_eq!(records[1].id, 1);
    }

    #[test]
    fn test_normalize_keeps_unknowns() {
        let mut food = raw("a", "Salt", "Spices");
        food.nutrients.sodium = Some(-5.0);

        let records = normalize(vec![food], "salt");
        assert_eq!(records[0].nutrients.sodium, None);
        assert_eq!(records[0].nutrients.protein, None);
    }

    #[tokio::test]
    async fn test_load_no_matches() {
        let mut source = MockFoodSource::new();
        source
            .expect_fetch()
            .returning(|_| Ok(vec![raw("a", "Beef", "Meat")]));

        let loader = DataLoader::new(Arc::new(source), Duration::from_secs(1));
        let result = loader.load("tofu").await;

        assert!(matches!(result, Err(LoadError::NoDataFound(_))));
    }

    #[tokio::test]
    async fn test_load_source_failure() {
        let mut source = MockFoodSource::new();
        source
            .expect_fetch()
            .returning(|_| Err(SourceError::Status(500)));

        let loader = DataLoader::new(Arc::new(source), Duration::from_secs(1));
        let result = loader.load("beef").await;

        assert!(matches!(
            result,
            Err(LoadError::SourceUnavailable(SourceError::Status(500)))
        ));
    }

    #[tokio::test]
    async fn test_empty_query_skips_fetch() {
        let mut source = MockFoodSource::new();
        source.expect_fetch().never();

        let loader = DataLoader::new(Arc::new(source), Duration::from_secs(1));
        assert!(matches!(
            loader.load("   ").await,
            Err(LoadError::NoDataFound(_))
        ));
    }

    #[tokio::test]
    async fn test_load_times_out() {
        let source = crate::services::source::StaticFoodSource::new(vec![raw("a", "Beef", "Meat")])
            .with_latency(Duration::from_millis(200));

        let loader = DataLoader::new(Arc::new(source), Duration::from_millis(20));
        let result = loader.load("beef").await;

        assert!(matches!(
            result,
            Err(LoadError::SourceUnavailable(SourceError::Timeout(_)))
        ));
    }
}
