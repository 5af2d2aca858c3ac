use super::{FoodSource, SourceError};
use crate::models::RawFood;
use async_trait::async_trait;
use std::time::Duration;

/// In-memory source returning every record mentioning the query
#[derive(Debug, Clone, Default)]
pub struct StaticFoodSource {
    foods: Vec<RawFood>,
    latency: Option<Duration>,
}

impl StaticFoodSource {
    pub fn new(foods: Vec<RawFood>) -> Self {
        Self {
            foods,
            latency: None,
        }
    }

    /// Delay every fetch, e.g. to exercise timeouts
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

#[async_trait]
impl FoodSource for StaticFoodSource {
    async fn fetch(&self, query: &str) -> Result<Vec<RawFood>, SourceError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let needle = query.trim().to_lowercase();
        Ok(self
            .foods
            .iter()
            .filter(|food| {
                food.description.to_lowercase().contains(&needle)
                    || food.brand.to_lowercase().contains(&needle)
                    || food.category.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Nutrients;

    fn raw(id: &str, description: &str) -> RawFood {
        RawFood {
            source_id: id.to_string(),
            description: description.to_string(),
            brand: String::new(),
            category: String::new(),
            nutrients: Nutrients::default(),
        }
    }

    #[tokio::test]
    async fn test_fetch_filters_by_query() {
        let source = StaticFoodSource::new(vec![raw("1", "Greek Yogurt"), raw("2", "Rice")]);

        let found = source.fetch("yogurt").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].source_id, "1");
    }
}
