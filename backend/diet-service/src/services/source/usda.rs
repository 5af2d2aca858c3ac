use super::{FoodSource, SourceError};
use crate::models::{NutrientKind, Nutrients, RawFood};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

/// USDA FoodData Central search client
///
/// `GET {base_url}/foods/search?query=..&pageSize=..&api_key=..`
#[derive(Debug, Clone)]
pub struct UsdaClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    page_size: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    foods: Vec<UsdaFood>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsdaFood {
    fdc_id: u64,
    #[serde(default)]
    description: String,
    brand_owner: Option<String>,
    brand_name: Option<String>,
    food_category: Option<String>,
    #[serde(default)]
    food_nutrients: Vec<UsdaNutrient>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsdaNutrient {
    nutrient_number: Option<String>,
    nutrient_name: Option<String>,
    unit_name: Option<String>,
    value: Option<f64>,
}

impl UsdaNutrient {
    fn kind(&self) -> Option<NutrientKind> {
        let by_number = self.nutrient_number.as_deref().and_then(|n| match n {
            "208" => Some(NutrientKind::Calories),
            "203" => Some(NutrientKind::Protein),
            "204" => Some(NutrientKind::Fat),
            "205" => Some(NutrientKind::Carbohydrate),
            "269" => Some(NutrientKind::Sugar),
            "307" => Some(NutrientKind::Sodium),
            "291" => Some(NutrientKind::Fiber),
            _ => None,
        });
        if by_number.is_some() || self.nutrient_number.is_some() {
            return by_number;
        }

        // older payloads only carry the name
        let name = self.nutrient_name.as_deref()?.to_lowercase();
        let unit = self.unit_name.as_deref().unwrap_or_default().to_lowercase();
        if name.starts_with("energy") {
            (unit.is_empty() || unit == "kcal").then_some(NutrientKind::Calories)
        } else if name == "protein" {
            Some(NutrientKind::Protein)
        } else if name.starts_with("total lipid") {
            Some(NutrientKind::Fat)
        } else if name.starts_with("carbohydrate") {
            Some(NutrientKind::Carbohydrate)
        } else if name.starts_with("sugars, total") || name.starts_with("total sugars") {
            Some(NutrientKind::Sugar)
        } else if name.starts_with("sodium") {
            Some(NutrientKind::Sodium)
        } else if name.starts_with("fiber, total dietary") {
            Some(NutrientKind::Fiber)
        } else {
            None
        }
    }
}

impl From<UsdaFood> for RawFood {
    fn from(food: UsdaFood) -> Self {
        let mut nutrients = Nutrients::default();
        for nutrient in &food.food_nutrients {
            if let (Some(kind), Some(value)) = (nutrient.kind(), nutrient.value) {
                if nutrients.get(kind).is_none() {
                    nutrients.set(kind, Some(value));
                }
            }
        }

        RawFood {
            source_id: food.fdc_id.to_string(),
            description: food.description,
            brand: food.brand_owner.or(food.brand_name).unwrap_or_default(),
            category: food.food_category.unwrap_or_default(),
            nutrients,
        }
    }
}

impl UsdaClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        page_size: u32,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("diet-service/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            page_size,
        })
    }
}

#[async_trait]
impl FoodSource for UsdaClient {
    async fn fetch(&self, query: &str) -> Result<Vec<RawFood>, SourceError> {
        let url = format!("{}/foods/search", self.base_url);
        let page_size = self.page_size.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("query", query),
                ("pageSize", page_size.as_str()),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("USDA search returned {} for query '{}'", status, query);
            return Err(SourceError::Status(status.as_u16()));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        debug!("USDA search '{}' returned {} foods", query, body.foods.len());

        Ok(body.foods.into_iter().map(RawFood::from).collect())
    }
}
