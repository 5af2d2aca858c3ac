use serde::{Deserialize, Serialize};

/// Nutrient fields tracked per food, in feature-vector column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NutrientKind {
    Calories,     // kcal
    Protein,      // g
    Fat,          // g
    Carbohydrate, // g
    Sugar,        // g
    Sodium,       // mg
    Fiber,        // g
}

impl NutrientKind {
    pub const ALL: [NutrientKind; 7] = [
        NutrientKind::Calories,
        NutrientKind::Protein,
        NutrientKind::Fat,
        NutrientKind::Carbohydrate,
        NutrientKind::Sugar,
        NutrientKind::Sodium,
        NutrientKind::Fiber,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NutrientKind::Calories => "calories",
            NutrientKind::Protein => "protein",
            NutrientKind::Fat => "fat",
            NutrientKind::Carbohydrate => "carbohydrate",
            NutrientKind::Sugar => "sugar",
            NutrientKind::Sodium => "sodium",
            NutrientKind::Fiber => "fiber",
        }
    }

    /// Column of this nutrient in an encoded feature vector
    pub fn index(&self) -> usize {
        match self {
            NutrientKind::Calories => 0,
            NutrientKind::Protein => 1,
            NutrientKind::Fat => 2,
            NutrientKind::Carbohydrate => 3,
            NutrientKind::Sugar => 4,
            NutrientKind::Sodium => 5,
            NutrientKind::Fiber => 6,
        }
    }
}

/// Feature vector dimension, fixed for every dataset generation
pub const FEATURE_DIM: usize = NutrientKind::ALL.len();

/// Columns of a tabular query result, leading with the ones every caller renders
pub const RESULT_COLUMNS: [&str; 10] = [
    "description",
    "brand",
    "category",
    "calories",
    "protein",
    "fat",
    "carbohydrate",
    "sugar",
    "sodium",
    "fiber",
];

/// Nutrient values of one food. `None` means unknown, never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrients {
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub carbohydrate: Option<f64>,
    pub sugar: Option<f64>,
    pub sodium: Option<f64>,
    pub fiber: Option<f64>,
}

impl Nutrients {
    pub fn get(&self, kind: NutrientKind) -> Option<f64> {
        match kind {
            NutrientKind::Calories => self.calories,
            NutrientKind::Protein => self.protein,
            NutrientKind::Fat => self.fat,
            NutrientKind::Carbohydrate => self.carbohydrate,
            NutrientKind::Sugar => self.sugar,
            NutrientKind::Sodium => self.sodium,
            NutrientKind::Fiber => self.fiber,
        }
    }

    pub fn set(&mut self, kind: NutrientKind, value: Option<f64>) {
        let slot = match kind {
            NutrientKind::Calories => &mut self.calories,
            NutrientKind::Protein => &mut self.protein,
            NutrientKind::Fat => &mut self.fat,
            NutrientKind::Carbohydrate => &mut self.carbohydrate,
            NutrientKind::Sugar => &mut self.sugar,
            NutrientKind::Sodium => &mut self.sodium,
            NutrientKind::Fiber => &mut self.fiber,
        };
        *slot = value;
    }

    /// Builder-style setter for a known value
    pub fn with(mut self, kind: NutrientKind, value: f64) -> Self {
        self.set(kind, Some(value));
        self
    }

    /// Drop values that cannot be real measurements (NaN, infinite, negative)
    pub fn sanitized(mut self) -> Self {
        for kind in NutrientKind::ALL {
            let cleaned = self
                .get(kind)
                .filter(|v| v.is_finite() && *v >= 0.0);
            self.set(kind, cleaned);
        }
        self
    }
}

/// A candidate food as returned by an external source, before normalization
#[derive(Debug, Clone, PartialEq)]
pub struct RawFood {
    pub source_id: String,
    pub description: String,
    pub brand: String,
    pub category: String,
    pub nutrients: Nutrients,
}

/// A food in the working dataset. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodRecord {
    /// Stable index within the dataset generation that produced it
    pub id: usize,
    pub source_id: String,
    pub description: String,
    pub brand: String,
    pub category: String,
    #[serde(flatten)]
    pub nutrients: Nutrients,
}

impl FoodRecord {
    pub fn nutrient(&self, kind: NutrientKind) -> Option<f64> {
        self.nutrients.get(kind)
    }

    /// Case-insensitive match used to locate an anchor record
    pub fn matches_anchor(&self, needle_lower: &str) -> bool {
        self.description.to_lowercase().contains(needle_lower)
            || self.brand.to_lowercase().contains(needle_lower)
    }

    /// Case-insensitive match over every searchable text field
    pub fn mentions(&self, needle_lower: &str) -> bool {
        self.matches_anchor(needle_lower) || self.category.to_lowercase().contains(needle_lower)
    }
}

/// Cluster labels for one dataset generation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterAssignment {
    /// One label per record, in dataset order
    pub labels: Vec<usize>,
    pub k: usize,
    /// Sum of squared distances to the assigned centroids
    pub inertia: f64,
    pub iterations: usize,
}

impl ClusterAssignment {
    pub fn label_of(&self, index: usize) -> Option<usize> {
        self.labels.get(index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nutrient_index_matches_order() {
        for (i, kind) in NutrientKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn test_sanitized_drops_invalid_values() {
        let nutrients = Nutrients::default()
            .with(NutrientKind::Calories, f64::NAN)
            .with(NutrientKind::Protein, -1.0)
            .with(NutrientKind::Fat, 3.5)
            .sanitized();

        assert_eq!(nutrients.calories, None);
        assert_eq!(nutrients.protein, None);
        assert_eq!(nutrients.fat, Some(3.5));
    }

    #[test]
    fn test_record_serializes_flat() {
        let record = FoodRecord {
            id: 0,
            source_id: "1".to_string(),
            description: "Oats".to_string(),
            brand: String::new(),
            category: "Cereal".to_string(),
            nutrients: Nutrients::default().with(NutrientKind::Calories, 380.0),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["calories"], 380.0);
        assert!(json["protein"].is_null());
    }
}
