use crate::models::{FoodRecord, NutrientKind};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dietary goals known to the service. Fixed at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalId {
    WeightLoss,
    MuscleGain,
    LowCarb,
    HeartHealthy,
    HighFiber,
    LowSugar,
}

impl GoalId {
    pub const ALL: [GoalId; 6] = [
        GoalId::WeightLoss,
        GoalId::MuscleGain,
        GoalId::LowCarb,
        GoalId::HeartHealthy,
        GoalId::HighFiber,
        GoalId::LowSugar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GoalId::WeightLoss => "weight_loss",
            GoalId::MuscleGain => "muscle_gain",
            GoalId::LowCarb => "low_carb",
            GoalId::HeartHealthy => "heart_healthy",
            GoalId::HighFiber => "high_fiber",
            GoalId::LowSugar => "low_sugar",
        }
    }

    /// Case-insensitive lookup; `None` for identifiers outside the registry
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|goal| goal.as_str().eq_ignore_ascii_case(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Higher is better; the value must reach the threshold
    Maximize,
    /// Lower is better; the value must not exceed the threshold
    Minimize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientConstraint {
    pub nutrient: NutrientKind,
    pub direction: Direction,
    pub threshold: f64,
    /// Contribution of this constraint to the ranking score
    pub weight: f64,
}

impl NutrientConstraint {
    pub const fn at_least(nutrient: NutrientKind, threshold: f64) -> Self {
        Self {
            nutrient,
            direction: Direction::Maximize,
            threshold,
            weight: 1.0,
        }
    }

    pub const fn at_most(nutrient: NutrientKind, threshold: f64) -> Self {
        Self {
            nutrient,
            direction: Direction::Minimize,
            threshold,
            weight: 1.0,
        }
    }

    /// Signed distance to the threshold; non-negative when satisfied
    pub fn margin(&self, value: f64) -> f64 {
        match self.direction {
            Direction::Maximize => value - self.threshold,
            Direction::Minimize => self.threshold - value,
        }
    }

    /// Margin scaled by the threshold magnitude so constraints on different
    /// units contribute comparably
    pub fn normalized_margin(&self, value: f64) -> f64 {
        self.margin(value) / self.threshold.abs().max(1.0)
    }

    pub fn is_satisfied(&self, value: f64) -> bool {
        self.margin(value) >= 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProfile {
    pub id: GoalId,
    pub constraints: Vec<NutrientConstraint>,
}

impl GoalProfile {
    /// Ranking score for a record, or `None` if any constraint fails or
    /// concerns an unknown nutrient
    pub fn score(&self, record: &FoodRecord) -> Option<f64> {
        let mut score = 0.0;
        for constraint in &self.constraints {
            let value = record.nutrient(constraint.nutrient)?;
            if !constraint.is_satisfied(value) {
                return None;
            }
            score += constraint.weight * constraint.normalized_margin(value);
        }
        Some(score)
    }
}

static REGISTRY: Lazy<Vec<GoalProfile>> = Lazy::new(|| {
    use NutrientKind::*;

    vec![
        GoalProfile {
            id: GoalId::WeightLoss,
            constraints: vec![
                NutrientConstraint::at_most(Calories, 200.0),
                NutrientConstraint::at_most(Fat, 10.0),
            ],
        },
        GoalProfile {
            id: GoalId::MuscleGain,
            constraints: vec![NutrientConstraint::at_least(Protein, 15.0)],
        },
        GoalProfile {
            id: GoalId::LowCarb,
            constraints: vec![NutrientConstraint::at_most(Carbohydrate, 10.0)],
        },
        GoalProfile {
            id: GoalId::HeartHealthy,
            constraints: vec![
                NutrientConstraint::at_most(Sodium, 140.0),
                NutrientConstraint::at_most(Fat, 10.0),
            ],
        },
        GoalProfile {
            id: GoalId::HighFiber,
            constraints: vec![NutrientConstraint::at_least(Fiber, 5.0)],
        },
        GoalProfile {
            id: GoalId::LowSugar,
            constraints: vec![NutrientConstraint::at_most(Sugar, 5.0)],
        },
    ]
});

pub fn registry() -> &'static [GoalProfile] {
    &REGISTRY
}

pub fn profile(goal: GoalId) -> Option<&'static GoalProfile> {
    REGISTRY.iter().find(|p| p.id == goal)
}

/// Registry as `{identifier: constraints}` for choice controls
pub fn registry_map() -> BTreeMap<&'static str, &'static [NutrientConstraint]> {
    REGISTRY
        .iter()
        .map(|p| (p.id.as_str(), p.constraints.as_slice()))
        .collect()
}

/// Split comma-separated allergy input into lower-cased, trimmed, non-empty terms
pub fn parse_allergies(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalMatch {
    /// Index of the matching record in the dataset
    pub index: usize,
    pub score: f64,
}

/// Allergy exclusion followed by goal constraints
pub struct GoalFilter;

impl GoalFilter {
    pub fn contains_allergen(record: &FoodRecord, allergies: &[String]) -> bool {
        allergies.iter().any(|term| {
            let term = term.trim().to_lowercase();
            !term.is_empty() && record.mentions(&term)
        })
    }

    /// Matching records ranked by descending score, ties by dataset order.
    /// An unknown goal matches nothing.
    pub fn apply(records: &[FoodRecord], goal: &str, allergies: &[String]) -> Vec<GoalMatch> {
        let Some(profile) = GoalId::parse(goal).and_then(profile) else {
            return Vec::new();
        };

        let mut matches: Vec<GoalMatch> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| !Self::contains_allergen(record, allergies))
            .filter_map(|(index, record)| {
                profile
                    .score(record)
                    .map(|score| GoalMatch { index, score })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.index.cmp(&b.index))
        });

        matches
    }
}
