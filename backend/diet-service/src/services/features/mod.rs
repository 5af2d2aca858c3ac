/// Feature Encoding Module
///
/// Turns the nutrient fields of a dataset into a dense feature matrix
/// (one row per record, one column per `NutrientKind`).
///
/// # Policy
/// - **Imputation**: unknown values take the column mean over the known values
///   of the current dataset, or zero when the whole column is unknown
/// - **Normalization**: min-max to [0, 1] (default) or z-score, with parameters
///   recomputed from the dataset being encoded
use crate::models::{FoodRecord, NutrientKind, FEATURE_DIM};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    #[default]
    MinMax,
    ZScore,
}

/// Per-column statistics of the imputed (pre-normalization) values
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std: f64,
    pub known: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureEncoder {
    normalization: Normalization,
}

impl FeatureEncoder {
    pub fn new(normalization: Normalization) -> Self {
        Self { normalization }
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    /// Encode records into an `n x FEATURE_DIM` matrix, rows in dataset order.
    ///
    /// Pure function of the records and the encoder policy.
    pub fn encode(&self, records: &[FoodRecord]) -> Array2<f64> {
        let mut matrix = self.impute(records);

        for kind in NutrientKind::ALL {
            let col = kind.index();
            let stats = column_stats(&matrix, col, known_count(records, kind));
            let mut column = matrix.column_mut(col);

            match self.normalization {
                Normalization::MinMax => {
                    let range = stats.max - stats.min;
                    column.mapv_inplace(|v| {
                        if range < f64::EPSILON {
                            0.0
                        } else {
                            (v - stats.min) / range
                        }
                    });
                }
                Normalization::ZScore => {
                    column.mapv_inplace(|v| {
                        if stats.std < f64::EPSILON {
                            0.0
                        } else {
                            (v - stats.mean) / stats.std
                        }
                    });
                }
            }
        }

        matrix
    }

    /// Raw values with unknowns replaced by the column mean
    pub fn impute(&self, records: &[FoodRecord]) -> Array2<f64> {
        let mut matrix = Array2::<f64>::zeros((records.len(), FEATURE_DIM));

        for kind in NutrientKind::ALL {
            let known: Vec<f64> = records.iter().filter_map(|r| r.nutrient(kind)).collect();
            let fill = if known.is_empty() {
                0.0
            } else {
                known.iter().sum::<f64>() / known.len() as f64
            };

            for (row, record) in records.iter().enumerate() {
                matrix[[row, kind.index()]] = record.nutrient(kind).unwrap_or(fill);
            }
        }

        matrix
    }

    /// Statistics of every column after imputation
    pub fn stats(&self, records: &[FoodRecord]) -> Vec<ColumnStats> {
        let matrix = self.impute(records);
        NutrientKind::ALL
            .iter()
            .map(|kind| column_stats(&matrix, kind.index(), known_count(records, *kind)))
            .collect()
    }
}

fn known_count(records: &[FoodRecord], kind: NutrientKind) -> usize {
    records.iter().filter(|r| r.nutrient(kind).is_some()).count()
}

fn column_stats(matrix: &Array2<f64>, col: usize, known: usize) -> ColumnStats {
    let column = matrix.column(col);
    if column.is_empty() {
        return ColumnStats {
            mean: 0.0,
            min: 0.0,
            max: 0.0,
            std: 0.0,
            known,
        };
    }

    let n = column.len() as f64;
    let mean = column.sum() / n;
    let min = column.iter().copied().fold(f64::INFINITY, f64::min);
    let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    ColumnStats {
        mean,
        min,
        max,
        std: variance.sqrt(),
        known,
    }
}
