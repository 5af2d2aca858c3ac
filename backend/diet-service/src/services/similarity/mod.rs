use ndarray::{Array2, ArrayView1};

pub fn squared_euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

pub fn euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    squared_euclidean(a, b).sqrt()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Row index in the feature matrix
    pub index: usize,
    pub distance: f64,
}

/// Brute-force nearest-neighbor lookup over an encoded feature matrix
pub struct SimilarityIndex<'a> {
    features: &'a Array2<f64>,
}

impl<'a> SimilarityIndex<'a> {
    pub fn new(features: &'a Array2<f64>) -> Self {
        Self { features }
    }

    /// Up to `top_n` rows closest to `anchor`, excluding the anchor itself.
    /// Sorted by ascending distance, ties by row order.
    pub fn nearest(&self, anchor: usize, top_n: usize) -> Vec<Neighbor> {
        if anchor >= self.features.nrows() || top_n == 0 {
            return Vec::new();
        }

        let origin = self.features.row(anchor);
        let mut neighbors: Vec<Neighbor> = self
            .features
            .rows()
            .into_iter()
            .enumerate()
            .filter(|(i, _)| *i != anchor)
            .map(|(index, row)| Neighbor {
                index,
                distance: euclidean(origin, row),
            })
            .collect();

        // NaN distances sort last
        neighbors.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or_else(|| a.distance.is_nan().cmp(&b.distance.is_nan()))
                .then(a.index.cmp(&b.index))
        });
        neighbors.truncate(top_n);
        neighbors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_euclidean() {
        let a = array![0.0, 0.0];
        let b = array![3.0, 4.0];
        assert!((euclidean(a.view(), b.view()) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_nearest_excludes_anchor_and_sorts() {
        let features = array![[0.0, 0.0], [2.0, 0.0], [1.0, 0.0], [0.0, 0.0]];
        let index = SimilarityIndex::new(&features);

        let result = index.nearest(0, 10);
        let order: Vec<usize> = result.iter().map(|n| n.index).collect();

        assert_eq!(order, vec![3, 2, 1]);
        assert!(result.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_ties_keep_row_order() {
        let features = array![[0.0], [1.0], [-1.0], [1.0]];
        let result = SimilarityIndex::new(&features).nearest(0, 2);

        assert_eq!(result[0].index, 1);
        assert_eq!(result[1].index, 2);
    }

    #[test]
    fn test_out_of_range_anchor() {
        let features = array![[0.0], [1.0]];
        assert!(SimilarityIndex::new(&features).nearest(5, 3).is_empty());
        assert!(SimilarityIndex::new(&features).nearest(0, 0).is_empty());
    }
}
