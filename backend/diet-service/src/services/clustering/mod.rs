// ============================================
// K-Means Cluster Model
// ============================================
//
// Lloyd's algorithm with k-means++ seeding over the encoded feature matrix.
//
// Cluster count heuristic:
//   k = min(max_clusters, max(2, n / 10)), clamped to n
//
// Seeding draws from a StdRng built from a fixed seed, so the same feature
// matrix and config always produce the same labels.

use crate::models::ClusterAssignment;
use crate::services::similarity::squared_euclidean;
use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeansConfig {
    /// Upper bound on k
    pub max_clusters: usize,
    /// Seed for k-means++ initialization
    pub seed: u64,
    pub max_iterations: usize,
    /// Stop once no centroid moves further than this
    pub tolerance: f64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            max_clusters: 8,
            seed: 42,
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

/// Number of clusters to train for a dataset of `n` records
pub fn cluster_count(n: usize, max_clusters: usize) -> usize {
    if n == 0 {
        return 0;
    }
    (n / 10).max(2).min(max_clusters.max(1)).min(n)
}

#[derive(Debug, Clone, Default)]
pub struct ClusterModel {
    config: KMeansConfig,
}

impl ClusterModel {
    pub fn new(config: KMeansConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KMeansConfig {
        &self.config
    }

    /// Train with k derived from the number of rows
    pub fn train(&self, features: &Array2<f64>) -> ClusterAssignment {
        let k = cluster_count(features.nrows(), self.config.max_clusters);
        self.train_with_k(features, k)
    }

    /// Partition rows into `k` groups and label every row
    pub fn train_with_k(&self, features: &Array2<f64>, k: usize) -> ClusterAssignment {
        let n = features.nrows();
        let k = k.min(n);
        if k == 0 {
            return ClusterAssignment {
                labels: Vec::new(),
                k: 0,
                inertia: 0.0,
                iterations: 0,
            };
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut centroids = init_centroids(features, k, &mut rng);
        let mut labels = vec![0usize; n];
        let mut iterations = 0;

        for _ in 0..self.config.max_iterations.max(1) {
            iterations += 1;
            assign(features, &centroids, &mut labels);

            let updated = update_centroids(features, &labels, &centroids);
            let shift = centroids
                .rows()
                .into_iter()
                .zip(updated.rows())
                .map(|(old, new)| squared_euclidean(old, new).sqrt())
                .fold(0.0, f64::max);

            centroids = updated;
            if shift <= self.config.tolerance {
                break;
            }
        }

        let inertia = assign(features, &centroids, &mut labels);

        debug!(
            "k-means finished: n={}, k={}, iterations={}, inertia={:.6}",
            n, k, iterations, inertia
        );

        ClusterAssignment {
            labels,
            k,
            inertia,
            iterations,
        }
    }
}

/// k-means++ seeding: each new centroid is drawn with probability
/// proportional to its squared distance from the nearest chosen one.
fn init_centroids(features: &Array2<f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
    let n = features.nrows();
    let mut chosen: Vec<usize> = Vec::with_capacity(k);
    chosen.push(rng.gen_range(0..n));

    let mut nearest: Vec<f64> = (0..n)
        .map(|i| squared_euclidean(features.row(i), features.row(chosen[0])))
        .collect();

    while chosen.len() < k {
        let total: f64 = nearest.iter().sum();

        let next = if total <= f64::EPSILON {
            // every remaining point coincides with a centroid
            (0..n).find(|i| !chosen.contains(i)).unwrap_or(0)
        } else {
            let target = rng.gen::<f64>() * total;
            let mut acc = 0.0;
            let mut pick = n - 1;
            for (i, d) in nearest.iter().enumerate() {
                acc += d;
                if acc >= target && *d > 0.0 {
                    pick = i;
                    break;
                }
            }
            pick
        };

        chosen.push(next);
        for (i, d) in nearest.iter_mut().enumerate() {
            *d = d.min(squared_euclidean(features.row(i), features.row(next)));
        }
    }

    let mut centroids = Array2::<f64>::zeros((k, features.ncols()));
    for (c, &i) in chosen.iter().enumerate() {
        centroids.row_mut(c).assign(&features.row(i));
    }
    centroids
}

/// Label each row with its nearest centroid (lowest index on ties).
/// Returns the resulting inertia.
fn assign(features: &Array2<f64>, centroids: &Array2<f64>, labels: &mut [usize]) -> f64 {
    let mut inertia = 0.0;
    for (i, row) in features.rows().into_iter().enumerate() {
        let (best, dist) = nearest_centroid(row, centroids);
        labels[i] = best;
        inertia += dist;
    }
    inertia
}

fn nearest_centroid(row: ArrayView1<f64>, centroids: &Array2<f64>) -> (usize, f64) {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (c, centroid) in centroids.rows().into_iter().enumerate() {
        let dist = squared_euclidean(row, centroid);
        if dist < best_dist {
            best = c;
            best_dist = dist;
        }
    }
    (best, best_dist)
}

/// Recompute centroids as member means. An empty cluster is re-seeded with
/// the row farthest from its current centroid.
fn update_centroids(
    features: &Array2<f64>,
    labels: &[usize],
    centroids: &Array2<f64>,
) -> Array2<f64> {
    let k = centroids.nrows();
    let mut sums = Array2::<f64>::zeros(centroids.raw_dim());
    let mut counts = vec![0usize; k];

    for (i, row) in features.rows().into_iter().enumerate() {
        let label = labels[i];
        let mut sum = sums.row_mut(label);
        sum += &row;
        counts[label] += 1;
    }

    let mut taken: Vec<usize> = Vec::new();
    for c in 0..k {
        if counts[c] > 0 {
            let mean = &sums.row(c) / counts[c] as f64;
            sums.row_mut(c).assign(&mean);
            continue;
        }

        let farthest = (0..features.nrows())
            .filter(|i| !taken.contains(i))
            .map(|i| {
                let d = squared_euclidean(features.row(i), centroids.row(labels[i]));
                (i, d)
            })
            .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
                Some((_, bd)) if bd >= d => best,
                _ => Some((i, d)),
            });

        match farthest {
            Some((i, _)) => {
                taken.push(i);
                sums.row_mut(c).assign(&features.row(i));
            }
            None => sums.row_mut(c).assign(&centroids.row(c)),
        }
    }

    sums
}
