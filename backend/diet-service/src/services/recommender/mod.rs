/// Recommender Module
///
/// Owns the dataset generation and answers the three query types.
///
/// # Generations
/// Each successful `load` installs a new immutable `Snapshot` (records, feature
/// matrix, no clusters). `train` installs a copy of the same generation with
/// cluster labels attached. Queries clone the current `Arc<Snapshot>` and never
/// see a mix of two generations.
///
/// # Last query wins
/// Every load draws a ticket from a monotonically increasing counter. A load
/// only installs its snapshot if no newer load has started since; a training
/// run only installs labels if the generation it trained on is still current.
use crate::models::{ClusterAssignment, FoodRecord};
use crate::services::clustering::{ClusterModel, KMeansConfig};
use crate::services::features::{FeatureEncoder, Normalization};
use crate::services::goals::GoalFilter;
use crate::services::loader::{DataLoader, LoadError};
use crate::services::similarity::SimilarityIndex;
use crate::services::source::FoodSource;
use ndarray::Array2;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct RecommenderConfig {
    pub fetch_timeout: Duration,
    pub normalization: Normalization,
    pub kmeans: KMeansConfig,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            normalization: Normalization::MinMax,
            kmeans: KMeansConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommenderState {
    Empty,
    Loaded,
    Trained,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadOutcome {
    Loaded { generation: u64, records: usize },
    /// Zero matching records; previous generation kept
    NoDataFound,
    /// Fetch failed or timed out; previous generation kept
    SourceUnavailable,
    /// A newer load started before this one finished
    Superseded,
    /// The job was aborted before it could finish
    Cancelled,
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded { .. })
    }
}

/// One immutable dataset generation
#[derive(Debug)]
pub struct Snapshot {
    generation: u64,
    records: Arc<[FoodRecord]>,
    features: Arc<Array2<f64>>,
    clusters: Option<Arc<ClusterAssignment>>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            generation: 0,
            records: Arc::from(Vec::new()),
            features: Arc::new(Array2::zeros((0, crate::models::FEATURE_DIM))),
            clusters: None,
        }
    }

    fn loaded(generation: u64, records: Vec<FoodRecord>, features: Array2<f64>) -> Self {
        Self {
            generation,
            records: Arc::from(records),
            features: Arc::new(features),
            clusters: None,
        }
    }

    fn with_clusters(&self, clusters: ClusterAssignment) -> Self {
        Self {
            generation: self.generation,
            records: Arc::clone(&self.records),
            features: Arc::clone(&self.features),
            clusters: Some(Arc::new(clusters)),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn records(&self) -> &[FoodRecord] {
        &self.records
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn clusters(&self) -> Option<&ClusterAssignment> {
        self.clusters.as_deref()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn state(&self) -> RecommenderState {
        if self.is_empty() {
            RecommenderState::Empty
        } else if self.clusters.is_some() {
            RecommenderState::Trained
        } else {
            RecommenderState::Loaded
        }
    }

    /// First record (dataset order) whose description or brand contains `query`
    pub fn find_anchor(&self, query: &str) -> Option<usize> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.records.iter().position(|r| r.matches_anchor(&needle))
    }

    pub fn filter_by_goal(&self, goal: &str, allergies: &[String]) -> Vec<FoodRecord> {
        GoalFilter::apply(&self.records, goal, allergies)
            .into_iter()
            .map(|m| self.records[m.index].clone())
            .collect()
    }

    pub fn find_similar(&self, query: &str, top_n: usize) -> Vec<FoodRecord> {
        let Some(anchor) = self.find_anchor(query) else {
            return Vec::new();
        };

        SimilarityIndex::new(&self.features)
            .nearest(anchor, top_n)
            .into_iter()
            .map(|n| self.records[n.index].clone())
            .collect()
    }

    /// Records sharing the anchor's cluster, excluding the anchor.
    /// Empty when untrained or when no anchor matches.
    pub fn cluster_foods(&self, query: &str) -> Vec<FoodRecord> {
        let Some(clusters) = self.clusters() else {
            return Vec::new();
        };
        let Some(anchor) = self.find_anchor(query) else {
            return Vec::new();
        };
        let Some(label) = clusters.label_of(anchor) else {
            return Vec::new();
        };

        self.records
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != anchor && clusters.label_of(*i) == Some(label))
            .map(|(_, r)| r.clone())
            .collect()
    }
}

pub struct Recommender {
    loader: DataLoader,
    encoder: FeatureEncoder,
    model: ClusterModel,
    current: RwLock<Arc<Snapshot>>,
    issued: AtomicU64,
}

impl Recommender {
    pub fn new(source: Arc<dyn FoodSource>, config: RecommenderConfig) -> Self {
        Self {
            loader: DataLoader::new(source, config.fetch_timeout),
            encoder: FeatureEncoder::new(config.normalization),
            model: ClusterModel::new(config.kmeans),
            current: RwLock::new(Arc::new(Snapshot::empty())),
            issued: AtomicU64::new(0),
        }
    }

    /// Current generation; hold on to it to run several queries consistently
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.current.read())
    }

    pub fn state(&self) -> RecommenderState {
        self.snapshot().state()
    }

    pub async fn load(&self, query: &str) -> bool {
        self.load_with_outcome(query).await.is_loaded()
    }

    pub async fn load_with_outcome(&self, query: &str) -> LoadOutcome {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;

        let records = match self.loader.load(query).await {
            Ok(records) => records,
            Err(LoadError::NoDataFound(_)) => return LoadOutcome::NoDataFound,
            Err(LoadError::SourceUnavailable(e)) => {
                warn!("Load for '{}' failed: {}", query, e);
                return LoadOutcome::SourceUnavailable;
            }
        };

        let features = self.encoder.encode(&records);
        let count = records.len();
        let snapshot = Arc::new(Snapshot::loaded(ticket, records, features));

        let mut current = self.current.write();
        if self.issued.load(Ordering::SeqCst) != ticket {
            warn!(
                "Load for '{}' superseded: ticket={}, latest={}",
                query,
                ticket,
                self.issued.load(Ordering::SeqCst)
            );
            return LoadOutcome::Superseded;
        }
        *current = snapshot;

        info!(
            "Dataset loaded: query='{}', generation={}, records={}",
            query, ticket, count
        );

        LoadOutcome::Loaded {
            generation: ticket,
            records: count,
        }
    }

    /// Cluster the current generation. False when nothing is loaded or the
    /// generation was replaced while training.
    pub async fn train(&self) -> bool {
        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            debug!("Train skipped: no dataset loaded");
            return false;
        }

        let model = self.model.clone();
        let features = Arc::clone(&snapshot.features);
        let assignment = match tokio::task::spawn_blocking(move || model.train(&features)).await {
            Ok(assignment) => assignment,
            Err(e) => {
                error!("Training task failed: {}", e);
                return false;
            }
        };

        self.install_clusters(&snapshot, assignment)
    }

    fn install_clusters(&self, trained_on: &Snapshot, assignment: ClusterAssignment) -> bool {
        let mut current = self.current.write();
        if current.generation != trained_on.generation {
            warn!(
                "Discarding clusters for stale generation {} (current {})",
                trained_on.generation, current.generation
            );
            return false;
        }

        info!(
            "Model trained: generation={}, k={}, iterations={}, inertia={:.4}",
            trained_on.generation, assignment.k, assignment.iterations, assignment.inertia
        );

        *current = Arc::new(current.with_clusters(assignment));
        true
    }

    pub fn filter_by_goal(&self, goal: &str, allergies: &[String]) -> Vec<FoodRecord> {
        self.snapshot().filter_by_goal(goal, allergies)
    }

    pub fn find_similar(&self, query: &str, top_n: usize) -> Vec<FoodRecord> {
        self.snapshot().find_similar(query, top_n)
    }

    pub fn get_cluster_foods(&self, query: &str) -> Vec<FoodRecord> {
        self.snapshot().cluster_foods(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NutrientKind, Nutrients, RawFood};
    use crate::services::source::StaticFoodSource;

    fn raw(id: &str, description: &str, calories: f64, protein: f64) -> RawFood {
        RawFood {
            source_id: id.to_string(),
            description: description.to_string(),
            brand: "Pantry".to_string(),
            category: "Snacks".to_string(),
            nutrients: Nutrients::default()
                .with(NutrientKind::Calories, calories)
                .with(NutrientKind::Protein, protein),
        }
    }

    fn recommender() -> Recommender {
        let source = StaticFoodSource::new(vec![
            raw("1", "Bean chips", 120.0, 4.0),
            raw("2", "Bean dip", 80.0, 3.0),
            raw("3", "Rice cake", 35.0, 1.0),
            raw("4", "Rice crackers", 110.0, 2.0),
        ]);
        Recommender::new(Arc::new(source), RecommenderConfig::default())
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let rec = recommender();
        assert_eq!(rec.state(), RecommenderState::Empty);

        assert!(rec.load("bean").await);
        assert_eq!(rec.state(), RecommenderState::Loaded);

        assert!(rec.train().await);
        assert_eq!(rec.state(), RecommenderState::Trained);

        assert!(rec.load("rice").await);
        assert_eq!(rec.state(), RecommenderState::Loaded);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_generation() {
        let rec = recommender();
        assert!(rec.load("bean").await);
        let before = rec.snapshot();

        assert_eq!(
            rec.load_with_outcome("quinoa").await,
            LoadOutcome::NoDataFound
        );

        let after = rec.snapshot();
        assert_eq!(before.generation(), after.generation());
        assert_eq!(after.len(), 2);
    }

    #[tokio::test]
    async fn test_train_without_data() {
        let rec = recommender();
        assert!(!rec.train().await);
        assert_eq!(rec.state(), RecommenderState::Empty);
    }

    #[tokio::test]
    async fn test_queries_before_load_are_empty() {
        let rec = recommender();
        assert!(rec.filter_by_goal("muscle_gain", &[]).is_empty());
        assert!(rec.find_similar("bean", 3).is_empty());
        assert!(rec.get_cluster_foods("bean").is_empty());
    }

    #[tokio::test]
    async fn test_stale_training_is_discarded() {
        let rec = recommender();
        assert!(rec.load("bean").await);
        let stale = rec.snapshot();

        assert!(rec.load("rice").await);
        let assignment = ClusterModel::default().train(stale.features());

        assert!(!rec.install_clusters(&stale, assignment));
        assert_eq!(rec.state(), RecommenderState::Loaded);
    }

    #[test]
    fn test_find_anchor_uses_description_and_brand() {
        let records = vec![
            FoodRecord {
                id: 0,
                source_id: "1".to_string(),
                description: "Granola".to_string(),
                brand: "Oat Co".to_string(),
                category: "Cereal".to_string(),
                nutrients: Nutrients::default(),
            },
            FoodRecord {
                id: 1,
                source_id: "2".to_string(),
                description: "Oat bar".to_string(),
                brand: String::new(),
                category: "Cereal".to_string(),
                nutrients: Nutrients::default(),
            },
        ];
        let features = FeatureEncoder::default().encode(&records);
        let snapshot = Snapshot::loaded(1, records, features);

        assert_eq!(snapshot.find_anchor("OAT"), Some(0));
        assert_eq!(snapshot.find_anchor("bar"), Some(1));
        assert_eq!(snapshot.find_anchor("cereal"), None);
        assert_eq!(snapshot.find_anchor(""), None);
    }
}
