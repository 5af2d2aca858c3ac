pub mod clustering;
pub mod features;
pub mod goals;
pub mod loader;
pub mod recommender;
pub mod similarity;
pub mod source;
pub mod worker;

pub use clustering::ClusterModel;
pub use features::FeatureEncoder;
pub use goals::GoalFilter;
pub use loader::DataLoader;
pub use recommender::Recommender;
pub use similarity::SimilarityIndex;
pub use worker::{RecommenderHandle, RecommenderWorker};
