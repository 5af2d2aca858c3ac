pub mod backup;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;

pub use config::Config;
pub use services::{
    ClusterModel, DataLoader, FeatureEncoder, GoalFilter, Recommender, RecommenderHandle,
    RecommenderWorker, SimilarityIndex,
};
