pub mod export;
pub mod ingredients;
pub mod recommendations;

pub use recommendations::{RecommendationIndex, RecommendationService, RecommenderSettings};
