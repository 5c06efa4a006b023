pub mod applications;
pub mod matching;
pub mod stats_models;
