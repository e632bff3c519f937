pub mod dataset;
pub mod matrix;
pub mod recommender;
pub mod similarity;
