pub mod communities;
pub mod favorites;
pub mod health;
pub mod learning_paths;
pub mod metrics;
