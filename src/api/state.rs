use std::sync::Arc;

use crate::config::Config;
use crate::services::recommender::Recommender;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<Recommender>,
    pub config: Config,
}

impl AppState {
    pub fn new(model: Arc<Recommender>, config: Config) -> Self {
        Self { model, config }
    }
}
