pub mod classifier;
pub mod config;
pub mod constants;
pub mod emotion;
pub mod error;
pub mod frames;
pub mod logging;
pub mod naming;
pub mod pipeline;
pub mod routes;
pub mod storage;
pub mod timeline;

use axum::{Router, extract::DefaultBodyLimit};
use std::sync::Arc;

use config::Config;
use pipeline::Pipeline;

pub struct AppState {
    pub config: Config,
    pub pipeline: Arc<Pipeline>,
}

/// Router with all routes and the upload body limit applied
pub fn app(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_size;
    Router::new()
        .merge(routes::build_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
