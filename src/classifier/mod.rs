use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::config::{ClassifierBackend, Config};
use crate::emotion::EmotionScores;

/// Pluggable emotion classifier for still images.
/// Built once at start-up and shared across requests.
pub trait EmotionClassifier: Send + Sync {
    /// Score a single image file
    fn classify(&self, image: &Path) -> Result<EmotionScores>;
}

mod constant;
mod vit;

pub use constant::ConstantClassifier;
pub use vit::VitClassifier;

/// Construct the backend selected in `config`
pub fn build(config: &Config) -> Result<Arc<dyn EmotionClassifier>> {
    match config.classifier {
        ClassifierBackend::Vit => Ok(Arc::new(VitClassifier::new(&config.model_repo)?)),
        ClassifierBackend::Constant => {
            tracing::info!("[classifier] Using constant scores, no model loaded");
            Ok(Arc::new(ConstantClassifier::new()))
        }
    }
}
