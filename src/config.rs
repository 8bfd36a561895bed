//! Environment configuration.
//!
//! Every value has a default; numbers that fail to parse or are zero fall
//! back to the default rather than aborting start-up.

use std::path::PathBuf;

use crate::constants::{
    DEFAULT_FFMPEG_PATH, DEFAULT_FFMPEG_THREADS, DEFAULT_FRAME_RATE, DEFAULT_MODEL_REPO,
    DEFAULT_PORT, DEFAULT_UPLOAD_FOLDER, FRAMES_DIR_PREFIX, MAX_UPLOAD_SIZE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierBackend {
    /// ViT expression model run with candle
    Vit,
    /// Fixed scores for every image, no model loaded
    Constant,
}

impl ClassifierBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "vit" => Some(ClassifierBackend::Vit),
            "constant" | "noop" => Some(ClassifierBackend::Constant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub upload_dir: PathBuf,
    pub frames_work_dir: PathBuf,
    pub frame_rate: u32,
    pub max_upload_size: usize,
    pub ffmpeg_path: String,
    pub ffmpeg_threads: usize,
    pub classifier: ClassifierBackend,
    pub model_repo: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, used by `from_env` and tests
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let positive = |key: &str| {
            lookup(key)
                .and_then(|s| s.trim().parse::<u64>().ok())
                .filter(|v| *v > 0)
        };

        let classifier = match lookup("CLASSIFIER") {
            Some(value) => ClassifierBackend::parse(&value).unwrap_or_else(|| {
                tracing::warn!(
                    "[config] Unknown CLASSIFIER {:?}, falling back to vit",
                    value
                );
                ClassifierBackend::Vit
            }),
            None => ClassifierBackend::Vit,
        };

        Self {
            port: positive("PORT")
                .and_then(|v| u16::try_from(v).ok())
                .unwrap_or(DEFAULT_PORT),
            upload_dir: lookup("UPLOAD_FOLDER")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_FOLDER)),
            frames_work_dir: lookup("FRAMES_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join(FRAMES_DIR_PREFIX)),
            frame_rate: positive("FRAME_RATE")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(DEFAULT_FRAME_RATE),
            max_upload_size: positive("MAX_UPLOAD_SIZE")
                .and_then(|v| usize::try_from(v).ok())
                .unwrap_or(MAX_UPLOAD_SIZE),
            ffmpeg_path: lookup("FFMPEG_PATH")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FFMPEG_PATH.to_string()),
            ffmpeg_threads: positive("FFMPEG_THREADS")
                .and_then(|v| usize::try_from(v).ok())
                .unwrap_or(DEFAULT_FFMPEG_THREADS),
            classifier,
            model_repo: lookup("EMOTION_MODEL_REPO")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL_REPO.to_string()),
        }
    }
}
