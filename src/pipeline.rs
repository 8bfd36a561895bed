//! Image and video processing: classify, encode, clean up.
//!
//! Videos are sampled into a private frame directory, each frame is
//! classified and deleted as soon as its block is written, and the directory
//! is removed on every exit path.

use bytes::{Bytes, BytesMut};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::classifier::EmotionClassifier;
use crate::constants::{BLOCK_SIZE, FRAMES_DIR_PREFIX};
use crate::frames::{ExtractionError, FrameExtractor};
use crate::naming;

/// Upload kind as sent in the `fileType` form field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Exact, case-sensitive match on `Image` / `Video`
    pub fn from_discriminator(value: &str) -> Option<Self> {
        match value {
            "Image" => Some(MediaKind::Image),
            "Video" => Some(MediaKind::Video),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("frame extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("no frames extracted")]
    NoFrames,

    #[error("classification failed for {path:?}: {source}")]
    Classification {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("frame directory error: {0}")]
    Io(#[from] io::Error),
}

impl ProcessError {
    /// True when the uploaded content is at fault (maps to a client error)
    pub fn is_unsupported_input(&self) -> bool {
        match self {
            ProcessError::Extraction(e) => !e.is_infrastructure(),
            ProcessError::NoFrames | ProcessError::Classification { .. } => true,
            ProcessError::Io(_) => false,
        }
    }
}

/// Frame directory that is removed, with anything left in it, when dropped
struct FrameDir {
    path: PathBuf,
}

impl FrameDir {
    fn create(work_root: &Path) -> io::Result<Self> {
        let path = work_root.join(naming::unique_name_with_prefix(FRAMES_DIR_PREFIX));
        std::fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FrameDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!("[frames] Failed to cleanup frame dir {:?}: {}", self.path, e);
            }
        }
    }
}

/// Classify one image into a single result block
pub fn process_image(
    classifier: &dyn EmotionClassifier,
    image: &Path,
) -> Result<Bytes, ProcessError> {
    let scores = classifier
        .classify(image)
        .map_err(|source| ProcessError::Classification {
            path: image.to_path_buf(),
            source,
        })?;

    let mut out = BytesMut::with_capacity(BLOCK_SIZE);
    scores.encode_into(&mut out);
    Ok(out.freeze())
}

/// Classify every sampled frame of `video`, concatenating blocks in frame order.
/// The per-call frame directory under `work_root` never outlives this call.
pub fn process_video(
    extractor: &dyn FrameExtractor,
    classifier: &dyn EmotionClassifier,
    video: &Path,
    work_root: &Path,
    frame_rate: u32,
) -> Result<Bytes, ProcessError> {
    let frame_dir = FrameDir::create(work_root)?;

    let frames = extractor.extract(video, frame_dir.path(), frame_rate)?;
    if frames.is_empty() {
        return Err(ProcessError::NoFrames);
    }

    let frame_count = frames.len();
    let mut out = BytesMut::with_capacity(frame_count * BLOCK_SIZE);

    for frame in frames {
        let scores = classifier
            .classify(&frame)
            .map_err(|source| ProcessError::Classification {
                path: frame.clone(),
                source,
            })?;
        scores.encode_into(&mut out);

        if let Err(e) = std::fs::remove_file(&frame) {
            tracing::warn!("[frames] Failed to remove frame {:?}: {}", frame, e);
        }
    }

    drop(frame_dir);
    tracing::debug!("[frames] Classified {} frames from {:?}", frame_count, video);
    Ok(out.freeze())
}

/// Shared processing handle: one extractor and one classifier for the whole
/// process
pub struct Pipeline {
    extractor: Arc<dyn FrameExtractor>,
    classifier: Arc<dyn EmotionClassifier>,
    work_root: PathBuf,
    frame_rate: u32,
}

impl Pipeline {
    pub fn new(
        extractor: Arc<dyn FrameExtractor>,
        classifier: Arc<dyn EmotionClassifier>,
        work_root: PathBuf,
        frame_rate: u32,
    ) -> Self {
        Self {
            extractor,
            classifier,
            work_root,
            frame_rate,
        }
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    /// Blocking: runs inference and, for videos, ffmpeg
    pub fn process(&self, kind: MediaKind, path: &Path) -> Result<Bytes, ProcessError> {
        match kind {
            MediaKind::Image => process_image(self.classifier.as_ref(), path),
            MediaKind::Video => process_video(
                self.extractor.as_ref(),
                self.classifier.as_ref(),
                path,
                &self.work_root,
                self.frame_rate,
            ),
        }
    }
}
