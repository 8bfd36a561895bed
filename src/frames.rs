//! Video frame extraction.
//!
//! Frames are written by ffmpeg as `frame_000001.jpg`, `frame_000002.jpg`, ...
//! into a caller-owned directory and returned in frame-index order.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

const FRAME_PREFIX: &str = "frame_";
const FRAME_EXTENSION: &str = "jpg";
const FRAME_PATTERN: &str = "frame_%06d.jpg";

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("ffmpeg exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("failed to read extracted frames: {0}")]
    Io(#[from] io::Error),
}

impl ExtractionError {
    /// True when the failure is ours (missing binary, unreadable work dir)
    /// rather than a property of the uploaded file.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, ExtractionError::Spawn { .. } | ExtractionError::Io(_))
    }
}

/// Extracted frame files in temporal order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameList(Vec<PathBuf>);

impl FrameList {
    pub fn new(frames: Vec<PathBuf>) -> Self {
        Self(frames)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.0.iter()
    }
}

impl IntoIterator for FrameList {
    type Item = PathBuf;
    type IntoIter = std::vec::IntoIter<PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Pluggable frame source for video uploads
pub trait FrameExtractor: Send + Sync {
    /// Sample `video` at `frame_rate` fps into `out_dir`.
    /// `out_dir` exists and is owned by the caller.
    fn extract(
        &self,
        video: &Path,
        out_dir: &Path,
        frame_rate: u32,
    ) -> Result<FrameList, ExtractionError>;
}

pub struct FfmpegExtractor {
    ffmpeg_path: String,
    threads: usize,
}

impl FfmpegExtractor {
    pub fn new(ffmpeg_path: impl Into<String>, threads: usize) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            threads: threads.max(1),
        }
    }
}

impl FrameExtractor for FfmpegExtractor {
    fn extract(
        &self,
        video: &Path,
        out_dir: &Path,
        frame_rate: u32,
    ) -> Result<FrameList, ExtractionError> {
        let threads = self.threads.to_string();
        let vf = format!("fps={}", frame_rate.max(1));

        let output = Command::new(&self.ffmpeg_path)
            .args(["-hide_banner", "-loglevel", "error", "-nostdin"])
            .args(["-threads", &threads])
            .arg("-i")
            .arg(video)
            .args(["-an", "-sn"])
            .args(["-vf", &vf])
            .args(["-q:v", "4"])
            .arg("-y")
            .arg(out_dir.join(FRAME_PATTERN))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| ExtractionError::Spawn {
                program: self.ffmpeg_path.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ExtractionError::Failed {
                status: output.status.to_string(),
                stderr,
            });
        }

        let frames = collect_frames(out_dir)?;
        tracing::debug!(
            "[frames] Extracted {} frames from {:?} at {} fps",
            frames.len(),
            video,
            frame_rate
        );
        Ok(frames)
    }
}

/// Numeric index of a `frame_<n>.jpg` file name
fn frame_index(path: &Path) -> Option<u64> {
    if path.extension().and_then(|e| e.to_str()) != Some(FRAME_EXTENSION) {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix(FRAME_PREFIX)?
        .parse()
        .ok()
}

/// List extracted frames in `dir`, ordered by frame index rather than name
pub fn collect_frames(dir: &Path) -> io::Result<FrameList> {
    let mut indexed: Vec<(u64, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(index) = frame_index(&path) {
            indexed.push((index, path));
        }
    }
    indexed.sort_by_key(|(index, _)| *index);
    Ok(FrameList(indexed.into_iter().map(|(_, path)| path).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_ordered_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["frame_10.jpg", "frame_2.jpg", "frame_1.jpg", "frame_000003.jpg"] {
            std::fs::write(dir.path().join(name), b"jpg").unwrap();
        }

        let frames = collect_frames(dir.path()).unwrap();
        let names: Vec<_> = frames
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["frame_1.jpg", "frame_2.jpg", "frame_000003.jpg", "frame_10.jpg"]
        );
    }

    #[test]
    fn unrelated_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("frame_1.jpg"), b"jpg").unwrap();
        std::fs::write(dir.path().join("frame_2.png"), b"png").unwrap();
        std::fs::write(dir.path().join("frame_x.jpg"), b"jpg").unwrap();
        std::fs::write(dir.path().join("input.mp4"), b"mp4").unwrap();
        std::fs::create_dir(dir.path().join("frame_3.jpg")).unwrap();

        let frames = collect_frames(dir.path()).unwrap();
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn missing_ffmpeg_is_an_infrastructure_error() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = FfmpegExtractor::new("/nonexistent/bin/ffmpeg", 1);

        let err = extractor
            .extract(Path::new("clip.mp4"), dir.path(), 4)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Spawn { .. }));
        assert!(err.is_infrastructure());
    }

    #[cfg(unix)]
    #[test]
    fn failing_transcoder_is_an_input_error() {
        // `false` ignores its arguments and exits 1, standing in for ffmpeg
        // rejecting an undecodable file.
        let dir = tempfile::tempdir().unwrap();
        let extractor = FfmpegExtractor::new("false", 1);

        let err = extractor
            .extract(Path::new("not-a-video.mp4"), dir.path(), 4)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Failed { .. }));
        assert!(!err.is_infrastructure());
    }
}
