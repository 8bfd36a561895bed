//! Upload persistence.
//!
//! Uploads are written to the uploads folder under a unique name before
//! processing and deleted when the returned handle is dropped.

use std::io;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncWriteExt};

use crate::naming;
use crate::pipeline::MediaKind;

/// A persisted upload. The file is removed on drop.
#[derive(Debug)]
pub struct StoredUpload {
    path: PathBuf,
}

impl StoredUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoredUpload {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!("[upload] Failed to remove upload {:?}: {}", self.path, e);
            }
        }
    }
}

/// Extension for the stored file: the client's, if it is short and plain,
/// otherwise the media kind
pub fn upload_extension(original_name: Option<&str>, kind: MediaKind) -> String {
    original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| kind.as_str().to_string())
}

pub async fn persist_upload(
    upload_dir: &Path,
    kind: MediaKind,
    original_name: Option<&str>,
    data: &[u8],
) -> io::Result<StoredUpload> {
    tokio::fs::create_dir_all(upload_dir).await?;

    let file_name = format!(
        "{}.{}",
        naming::unique_name(),
        upload_extension(original_name, kind)
    );
    let stored = write_upload(upload_dir.join(file_name), data).await?;

    tracing::debug!("[upload] Saved {} bytes to {:?}", data.len(), stored.path);
    Ok(stored)
}

/// The guard exists before the first byte is written, so a failed or partial
/// write leaves nothing behind
async fn write_upload<R>(path: PathBuf, mut data: R) -> io::Result<StoredUpload>
where
    R: AsyncRead + Unpin,
{
    let stored = StoredUpload { path };
    let mut file = tokio::fs::File::create(&stored.path).await?;
    tokio::io::copy(&mut data, &mut file).await?;
    file.flush().await?;
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    /// Yields `remaining` bytes, then fails like a device running out of space
    struct FailingReader {
        remaining: usize,
    }

    impl AsyncRead for FailingReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.remaining == 0 {
                return Poll::Ready(Err(io::Error::other("no space left on device")));
            }
            let n = self.remaining.min(buf.remaining());
            buf.put_slice(&vec![0u8; n]);
            self.remaining -= n;
            Poll::Ready(Ok(()))
        }
    }

    #[test]
    fn keeps_plain_client_extensions() {
        assert_eq!(upload_extension(Some("holiday.MP4"), MediaKind::Video), "mp4");
        assert_eq!(upload_extension(Some("face.jpeg"), MediaKind::Image), "jpeg");
    }

    #[test]
    fn falls_back_to_media_kind() {
        assert_eq!(upload_extension(None, MediaKind::Video), "video");
        assert_eq!(upload_extension(Some("noext"), MediaKind::Image), "image");
        assert_eq!(upload_extension(Some("x.tar.gz?x=1"), MediaKind::Image), "image");
        assert_eq!(upload_extension(Some("a.verylongext"), MediaKind::Video), "video");
    }

    #[tokio::test]
    async fn upload_is_removed_when_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let upload_dir = dir.path().join("uploads");

        let stored = persist_upload(&upload_dir, MediaKind::Image, Some("face.png"), b"pixels")
            .await
            .unwrap();
        let path = stored.path().to_path_buf();
        assert_eq!(std::fs::read(&path).unwrap(), b"pixels");
        assert_eq!(path.extension().unwrap(), "png");

        drop(stored);
        assert!(!path.exists());
        assert!(std::fs::read_dir(&upload_dir).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn concurrent_uploads_get_distinct_paths() {
        let dir = tempfile::tempdir().unwrap();
        let a = persist_upload(dir.path(), MediaKind::Video, Some("clip.mp4"), b"a")
            .await
            .unwrap();
        let b = persist_upload(dir.path(), MediaKind::Video, Some("clip.mp4"), b"b")
            .await
            .unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[tokio::test]
    async fn failed_write_leaves_no_partial_upload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.mp4");

        let result = write_upload(path.clone(), FailingReader { remaining: 8192 }).await;
        assert!(result.is_err());
        assert!(!path.exists());
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn write_into_missing_dir_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent").join("face.png");

        assert!(write_upload(path, &b"pixels"[..]).await.is_err());
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}
