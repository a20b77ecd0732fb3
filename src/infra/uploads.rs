//! Runtime video storage for lesson media.

use std::error::Error as StdError;
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use futures::{StreamExt, pin_mut, stream};
use sha2::{Digest, Sha256};
use slug::slugify;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

/// Errors that can occur while interacting with the video storage backend.
#[derive(Debug, Error)]
pub enum VideoStorageError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("uploaded file exceeds configured body limit")]
    PayloadTooLarge {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("uploaded file stream failed")]
    PayloadStream {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("uploaded file is empty")]
    EmptyPayload,
    #[error("uploaded file size exceeds supported range")]
    SizeOverflow,
}

/// Result of storing a video payload.
#[derive(Debug, Clone)]
pub struct StoredVideo {
    pub stored_path: String,
    pub checksum: String,
    pub size_bytes: i64,
}

/// Filesystem-backed storage for lesson videos.
#[derive(Debug)]
pub struct VideoStorage {
    root: PathBuf,
}

impl VideoStorage {
    /// Initialise storage rooted at the provided directory, creating it if
    /// necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Store the provided payload and return metadata describing it.
    ///
    /// The payload is streamed to disk to avoid buffering large videos in
    /// memory.
    pub async fn store_stream<S>(
        &self,
        original_name: &str,
        stream: S,
    ) -> Result<StoredVideo, VideoStorageError>
    where
        S: futures::Stream<Item = Result<Bytes, VideoStorageError>>,
    {
        let stored_path = self.build_stored_path(original_name);
        let absolute = self.resolve(&stored_path)?;

        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&absolute).await?;
        let mut hasher = Sha256::new();
        let mut total_bytes: u64 = 0;
        let mut saw_payload = false;

        pin_mut!(stream);
        while let Some(chunk_result) = stream.next().await {
            let chunk = match chunk_result {
                Ok(chunk) => chunk,
                Err(err) => {
                    drop(file);
                    let _ = fs::remove_file(&absolute).await;
                    return Err(err);
                }
            };

            if chunk.is_empty() {
                continue;
            }

            saw_payload = true;
            total_bytes = total_bytes
                .checked_add(chunk.len() as u64)
                .ok_or(VideoStorageError::SizeOverflow)?;
            file.write_all(&chunk).await?;
            hasher.update(&chunk);
        }

        file.flush().await?;

        if !saw_payload {
            drop(file);
            let _ = fs::remove_file(&absolute).await;
            return Err(VideoStorageError::EmptyPayload);
        }

        let checksum = hex::encode(hasher.finalize());
        let size_bytes =
            i64::try_from(total_bytes).map_err(|_| VideoStorageError::SizeOverflow)?;

        Ok(StoredVideo {
            stored_path,
            checksum,
            size_bytes,
        })
    }

    /// Store a fully-buffered payload. Intended for tests and small files.
    pub async fn store(
        &self,
        original_name: &str,
        data: Bytes,
    ) -> Result<StoredVideo, VideoStorageError> {
        let stream = stream::once(async move { Ok::<_, VideoStorageError>(data) });
        self.store_stream(original_name, stream).await
    }

    /// Read the stored payload into memory.
    pub async fn read(&self, stored_path: &str) -> Result<Bytes, VideoStorageError> {
        let absolute = self.resolve(stored_path)?;
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    /// Remove the stored payload. Missing files are treated as success.
    pub async fn delete(&self, stored_path: &str) -> Result<(), VideoStorageError> {
        let absolute = self.resolve(stored_path)?;
        match fs::remove_file(&absolute).await {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(VideoStorageError::Io(err)),
        }
    }

    /// Resolve the absolute filesystem path for a stored video.
    fn resolve(&self, stored_path: &str) -> Result<PathBuf, VideoStorageError> {
        let relative = Path::new(stored_path);
        if relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(VideoStorageError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }

    fn build_stored_path(&self, original_name: &str) -> String {
        let (year, month, day) = time::OffsetDateTime::now_utc().to_calendar_date();
        let directory = format!("{year}/{:02}/{:02}", month as u8, day);
        let identifier = Uuid::new_v4();
        let filename = sanitize_filename(original_name);
        format!("{directory}/{identifier}-{filename}")
    }
}

fn sanitize_filename(original: &str) -> String {
    let path = Path::new(original);
    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("video");
    let mut base = slugify(stem);
    if base.is_empty() {
        base = "video".to_string();
    }

    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty());

    match extension {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_and_deletes_a_payload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = VideoStorage::new(dir.path().to_path_buf()).expect("storage");

        let stored = storage
            .store("Intro Lesson.mp4", Bytes::from_static(b"not really a video"))
            .await
            .expect("store succeeds");

        assert!(stored.stored_path.ends_with("intro-lesson.mp4"));
        assert_eq!(stored.size_bytes, 18);

        let read_back = storage.read(&stored.stored_path).await.expect("read");
        assert_eq!(read_back, Bytes::from_static(b"not really a video"));

        storage.delete(&stored.stored_path).await.expect("delete");
        assert!(storage.read(&stored.stored_path).await.is_err());
    }

    #[tokio::test]
    async fn empty_payloads_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = VideoStorage::new(dir.path().to_path_buf()).expect("storage");

        let result = storage.store("empty.mp4", Bytes::new()).await;
        assert!(matches!(result, Err(VideoStorageError::EmptyPayload)));
    }

    #[tokio::test]
    async fn traversal_paths_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = VideoStorage::new(dir.path().to_path_buf()).expect("storage");

        assert!(matches!(
            storage.read("../outside").await,
            Err(VideoStorageError::InvalidPath)
        ));
        assert!(matches!(
            storage.delete("/etc/passwd").await,
            Err(VideoStorageError::InvalidPath)
        ));
    }

    #[test]
    fn filenames_are_slugged_with_extension_kept() {
        assert_eq!(sanitize_filename("My Video File.MP4"), "my-video-file.mp4");
        assert_eq!(sanitize_filename("..."), "video");
        assert_eq!(sanitize_filename("no_ext"), "no-ext");
    }
}
