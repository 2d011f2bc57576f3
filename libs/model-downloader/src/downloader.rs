use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use sha2::{Digest, Sha256};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};

use crate::error::DownloadError;
use crate::progress::{DownloadProgress, DownloadStatus, ProgressObserver};

const DEFAULT_CHUNK_SIZE: usize = 8192;
const RETRY_ATTEMPTS: u32 = 3;
const RETRY_DELAY_SECS: u64 = 5;
const DOWNLOAD_TIMEOUT_SECS: u64 = 300;

/// Describes a model artifact available for download, with the checksum
/// the downloaded bytes must match.
#[derive(Debug, Clone)]
pub struct ModelFetchSpec {
    pub model_id: String,
    pub source_url: String,
    pub expected_sha256: String,
    pub destination_dir: PathBuf,
}

impl ModelFetchSpec {
    fn temp_path(&self) -> PathBuf {
        self.destination_dir.join(format!("{}.part", self.model_id))
    }

    fn final_path(&self) -> PathBuf {
        self.destination_dir.join(format!("{}.bin", self.model_id))
    }
}

/// Resumable, integrity-checked model downloader.
pub struct ModelDownloader {
    client: Client,
}

impl ModelDownloader {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .user_agent("tiktrue-model-downloader/0.1")
                .timeout(std::time::Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
                .build()
                .expect("model downloader client must build with static config"),
        }
    }

    /// Downloads `spec.source_url` to `spec.destination_dir`, resuming from
    /// a partial `.part` file if one already exists, and verifies the
    /// result against `spec.expected_sha256` before the final rename.
    #[instrument(skip(self, spec, observer), fields(model_id = %spec.model_id))]
    pub async fn download(
        &self,
        spec: &ModelFetchSpec,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<PathBuf, DownloadError> {
        fs::create_dir_all(&spec.destination_dir).await?;

        let temp_path = spec.temp_path();
        let resume_from = match fs::metadata(&temp_path).await {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };

        let mut progress = DownloadProgress::new(spec.model_id.clone(), 0, temp_path.to_string_lossy().into_owned());
        progress.resume_position = resume_from;
        progress.status = DownloadStatus::Downloading;

        let mut last_err = None;
        for attempt in 1..=RETRY_ATTEMPTS {
            match self.attempt_download(spec, resume_from, &mut progress, observer.as_ref()).await {
                Ok(()) => {
                    last_err = None;
                    break;
                }
                Err(err) => {
                    warn!(attempt, %err, "download attempt failed, retrying");
                    last_err = Some(err);
                    tokio::time::sleep(std::time::Duration::from_secs(RETRY_DELAY_SECS)).await;
                }
            }
        }

        if let Some(err) = last_err {
            progress.status = DownloadStatus::Failed;
            progress.error_message = err.to_string();
            observer.on_progress(&progress);
            return Err(err);
        }

        progress.status = DownloadStatus::Verifying;
        observer.on_progress(&progress);
        self.verify_integrity(&temp_path, &spec.expected_sha256).await?;

        let final_path = spec.final_path();
        fs::rename(&temp_path, &final_path).await?;

        progress.status = DownloadStatus::Completed;
        observer.on_progress(&progress);
        info!(path = %final_path.display(), "model download complete");
        Ok(final_path)
    }

    async fn attempt_download(
        &self,
        spec: &ModelFetchSpec,
        resume_from: u64,
        progress: &mut DownloadProgress,
        observer: &dyn ProgressObserver,
    ) -> Result<(), DownloadError> {
        let mut request = self.client.get(&spec.source_url);
        if resume_from > 0 {
            request = request.header("Range", format!("bytes={}-", resume_from));
        }
        let response = request.send().await?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::PARTIAL_CONTENT {
            return Err(DownloadError::ServerRejection(format!("HTTP_{}", status)));
        }

        let content_length = response.content_length().unwrap_or(0);
        progress.total_size = if status == StatusCode::PARTIAL_CONTENT {
            resume_from + content_length
        } else {
            content_length
        };

        let append = status == StatusCode::PARTIAL_CONTENT && resume_from > 0;
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(spec.temp_path())
            .await?;

        let mut downloaded = if append { resume_from } else { 0 };
        let mut stream = response.bytes_stream();
        let mut since_last_report = 0usize;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            since_last_report += chunk.len();
            if since_last_report >= DEFAULT_CHUNK_SIZE * 16 {
                progress.record_progress(downloaded);
                observer.on_progress(progress);
                since_last_report = 0;
            }
        }
        file.flush().await?;
        progress.record_progress(downloaded);
        observer.on_progress(progress);
        Ok(())
    }

    async fn verify_integrity(&self, path: &Path, expected_sha256: &str) -> Result<(), DownloadError> {
        let mut file = fs::File::open(path).await?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; DEFAULT_CHUNK_SIZE];
        loop {
            let n = tokio::io::AsyncReadExt::read(&mut file, &mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        let actual = hex::encode(hasher.finalize());
        if actual.eq_ignore_ascii_case(expected_sha256) {
            Ok(())
        } else {
            Err(DownloadError::IntegrityMismatch {
                expected: expected_sha256.to_string(),
                actual,
            })
        }
    }
}

impl Default for ModelDownloader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingObserver {
        events: Mutex<Vec<DownloadStatus>>,
    }

    impl ProgressObserver for RecordingObserver {
        fn on_progress(&self, progress: &DownloadProgress) {
            self.events.lock().unwrap().push(progress.status);
        }
    }

    #[tokio::test]
    async fn verify_integrity_accepts_matching_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        tokio::fs::write(&path, b"hello world").await.unwrap();

        let mut hasher = Sha256::new();
        hasher.update(b"hello world");
        let expected = hex::encode(hasher.finalize());

        let downloader = ModelDownloader::new();
        assert!(downloader.verify_integrity(&path, &expected).await.is_ok());
    }

    #[tokio::test]
    async fn verify_integrity_rejects_mismatched_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        tokio::fs::write(&path, b"hello world").await.unwrap();

        let downloader = ModelDownloader::new();
        let err = downloader
            .verify_integrity(&path, "0000000000000000000000000000000000000000000000000000000000000000")
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::IntegrityMismatch { .. }));
    }

    #[test]
    fn fetch_spec_paths_are_scoped_to_destination_dir() {
        let spec = ModelFetchSpec {
            model_id: "llama-7b".to_string(),
            source_url: "https://example.invalid/llama-7b.bin".to_string(),
            expected_sha256: "abc".to_string(),
            destination_dir: PathBuf::from("/tmp/models"),
        };
        assert_eq!(spec.temp_path(), PathBuf::from("/tmp/models/llama-7b.part"));
        assert_eq!(spec.final_path(), PathBuf::from("/tmp/models/llama-7b.bin"));
    }

    #[tokio::test]
    async fn recording_observer_receives_a_completed_event_after_a_successful_verify() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        tokio::fs::write(&path, b"abc").await.unwrap();
        let mut hasher = Sha256::new();
        hasher.update(b"abc");
        let expected = hex::encode(hasher.finalize());

        let downloader = ModelDownloader::new();
        let observer = RecordingObserver { events: Mutex::new(Vec::new()) };
        downloader.verify_integrity(&path, &expected).await.unwrap();
        observer.on_progress(&{
            let mut p = DownloadProgress::new("m", 3, path.to_string_lossy().into_owned());
            p.status = DownloadStatus::Completed;
            p
        });
        assert_eq!(observer.events.lock().unwrap().as_slice(), &[DownloadStatus::Completed]);
    }
}
