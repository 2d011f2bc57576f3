//! Resumable model downloads: chunked streaming with HTTP range resume,
//! SHA-256 integrity verification, and progress reporting.

pub mod downloader;
pub mod error;
pub mod progress;

pub use downloader::{ModelDownloader, ModelFetchSpec};
pub use error::DownloadError;
pub use progress::{DownloadProgress, DownloadStatus, ProgressObserver};
