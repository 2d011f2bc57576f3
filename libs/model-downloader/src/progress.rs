use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Pending,
    Downloading,
    Verifying,
    Completed,
    Failed,
    Paused,
}

/// Tracks a single model download's progress, speed, and resumability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadProgress {
    pub model_id: String,
    pub total_size: u64,
    pub downloaded_size: u64,
    pub download_speed_bps: f64,
    pub eta_secs: f64,
    pub status: DownloadStatus,
    pub started_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    pub error_message: String,
    pub resume_position: u64,
    pub temp_file_path: String,
}

impl DownloadProgress {
    pub fn new(model_id: impl Into<String>, total_size: u64, temp_file_path: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            model_id: model_id.into(),
            total_size,
            downloaded_size: 0,
            download_speed_bps: 0.0,
            eta_secs: 0.0,
            status: DownloadStatus::Pending,
            started_at: now,
            last_update: now,
            error_message: String::new(),
            resume_position: 0,
            temp_file_path: temp_file_path.into(),
        }
    }

    pub fn progress_percentage(&self) -> f64 {
        if self.total_size == 0 {
            0.0
        } else {
            (self.downloaded_size as f64 / self.total_size as f64) * 100.0
        }
    }

    /// Updates running-average speed and ETA from a new byte count.
    pub fn record_progress(&mut self, downloaded: u64) {
        self.downloaded_size = downloaded;
        let now = Utc::now();
        let elapsed = (now - self.started_at).num_milliseconds() as f64 / 1000.0;
        if elapsed > 0.0 {
            self.download_speed_bps = downloaded as f64 / elapsed;
            if self.download_speed_bps > 0.0 {
                let remaining = self.total_size.saturating_sub(downloaded) as f64;
                self.eta_secs = remaining / self.download_speed_bps;
            }
        }
        self.last_update = now;
    }
}

/// Callback invoked as a download makes progress.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, progress: &DownloadProgress);
}

impl<F: Fn(&DownloadProgress) + Send + Sync> ProgressObserver for F {
    fn on_progress(&self, progress: &DownloadProgress) {
        self(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_percentage_handles_zero_total_size() {
        let progress = DownloadProgress::new("m1", 0, "/tmp/m1.part");
        assert_eq!(progress.progress_percentage(), 0.0);
    }

    #[test]
    fn progress_percentage_is_proportional() {
        let mut progress = DownloadProgress::new("m1", 100, "/tmp/m1.part");
        progress.downloaded_size = 50;
        assert_eq!(progress.progress_percentage(), 50.0);
    }
}
