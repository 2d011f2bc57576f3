use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitoringError {
    #[error("no license information available for a license-usage report")]
    NoLicenseInfo,
}
