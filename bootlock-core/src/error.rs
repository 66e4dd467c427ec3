use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::license::BindingMode;

#[derive(Error, Debug)]
pub enum LicenseError {
    #[error("License File Not Found: {}", .path.display())]
    ArtifactNotFound { path: PathBuf },
    #[error("License File Unreadable: {}", .path.display())]
    ArtifactUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed License Document")]
    MalformedDocument(#[source] serde_json::Error),
    #[error("Invalid License Public Key")]
    InvalidPublicKey,
    /// Does not say whether the signature bytes or the content were altered.
    #[error("License Signature Invalid or Tampered")]
    SignatureInvalid,
    #[error("License Not Yet Valid (valid from {issue_date})")]
    NotYetValid { issue_date: i64 },
    #[error("License Expired (valid until {expire_date})")]
    Expired { expire_date: i64 },
    #[error("Malformed License Dates: {0}")]
    MalformedTemporalData(&'static str),
    #[error("License Has No Bound Machines")]
    NoMachinesConfigured,
    #[error("Machine Not Authorized By License ({mode} mode)")]
    MachineMismatch { mode: BindingMode },
    #[error("Unsupported License Mode: {0:?}")]
    UnsupportedMode(String),
    #[error("Rollback Record Malformed: {0}")]
    RollbackRecordMalformed(&'static str),
    #[error("Rollback Record Tampered")]
    RollbackRecordTampered,
    #[error("Clock Rollback Detected (now {now} < last recorded {last})")]
    ClockRollbackDetected { now: i64, last: i64 },
    #[error("Rollback Check I/O Failure: {}", .path.display())]
    RollbackIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config File Unreadable: {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Config File Invalid")]
    Parse(#[from] serde_json::Error),
    #[error("Config Value Missing: {0}")]
    Missing(&'static str),
}
