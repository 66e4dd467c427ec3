//! The four license checks. Each one either passes or fails with a single [`LicenseError`].
//!
//! They are independent of each other; [`crate::LicenseVerifier`] decides the order.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use ed25519_dalek::VerifyingKey;
use fs2::FileExt;
use log::trace;
use tempfile::NamedTempFile;

use crate::error::LicenseError;
use crate::license::{BindingMode, License, MachineFingerprint, Timestamp};
use crate::{signature, stamp};

pub(crate) fn check_signature(license: &mut License, key: &VerifyingKey) -> Result<(), LicenseError> {
    signature::verify_detached(license, key)
}

/// Inclusive on both ends.
pub(crate) fn check_validity_window(license: &License, now: i64) -> Result<(), LicenseError> {
    let issue_date = epoch_millis(license.issue_date.as_ref(), "issueDate")?;
    let expire_date = epoch_millis(license.expire_date.as_ref(), "expireDate")?;

    if now < issue_date {
        trace!("License Not Yet Valid {now} < {issue_date}");
        return Err(LicenseError::NotYetValid { issue_date });
    }

    if now > expire_date {
        trace!("License Expired {now} > {expire_date}");
        return Err(LicenseError::Expired { expire_date });
    }

    Ok(())
}

fn epoch_millis(date: Option<&Timestamp>, field: &'static str) -> Result<i64, LicenseError> {
    match date {
        Some(Timestamp::Millis(millis)) => Ok(*millis),
        Some(Timestamp::Other(value)) => {
            trace!("License {field} is not epoch millis: {value}");
            Err(LicenseError::MalformedTemporalData(field))
        }
        None => {
            trace!("License {field} missing");
            Err(LicenseError::MalformedTemporalData(field))
        }
    }
}

pub(crate) fn check_hardware(license: &License, current: &MachineFingerprint) -> Result<(), LicenseError> {
    let Some(first) = license.bound_machines.first() else {
        return Err(LicenseError::NoMachinesConfigured);
    };

    let Some(mode) = BindingMode::parse(&license.mode) else {
        return Err(LicenseError::UnsupportedMode(license.mode.clone()));
    };

    let authorized = match mode {
        BindingMode::Standalone => first.matches(current),
        BindingMode::Cluster => license.bound_machines.iter().any(|bound| bound.matches(current)),
    };

    if authorized {
        Ok(())
    } else {
        trace!("Hardware Locks Failed to match ({mode})");
        Err(LicenseError::MachineMismatch { mode })
    }
}

/// Compares `now` with the last stamped time in `record_path`, then stamps `now`.
///
/// A missing record is a first run and is simply created. The whole read-compare-write
/// happens under an exclusive lock on `<record>.lock`, and the new record replaces the old
/// one by rename so a failed write never leaves a truncated record behind.
pub(crate) fn check_time_rollback(record_path: &Path, secret: &str, now: i64) -> Result<(), LicenseError> {
    let io_failure = |source: io::Error| LicenseError::RollbackIo { path: record_path.to_path_buf(), source };

    let dir = match record_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(io_failure)?;

    let lock = OpenOptions::new().write(true).create(true).truncate(false).open(lock_path(record_path)).map_err(io_failure)?;
    FileExt::lock_exclusive(&lock).map_err(io_failure)?;

    match fs::read(record_path) {
        Ok(bytes) => {
            // not UTF-8 can only be a hand edit, let the stamp reject it
            let last = read_record(String::from_utf8_lossy(&bytes).trim(), secret)?;
            if now < last {
                return Err(LicenseError::ClockRollbackDetected { now, last });
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => trace!("No Rollback Record, First Run"),
        Err(e) => return Err(io_failure(e)),
    }

    let stamp = stamp::sign(&now.to_string(), secret).map_err(|e| io_failure(io::Error::new(io::ErrorKind::InvalidInput, e.to_string())))?;

    let mut staged = NamedTempFile::new_in(dir).map_err(io_failure)?;
    staged.write_all(format!("{now}:{stamp}").as_bytes()).map_err(io_failure)?;
    staged.as_file().sync_all().map_err(io_failure)?;
    staged.persist(record_path).map_err(|e| io_failure(e.error))?;

    Ok(())
}

fn lock_path(record_path: &Path) -> PathBuf {
    let mut name = record_path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Parses `<millis>:<stamp>`, authenticating the timestamp text before trusting it.
///
/// Trailing empty parts are dropped first, so `123:` is malformed rather than tampered.
fn read_record(content: &str, secret: &str) -> Result<i64, LicenseError> {
    let mut parts: Vec<&str> = content.split(':').collect();
    while parts.last().is_some_and(|part| part.is_empty()) {
        parts.pop();
    }

    let [timestamp, hmac] = parts.as_slice() else {
        return Err(LicenseError::RollbackRecordMalformed("expected <timestamp>:<hmac>"));
    };

    if !stamp::verify(timestamp, hmac, secret) {
        return Err(LicenseError::RollbackRecordTampered);
    }

    timestamp.parse().map_err(|_| LicenseError::RollbackRecordMalformed("timestamp is not an integer"))
}
