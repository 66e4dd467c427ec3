//! Startup gate: runs the application's startup sequence, license check included, and
//! decides whether the process may keep going.
//!
//! Nothing in here exits the process; `main` does that with [`BootOutcome::exit_code`].

use std::error::Error;

use bootlock_core::error::{ConfigError, LicenseError};
use log::{error, info};
use thiserror::Error;

/// Exit status reserved for license failures.
pub const LICENSE_FAILURE_EXIT: i32 = 1;
/// Exit status for any other startup failure.
pub const STARTUP_FAILURE_EXIT: i32 = 2;

#[derive(Error, Debug)]
pub enum BootError {
    #[error("License Check Failed: {0}")]
    License(#[from] LicenseError),
    /// The host environment is restarting us on purpose (hot reload), not a failure.
    #[error("Hot Reload Restart")]
    HotReload,
    #[error("Startup Failed: {0}")]
    Startup(Box<dyn Error + Send + Sync>),
}

impl From<ConfigError> for BootError {
    fn from(e: ConfigError) -> Self {
        Self::Startup(Box::new(e))
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BootOutcome {
    /// License verified, carry on.
    Started,
    /// Restart requested by the environment, return quietly.
    Reloading,
    Exit(i32),
}

impl BootOutcome {
    #[must_use]
    pub fn exit_code(self) -> Option<i32> {
        match self {
            Self::Exit(code) => Some(code),
            Self::Started | Self::Reloading => None,
        }
    }
}

/// Runs `startup` once and maps its result to what the process should do next.
pub fn gate<F>(startup: F) -> BootOutcome
where
    F: FnOnce() -> Result<(), BootError>,
{
    match startup() {
        Ok(()) => {
            info!("License check passed, application started");
            BootOutcome::Started
        }
        Err(BootError::License(e)) => {
            error!("License check failed: {}", cause_chain(&e));
            BootOutcome::Exit(LICENSE_FAILURE_EXIT)
        }
        Err(BootError::HotReload) => BootOutcome::Reloading,
        Err(BootError::Startup(e)) => {
            error!("Startup failed: {}", cause_chain(e.as_ref()));
            BootOutcome::Exit(STARTUP_FAILURE_EXIT)
        }
    }
}

/// `outer: inner: innermost`
#[must_use]
pub fn cause_chain(e: &(dyn Error + 'static)) -> String {
    let mut text = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn success_continues() {
        assert_eq!(gate(|| Ok(())), BootOutcome::Started);
        assert_eq!(BootOutcome::Started.exit_code(), None);
    }

    #[test]
    fn license_failure_exits_with_one() {
        let outcome = gate(|| Err(LicenseError::Expired { expire_date: 10 }.into()));
        assert_eq!(outcome, BootOutcome::Exit(LICENSE_FAILURE_EXIT));
        assert_eq!(outcome.exit_code(), Some(1));
    }

    #[test]
    fn other_failure_exits_with_two() {
        let outcome = gate(|| Err(ConfigError::Missing("public_key").into()));
        assert_eq!(outcome.exit_code(), Some(2));

        let outcome = gate(|| Err(BootError::Startup("port already in use".into())));
        assert_eq!(outcome, BootOutcome::Exit(STARTUP_FAILURE_EXIT));
    }

    #[test]
    fn hot_reload_is_a_quiet_return() {
        let outcome = gate(|| Err(BootError::HotReload));
        assert_eq!(outcome, BootOutcome::Reloading);
        assert_eq!(outcome.exit_code(), None);
    }

    #[test]
    fn cause_chain_walks_sources() {
        let e = LicenseError::RollbackIo { path: PathBuf::from("/var/lib/app/clock.rec"), source: io::Error::other("disk full") };
        assert_eq!(cause_chain(&e), "Rollback Check I/O Failure: /var/lib/app/clock.rec: disk full");
    }
}
