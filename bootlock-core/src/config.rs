use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_MID_KEY: &str = "bootlock";

fn default_mid_key() -> String {
    DEFAULT_MID_KEY.to_owned()
}

/// Everything the verifier needs, supplied by the host application.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
pub struct VerifierConfig {
    /// The signed license JSON.
    pub license_path: PathBuf,
    /// Hex encoded Ed25519 verifying key of the issuer.
    pub public_key: String,
    /// Where the last verified time is stamped.
    pub record_path: PathBuf,
    /// Shared secret for the record's HMAC.
    pub record_secret: String,
    /// Key mixed into the hashed machine identifiers.
    #[serde(default = "default_mid_key")]
    pub mid_key: String,
}

impl VerifierConfig {
    #[must_use]
    pub fn new(license_path: impl Into<PathBuf>, public_key: impl Into<String>, record_path: impl Into<PathBuf>, record_secret: impl Into<String>) -> Self {
        Self {
            license_path: license_path.into(),
            public_key: public_key.into(),
            record_path: record_path.into(),
            record_secret: record_secret.into(),
            mid_key: default_mid_key(),
        }
    }

    #[must_use]
    pub fn with_mid_key(mut self, mid_key: impl Into<String>) -> Self {
        self.mid_key = mid_key.into();
        self
    }

    /// # Errors
    /// Will return `Err` if the file can't be read, isn't valid JSON or leaves a required value empty
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Will return `Err` naming the first required value that is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.license_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing("license_path"));
        }
        if self.public_key.trim().is_empty() {
            return Err(ConfigError::Missing("public_key"));
        }
        if self.record_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing("record_path"));
        }
        if self.record_secret.is_empty() {
            return Err(ConfigError::Missing("record_secret"));
        }
        Ok(())
    }
}
