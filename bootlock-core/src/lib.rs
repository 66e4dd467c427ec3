use std::fs;
use std::io::ErrorKind;

use ed25519_dalek::VerifyingKey;
use license::License;
use log::{debug, info, trace};

use crate::clock::{Clock, SystemClock};
use crate::config::VerifierConfig;
use crate::error::LicenseError;
use crate::sysinfo::{FingerprintProvider, HostFingerprint};

pub mod clock;
pub mod config;
pub mod error;
pub mod license;
pub mod signature;
pub mod stamp;
pub mod sysinfo;
mod validator;

pub struct LicenseVerifier<F = HostFingerprint, C = SystemClock> {
    config: VerifierConfig,
    public_key: VerifyingKey,
    fingerprints: F,
    clock: C,
}

impl LicenseVerifier {
    /// Verifier for the machine we are running on, using the system clock.
    /// # Errors
    /// Will return `Err` if the configured public key can't be decoded
    pub fn new(config: VerifierConfig) -> Result<Self, LicenseError> {
        let fingerprints = HostFingerprint::new(config.mid_key.clone());
        Self::with_environment(config, fingerprints, SystemClock)
    }
}

impl<F: FingerprintProvider, C: Clock> LicenseVerifier<F, C> {
    /// # Errors
    /// Will return `Err` if the configured public key can't be decoded
    pub fn with_environment(config: VerifierConfig, fingerprints: F, clock: C) -> Result<Self, LicenseError> {
        let public_key = signature::public_key_from_hex(&config.public_key)?;

        Ok(Self {
            config,
            public_key,
            fingerprints,
            clock,
        })
    }

    /// Runs every check against the configured license file.
    /// # Errors
    /// Will return `Err` with the first check that failed
    pub fn verify(&self) -> Result<(), LicenseError> {
        self.verified_license().map(|_| ())
    }

    /// Same as [`Self::verify`] but hands back the now trusted license.
    ///
    /// Checks run in a fixed order: signature, validity window, hardware binding and
    /// last the clock rollback record, which is only stamped once the license is trusted.
    /// # Errors
    /// Will return `Err` with the first check that failed
    pub fn verified_license(&self) -> Result<License, LicenseError> {
        let mut lic = self.read_license()?;
        trace!("License: {lic:?}");

        let now = self.clock.now_millis();

        validator::check_signature(&mut lic, &self.public_key)?;
        debug!("License {} signature ok", lic.license_id);

        validator::check_validity_window(&lic, now)?;
        debug!("License {} within validity window", lic.license_id);

        let current = self.fingerprints.fingerprint();
        validator::check_hardware(&lic, &current)?;
        debug!("License {} bound to this machine", lic.license_id);

        validator::check_time_rollback(&self.config.record_path, &self.config.record_secret, now)?;
        debug!("Clock rollback record ok");

        info!("License {} for {} ({}) verified", lic.license_id, lic.customer, lic.edition);
        Ok(lic)
    }

    /// Reads and parses the license file without checking anything.
    ///
    /// WARNING the result is untrusted, only use it to show who the license claims to be for
    /// # Errors
    /// Will return `Err` if the file is missing, unreadable or not a license document
    pub fn read_license(&self) -> Result<License, LicenseError> {
        let path = &self.config.license_path;

        let text = fs::read_to_string(path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                LicenseError::ArtifactNotFound { path: path.clone() }
            } else {
                LicenseError::ArtifactUnreadable { path: path.clone(), source }
            }
        })?;

        serde_json::from_str(&text).map_err(LicenseError::MalformedDocument)
    }

    #[must_use]
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }
}
