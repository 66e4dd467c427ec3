use ::sysinfo::Networks;
use log::{debug, trace};
use machineid_rs::{Encryption, HWIDComponent, IdBuilder};

use crate::license::MachineFingerprint;

/// Source of the current host's fingerprint.
pub trait FingerprintProvider {
    fn fingerprint(&self) -> MachineFingerprint;
}

/// Reads the fingerprint of the machine we are running on.
///
/// The MAC address is reported as is. The CPU and mainboard identifiers are SHA256
/// hashes keyed with `mid_key`, so the issuer only ever sees application specific values.
/// A component that can't be read is left unset.
#[derive(Debug, Clone)]
pub struct HostFingerprint {
    mid_key: String,
}

impl HostFingerprint {
    #[must_use]
    pub fn new(mid_key: impl Into<String>) -> Self {
        Self { mid_key: mid_key.into() }
    }

    fn hashed(&self, component: HWIDComponent) -> Option<String> {
        IdBuilder::new(Encryption::SHA256)
            .add_component(component)
            .build(&self.mid_key)
            .inspect_err(|e| trace!("HWID Component Failed: {e:?}"))
            .ok()
    }
}

impl FingerprintProvider for HostFingerprint {
    fn fingerprint(&self) -> MachineFingerprint {
        let fingerprint = MachineFingerprint {
            mac_address: primary_mac_address(),
            cpu_serial: self.hashed(HWIDComponent::CPUID),
            main_board_serial: self.hashed(HWIDComponent::SystemID),
        };

        debug!("Host Fingerprint: {fingerprint:?}");
        fingerprint
    }
}

/// First non-zero MAC address by interface name, so the pick is stable between runs.
fn primary_mac_address() -> Option<String> {
    let networks = Networks::new_with_refreshed_list();

    let mut interfaces: Vec<_> = networks.iter().filter(|(_, data)| data.mac_address().0 != [0u8; 6]).collect();
    interfaces.sort_by(|(a, _), (b, _)| a.cmp(b));

    interfaces.first().map(|(_, data)| format!("{}", data.mac_address()))
}

/// A fingerprint fixed up front, for hosts where the identifiers are provisioned externally.
impl FingerprintProvider for MachineFingerprint {
    fn fingerprint(&self) -> MachineFingerprint {
        self.clone()
    }
}
