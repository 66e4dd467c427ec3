use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The signed license document, as issued.
///
/// Field order and names are part of the signed bytes, see [`crate::signature::canonical_bytes`].
#[derive(Serialize, Deserialize, Default, Debug, Eq, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct License {
    pub license_id: String,
    pub customer: String,
    pub edition: String,

    pub issue_date: Option<Timestamp>,
    pub expire_date: Option<Timestamp>,

    #[serde(default)]
    pub features: BTreeMap<String, bool>,

    #[serde(default)]
    pub bound_machines: Vec<MachineFingerprint>,

    pub mode: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl License {
    /// Whether the license grants `feature`. Unknown features are not granted.
    #[must_use]
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.get(feature).copied().unwrap_or(false)
    }
}

/// A license date as written in the document.
///
/// Anything that isn't integer epoch millis is kept verbatim so the signed bytes still
/// reproduce, and is rejected by the validity check instead of failing the whole parse.
#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Clone)]
#[serde(untagged)]
pub enum Timestamp {
    Millis(i64),
    Other(serde_json::Value),
}

impl Timestamp {
    #[must_use]
    pub fn millis(&self) -> Option<i64> {
        match self {
            Self::Millis(millis) => Some(*millis),
            Self::Other(_) => None,
        }
    }
}

/// Identifier tuple of a host. `None` is an unset value, not a wildcard.
#[derive(Serialize, Deserialize, Default, Debug, Eq, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MachineFingerprint {
    pub mac_address: Option<String>,
    pub cpu_serial: Option<String>,
    pub main_board_serial: Option<String>,
}

impl MachineFingerprint {
    /// All three fields must agree under [`same_value`].
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        same_value(self.mac_address.as_deref(), other.mac_address.as_deref())
            && same_value(self.cpu_serial.as_deref(), other.cpu_serial.as_deref())
            && same_value(self.main_board_serial.as_deref(), other.main_board_serial.as_deref())
    }
}

/// Optional equality: two unset values are equal, an unset and a set value never are.
#[must_use]
pub fn same_value(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BindingMode {
    /// Only the first bound machine may run the application.
    Standalone,
    /// Any bound machine may run the application.
    Cluster,
}

impl BindingMode {
    /// Case-insensitive; `None` for anything that is not a known mode.
    #[must_use]
    pub fn parse(mode: &str) -> Option<Self> {
        if mode.eq_ignore_ascii_case("standalone") {
            Some(Self::Standalone)
        } else if mode.eq_ignore_ascii_case("cluster") {
            Some(Self::Cluster)
        } else {
            None
        }
    }
}

impl fmt::Display for BindingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standalone => f.write_str("standalone"),
            Self::Cluster => f.write_str("cluster"),
        }
    }
}
