//! Keyed integrity stamps for short local strings.
//!
//! A stamp is the lowercase hex HMAC-SHA256 of the text under a shared secret.

use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use log::trace;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// # Errors
/// Will return `Err` if the secret is rejected as an HMAC key
pub fn sign(text: &str, secret: &str) -> Result<String, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(text.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of `stamp` against `text`. Undecodable stamps are rejected, never an error.
#[must_use]
pub fn verify(text: &str, stamp: &str, secret: &str) -> bool {
    let Ok(expected) = hex::decode(stamp) else {
        trace!("Stamp Hex Decode Failed");
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        trace!("Stamp Secret Rejected");
        return false;
    };
    mac.update(text.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamp_verifies_under_same_secret() {
        let stamp = sign("1700000000000", "s3cret").unwrap();
        assert_eq!(stamp.len(), 64);
        assert!(verify("1700000000000", &stamp, "s3cret"));
    }

    #[test]
    fn stamp_rejects_other_text_or_secret() {
        let stamp = sign("1700000000000", "s3cret").unwrap();
        assert!(!verify("1700000000001", &stamp, "s3cret"));
        assert!(!verify("1700000000000", &stamp, "other"));
    }

    #[test]
    fn garbage_stamp_is_rejected() {
        assert!(!verify("1", "not-hex", "s3cret"));
        assert!(!verify("1", "", "s3cret"));
        assert!(!verify("1", "abcd", "s3cret"));
    }

    #[test]
    fn known_vector() {
        // RFC 4231 test case 2
        assert_eq!(sign("what do ya want for nothing?", "Jefe").unwrap(), "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843");
    }
}
