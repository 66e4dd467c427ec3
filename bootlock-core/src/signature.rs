use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::{SIGNATURE_LENGTH, Signature, Verifier, VerifyingKey};
use log::trace;

use crate::error::LicenseError;
use crate::license::License;

/// Decodes a hex encoded Ed25519 public key.
/// # Errors
/// Will return `Err` if the key isn't 32 bytes of hex or isn't a valid curve point
pub fn public_key_from_hex(key: &str) -> Result<VerifyingKey, LicenseError> {
    let Ok(bytes) = hex::decode(key.trim()) else {
        trace!("Public Key Hex Decode Failed");
        return Err(LicenseError::InvalidPublicKey);
    };

    let Ok(bytes) = <[u8; 32]>::try_from(bytes.as_slice()) else {
        trace!("Public Key Length {} != 32", bytes.len());
        return Err(LicenseError::InvalidPublicKey);
    };

    VerifyingKey::from_bytes(&bytes).map_err(|_| LicenseError::InvalidPublicKey)
}

/// Deterministic (RFC 8785) JSON of the license, the bytes an issuer signs.
///
/// The `signature` field is left out of the output only when it is `None`, so callers
/// holding a signed document must take the signature out first.
/// # Errors
/// Will return `Err` if the license can't be serialized
pub fn canonical_bytes(license: &License) -> Result<Vec<u8>, serde_json::Error> {
    serde_jcs::to_vec(license)
}

/// Verifies the detached signature over the license with its `signature` field removed.
///
/// The field is restored before returning whatever the outcome. Every failure collapses
/// into [`LicenseError::SignatureInvalid`]; the reason is only traced.
pub(crate) fn verify_detached(license: &mut License, key: &VerifyingKey) -> Result<(), LicenseError> {
    let signature = license.signature.take();
    let outcome = verify_taken(license, signature.as_deref(), key);
    license.signature = signature;
    outcome
}

fn verify_taken(license: &License, signature: Option<&str>, key: &VerifyingKey) -> Result<(), LicenseError> {
    let Some(encoded) = signature else {
        trace!("License Has No Signature");
        return Err(LicenseError::SignatureInvalid);
    };

    let Some(signature) = decode_signature(encoded.trim()) else {
        trace!("License Signature Decode Failed");
        return Err(LicenseError::SignatureInvalid);
    };

    let Ok(payload) = canonical_bytes(license) else {
        trace!("License Canonicalization Failed");
        return Err(LicenseError::SignatureInvalid);
    };

    key.verify(&payload, &signature).map_err(|e| {
        trace!("License Signature Verify Failed: {e}");
        LicenseError::SignatureInvalid
    })
}

/// Base64 first; 128 hex characters are also accepted.
fn decode_signature(encoded: &str) -> Option<Signature> {
    let bytes = if encoded.len() == SIGNATURE_LENGTH * 2 && encoded.bytes().all(|b| b.is_ascii_hexdigit()) {
        hex::decode(encoded).ok()?
    } else {
        STANDARD.decode(encoded).ok()?
    };

    Signature::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::{Signer, SigningKey};

    use super::*;
    use crate::license::{MachineFingerprint, Timestamp};

    fn issuer() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    fn unsigned() -> License {
        License {
            license_id: "L-42".into(),
            customer: "ACME".into(),
            edition: "enterprise".into(),
            issue_date: Some(Timestamp::Millis(1_000)),
            expire_date: Some(Timestamp::Millis(2_000)),
            features: [("export".to_owned(), true)].into_iter().collect(),
            bound_machines: vec![MachineFingerprint { mac_address: Some("aa:bb".into()), cpu_serial: None, main_board_serial: Some("B1".into()) }],
            mode: "standalone".into(),
            signature: None,
        }
    }

    fn signed(encode: impl Fn(&[u8]) -> String) -> License {
        let mut lic = unsigned();
        let payload = canonical_bytes(&lic).unwrap();
        lic.signature = Some(encode(issuer().sign(&payload).to_bytes().as_slice()));
        lic
    }

    #[test]
    fn canonical_bytes_omit_signature_and_sort_keys() {
        let text = String::from_utf8(canonical_bytes(&unsigned()).unwrap()).unwrap();
        assert!(!text.contains("signature"));
        assert!(text.starts_with(r#"{"boundMachines":"#));
        assert!(text.contains(r#""cpuSerial":null"#));
    }

    #[test]
    fn valid_signature_passes_and_is_restored() {
        let mut lic = signed(|b| STANDARD.encode(b));
        let original = lic.signature.clone();

        verify_detached(&mut lic, &issuer().verifying_key()).unwrap();
        assert_eq!(lic.signature, original);
    }

    #[test]
    fn hex_signature_is_accepted() {
        let mut lic = signed(|b| hex::encode(b));
        verify_detached(&mut lic, &issuer().verifying_key()).unwrap();
    }

    #[test]
    fn altered_field_is_tampering() {
        let mut lic = signed(|b| STANDARD.encode(b));
        lic.expire_date = Some(Timestamp::Millis(9_999_999));
        let original = lic.signature.clone();

        let err = verify_detached(&mut lic, &issuer().verifying_key()).unwrap_err();
        assert!(matches!(err, LicenseError::SignatureInvalid));
        assert_eq!(lic.signature, original);
    }

    #[test]
    fn corrupt_or_missing_signature_is_tampering() {
        let key = issuer().verifying_key();

        let mut lic = signed(|_| "!!not base64!!".to_owned());
        assert!(matches!(verify_detached(&mut lic, &key), Err(LicenseError::SignatureInvalid)));

        let mut lic = signed(|b| STANDARD.encode(&b[..10]));
        assert!(matches!(verify_detached(&mut lic, &key), Err(LicenseError::SignatureInvalid)));

        let mut lic = unsigned();
        assert!(matches!(verify_detached(&mut lic, &key), Err(LicenseError::SignatureInvalid)));
    }

    #[test]
    fn other_key_is_rejected() {
        let mut lic = signed(|b| STANDARD.encode(b));
        let other = SigningKey::from_bytes(&[9u8; 32]).verifying_key();
        assert!(matches!(verify_detached(&mut lic, &other), Err(LicenseError::SignatureInvalid)));
    }

    #[test]
    fn public_key_decoding() {
        let hex_key = hex::encode(issuer().verifying_key().to_bytes());
        assert_eq!(public_key_from_hex(&hex_key).unwrap(), issuer().verifying_key());
        assert!(matches!(public_key_from_hex("zz"), Err(LicenseError::InvalidPublicKey)));
        assert!(matches!(public_key_from_hex("abcd"), Err(LicenseError::InvalidPublicKey)));
    }
}
