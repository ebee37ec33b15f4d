use ed25519_dalek::{PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH, Signature, VerifyingKey};

use crate::error::{BotError, Result};

/// Validates inbound webhook requests against the application's Ed25519
/// public key. Discord signs `timestamp ‖ body` and sends the signature and
/// timestamp as headers; nothing in the body is trusted before this passes.
pub struct SignatureVerifier {
    key: VerifyingKey,
}

impl SignatureVerifier {
    /// Parse the hex public key shown on the application's developer page.
    pub fn new(public_key_hex: &str) -> Result<Self> {
        let bytes = hex::decode(public_key_hex)?;
        let bytes: [u8; PUBLIC_KEY_LENGTH] = bytes.as_slice().try_into().map_err(|_| {
            BotError::new("authentication_failure").push_str(format!(
                "public key must be {} bytes, got {}",
                PUBLIC_KEY_LENGTH,
                bytes.len()
            ))
        })?;
        let key = VerifyingKey::from_bytes(&bytes)
            .map_err(|e| BotError::new("authentication_failure").push_std(e))?;
        Ok(Self { key })
    }

    /// PASS or FAIL for one request. Every failure mode (bad hex, wrong
    /// length, bad signature) collapses to `authentication_failure`.
    pub fn verify(&self, timestamp: &str, body: &[u8], signature_hex: &str) -> Result<()> {
        let sig = hex::decode(signature_hex)
            .map_err(|e| BotError::new("authentication_failure").push_std(e))?;
        let sig: [u8; SIGNATURE_LENGTH] = sig.as_slice().try_into().map_err(|_| {
            BotError::new("authentication_failure").push_str(format!(
                "signature must be {} bytes, got {}",
                SIGNATURE_LENGTH,
                sig.len()
            ))
        })?;
        let signature = Signature::from_bytes(&sig);

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.key
            .verify_strict(&message, &signature)
            .map_err(|e| BotError::new("authentication_failure").push_std(e))
    }
}
