//! Webhook signature verification.
//!
//! The provider signs the raw request body with HMAC-SHA256 using the shared
//! secret and sends `sha256=<hex digest>` in [`SIGNATURE_HEADER`].

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::errors::WebhookError;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "X-Signature-256";

/// Prefix of the header value.
const SIGNATURE_PREFIX: &str = "sha256=";

/// Verifier for webhook body signatures.
pub struct WebhookVerifier {
    /// `None` when the operator has not configured a signing secret.
    secret: Option<SecretString>,
}

impl WebhookVerifier {
    pub fn new(secret: Option<SecretString>) -> Self {
        let secret = secret.filter(|s| !s.expose_secret().is_empty());
        Self { secret }
    }

    /// Verifies `signature_header` against the raw `payload`.
    ///
    /// # Verification Steps
    ///
    /// 1. Require a configured secret
    /// 2. Require a signature header
    /// 3. Decode the `sha256=` hex digest
    /// 4. Compare against the computed HMAC in constant time
    ///
    /// # Errors
    ///
    /// - `Misconfigured` - no secret configured
    /// - `Unauthorized` - header missing or malformed, or mismatch
    pub fn verify(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> Result<(), WebhookError> {
        // 1. Secret
        let secret = self.secret.as_ref().ok_or(WebhookError::Misconfigured)?;

        // 2. Header
        let header = signature_header
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(WebhookError::Unauthorized("missing signature header"))?;

        // 3. Decode
        let provided = header
            .strip_prefix(SIGNATURE_PREFIX)
            .and_then(|hex_digest| hex::decode(hex_digest).ok())
            .ok_or(WebhookError::Unauthorized("malformed signature header"))?;

        // 4. Compare (constant-time)
        let expected = compute_signature(secret.expose_secret().as_bytes(), payload)
            .ok_or(WebhookError::Misconfigured)?;
        if !constant_time_compare(&expected, &provided) {
            return Err(WebhookError::Unauthorized("signature mismatch"));
        }

        Ok(())
    }
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("configured", &self.secret.is_some())
            .finish()
    }
}

fn compute_signature(secret: &[u8], payload: &[u8]) -> Option<Vec<u8>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret).ok()?;
    mac.update(payload);
    Some(mac.finalize().into_bytes().to_vec())
}

/// Performs constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Builds the header value a provider would send for `payload`.
///
/// Used by tests and local tooling that replay events.
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    let digest = compute_signature(secret.as_bytes(), payload).unwrap_or_default();
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(digest))
}
