use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// An ephemeral ed25519 keypair used to authorize actions without
/// re-invoking the primary signer. Generated client-side; the signing half
/// never leaves the process and is excluded from `Debug` and serialization.
#[derive(Clone)]
pub struct SessionKey {
    pub id: Uuid,
    pub created_at: i64,
    pub expires_at: i64,
    /// Delegation this key is scoped to, if any. A scoped key must not
    /// outlive its delegation.
    pub delegation_id: Option<Uuid>,
    pub revoked: bool,
    signing_key: SigningKey,
}

impl SessionKey {
    /// Default lifetime: 30 days.
    pub const DEFAULT_TTL_SECS: i64 = 30 * 24 * 60 * 60;

    pub fn generate(created_at: i64, expires_at: i64, delegation_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at,
            expires_at,
            delegation_id,
            revoked: false,
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expires_at
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKey")
            .field("id", &self.id)
            .field("public_key", &hex::encode(self.public_key_bytes()))
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .field("delegation_id", &self.delegation_id)
            .field("revoked", &self.revoked)
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

/// A platform-bound biometric credential. Only public material is held
/// here; the private key never leaves the authenticator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Passkey {
    pub id: Uuid,
    pub raw_credential_id: Vec<u8>,
    pub public_key: Vec<u8>,
    pub created_at: i64,
    pub revoked: bool,
}

impl Passkey {
    pub fn new(raw_credential_id: Vec<u8>, public_key: Vec<u8>, created_at: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            raw_credential_id,
            public_key,
            created_at,
            revoked: false,
        }
    }

    /// WebAuthn-style rendering of the raw credential id.
    pub fn credential_id_b64(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.raw_credential_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_signing_key() {
        let key = SessionKey::generate(0, 100, None);
        let rendered = format!("{:?}", key);
        assert!(rendered.contains("<redacted>"));
        assert!(rendered.contains(&hex::encode(key.public_key_bytes())));
    }

    #[test]
    fn session_signatures_verify_against_public_half() {
        use ed25519_dalek::{Signature, Verifier as _};
        let key = SessionKey::generate(0, 100, None);
        let sig_bytes = key.sign(b"authorize");
        let sig = Signature::from_slice(&sig_bytes).unwrap();
        assert!(key.verifying_key().verify(b"authorize", &sig).is_ok());
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let key = SessionKey::generate(0, 100, None);
        assert!(!key.is_expired(100));
        assert!(key.is_expired(101));
    }
}
