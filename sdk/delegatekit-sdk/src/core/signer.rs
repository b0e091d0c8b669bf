use async_trait::async_trait;
use delegatekit_state::Address;
use ed25519_dalek::{Signer as _, SigningKey};
use rand::rngs::OsRng;
use uuid::Uuid;

/// Abstraction for an entity that can sign on behalf of a smart account.
/// This allows the SDK to work with:
/// 1. Local keypairs (backend/CLI)
/// 2. Wallet adapters (frontend flows, hardware signers)
#[async_trait]
pub trait DelegationSigner: Send + Sync {
    fn address(&self) -> Address;

    /// Sign an arbitrary message payload.
    /// Returns Err if the signer does not support it or the user declined.
    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, String>;
}

/// In-process ed25519 signer, mainly for services, tests and examples.
pub struct LocalSigner {
    address: Address,
    key: SigningKey,
}

impl LocalSigner {
    pub fn random(address: Address) -> Self {
        Self {
            address,
            key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_key(address: Address, key: SigningKey) -> Self {
        Self { address, key }
    }
}

#[async_trait]
impl DelegationSigner for LocalSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, String> {
        Ok(self.key.sign(message).to_bytes().to_vec())
    }
}

/// Options passed to the platform authenticator ceremony.
#[derive(Clone, Debug)]
pub struct CredentialRequestOptions {
    pub relying_party: String,
    pub user_name: String,
    pub challenge: Vec<u8>,
}

/// Public material returned by a registration ceremony.
#[derive(Clone, Debug)]
pub struct PasskeyMaterial {
    pub raw_credential_id: Vec<u8>,
    pub public_key: Vec<u8>,
}

/// Material returned by an assertion ceremony.
#[derive(Clone, Debug)]
pub struct AssertionMaterial {
    pub raw_credential_id: Vec<u8>,
    pub signature: Vec<u8>,
    pub authenticator_data: Vec<u8>,
    pub client_data_json: Vec<u8>,
}

/// The platform authenticator (WebAuthn-class) external collaborator.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn create_credential(
        &self,
        options: &CredentialRequestOptions,
    ) -> Result<PasskeyMaterial, String>;

    async fn get_credential(
        &self,
        options: &CredentialRequestOptions,
    ) -> Result<AssertionMaterial, String>;
}

/// What the user is asked to approve when a `RequireConfirmation` caveat
/// is present.
#[derive(Clone, Debug)]
pub struct CallSummary {
    pub sender: Address,
    pub target: Address,
    pub value: u128,
    pub delegation_id: Option<Uuid>,
}

/// Synchronous user-confirmation step consulted by the execution pipeline
/// before dispatch. Absence of a gate means confirmation cannot be
/// obtained and the caveat fails.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    async fn confirm(&self, summary: &CallSummary) -> bool;
}
