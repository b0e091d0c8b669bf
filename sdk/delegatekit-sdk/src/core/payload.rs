use borsh::{BorshDeserialize, BorshSerialize};
use delegatekit_state::Address;

/// How the account-abstraction substrate should authorize the call.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum CallMode {
    /// The sender's own signer authorizes the call.
    Direct,
    /// Authorized by a signed delegation held by `delegate`.
    ViaDelegation {
        delegation_id: [u8; 16],
        delegate: Address,
    },
    /// Authorized by an ephemeral session key.
    ViaSessionKey { session_public_key: [u8; 32] },
}

/// The constructed call, opaque to this SDK beyond its byte encoding;
/// the substrate defines what it means.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct CallPayload {
    pub mode: CallMode,
    pub sender: Address,
    pub target: Address,
    pub value: u128,
    pub data: Vec<u8>,
}

impl CallPayload {
    pub fn to_bytes(&self) -> std::io::Result<Vec<u8>> {
        borsh::to_vec(self)
    }
}

/// A call payload plus the authorizing signature over its bytes.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SignedPayload {
    pub payload: CallPayload,
    pub signature: Vec<u8>,
}
