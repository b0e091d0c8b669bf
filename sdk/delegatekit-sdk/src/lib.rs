pub mod account;
pub mod core;
pub mod credential;
pub mod delegation;
pub mod error;
pub mod events;
pub mod execute;
pub mod permission;
pub mod store;
pub mod utils;

pub use crate::account::{SmartAccount, SmartAccountBuilder};
pub use crate::core::clock::{Clock, ManualClock, SystemClock};
pub use crate::core::connection::{
    ChainConnection, ChainError, GasEstimate, SubmissionHandle, TransactionReceipt, TxHash,
};
pub use crate::core::payload::{CallMode, CallPayload, SignedPayload};
pub use crate::core::signer::{
    AssertionMaterial, Authenticator, CallSummary, ConfirmationGate, CredentialRequestOptions,
    DelegationSigner, LocalSigner, PasskeyMaterial,
};
pub use crate::credential::{CredentialManager, SessionKeyBuilder};
pub use crate::delegation::{CreateDelegationBuilder, DelegationManager};
pub use crate::error::{DelegateKitError, Result};
pub use crate::events::{NotificationBus, NotificationEvent, NotificationKind};
pub use crate::execute::{ExecuteOptions, ExecutionCredential, ExecutionPipeline, ExecutionRequest};
pub use crate::permission::{PermissionDetails, PermissionService};
pub use crate::store::{GrantStore, InMemoryStore, StoreError};
pub use crate::utils::{retry_with_backoff, CancelToken, RetryPolicy};

pub mod state {
    pub use delegatekit_state::{
        parse_frequency, Address, Caveat, CaveatError, CaveatTerm, CaveatType, Delegation,
        DelegationStatus, ExecutionContext, Passkey, Permission, PermissionKind, SessionKey,
        TokenKind, VerifyStatus,
    };
}
