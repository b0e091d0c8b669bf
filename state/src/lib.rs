pub mod address;
pub mod caveat;
pub mod credential;
pub mod delegation;
pub mod permission;

pub use crate::address::{Address, AddressParseError, TokenKind};
pub use crate::caveat::{Caveat, CaveatError, CaveatTerm, CaveatType, ExecutionContext};
pub use crate::credential::{Passkey, SessionKey};
pub use crate::delegation::{Delegation, DelegationStatus, VerifyStatus};
pub use crate::permission::{parse_frequency, FrequencyParseError, Permission, PermissionKind};
