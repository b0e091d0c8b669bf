use crate::address::Address;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Discriminant of a [`Caveat`], used for violation reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaveatType {
    MaxAmount,
    TimeLimit,
    WhitelistedAddresses,
    BlacklistedAddresses,
    MaxTransactionsPerDay,
    RequireConfirmation,
}

impl fmt::Display for CaveatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaveatType::MaxAmount => "MaxAmount",
            CaveatType::TimeLimit => "TimeLimit",
            CaveatType::WhitelistedAddresses => "WhitelistedAddresses",
            CaveatType::BlacklistedAddresses => "BlacklistedAddresses",
            CaveatType::MaxTransactionsPerDay => "MaxTransactionsPerDay",
            CaveatType::RequireConfirmation => "RequireConfirmation",
        };
        f.write_str(name)
    }
}

/// A single constraint attached to a delegation. Multiple caveats on one
/// delegation are conjunctive: execution must satisfy all of them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(tag = "type", content = "terms")]
pub enum Caveat {
    /// Inclusive ceiling on the transfer value.
    MaxAmount(u128),
    /// Absolute expiry timestamp (unix seconds), fixed at encode time.
    TimeLimit { expires_at: i64 },
    /// Target must be a member of this set.
    WhitelistedAddresses(Vec<Address>),
    /// Target must not be a member of this set.
    BlacklistedAddresses(Vec<Address>),
    /// Ceiling on same-day executions under the delegation. The rolling
    /// count is supplied by the caller; the engine holds no state.
    MaxTransactionsPerDay(u32),
    /// Execution requires an explicit user confirmation before dispatch.
    RequireConfirmation,
}

impl Caveat {
    /// Build a `TimeLimit` caveat from a relative duration. The absolute
    /// expiry is fixed here, once, and never recomputed.
    pub fn time_limit(now: i64, ttl_secs: i64) -> Self {
        Caveat::TimeLimit {
            expires_at: now.saturating_add(ttl_secs),
        }
    }

    pub fn caveat_type(&self) -> CaveatType {
        match self {
            Caveat::MaxAmount(_) => CaveatType::MaxAmount,
            Caveat::TimeLimit { .. } => CaveatType::TimeLimit,
            Caveat::WhitelistedAddresses(_) => CaveatType::WhitelistedAddresses,
            Caveat::BlacklistedAddresses(_) => CaveatType::BlacklistedAddresses,
            Caveat::MaxTransactionsPerDay(_) => CaveatType::MaxTransactionsPerDay,
            Caveat::RequireConfirmation => CaveatType::RequireConfirmation,
        }
    }

    /// Encode the caveat into an opaque, independently verifiable term.
    pub fn encode(&self) -> Result<CaveatTerm, CaveatError> {
        let bytes =
            borsh::to_vec(self).map_err(|e| CaveatError::TermEncoding(e.to_string()))?;
        Ok(CaveatTerm(bytes))
    }
}

/// Opaque encoded caveat term.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaveatTerm(Vec<u8>);

impl CaveatTerm {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn decode(&self) -> Result<Caveat, CaveatError> {
        Caveat::try_from_slice(&self.0).map_err(|e| CaveatError::TermEncoding(e.to_string()))
    }
}

impl fmt::Display for CaveatTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for CaveatTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CaveatTerm({})", self)
    }
}

/// Construction-time caveat defects. These are local contract violations,
/// raised before any signing or network interaction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CaveatError {
    #[error("{0} caveat has an empty address list")]
    EmptyAddressList(CaveatType),
    #[error("time limit expiry {0} is not a valid timestamp")]
    InvalidTimeLimit(i64),
    #[error("max transactions per day must be at least 1")]
    ZeroTransactionCount,
    #[error("address {0} appears in both the whitelist and the blacklist")]
    ContradictoryLists(Address),
    #[error("failed to encode caveat term: {0}")]
    TermEncoding(String),
    #[error("credential expiry {credential} exceeds delegation expiry {delegation}")]
    CredentialOutlivesDelegation { credential: i64, delegation: i64 },
}

/// Caller-assembled facts an execution is judged against.
#[derive(Clone, Copy, Debug)]
pub struct ExecutionContext {
    /// Proposed transfer value.
    pub value: u128,
    /// Call target.
    pub target: Address,
    /// Current time, unix seconds.
    pub now: i64,
    /// Executions already performed today under this delegation.
    /// Bookkeeping is the caller's responsibility.
    pub executed_today: u32,
    /// Whether the user explicitly confirmed this execution.
    pub confirmed: bool,
}

/// Validate a caveat set for internal consistency. Fails fast; does not
/// touch the network or the clock.
pub fn validate(caveats: &[Caveat]) -> Result<(), CaveatError> {
    let mut whitelisted: HashSet<Address> = HashSet::new();
    let mut blacklisted: HashSet<Address> = HashSet::new();

    for caveat in caveats {
        match caveat {
            Caveat::MaxAmount(_) => {}
            Caveat::TimeLimit { expires_at } => {
                if *expires_at <= 0 {
                    return Err(CaveatError::InvalidTimeLimit(*expires_at));
                }
            }
            Caveat::WhitelistedAddresses(list) => {
                if list.is_empty() {
                    return Err(CaveatError::EmptyAddressList(CaveatType::WhitelistedAddresses));
                }
                whitelisted.extend(list.iter().copied());
            }
            Caveat::BlacklistedAddresses(list) => {
                if list.is_empty() {
                    return Err(CaveatError::EmptyAddressList(CaveatType::BlacklistedAddresses));
                }
                blacklisted.extend(list.iter().copied());
            }
            Caveat::MaxTransactionsPerDay(count) => {
                if *count == 0 {
                    return Err(CaveatError::ZeroTransactionCount);
                }
            }
            Caveat::RequireConfirmation => {}
        }
    }

    // Both list kinds on one delegation are legal, but an address present in
    // both can never be satisfied under AND semantics.
    if let Some(addr) = whitelisted.intersection(&blacklisted).next() {
        return Err(CaveatError::ContradictoryLists(*addr));
    }

    Ok(())
}

/// Evaluate all caveats against an execution context. Conjunctive: the
/// first violated caveat type is returned, and every caveat kind present is
/// considered; both address lists are checked when both exist.
pub fn evaluate(caveats: &[Caveat], ctx: &ExecutionContext) -> Result<(), CaveatType> {
    for caveat in caveats {
        match caveat {
            Caveat::MaxAmount(ceiling) => {
                if ctx.value > *ceiling {
                    return Err(CaveatType::MaxAmount);
                }
            }
            Caveat::TimeLimit { expires_at } => {
                if ctx.now > *expires_at {
                    return Err(CaveatType::TimeLimit);
                }
            }
            Caveat::WhitelistedAddresses(list) => {
                if !list.contains(&ctx.target) {
                    return Err(CaveatType::WhitelistedAddresses);
                }
            }
            Caveat::BlacklistedAddresses(list) => {
                if list.contains(&ctx.target) {
                    return Err(CaveatType::BlacklistedAddresses);
                }
            }
            Caveat::MaxTransactionsPerDay(max) => {
                if ctx.executed_today >= *max {
                    return Err(CaveatType::MaxTransactionsPerDay);
                }
            }
            Caveat::RequireConfirmation => {
                if !ctx.confirmed {
                    return Err(CaveatType::RequireConfirmation);
                }
            }
        }
    }
    Ok(())
}

/// Whether any caveat in the set demands an explicit confirmation step.
pub fn needs_confirmation(caveats: &[Caveat]) -> bool {
    caveats
        .iter()
        .any(|c| matches!(c, Caveat::RequireConfirmation))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(value: u128, target: Address) -> ExecutionContext {
        ExecutionContext {
            value,
            target,
            now: 1_700_000_000,
            executed_today: 0,
            confirmed: false,
        }
    }

    #[test]
    fn max_amount_boundary_is_inclusive() {
        let caveats = vec![Caveat::MaxAmount(50)];
        assert!(evaluate(&caveats, &ctx(50, Address::ZERO)).is_ok());
        assert_eq!(
            evaluate(&caveats, &ctx(51, Address::ZERO)),
            Err(CaveatType::MaxAmount)
        );
    }

    #[test]
    fn both_address_lists_are_evaluated() {
        let a = Address::from_low_byte(1);
        let b = Address::from_low_byte(2);
        let c = Address::from_low_byte(3);
        let caveats = vec![
            Caveat::WhitelistedAddresses(vec![a, b]),
            Caveat::BlacklistedAddresses(vec![b]),
        ];
        assert!(evaluate(&caveats, &ctx(1, a)).is_ok());
        // Whitelisted but also blacklisted: the blacklist still applies.
        assert_eq!(
            evaluate(&caveats, &ctx(1, b)),
            Err(CaveatType::BlacklistedAddresses)
        );
        assert_eq!(
            evaluate(&caveats, &ctx(1, c)),
            Err(CaveatType::WhitelistedAddresses)
        );
    }

    #[test]
    fn daily_count_is_caller_supplied() {
        let caveats = vec![Caveat::MaxTransactionsPerDay(3)];
        let mut context = ctx(1, Address::ZERO);
        context.executed_today = 2;
        assert!(evaluate(&caveats, &context).is_ok());
        context.executed_today = 3;
        assert_eq!(
            evaluate(&caveats, &context),
            Err(CaveatType::MaxTransactionsPerDay)
        );
    }

    #[test]
    fn confirmation_gate_feeds_evaluation() {
        let caveats = vec![Caveat::RequireConfirmation];
        assert!(needs_confirmation(&caveats));
        let mut context = ctx(1, Address::ZERO);
        assert_eq!(
            evaluate(&caveats, &context),
            Err(CaveatType::RequireConfirmation)
        );
        context.confirmed = true;
        assert!(evaluate(&caveats, &context).is_ok());
    }

    #[test]
    fn validate_rejects_malformed_terms() {
        assert_eq!(
            validate(&[Caveat::WhitelistedAddresses(vec![])]),
            Err(CaveatError::EmptyAddressList(CaveatType::WhitelistedAddresses))
        );
        assert_eq!(
            validate(&[Caveat::MaxTransactionsPerDay(0)]),
            Err(CaveatError::ZeroTransactionCount)
        );
        assert_eq!(
            validate(&[Caveat::TimeLimit { expires_at: 0 }]),
            Err(CaveatError::InvalidTimeLimit(0))
        );
    }

    #[test]
    fn validate_rejects_contradictory_lists() {
        let a = Address::from_low_byte(9);
        let caveats = vec![
            Caveat::WhitelistedAddresses(vec![a]),
            Caveat::BlacklistedAddresses(vec![a]),
        ];
        assert_eq!(validate(&caveats), Err(CaveatError::ContradictoryLists(a)));
    }

    #[test]
    fn terms_encode_to_opaque_bytes() {
        let caveat = Caveat::time_limit(1_700_000_000, 3600);
        let term = caveat.encode().unwrap();
        assert!(!term.as_bytes().is_empty());
        assert_eq!(term.decode().unwrap(), caveat);
    }
}
