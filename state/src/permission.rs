use crate::address::{Address, TokenKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Kind of a higher-level grant built on top of a delegation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionKind {
    NativeTokenStream,
    Custom,
}

/// A streaming/recurring payment grant. A thin semantic wrapper: its
/// validity derives entirely from the underlying delegation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    pub delegation_id: Uuid,
    pub kind: PermissionKind,
    pub amount: u128,
    pub period_secs: u64,
    pub token: TokenKind,
    pub recipient: Address,
}

impl Permission {
    /// The streaming rate implied by `(amount, period)`. Within rounding
    /// tolerance, `rate_per_second() * period_secs == amount`.
    pub fn rate_per_second(&self) -> f64 {
        self.amount as f64 / self.period_secs as f64
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrequencyParseError {
    #[error("empty frequency string")]
    Empty,
    #[error("frequency `{0}` has no numeric component")]
    NoNumber(String),
    #[error("unknown frequency unit `{0}` (expected d, h, m or s)")]
    UnknownUnit(char),
    #[error("frequency must be positive")]
    Zero,
    #[error("frequency `{0}` overflows the representable period")]
    TooLarge(String),
}

/// Parse a human frequency string (`"30d"`, `"12h"`, `"90m"`, `"45s"`, or
/// bare seconds) into a period in seconds.
pub fn parse_frequency(input: &str) -> Result<u64, FrequencyParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(FrequencyParseError::Empty);
    }

    let (number_part, multiplier) = match trimmed.chars().last() {
        Some(unit) if unit.is_ascii_alphabetic() => {
            let multiplier = match unit.to_ascii_lowercase() {
                'd' => 86_400,
                'h' => 3_600,
                'm' => 60,
                's' => 1,
                other => return Err(FrequencyParseError::UnknownUnit(other)),
            };
            (&trimmed[..trimmed.len() - 1], multiplier)
        }
        _ => (trimmed, 1),
    };

    let value: u64 = number_part
        .parse()
        .map_err(|_| FrequencyParseError::NoNumber(trimmed.to_string()))?;
    if value == 0 {
        return Err(FrequencyParseError::Zero);
    }
    value
        .checked_mul(multiplier)
        .ok_or_else(|| FrequencyParseError::TooLarge(trimmed.to_string()))
}
