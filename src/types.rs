//! Common types used throughout the client

use ethers::types::{Address, U256};
use ethers::utils::{format_ether, parse_ether};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced when parsing user-supplied amounts and identifiers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Amount is required")]
    EmptyAmount,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Amount must be greater than zero")]
    NonPositiveAmount,

    #[error("Invalid item id: {0}")]
    InvalidSubject(String),
}

/// Identifier of a delegation subject (an Evermark token id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(u64);

impl SubjectId {
    /// Create a subject id; zero is not a valid token id
    pub fn new(id: u64) -> Result<Self, InputError> {
        if id == 0 {
            return Err(InputError::InvalidSubject(id.to_string()));
        }
        Ok(Self(id))
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn as_u256(&self) -> U256 {
        U256::from(self.0)
    }
}

impl FromStr for SubjectId {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InputError::InvalidSubject(s.to_string()));
        }
        let id = trimmed
            .parse::<u64>()
            .map_err(|_| InputError::InvalidSubject(s.to_string()))?;
        Self::new(id)
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse a human decimal amount ("12.5") into 18-decimal base units
pub fn parse_amount(text: &str) -> Result<U256, InputError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(InputError::EmptyAmount);
    }
    if trimmed.starts_with('-') || trimmed.starts_with('+') {
        return Err(InputError::InvalidAmount(text.to_string()));
    }
    parse_ether(trimmed).map_err(|e| InputError::InvalidAmount(format!("{text} ({e})")))
}

/// Parse an amount and require it to be strictly positive
pub fn parse_positive_amount(text: &str) -> Result<U256, InputError> {
    let amount = parse_amount(text)?;
    if amount.is_zero() {
        return Err(InputError::NonPositiveAmount);
    }
    Ok(amount)
}

/// Render base units as a human decimal with trailing zeros trimmed
pub fn format_amount(amount: U256) -> String {
    let full = format_ether(amount);
    match full.split_once('.') {
        Some((whole, frac)) => {
            let frac = frac.trim_end_matches('0');
            if frac.is_empty() {
                whole.to_string()
            } else {
                format!("{whole}.{frac}")
            }
        }
        None => full,
    }
}

/// Parse a 0x-prefixed 20-byte hex address
pub fn parse_address(text: &str) -> Option<Address> {
    let hex_part = text.trim().strip_prefix("0x").or_else(|| text.trim().strip_prefix("0X"))?;
    if hex_part.len() != 40 {
        return None;
    }
    let bytes = hex::decode(hex_part).ok()?;
    Some(Address::from_slice(&bytes))
}

/// Current unix time in seconds
pub fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
