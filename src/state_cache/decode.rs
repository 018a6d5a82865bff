//! Named-field decoding at the read boundary
//!
//! Multi-field reads are turned into structs here, keyed by the output names
//! in the interface descriptor. Nothing past this module indexes a tuple.

use ethers::abi::{Function, Token};
use ethers::types::U256;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{function}: expected {expected} outputs, got {got}")]
    Arity {
        function: String,
        expected: usize,
        got: usize,
    },

    #[error("{function}: missing output field {field}")]
    MissingField { function: String, field: String },

    #[error("{function}: field {field} is not a {expected}")]
    WrongType {
        function: String,
        field: String,
        expected: &'static str,
    },
}

/// Outputs of one call, addressable by name
#[derive(Debug)]
pub struct NamedOutputs {
    function: String,
    fields: HashMap<String, Token>,
}

impl NamedOutputs {
    /// Pair tokens with the descriptor's output names. Unnamed outputs take
    /// the matching entry of `canonical` instead.
    pub fn new(function: &Function, tokens: Vec<Token>, canonical: &[&str]) -> Result<Self, DecodeError> {
        if tokens.len() != function.outputs.len() {
            return Err(DecodeError::Arity {
                function: function.name.clone(),
                expected: function.outputs.len(),
                got: tokens.len(),
            });
        }
        let fields = function
            .outputs
            .iter()
            .zip(tokens)
            .enumerate()
            .map(|(i, (param, token))| {
                let name = if param.name.is_empty() {
                    canonical.get(i).map(|s| s.to_string()).unwrap_or_else(|| i.to_string())
                } else {
                    param.name.clone()
                };
                (name, token)
            })
            .collect();
        Ok(Self {
            function: function.name.clone(),
            fields,
        })
    }

    fn get(&self, field: &str) -> Result<&Token, DecodeError> {
        self.fields.get(field).ok_or_else(|| DecodeError::MissingField {
            function: self.function.clone(),
            field: field.to_string(),
        })
    }

    fn wrong_type(&self, field: &str, expected: &'static str) -> DecodeError {
        DecodeError::WrongType {
            function: self.function.clone(),
            field: field.to_string(),
            expected,
        }
    }

    pub fn uint(&self, field: &str) -> Result<U256, DecodeError> {
        match self.get(field)? {
            Token::Uint(value) => Ok(*value),
            _ => Err(self.wrong_type(field, "uint")),
        }
    }

    /// Timestamps and counters; saturates above `u64::MAX`
    pub fn uint_u64(&self, field: &str) -> Result<u64, DecodeError> {
        self.uint(field).map(saturating_u64)
    }

    pub fn boolean(&self, field: &str) -> Result<bool, DecodeError> {
        match self.get(field)? {
            Token::Bool(value) => Ok(*value),
            _ => Err(self.wrong_type(field, "bool")),
        }
    }
}

pub fn saturating_u64(value: U256) -> u64 {
    if value > U256::from(u64::MAX) {
        u64::MAX
    } else {
        value.as_u64()
    }
}

/// Single `uint256` return value
pub fn single_uint(function: &str, tokens: &[Token]) -> Result<U256, DecodeError> {
    match tokens {
        [Token::Uint(value)] => Ok(*value),
        [_] => Err(DecodeError::WrongType {
            function: function.to_string(),
            field: "0".to_string(),
            expected: "uint",
        }),
        other => Err(DecodeError::Arity {
            function: function.to_string(),
            expected: 1,
            got: other.len(),
        }),
    }
}

/// `WEMARK.getUserSummary`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub staked_balance: U256,
    pub available_voting_power: U256,
    pub delegated_power: U256,
    pub unbonding_amount: U256,
    pub unbonding_release_time: u64,
    pub can_claim_unbonding: bool,
}

impl UserSummary {
    pub const FIELDS: &'static [&'static str] = &[
        "stakedBalance",
        "availableVotingPower",
        "delegatedPower",
        "unbondingAmount",
        "unbondingReleaseTime",
        "canClaimUnbonding",
    ];

    pub fn decode(function: &Function, tokens: Vec<Token>) -> Result<Self, DecodeError> {
        let out = NamedOutputs::new(function, tokens, Self::FIELDS)?;
        Ok(Self {
            staked_balance: out.uint("stakedBalance")?,
            available_voting_power: out.uint("availableVotingPower")?,
            delegated_power: out.uint("delegatedPower")?,
            unbonding_amount: out.uint("unbondingAmount")?,
            unbonding_release_time: out.uint_u64("unbondingReleaseTime")?,
            can_claim_unbonding: out.boolean("canClaimUnbonding")?,
        })
    }
}

/// `WEMARK.getUnbondingInfo`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnbondingInfo {
    pub amount: U256,
    pub release_time: u64,
    pub can_claim: bool,
}

impl UnbondingInfo {
    pub const FIELDS: &'static [&'static str] = &["amount", "releaseTime", "canClaim"];

    pub fn decode(function: &Function, tokens: Vec<Token>) -> Result<Self, DecodeError> {
        let out = NamedOutputs::new(function, tokens, Self::FIELDS)?;
        Ok(Self {
            amount: out.uint("amount")?,
            release_time: out.uint_u64("releaseTime")?,
            can_claim: out.boolean("canClaim")?,
        })
    }
}

/// `EVERMARK_VOTING.getCycleBounds`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleBounds {
    pub start_time: u64,
    pub end_time: u64,
}

impl CycleBounds {
    pub const FIELDS: &'static [&'static str] = &["startTime", "endTime"];

    pub fn decode(function: &Function, tokens: Vec<Token>) -> Result<Self, DecodeError> {
        let out = NamedOutputs::new(function, tokens, Self::FIELDS)?;
        Ok(Self {
            start_time: out.uint_u64("startTime")?,
            end_time: out.uint_u64("endTime")?,
        })
    }
}

/// `EVERMARK_REWARDS.getUserRewardInfo`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardInfo {
    pub pending_eth: U256,
    pub pending_emark: U256,
    pub staked_amount: U256,
    pub period_eth_rewards: U256,
    pub period_emark_rewards: U256,
    pub next_reward_rebalance: u64,
}

impl RewardInfo {
    pub const FIELDS: &'static [&'static str] = &[
        "pendingEth",
        "pendingEmark",
        "stakedAmount",
        "periodEthRewards",
        "periodEmarkRewards",
        "nextRewardRebalance",
    ];

    pub fn decode(function: &Function, tokens: Vec<Token>) -> Result<Self, DecodeError> {
        let out = NamedOutputs::new(function, tokens, Self::FIELDS)?;
        Ok(Self {
            pending_eth: out.uint("pendingEth")?,
            pending_emark: out.uint("pendingEmark")?,
            staked_amount: out.uint("stakedAmount")?,
            period_eth_rewards: out.uint("periodEthRewards")?,
            period_emark_rewards: out.uint("periodEmarkRewards")?,
            next_reward_rebalance: out.uint_u64("nextRewardRebalance")?,
        })
    }
}
