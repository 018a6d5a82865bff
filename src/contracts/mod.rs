//! Remote targets and their interface descriptors
//!
//! The address book and ABIs are static configuration. They are validated
//! once, when the [`RemoteAccessContext`] is built, and passed down
//! explicitly from there.

mod abi;
mod context;

pub use abi::{builtin_abi, load_abi_override};
pub use context::RemoteAccessContext;

use ethers::abi::{Abi, Function};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::ConfigError;

/// Remote contracts the client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractId {
    #[serde(rename = "EMARK_TOKEN")]
    EmarkToken,
    #[serde(rename = "WEMARK")]
    Wemark,
    #[serde(rename = "EVERMARK_VOTING")]
    EvermarkVoting,
    #[serde(rename = "EVERMARK_REWARDS")]
    EvermarkRewards,
}

impl ContractId {
    pub const ALL: [ContractId; 4] = [
        ContractId::EmarkToken,
        ContractId::Wemark,
        ContractId::EvermarkVoting,
        ContractId::EvermarkRewards,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContractId::EmarkToken => "EMARK_TOKEN",
            ContractId::Wemark => "WEMARK",
            ContractId::EvermarkVoting => "EVERMARK_VOTING",
            ContractId::EvermarkRewards => "EVERMARK_REWARDS",
        }
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContractId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownContract(s.to_string()))
    }
}

/// A validated remote target: identity, address and interface descriptor
#[derive(Debug, Clone)]
pub struct ContractTarget {
    pub id: ContractId,
    pub address: Address,
    pub abi: Arc<Abi>,
}

impl ContractTarget {
    pub fn new(id: ContractId, address: Address, abi: Abi) -> Self {
        Self {
            id,
            address,
            abi: Arc::new(abi),
        }
    }

    /// Look up an operation by name; overloads resolve to the first entry
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.abi.function(name).ok()
    }
}
