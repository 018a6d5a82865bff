//! Explicitly constructed remote access context

use std::fmt;
use std::sync::Arc;

use ethers::types::Address;

use super::abi::{builtin_abi, load_abi_override};
use super::{ContractId, ContractTarget};
use crate::config::{check_address, ConfigError, ContractsConfig};
use crate::state_cache::RemoteReader;
use crate::wallet::WalletProvider;

/// Validated targets plus the wallet provider and remote reader.
///
/// Built once and shared as `Arc<RemoteAccessContext>` by the executor,
/// the cache and the delegation service.
pub struct RemoteAccessContext {
    emark_token: ContractTarget,
    wemark: ContractTarget,
    evermark_voting: ContractTarget,
    evermark_rewards: ContractTarget,
    wallet: Arc<dyn WalletProvider>,
    reader: Arc<dyn RemoteReader>,
}

impl RemoteAccessContext {
    /// Validate every address and descriptor; any failure rejects construction
    pub fn new(
        contracts: &ContractsConfig,
        wallet: Arc<dyn WalletProvider>,
        reader: Arc<dyn RemoteReader>,
    ) -> Result<Self, ConfigError> {
        for key in contracts.abi_overrides.keys() {
            key.parse::<ContractId>()?;
        }

        let build = |id: ContractId| -> Result<ContractTarget, ConfigError> {
            let raw = contracts
                .entries()
                .into_iter()
                .find(|(name, _)| *name == id.as_str())
                .map(|(_, value)| value)
                .unwrap_or_default();
            let address = check_address(id.as_str(), raw)?;
            let abi = match contracts.abi_overrides.get(id.as_str()) {
                Some(path) => load_abi_override(id, path)?,
                None => builtin_abi(id)?,
            };
            tracing::debug!(contract = %id, address = ?address, "contract target configured");
            Ok(ContractTarget::new(id, address, abi))
        };

        Ok(Self {
            emark_token: build(ContractId::EmarkToken)?,
            wemark: build(ContractId::Wemark)?,
            evermark_voting: build(ContractId::EvermarkVoting)?,
            evermark_rewards: build(ContractId::EvermarkRewards)?,
            wallet,
            reader,
        })
    }

    pub fn target(&self, id: ContractId) -> &ContractTarget {
        match id {
            ContractId::EmarkToken => &self.emark_token,
            ContractId::Wemark => &self.wemark,
            ContractId::EvermarkVoting => &self.evermark_voting,
            ContractId::EvermarkRewards => &self.evermark_rewards,
        }
    }

    pub fn wallet(&self) -> &Arc<dyn WalletProvider> {
        &self.wallet
    }

    pub fn reader(&self) -> &Arc<dyn RemoteReader> {
        &self.reader
    }

    /// Connected principal, if any
    pub fn principal(&self) -> Option<Address> {
        self.wallet.address()
    }
}

impl fmt::Debug for RemoteAccessContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteAccessContext")
            .field("emark_token", &self.emark_token.address)
            .field("wemark", &self.wemark.address)
            .field("evermark_voting", &self.evermark_voting.address)
            .field("evermark_rewards", &self.evermark_rewards.address)
            .field("strategy", &self.wallet.strategy_kind())
            .finish()
    }
}
