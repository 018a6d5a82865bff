//! Compiled-in interface descriptors
//!
//! Only the operations this client calls are listed. Multi-field reads name
//! their outputs so the cache can decode them by field name.

use ethers::abi::{parse_abi, Abi};
use std::path::Path;

use super::ContractId;
use crate::config::ConfigError;

const EMARK_TOKEN_ABI: &[&str] = &[
    "function balanceOf(address account) view returns (uint256)",
    "function allowance(address owner, address spender) view returns (uint256)",
    "function approve(address spender, uint256 amount) returns (bool)",
];

const WEMARK_ABI: &[&str] = &[
    "function balanceOf(address account) view returns (uint256)",
    "function getUserSummary(address user) view returns (uint256 stakedBalance, uint256 availableVotingPower, uint256 delegatedPower, uint256 unbondingAmount, uint256 unbondingReleaseTime, bool canClaimUnbonding)",
    "function getAvailableVotingPower(address user) view returns (uint256)",
    "function getTotalVotingPower(address user) view returns (uint256)",
    "function getUnbondingInfo(address user) view returns (uint256 amount, uint256 releaseTime, bool canClaim)",
    "function startUnbonding(uint256 amount)",
    "function completeUnbonding()",
];

const EVERMARK_VOTING_ABI: &[&str] = &[
    "function getCurrentCycle() view returns (uint256)",
    "function getTimeRemainingInCurrentCycle() view returns (uint256)",
    "function getCycleBounds() view returns (uint256 startTime, uint256 endTime)",
    "function getUserVotesForEvermark(address user, uint256 evermarkId) view returns (uint256)",
    "function delegateVotes(uint256 evermarkId, uint256 amount)",
    "function undelegateVotes(uint256 evermarkId, uint256 amount)",
    "function delegateVotesBatch(uint256[] evermarkIds, uint256[] amounts)",
];

const EVERMARK_REWARDS_ABI: &[&str] = &[
    "function getUserRewardInfo(address user) view returns (uint256 pendingEth, uint256 pendingEmark, uint256 stakedAmount, uint256 periodEthRewards, uint256 periodEmarkRewards, uint256 nextRewardRebalance)",
    "function claimRewards()",
];

fn signatures(id: ContractId) -> &'static [&'static str] {
    match id {
        ContractId::EmarkToken => EMARK_TOKEN_ABI,
        ContractId::Wemark => WEMARK_ABI,
        ContractId::EvermarkVoting => EVERMARK_VOTING_ABI,
        ContractId::EvermarkRewards => EVERMARK_REWARDS_ABI,
    }
}

/// Parse the built-in descriptor for a contract
pub fn builtin_abi(id: ContractId) -> Result<Abi, ConfigError> {
    parse_abi(signatures(id)).map_err(|e| ConfigError::InterfaceDescriptor {
        contract: id.to_string(),
        reason: e.to_string(),
    })
}

/// Load a JSON ABI file that replaces the built-in descriptor
pub fn load_abi_override(id: ContractId, path: &Path) -> Result<Abi, ConfigError> {
    let descriptor_error = |reason: String| ConfigError::InterfaceDescriptor {
        contract: id.to_string(),
        reason,
    };
    let content = std::fs::read_to_string(path)
        .map_err(|e| descriptor_error(format!("{}: {e}", path.display())))?;
    let abi: Abi = serde_json::from_str(&content).map_err(|e| descriptor_error(e.to_string()))?;
    if abi.functions.is_empty() {
        return Err(descriptor_error("descriptor declares no functions".into()));
    }
    Ok(abi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_all_builtin_descriptors_parse() {
        for id in ContractId::ALL {
            let abi = builtin_abi(id).unwrap();
            assert!(!abi.functions.is_empty(), "{id}");
        }
    }

    #[test]
    fn test_summary_outputs_are_named() {
        let abi = builtin_abi(ContractId::Wemark).unwrap();
        let summary = abi.function("getUserSummary").unwrap();
        let names: Vec<_> = summary.outputs.iter().map(|p| p.name.as_str()).collect();
        assert!(names.contains(&"availableVotingPower"));
        assert!(names.contains(&"canClaimUnbonding"));
    }

    #[test]
    fn test_override_from_json_file() {
        let json = r#"[{"type":"function","name":"getCurrentCycle","inputs":[],"outputs":[{"name":"","type":"uint256"}],"stateMutability":"view"}]"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        let abi = load_abi_override(ContractId::EvermarkVoting, file.path()).unwrap();
        assert!(abi.function("getCurrentCycle").is_ok());
    }

    #[test]
    fn test_override_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not json").unwrap();
        let err = load_abi_override(ContractId::Wemark, file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InterfaceDescriptor { .. }));
    }
}
