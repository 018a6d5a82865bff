//! Shared fixtures for the integration tests
#![allow(dead_code)]

use std::sync::Arc;

use emark_client::config::{ContractsConfig, DelegationConfig};
use emark_client::contracts::{ContractId, RemoteAccessContext};
use emark_client::delegation::DelegationService;
use emark_client::state_cache::{ManualClock, MockReader, UserDataCache};
use emark_client::tx_executor::{RetryConfig, TransactionExecutor};
use emark_client::wallet::{MockWallet, StrategyKind};
use ethers::abi::Token;
use ethers::types::{Address, U256};

pub const PRINCIPAL: Address = Address::repeat_byte(0xaa);
pub const NOW: u64 = 1_000;

pub fn u(v: u64) -> Token {
    Token::Uint(U256::from(v))
}

pub fn contracts() -> ContractsConfig {
    ContractsConfig {
        emark_token: "0x1111111111111111111111111111111111111111".into(),
        wemark: "0x2222222222222222222222222222222222222222".into(),
        evermark_voting: "0x3333333333333333333333333333333333333333".into(),
        evermark_rewards: "0x4444444444444444444444444444444444444444".into(),
        abi_overrides: Default::default(),
    }
}

/// Everything one test needs, wired against mocks
pub struct Harness {
    pub wallet: Arc<MockWallet>,
    pub reader: Arc<MockReader>,
    pub context: Arc<RemoteAccessContext>,
    pub executor: Arc<TransactionExecutor>,
    pub cache: Arc<UserDataCache>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new(kind: StrategyKind) -> Self {
        Self::with_wallet(MockWallet::new(PRINCIPAL, kind))
    }

    pub fn with_wallet(wallet: MockWallet) -> Self {
        let wallet = Arc::new(wallet);
        let reader = Arc::new(MockReader::new());
        let context = Arc::new(
            RemoteAccessContext::new(&contracts(), wallet.clone(), reader.clone())
                .expect("fixture addresses are valid"),
        );
        let clock = Arc::new(ManualClock::new(NOW));
        let executor = Arc::new(
            TransactionExecutor::new(Arc::clone(&context)).with_retry_config(
                RetryConfig {
                    base_delay_ms: 100,
                    max_delay_ms: 1_000,
                    ..RetryConfig::default()
                },
            ),
        );
        let cache = Arc::new(UserDataCache::new(Arc::clone(&context)).with_clock(clock.clone()));
        Self {
            wallet,
            reader,
            context,
            executor,
            cache,
            clock,
        }
    }

    pub fn delegation(&self, refresh_delay_ms: u64) -> DelegationService {
        DelegationService::new(
            Arc::clone(&self.executor),
            Arc::clone(&self.cache),
            DelegationConfig {
                refresh_delay_ms,
                max_batch_size: 10,
            },
        )
    }

    pub fn address(&self, id: ContractId) -> Address {
        self.context.target(id).address
    }
}

/// Amounts in whole tokens, 18 decimals
pub fn tokens(whole: u64) -> U256 {
    U256::from(whole) * U256::exp10(18)
}

/// Script every read; voting power in whole tokens
pub fn script_reads(reader: &MockReader, total: u64, available: u64) {
    let t = |whole: u64| Token::Uint(tokens(whole));
    reader.set(ContractId::EmarkToken, "balanceOf", vec![t(500)]);
    reader.set(ContractId::EmarkToken, "allowance", vec![u(0)]);
    reader.set(ContractId::Wemark, "balanceOf", vec![t(total)]);
    reader.set(
        ContractId::Wemark,
        "getUserSummary",
        vec![
            t(total),
            t(available),
            t(total - available),
            u(0),
            u(0),
            Token::Bool(false),
        ],
    );
    reader.set(ContractId::Wemark, "getAvailableVotingPower", vec![t(available)]);
    reader.set(ContractId::Wemark, "getTotalVotingPower", vec![t(total)]);
    reader.set(ContractId::Wemark, "getUnbondingInfo", vec![u(0), u(0), Token::Bool(false)]);
    reader.set(ContractId::EvermarkVoting, "getCurrentCycle", vec![u(3)]);
    reader.set(ContractId::EvermarkVoting, "getTimeRemainingInCurrentCycle", vec![u(600)]);
    reader.set(ContractId::EvermarkVoting, "getCycleBounds", vec![u(400), u(1_600)]);
    reader.set(
        ContractId::EvermarkRewards,
        "getUserRewardInfo",
        vec![u(0), u(0), t(total), u(0), u(0), u(2_000)],
    );
    reader.set(ContractId::EvermarkVoting, "getUserVotesForEvermark", vec![u(0)]);
}
