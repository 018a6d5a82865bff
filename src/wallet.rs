//! Wallet connection provider abstraction
//!
//! This module provides the async interface the executor submits through:
//! - Connection state and the connection-request flow
//! - The backend kind (declarative vs manual encoding)
//! - A `send` primitive that may wait on user confirmation indefinitely
//! - Mock wallet for testing

use async_trait::async_trait;
use ethers::abi::{Function, Token};
use ethers::types::{Address, Bytes, H256, U256};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

use crate::contracts::ContractId;
use crate::error_classifier::RawError;

/// Which request shape the active backend consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Backend takes a typed call description and encodes it itself
    Declarative,
    /// Backend only accepts a raw `{to, data, value}` envelope
    ManualEncoding,
}

/// Typed call description for declarative backends
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedCall {
    pub contract: ContractId,
    pub to: Address,
    pub function: Function,
    pub args: Vec<Token>,
    pub value: Option<U256>,
}

/// Raw transaction envelope for manual-encoding backends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction {
    pub to: Address,
    pub data: Bytes,
    pub value: Option<U256>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WalletRequest {
    Prepared(PreparedCall),
    Raw(RawTransaction),
}

impl WalletRequest {
    pub fn to(&self) -> Address {
        match self {
            WalletRequest::Prepared(call) => call.to,
            WalletRequest::Raw(tx) => tx.to,
        }
    }

    pub fn value(&self) -> Option<U256> {
        match self {
            WalletRequest::Prepared(call) => call.value,
            WalletRequest::Raw(tx) => tx.value,
        }
    }
}

/// What the backend reports back from `send`
#[derive(Debug, Clone, PartialEq)]
pub struct SendOutcome {
    pub success: bool,
    pub transaction_hash: Option<H256>,
    pub error: Option<RawError>,
}

impl SendOutcome {
    pub fn confirmed(hash: H256) -> Self {
        Self {
            success: true,
            transaction_hash: Some(hash),
            error: None,
        }
    }

    pub fn failed(error: impl Into<RawError>) -> Self {
        Self {
            success: false,
            transaction_hash: None,
            error: Some(error.into()),
        }
    }
}

/// Connection-level failures with a user-facing message
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("Please connect your wallet first")]
    NotConnected,

    #[error("Wallet connection was rejected: {0}")]
    ConnectionRejected(String),

    #[error("Wallet unavailable: {0}")]
    Unavailable(String),
}

impl From<WalletError> for RawError {
    fn from(err: WalletError) -> Self {
        RawError::Message(err.to_string())
    }
}

/// Async wallet connection provider
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Address of the connected principal, if any
    fn address(&self) -> Option<Address>;

    fn is_connected(&self) -> bool;

    /// Ask the user to connect; may suspend on user interaction
    async fn request_connection(&self) -> Result<Address, WalletError>;

    /// Request shape the active backend consumes
    fn strategy_kind(&self) -> StrategyKind;

    /// Submit a request. May wait on user confirmation for an unbounded time.
    async fn send(&self, request: WalletRequest) -> Result<SendOutcome, RawError>;
}

/// Mock wallet for testing
///
/// Records every request it receives and replays scripted outcomes in order.
/// Once the script is exhausted every send succeeds with a fresh hash.
pub struct MockWallet {
    address: Address,
    kind: StrategyKind,
    connected: AtomicBool,
    connect_error: Mutex<Option<WalletError>>,
    outcomes: Mutex<VecDeque<Result<SendOutcome, RawError>>>,
    sent: Mutex<Vec<WalletRequest>>,
    send_delay: Mutex<Option<Duration>>,
    next_hash: AtomicU64,
}

impl MockWallet {
    pub fn new(address: Address, kind: StrategyKind) -> Self {
        Self {
            address,
            kind,
            connected: AtomicBool::new(true),
            connect_error: Mutex::new(None),
            outcomes: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            send_delay: Mutex::new(None),
            next_hash: AtomicU64::new(1),
        }
    }

    pub fn new_disconnected(address: Address, kind: StrategyKind) -> Self {
        let wallet = Self::new(address, kind);
        wallet.connected.store(false, Ordering::SeqCst);
        wallet
    }

    /// Make the next connection request fail
    pub fn reject_connection(&self, error: WalletError) {
        *self.connect_error.lock() = Some(error);
    }

    pub fn push_outcome(&self, outcome: Result<SendOutcome, RawError>) {
        self.outcomes.lock().push_back(outcome);
    }

    pub fn push_failure(&self, error: impl Into<RawError>) {
        self.push_outcome(Err(error.into()));
    }

    pub fn set_send_delay(&self, delay: Duration) {
        *self.send_delay.lock() = Some(delay);
    }

    pub fn sent(&self) -> Vec<WalletRequest> {
        self.sent.lock().clone()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    fn address(&self) -> Option<Address> {
        self.is_connected().then_some(self.address)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn request_connection(&self) -> Result<Address, WalletError> {
        tokio::task::yield_now().await;
        if let Some(err) = self.connect_error.lock().take() {
            return Err(err);
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(self.address)
    }

    fn strategy_kind(&self) -> StrategyKind {
        self.kind
    }

    async fn send(&self, request: WalletRequest) -> Result<SendOutcome, RawError> {
        self.sent.lock().push(request);
        let delay = *self.send_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }
        let scripted = self.outcomes.lock().pop_front();
        match scripted {
            Some(outcome) => outcome,
            None => {
                let n = self.next_hash.fetch_add(1, Ordering::SeqCst);
                Ok(SendOutcome::confirmed(H256::from_low_u64_be(n)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_request(value: Option<U256>) -> WalletRequest {
        WalletRequest::Raw(RawTransaction {
            to: Address::repeat_byte(1),
            data: Bytes::from(vec![0xde, 0xad]),
            value,
        })
    }

    #[tokio::test]
    async fn test_mock_wallet_replays_script_then_succeeds() {
        let wallet = MockWallet::new(Address::repeat_byte(9), StrategyKind::ManualEncoding);
        wallet.push_failure("user rejected");

        let first = wallet.send(raw_request(None)).await;
        assert!(first.is_err());

        let second = wallet.send(raw_request(Some(U256::from(5)))).await.unwrap();
        assert!(second.success);
        assert_eq!(second.transaction_hash, Some(H256::from_low_u64_be(1)));
        assert_eq!(wallet.send_count(), 2);
        assert_eq!(wallet.sent()[1].value(), Some(U256::from(5)));
    }

    #[tokio::test]
    async fn test_connection_flow() {
        let wallet = MockWallet::new_disconnected(Address::repeat_byte(9), StrategyKind::Declarative);
        assert!(wallet.address().is_none());
        wallet.reject_connection(WalletError::ConnectionRejected("closed".into()));
        assert!(wallet.request_connection().await.is_err());
        assert_eq!(wallet.request_connection().await.unwrap(), Address::repeat_byte(9));
        assert!(wallet.is_connected());
    }

    #[test]
    fn test_wallet_error_into_raw() {
        let raw: RawError = WalletError::NotConnected.into();
        assert_eq!(raw.display_text(), "Please connect your wallet first");
    }
}
