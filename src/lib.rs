//! EMARK client library
//!
//! Client-side integration layer for the Evermark contracts: error
//! classification, backend-agnostic transaction execution, a consolidated
//! per-user state cache and vote delegation on top of them.

pub mod client;
pub mod config;
pub mod contracts;
pub mod delegation;
pub mod error_classifier;
pub mod metrics;
pub mod observability;
pub mod state_cache;
pub mod structured_logging;
pub mod tx_executor;
pub mod types;
pub mod wallet;

pub use client::EmarkClient;
pub use config::{Config, ConfigError};
pub use contracts::{ContractId, ContractTarget, RemoteAccessContext};
pub use error_classifier::{classify, ErrorContext, ErrorType, ParsedError, RawError, Severity};
pub use state_cache::{UserDataCache, UserDataSnapshot};
pub use tx_executor::{TransactionExecutor, TransactionOptions, TransactionResult, TransactionSpec};
pub use types::{format_amount, parse_amount, SubjectId};
pub use wallet::{StrategyKind, WalletProvider};
