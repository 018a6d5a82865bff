//! Transaction execution abstraction
//!
//! Normalizes `(target, operation, arguments, options)` into whichever request
//! shape the active wallet backend consumes, submits it, and converts every
//! outcome into a uniform [`TransactionResult`].

mod errors;
mod executor;
mod request;
mod retry;
mod strategy;

pub use errors::ExecutorError;
pub use executor::TransactionExecutor;
pub use request::{TransactionOptions, TransactionResult, TransactionSpec};
pub use retry::RetryConfig;
pub use strategy::{strategy_for, CallStrategy, DeclarativeStrategy, ManualEncodingStrategy};
