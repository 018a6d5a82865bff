//! Remote read interface
//!
//! The cache reads through [`RemoteReader`] only. [`EncodedReader`] adapts a
//! raw `eth_call`-style transport using the target's interface descriptor;
//! [`MockReader`] serves scripted values in tests.

use async_trait::async_trait;
use ethers::abi::Token;
use ethers::types::{Address, Bytes};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use thiserror::Error;

use crate::contracts::{ContractId, ContractTarget};
use crate::error_classifier::RawError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReadError {
    #[error("RPC transport error: {0}")]
    Transport(String),

    #[error("execution reverted: {0}")]
    Reverted(String),

    #[error("Failed to decode {function} result: {reason}")]
    Decode { function: String, reason: String },

    #[error("Unknown function {function} on {contract}")]
    UnknownFunction { contract: String, function: String },
}

impl ReadError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReadError::Transport(_))
    }

    pub fn category(&self) -> &'static str {
        match self {
            ReadError::Transport(_) => "transport",
            ReadError::Reverted(_) => "revert",
            ReadError::Decode { .. } => "decode",
            ReadError::UnknownFunction { .. } => "interface",
        }
    }
}

impl From<ReadError> for RawError {
    fn from(err: ReadError) -> Self {
        RawError::Message(err.to_string())
    }
}

/// Async remote read interface
#[async_trait]
pub trait RemoteReader: Send + Sync {
    /// Call a view function and return its decoded outputs in declaration order
    async fn read(
        &self,
        target: &ContractTarget,
        function: &str,
        args: Vec<Token>,
    ) -> Result<Vec<Token>, ReadError>;
}

/// Raw call transport (`eth_call` against the latest block)
#[async_trait]
pub trait CallTransport: Send + Sync {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ReadError>;
}

/// Reader that encodes and decodes with the target's interface descriptor
pub struct EncodedReader<T> {
    transport: T,
}

impl<T: CallTransport> EncodedReader<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl<T: CallTransport> RemoteReader for EncodedReader<T> {
    async fn read(
        &self,
        target: &ContractTarget,
        function: &str,
        args: Vec<Token>,
    ) -> Result<Vec<Token>, ReadError> {
        let func = target
            .function(function)
            .ok_or_else(|| ReadError::UnknownFunction {
                contract: target.id.to_string(),
                function: function.to_string(),
            })?;
        let data = func.encode_input(&args).map_err(|e| ReadError::Decode {
            function: function.to_string(),
            reason: format!("argument encoding failed: {e}"),
        })?;
        let output = self.transport.call(target.address, Bytes::from(data)).await?;
        func.decode_output(&output).map_err(|e| ReadError::Decode {
            function: function.to_string(),
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
struct Scripted {
    result: Result<Vec<Token>, ReadError>,
    delay: Option<Duration>,
}

/// Mock reader for testing
///
/// Responses are keyed by `(contract, function)` and optionally by the exact
/// argument list. Queued responses are consumed in order; the last one sticks.
#[derive(Default)]
pub struct MockReader {
    responses: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<(ContractId, String, Vec<Token>)>>,
}

impl MockReader {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(contract: ContractId, function: &str, args: Option<&[Token]>) -> String {
        match args {
            Some(args) => format!("{contract}.{function}:{args:?}"),
            None => format!("{contract}.{function}"),
        }
    }

    fn push(&self, key: String, scripted: Scripted) {
        self.responses.lock().entry(key).or_default().push_back(scripted);
    }

    /// Replace every queued response for a function with one value
    pub fn set(&self, contract: ContractId, function: &str, tokens: Vec<Token>) {
        let key = Self::key(contract, function, None);
        self.responses.lock().insert(
            key,
            VecDeque::from([Scripted {
                result: Ok(tokens),
                delay: None,
            }]),
        );
    }

    /// Response for one exact argument list
    pub fn set_for_args(&self, contract: ContractId, function: &str, args: Vec<Token>, tokens: Vec<Token>) {
        let key = Self::key(contract, function, Some(&args));
        self.responses.lock().insert(
            key,
            VecDeque::from([Scripted {
                result: Ok(tokens),
                delay: None,
            }]),
        );
    }

    pub fn fail(&self, contract: ContractId, function: &str, error: ReadError) {
        let key = Self::key(contract, function, None);
        self.responses.lock().insert(
            key,
            VecDeque::from([Scripted {
                result: Err(error),
                delay: None,
            }]),
        );
    }

    /// Queue a delayed response behind any already queued
    pub fn queue_delayed(&self, contract: ContractId, function: &str, tokens: Vec<Token>, delay: Duration) {
        self.push(
            Self::key(contract, function, None),
            Scripted {
                result: Ok(tokens),
                delay: Some(delay),
            },
        );
    }

    pub fn clear(&self, contract: ContractId, function: &str) {
        self.responses.lock().remove(&Self::key(contract, function, None));
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_to(&self, function: &str) -> usize {
        self.calls.lock().iter().filter(|(_, f, _)| f == function).count()
    }

    fn next(&self, key: &str) -> Option<Scripted> {
        let mut responses = self.responses.lock();
        let queue = responses.get_mut(key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl RemoteReader for MockReader {
    async fn read(
        &self,
        target: &ContractTarget,
        function: &str,
        args: Vec<Token>,
    ) -> Result<Vec<Token>, ReadError> {
        self.calls.lock().push((target.id, function.to_string(), args.clone()));
        let scripted = self
            .next(&Self::key(target.id, function, Some(&args)))
            .or_else(|| self.next(&Self::key(target.id, function, None)));
        let Some(scripted) = scripted else {
            return Err(ReadError::Transport(format!("no scripted response for {}.{function}", target.id)));
        };
        match scripted.delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }
        scripted.result
    }
}
