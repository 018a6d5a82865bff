//! Backend call strategies
//!
//! One implementation per wallet paradigm, selected by [`StrategyKind`].
//! New backends become new implementations here rather than branches at
//! the call sites.

use ethers::abi::{Function, Token};
use ethers::types::{Bytes, U256};

use super::errors::ExecutorError;
use crate::contracts::ContractTarget;
use crate::wallet::{PreparedCall, RawTransaction, StrategyKind, WalletRequest};

pub trait CallStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Turn an operation call into the request shape the backend consumes
    fn prepare(
        &self,
        target: &ContractTarget,
        operation: &str,
        args: Vec<Token>,
        value: Option<U256>,
    ) -> Result<WalletRequest, ExecutorError>;
}

/// Typed call description; the backend encodes and estimates gas itself
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclarativeStrategy;

/// Encodes call data locally into a raw `{to, data, value}` envelope
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualEncodingStrategy;

pub fn strategy_for(kind: StrategyKind) -> &'static dyn CallStrategy {
    match kind {
        StrategyKind::Declarative => &DeclarativeStrategy,
        StrategyKind::ManualEncoding => &ManualEncodingStrategy,
    }
}

fn lookup<'a>(target: &'a ContractTarget, operation: &str) -> Result<&'a Function, ExecutorError> {
    target
        .function(operation)
        .ok_or_else(|| ExecutorError::UnknownOperation {
            contract: target.id.to_string(),
            operation: operation.to_string(),
        })
}

fn check_arguments(function: &Function, args: &[Token]) -> Result<(), ExecutorError> {
    let expected: Vec<_> = function.inputs.iter().map(|p| p.kind.clone()).collect();
    if args.len() != expected.len() {
        return Err(ExecutorError::Encoding {
            operation: function.name.clone(),
            reason: format!("expected {} arguments, got {}", expected.len(), args.len()),
        });
    }
    if !Token::types_check(args, &expected) {
        return Err(ExecutorError::Encoding {
            operation: function.name.clone(),
            reason: "argument types do not match the interface".to_string(),
        });
    }
    Ok(())
}

impl CallStrategy for DeclarativeStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Declarative
    }

    fn prepare(
        &self,
        target: &ContractTarget,
        operation: &str,
        args: Vec<Token>,
        value: Option<U256>,
    ) -> Result<WalletRequest, ExecutorError> {
        let function = lookup(target, operation)?;
        check_arguments(function, &args)?;
        Ok(WalletRequest::Prepared(PreparedCall {
            contract: target.id,
            to: target.address,
            function: function.clone(),
            args,
            value,
        }))
    }
}

impl CallStrategy for ManualEncodingStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ManualEncoding
    }

    fn prepare(
        &self,
        target: &ContractTarget,
        operation: &str,
        args: Vec<Token>,
        value: Option<U256>,
    ) -> Result<WalletRequest, ExecutorError> {
        let function = lookup(target, operation)?;
        check_arguments(function, &args)?;
        let data = function
            .encode_input(&args)
            .map_err(|e| ExecutorError::Encoding {
                operation: operation.to_string(),
                reason: e.to_string(),
            })?;
        Ok(WalletRequest::Raw(RawTransaction {
            to: target.address,
            data: Bytes::from(data),
            value,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{builtin_abi, ContractId};
    use ethers::types::Address;

    fn voting() -> ContractTarget {
        ContractTarget::new(
            ContractId::EvermarkVoting,
            Address::repeat_byte(0x33),
            builtin_abi(ContractId::EvermarkVoting).unwrap(),
        )
    }

    fn delegate_args() -> Vec<Token> {
        vec![Token::Uint(U256::from(7u64)), Token::Uint(U256::exp10(18))]
    }

    #[test]
    fn test_manual_encoding_builds_envelope() {
        let value = U256::from(123_456_789u64);
        let request = ManualEncodingStrategy
            .prepare(&voting(), "delegateVotes", delegate_args(), Some(value))
            .unwrap();
        let WalletRequest::Raw(tx) = request else {
            panic!("expected raw envelope");
        };
        assert_eq!(tx.to, Address::repeat_byte(0x33));
        assert_eq!(tx.value, Some(value));
        let selector = voting().function("delegateVotes").unwrap().short_signature();
        assert_eq!(&tx.data[..4], &selector[..]);
        assert_eq!(tx.data.len(), 4 + 64);
    }

    #[test]
    fn test_declarative_keeps_typed_call() {
        let request = DeclarativeStrategy
            .prepare(&voting(), "delegateVotes", delegate_args(), None)
            .unwrap();
        let WalletRequest::Prepared(call) = request else {
            panic!("expected prepared call");
        };
        assert_eq!(call.function.name, "delegateVotes");
        assert_eq!(call.args, delegate_args());
        assert_eq!(call.contract, ContractId::EvermarkVoting);
    }

    #[test]
    fn test_both_strategies_reject_bad_input_the_same_way() {
        for strategy in [strategy_for(StrategyKind::Declarative), strategy_for(StrategyKind::ManualEncoding)] {
            let unknown = strategy.prepare(&voting(), "nope", vec![], None).unwrap_err();
            assert!(matches!(unknown, ExecutorError::UnknownOperation { .. }));

            let arity = strategy
                .prepare(&voting(), "delegateVotes", vec![Token::Uint(U256::one())], None)
                .unwrap_err();
            assert!(matches!(arity, ExecutorError::Encoding { .. }));

            let types = strategy
                .prepare(
                    &voting(),
                    "delegateVotes",
                    vec![Token::Bool(true), Token::Uint(U256::one())],
                    None,
                )
                .unwrap_err();
            assert!(matches!(types, ExecutorError::Encoding { .. }));
        }
    }
}
