//! Wiring of the components from one [`Config`]

use std::sync::Arc;

use crate::config::{Config, ConfigError};
use crate::contracts::RemoteAccessContext;
use crate::delegation::DelegationService;
use crate::metrics::Metrics;
use crate::state_cache::{RemoteReader, UserDataCache};
use crate::tx_executor::TransactionExecutor;
use crate::wallet::WalletProvider;

/// Executor, cache and delegation service sharing one remote access context
pub struct EmarkClient {
    pub context: Arc<RemoteAccessContext>,
    pub executor: Arc<TransactionExecutor>,
    pub cache: Arc<UserDataCache>,
    pub delegation: DelegationService,
    pub metrics: Option<Arc<Metrics>>,
}

impl EmarkClient {
    pub fn new(
        config: &Config,
        wallet: Arc<dyn WalletProvider>,
        reader: Arc<dyn RemoteReader>,
    ) -> Result<Self, ConfigError> {
        Self::build(config, wallet, reader, None)
    }

    /// Same wiring with a shared metrics registry attached everywhere
    pub fn with_metrics(
        config: &Config,
        wallet: Arc<dyn WalletProvider>,
        reader: Arc<dyn RemoteReader>,
        metrics: Arc<Metrics>,
    ) -> Result<Self, ConfigError> {
        Self::build(config, wallet, reader, Some(metrics))
    }

    fn build(
        config: &Config,
        wallet: Arc<dyn WalletProvider>,
        reader: Arc<dyn RemoteReader>,
        metrics: Option<Arc<Metrics>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let context = Arc::new(RemoteAccessContext::new(&config.contracts, wallet, reader)?);

        let mut executor = TransactionExecutor::from_config(Arc::clone(&context), &config.executor);
        let mut cache = UserDataCache::from_config(Arc::clone(&context), &config.cache);
        if let Some(metrics) = &metrics {
            executor = executor.with_metrics(Arc::clone(metrics));
            cache = cache.with_metrics(Arc::clone(metrics));
        }
        let executor = Arc::new(executor);
        let cache = Arc::new(cache);

        let mut delegation = DelegationService::new(
            Arc::clone(&executor),
            Arc::clone(&cache),
            config.delegation.clone(),
        );
        if let Some(metrics) = &metrics {
            delegation = delegation.with_metrics(Arc::clone(metrics));
        }

        tracing::info!(
            chain = %config.chain.name,
            chain_id = config.chain.chain_id,
            strategy = ?context.wallet().strategy_kind(),
            metrics = metrics.is_some(),
            "EMARK client ready"
        );
        Ok(Self {
            context,
            executor,
            cache,
            delegation,
            metrics,
        })
    }
}
