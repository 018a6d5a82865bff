//! Consolidated per-principal state cache
//!
//! Each principal has one snapshot cell. Refreshes replace it wholesale or
//! per section. Every section refresh takes a generation number when it
//! starts; a result whose generation has since been superseded is dropped
//! on arrival, so the last request wins regardless of response order.

use arc_swap::ArcSwap;
use dashmap::DashMap;
use ethers::abi::{Function, Token};
use ethers::types::{Address, U256};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;

use super::clock::{Clock, SystemClock};
use super::decode::{saturating_u64, single_uint, CycleBounds, DecodeError, RewardInfo, UnbondingInfo, UserSummary};
use super::snapshot::{
    Balances, Cycle, Delegations, Rewards, Section, SectionKind, Unbonding, UserDataSnapshot, VotingPower,
};
use crate::config::CacheConfig;
use crate::contracts::{ContractId, RemoteAccessContext};
use crate::error_classifier::{classify, ErrorContext, RawError};
use crate::metrics::Metrics;
use crate::types::SubjectId;

type SectionSlot<T> = fn(&mut UserDataSnapshot) -> &mut Section<T>;

#[derive(Debug, Default)]
struct EntryState {
    generations: [u64; SectionKind::ALL.len()],
    /// Bumped by `invalidate`
    invalidation: u64,
    /// Invalidation epoch the snapshot was last fully refreshed at
    fresh_at: Option<u64>,
}

struct CacheEntry {
    snapshot: ArcSwap<UserDataSnapshot>,
    state: Mutex<EntryState>,
    subjects: RwLock<BTreeSet<SubjectId>>,
}

impl CacheEntry {
    fn new(principal: Address) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(UserDataSnapshot::empty(principal)),
            state: Mutex::new(EntryState::default()),
            subjects: RwLock::new(BTreeSet::new()),
        }
    }

    fn current(&self) -> Arc<UserDataSnapshot> {
        self.snapshot.load_full()
    }

    // Callers hold `state`, which serializes writers
    fn update(&self, f: impl FnOnce(&mut UserDataSnapshot)) {
        let mut next = UserDataSnapshot::clone(&self.snapshot.load());
        f(&mut next);
        self.snapshot.store(Arc::new(next));
    }

    fn begin<T>(&self, kind: SectionKind, slot: SectionSlot<T>) -> u64 {
        let mut state = self.state.lock();
        state.generations[kind.index()] += 1;
        let generation = state.generations[kind.index()];
        self.update(|snapshot| slot(snapshot).is_loading = true);
        generation
    }

    /// Apply a result if it is still the latest request for its section
    fn finish<T>(
        &self,
        kind: SectionKind,
        generation: u64,
        slot: SectionSlot<T>,
        outcome: Result<T, String>,
        now: u64,
    ) -> bool {
        let state = self.state.lock();
        if state.generations[kind.index()] != generation {
            return false;
        }
        self.update(|snapshot| {
            let section = slot(snapshot);
            match outcome {
                Ok(data) => {
                    section.data = Some(data);
                    section.error = None;
                }
                Err(error) => section.error = Some(error),
            }
            section.is_loading = false;
            section.updated_at = Some(now);
        });
        true
    }

    fn invalidation_epoch(&self) -> u64 {
        self.state.lock().invalidation
    }

    fn mark_fresh(&self, epoch: u64) {
        let mut state = self.state.lock();
        if state.invalidation == epoch {
            state.fresh_at = Some(epoch);
        }
    }

    fn is_fresh(&self) -> bool {
        let state = self.state.lock();
        state.fresh_at == Some(state.invalidation)
    }

    fn invalidate(&self) {
        self.state.lock().invalidation += 1;
    }
}

/// Read-only cache of per-principal remote state
pub struct UserDataCache {
    ctx: Arc<RemoteAccessContext>,
    entries: DashMap<Address, Arc<CacheEntry>>,
    clock: Arc<dyn Clock>,
    memoize: bool,
    metrics: Option<Arc<Metrics>>,
}

impl UserDataCache {
    pub fn new(ctx: Arc<RemoteAccessContext>) -> Self {
        Self {
            ctx,
            entries: DashMap::new(),
            clock: Arc::new(SystemClock),
            memoize: true,
            metrics: None,
        }
    }

    pub fn from_config(ctx: Arc<RemoteAccessContext>, config: &CacheConfig) -> Self {
        let mut cache = Self::new(ctx);
        cache.memoize = config.memoize;
        cache
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn entry(&self, principal: Address) -> Arc<CacheEntry> {
        Arc::clone(
            self.entries
                .entry(principal)
                .or_insert_with(|| Arc::new(CacheEntry::new(principal)))
                .value(),
        )
    }

    /// Stored snapshot with its clock-derived fields brought up to now
    fn view(&self, entry: &CacheEntry) -> Arc<UserDataSnapshot> {
        let stored = entry.current();
        let view = stored.as_of(self.clock.now());
        if view == *stored {
            stored
        } else {
            Arc::new(view)
        }
    }

    /// Current snapshot without issuing any read
    pub fn snapshot(&self, principal: Address) -> Option<Arc<UserDataSnapshot>> {
        self.entries.get(&principal).map(|entry| self.view(&entry))
    }

    /// Memoized snapshot; reads only when absent, invalidated or never
    /// completed. With memoization off every call reads.
    pub async fn load(&self, principal: Address) -> Arc<UserDataSnapshot> {
        let entry = self.entry(principal);
        if self.memoize && entry.is_fresh() {
            return self.view(&entry);
        }
        self.refetch(principal).await
    }

    /// Mark the snapshot stale so the next `load` reads again
    pub fn invalidate(&self, principal: Address) {
        if let Some(entry) = self.entries.get(&principal) {
            entry.invalidate();
            tracing::debug!(principal = ?principal, "snapshot invalidated");
        }
    }

    pub fn is_stale(&self, principal: Address) -> bool {
        self.entries.get(&principal).map_or(true, |entry| !entry.is_fresh())
    }

    /// Track a subject in the `delegations` section. Returns false if it was
    /// already watched.
    pub fn watch_subject(&self, principal: Address, subject: SubjectId) -> bool {
        self.entry(principal).subjects.write().insert(subject)
    }

    pub fn watched_subjects(&self, principal: Address) -> Vec<SubjectId> {
        self.entries
            .get(&principal)
            .map(|entry| entry.subjects.read().iter().copied().collect())
            .unwrap_or_default()
    }

    /// Refresh every section in parallel and wait for all of them
    pub async fn refetch(&self, principal: Address) -> Arc<UserDataSnapshot> {
        let entry = self.entry(principal);
        let epoch = entry.invalidation_epoch();
        let (balances, voting, unbonding, cycle, rewards, delegations) = tokio::join!(
            self.balances_in(&entry, principal),
            self.voting_in(&entry, principal),
            self.unbonding_in(&entry, principal),
            self.cycle_in(&entry),
            self.rewards_in(&entry, principal),
            self.delegations_in(&entry, principal),
        );
        if balances && voting && unbonding && cycle && rewards && delegations {
            entry.mark_fresh(epoch);
        }
        entry.current()
    }

    pub async fn refetch_balances(&self, principal: Address) -> Arc<UserDataSnapshot> {
        let entry = self.entry(principal);
        self.balances_in(&entry, principal).await;
        entry.current()
    }

    pub async fn refetch_voting(&self, principal: Address) -> Arc<UserDataSnapshot> {
        let entry = self.entry(principal);
        self.voting_in(&entry, principal).await;
        entry.current()
    }

    pub async fn refetch_unbonding(&self, principal: Address) -> Arc<UserDataSnapshot> {
        let entry = self.entry(principal);
        self.unbonding_in(&entry, principal).await;
        entry.current()
    }

    pub async fn refetch_cycle(&self, principal: Address) -> Arc<UserDataSnapshot> {
        let entry = self.entry(principal);
        self.cycle_in(&entry).await;
        entry.current()
    }

    pub async fn refetch_rewards(&self, principal: Address) -> Arc<UserDataSnapshot> {
        let entry = self.entry(principal);
        self.rewards_in(&entry, principal).await;
        entry.current()
    }

    pub async fn refetch_delegations(&self, principal: Address) -> Arc<UserDataSnapshot> {
        let entry = self.entry(principal);
        self.delegations_in(&entry, principal).await;
        entry.current()
    }

    /// True when this refresh's result was applied and was not a failure
    async fn run_section<T, Fut>(
        &self,
        entry: &CacheEntry,
        kind: SectionKind,
        slot: SectionSlot<T>,
        fetch: Fut,
    ) -> bool
    where
        Fut: Future<Output = Result<T, String>>,
    {
        let generation = entry.begin(kind, slot);
        let outcome = fetch.await;
        let succeeded = outcome.is_ok();
        if !succeeded {
            if let Some(metrics) = &self.metrics {
                metrics.record_read_failure(kind.as_str());
            }
        }
        let applied = entry.finish(kind, generation, slot, outcome, self.clock.now());
        if !applied {
            tracing::debug!(section = kind.as_str(), generation, "discarding superseded result");
            if let Some(metrics) = &self.metrics {
                metrics.cache_stale_discarded.inc();
            }
        }
        applied && succeeded
    }

    async fn balances_in(&self, entry: &CacheEntry, principal: Address) -> bool {
        self.run_section(entry, SectionKind::Balances, |s| &mut s.balances, self.fetch_balances(principal))
            .await
    }

    async fn voting_in(&self, entry: &CacheEntry, principal: Address) -> bool {
        self.run_section(entry, SectionKind::Voting, |s| &mut s.voting, self.fetch_voting(principal))
            .await
    }

    async fn unbonding_in(&self, entry: &CacheEntry, principal: Address) -> bool {
        self.run_section(entry, SectionKind::Unbonding, |s| &mut s.unbonding, self.fetch_unbonding(principal))
            .await
    }

    async fn cycle_in(&self, entry: &CacheEntry) -> bool {
        self.run_section(entry, SectionKind::Cycle, |s| &mut s.cycle, self.fetch_cycle())
            .await
    }

    async fn rewards_in(&self, entry: &CacheEntry, principal: Address) -> bool {
        self.run_section(entry, SectionKind::Rewards, |s| &mut s.rewards, self.fetch_rewards(principal))
            .await
    }

    async fn delegations_in(&self, entry: &CacheEntry, principal: Address) -> bool {
        let subjects: Vec<SubjectId> = entry.subjects.read().iter().copied().collect();
        self.run_section(
            entry,
            SectionKind::Delegations,
            |s| &mut s.delegations,
            self.fetch_delegations(principal, subjects),
        )
        .await
    }

    /// One remote read; failures come back as classified, user-facing text
    async fn read(&self, contract: ContractId, function: &str, args: Vec<Token>) -> Result<Vec<Token>, String> {
        if let Some(metrics) = &self.metrics {
            metrics.cache_reads.inc();
        }
        let target = self.ctx.target(contract);
        self.ctx.reader().read(target, function, args).await.map_err(|err| {
            tracing::debug!(
                contract = %contract,
                function,
                category = err.category(),
                retryable = err.is_retryable(),
                error = %err,
                "remote read failed"
            );
            let context = ErrorContext::new()
                .with_operation(function)
                .with_contract(contract.as_str())
                .with_method_name(function);
            classify(&RawError::from(err), Some(&context)).message
        })
    }

    async fn read_uint(&self, contract: ContractId, function: &str, args: Vec<Token>) -> Result<U256, String> {
        let tokens = self.read(contract, function, args).await?;
        single_uint(function, &tokens).map_err(|e| e.to_string())
    }

    /// Read a multi-field function and decode it by output name
    async fn read_decoded<T>(
        &self,
        contract: ContractId,
        function: &str,
        args: Vec<Token>,
        decode: fn(&Function, Vec<Token>) -> Result<T, DecodeError>,
    ) -> Result<T, String> {
        let tokens = self.read(contract, function, args).await?;
        let descriptor = self
            .ctx
            .target(contract)
            .function(function)
            .ok_or_else(|| format!("{contract} has no {function} in its interface"))?;
        decode(descriptor, tokens).map_err(|e| e.to_string())
    }

    async fn fetch_balances(&self, principal: Address) -> Result<Balances, String> {
        let owner = Token::Address(principal);
        let spender = Token::Address(self.ctx.target(ContractId::Wemark).address);
        let (emark, wemark, allowance) = tokio::join!(
            self.read_uint(ContractId::EmarkToken, "balanceOf", vec![owner.clone()]),
            self.read_uint(ContractId::Wemark, "balanceOf", vec![owner.clone()]),
            self.read_uint(ContractId::EmarkToken, "allowance", vec![owner, spender]),
        );
        Ok(Balances {
            emark_balance: emark?,
            wemark_balance: wemark?,
            emark_allowance: allowance?,
        })
    }

    /// The dedicated reads win over the summary; the summary fills gaps
    async fn fetch_voting(&self, principal: Address) -> Result<VotingPower, String> {
        let user = Token::Address(principal);
        let (summary, available, total) = tokio::join!(
            self.read_decoded(ContractId::Wemark, "getUserSummary", vec![user.clone()], UserSummary::decode),
            self.read_uint(ContractId::Wemark, "getAvailableVotingPower", vec![user.clone()]),
            self.read_uint(ContractId::Wemark, "getTotalVotingPower", vec![user]),
        );
        let summary = log_fallback("getUserSummary", summary);
        let available = log_fallback("getAvailableVotingPower", available);

        let available = match (available, &summary) {
            (Ok(value), _) => value,
            (Err(_), Ok(summary)) => summary.available_voting_power,
            (Err(e), Err(_)) => return Err(e),
        };
        let total = match (total, &summary) {
            (Ok(value), _) => value,
            (Err(_), Ok(summary)) => summary.staked_balance,
            (Err(e), Err(_)) => return Err(e),
        };
        let delegated = match &summary {
            Ok(summary) => summary.delegated_power,
            Err(_) => total.saturating_sub(available),
        };
        Ok(VotingPower::new(total, available, delegated))
    }

    async fn fetch_unbonding(&self, principal: Address) -> Result<Unbonding, String> {
        let user = Token::Address(principal);
        let (info, summary) = tokio::join!(
            self.read_decoded(ContractId::Wemark, "getUnbondingInfo", vec![user.clone()], UnbondingInfo::decode),
            self.read_decoded(ContractId::Wemark, "getUserSummary", vec![user], UserSummary::decode),
        );
        let now = self.clock.now();
        match (log_fallback("getUnbondingInfo", info), summary) {
            (Ok(info), _) => Ok(Unbonding::derive(info.amount, info.release_time, info.can_claim, now)),
            (Err(_), Ok(summary)) => Ok(Unbonding::derive(
                summary.unbonding_amount,
                summary.unbonding_release_time,
                summary.can_claim_unbonding,
                now,
            )),
            (Err(e), Err(_)) => Err(e),
        }
    }

    async fn fetch_cycle(&self) -> Result<Cycle, String> {
        let (current, remaining, bounds) = tokio::join!(
            self.read_uint(ContractId::EvermarkVoting, "getCurrentCycle", vec![]),
            self.read_uint(ContractId::EvermarkVoting, "getTimeRemainingInCurrentCycle", vec![]),
            self.read_decoded(ContractId::EvermarkVoting, "getCycleBounds", vec![], CycleBounds::decode),
        );
        let bounds = bounds?;
        Ok(Cycle::derive(
            saturating_u64(current?),
            saturating_u64(remaining?),
            bounds.start_time,
            bounds.end_time,
            self.clock.now(),
        ))
    }

    async fn fetch_rewards(&self, principal: Address) -> Result<Rewards, String> {
        let info = self
            .read_decoded(
                ContractId::EvermarkRewards,
                "getUserRewardInfo",
                vec![Token::Address(principal)],
                RewardInfo::decode,
            )
            .await?;
        Ok(Rewards::derive(
            info.pending_eth,
            info.pending_emark,
            info.staked_amount,
            info.period_eth_rewards,
            info.period_emark_rewards,
            info.next_reward_rebalance,
        ))
    }

    async fn fetch_delegations(&self, principal: Address, subjects: Vec<SubjectId>) -> Result<Delegations, String> {
        let reads = subjects.iter().map(|subject| {
            self.read_uint(
                ContractId::EvermarkVoting,
                "getUserVotesForEvermark",
                vec![Token::Address(principal), Token::Uint(subject.as_u256())],
            )
        });
        let amounts = futures::future::join_all(reads).await;
        let mut by_subject = BTreeMap::new();
        for (subject, amount) in subjects.into_iter().zip(amounts) {
            by_subject.insert(subject, amount?);
        }
        Ok(Delegations { by_subject })
    }
}

fn log_fallback<T>(function: &str, result: Result<T, String>) -> Result<T, String> {
    if let Err(error) = &result {
        tracing::warn!(function, error = %error, "read failed, falling back");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContractsConfig;
    use crate::state_cache::{ManualClock, MockReader, ReadError};
    use crate::wallet::{MockWallet, StrategyKind};
    use std::time::Duration;

    const PRINCIPAL: Address = Address::repeat_byte(0xaa);

    fn u(v: u64) -> Token {
        Token::Uint(U256::from(v))
    }

    fn setup() -> (Arc<MockReader>, UserDataCache, Arc<ManualClock>) {
        let reader = Arc::new(MockReader::new());
        let contracts = ContractsConfig {
            emark_token: "0x1111111111111111111111111111111111111111".into(),
            wemark: "0x2222222222222222222222222222222222222222".into(),
            evermark_voting: "0x3333333333333333333333333333333333333333".into(),
            evermark_rewards: "0x4444444444444444444444444444444444444444".into(),
            abi_overrides: Default::default(),
        };
        let wallet = Arc::new(MockWallet::new(PRINCIPAL, StrategyKind::Declarative));
        let ctx = RemoteAccessContext::new(&contracts, wallet, reader.clone()).unwrap();
        let clock = Arc::new(ManualClock::new(1_000));
        let cache = UserDataCache::new(Arc::new(ctx)).with_clock(clock.clone());
        (reader, cache, clock)
    }

    fn script_all(reader: &MockReader) {
        reader.set(ContractId::EmarkToken, "balanceOf", vec![u(500)]);
        reader.set(ContractId::EmarkToken, "allowance", vec![u(50)]);
        reader.set(ContractId::Wemark, "balanceOf", vec![u(300)]);
        reader.set(
            ContractId::Wemark,
            "getUserSummary",
            vec![u(300), u(120), u(180), u(10), u(1_600), Token::Bool(false)],
        );
        reader.set(ContractId::Wemark, "getAvailableVotingPower", vec![u(100)]);
        reader.set(ContractId::Wemark, "getTotalVotingPower", vec![u(300)]);
        reader.set(ContractId::Wemark, "getUnbondingInfo", vec![u(10), u(1_600), Token::Bool(false)]);
        reader.set(ContractId::EvermarkVoting, "getCurrentCycle", vec![u(4)]);
        reader.set(ContractId::EvermarkVoting, "getTimeRemainingInCurrentCycle", vec![u(900)]);
        reader.set(ContractId::EvermarkVoting, "getCycleBounds", vec![u(500), u(1_900)]);
        reader.set(
            ContractId::EvermarkRewards,
            "getUserRewardInfo",
            vec![u(0), u(7), u(300), u(1), u(2), u(2_000)],
        );
        reader.set(ContractId::EvermarkVoting, "getUserVotesForEvermark", vec![u(0)]);
    }

    #[tokio::test]
    async fn test_full_load_derives_every_section() {
        let (reader, cache, _clock) = setup();
        script_all(&reader);
        let snapshot = cache.load(PRINCIPAL).await;

        let balances = snapshot.balances.data.as_ref().unwrap();
        assert_eq!(balances.emark_allowance, U256::from(50));

        let voting = snapshot.voting.data.as_ref().unwrap();
        // dedicated read (100) wins over the summary (120)
        assert_eq!(voting.available(), U256::from(100));
        assert_eq!(voting.reserved(), U256::from(200));
        assert_eq!(voting.delegated(), U256::from(180));

        let unbonding = snapshot.unbonding.data.as_ref().unwrap();
        assert_eq!(unbonding.time_until_release, 600);
        assert!(unbonding.is_unbonding);

        let cycle = snapshot.cycle.data.as_ref().unwrap();
        assert_eq!(cycle.current_cycle, 4);
        assert!(cycle.is_active);

        assert!(snapshot.rewards.data.as_ref().unwrap().has_claimable_rewards);
        assert!(!snapshot.is_loading());
        assert!(snapshot.errors().is_empty());
        assert!(!cache.is_stale(PRINCIPAL));
    }

    #[tokio::test]
    async fn test_summary_fills_in_when_dedicated_read_fails() {
        let (reader, cache, _clock) = setup();
        script_all(&reader);
        reader.fail(ContractId::Wemark, "getAvailableVotingPower", ReadError::Transport("down".into()));
        let snapshot = cache.load(PRINCIPAL).await;
        assert_eq!(snapshot.available_voting_power(), Some(U256::from(120)));
    }

    #[tokio::test]
    async fn test_failed_section_does_not_degrade_others() {
        let (reader, cache, _clock) = setup();
        script_all(&reader);
        reader.fail(
            ContractId::EvermarkRewards,
            "getUserRewardInfo",
            ReadError::Transport("fetch failed".into()),
        );
        let snapshot = cache.load(PRINCIPAL).await;
        assert!(snapshot.rewards.data.is_none());
        let error = snapshot.rewards.error.as_deref().unwrap();
        assert!(error.contains("Network connection problem"));
        assert!(snapshot.voting.data.is_some());
        assert!(snapshot.cycle.data.is_some());
        // a failed section leaves the snapshot eligible for another load
        assert!(cache.is_stale(PRINCIPAL));
    }

    #[tokio::test]
    async fn test_load_is_memoized_until_invalidated() {
        let (reader, cache, _clock) = setup();
        script_all(&reader);
        cache.load(PRINCIPAL).await;
        let calls = reader.call_count();
        cache.load(PRINCIPAL).await;
        assert_eq!(reader.call_count(), calls);

        cache.invalidate(PRINCIPAL);
        assert!(cache.is_stale(PRINCIPAL));
        cache.load(PRINCIPAL).await;
        assert!(reader.call_count() > calls);
    }

    #[tokio::test]
    async fn test_memoized_load_tracks_the_clock() {
        let (reader, cache, clock) = setup();
        script_all(&reader);
        cache.load(PRINCIPAL).await;
        let calls = reader.call_count();

        clock.advance(500);
        let snapshot = cache.load(PRINCIPAL).await;
        assert_eq!(reader.call_count(), calls);
        assert_eq!(snapshot.unbonding.data.as_ref().unwrap().time_until_release, 100);
        let cycle = snapshot.cycle.data.as_ref().unwrap();
        assert_eq!(cycle.time_remaining, 400);
        assert!(cycle.is_active);

        clock.advance(1_000);
        let snapshot = cache.snapshot(PRINCIPAL).unwrap();
        assert_eq!(snapshot.unbonding.data.as_ref().unwrap().time_until_release, 0);
        assert!(!snapshot.cycle.data.as_ref().unwrap().is_active);
    }

    #[tokio::test]
    async fn test_section_refetch_touches_only_its_reads() {
        let (reader, cache, _clock) = setup();
        script_all(&reader);
        cache.load(PRINCIPAL).await;
        let before = reader.call_count();
        reader.set(ContractId::EvermarkVoting, "getCurrentCycle", vec![u(5)]);
        let snapshot = cache.refetch_cycle(PRINCIPAL).await;
        assert_eq!(reader.call_count() - before, 3);
        assert_eq!(snapshot.cycle.data.as_ref().unwrap().current_cycle, 5);
    }

    #[tokio::test]
    async fn test_delegations_for_watched_subjects() {
        let (reader, cache, _clock) = setup();
        script_all(&reader);
        let subject = SubjectId::new(7).unwrap();
        assert!(cache.watch_subject(PRINCIPAL, subject));
        assert!(!cache.watch_subject(PRINCIPAL, subject));
        reader.set_for_args(
            ContractId::EvermarkVoting,
            "getUserVotesForEvermark",
            vec![Token::Address(PRINCIPAL), u(7)],
            vec![u(42)],
        );
        let snapshot = cache.refetch_delegations(PRINCIPAL).await;
        assert_eq!(snapshot.delegated_to(subject), Some(U256::from(42)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_request_wins() {
        let (reader, cache, _clock) = setup();
        script_all(&reader);
        reader.clear(ContractId::EvermarkVoting, "getCurrentCycle");
        reader.queue_delayed(ContractId::EvermarkVoting, "getCurrentCycle", vec![u(1)], Duration::from_millis(500));
        reader.queue_delayed(ContractId::EvermarkVoting, "getCurrentCycle", vec![u(2)], Duration::from_millis(10));

        let (first, second) = tokio::join!(cache.refetch_cycle(PRINCIPAL), async {
            tokio::task::yield_now().await;
            cache.refetch_cycle(PRINCIPAL).await
        });
        assert_eq!(second.cycle.data.as_ref().unwrap().current_cycle, 2);
        assert_eq!(first.cycle.data.as_ref().unwrap().current_cycle, 2);
        let final_snapshot = cache.snapshot(PRINCIPAL).unwrap();
        assert_eq!(final_snapshot.cycle.data.as_ref().unwrap().current_cycle, 2);
    }
}
