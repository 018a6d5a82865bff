//! Per-principal snapshot and its sections
//!
//! Derived values are computed here from decoded reads and the clock, never
//! fetched on their own.

use ethers::types::{Address, U256};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::types::SubjectId;

/// Independently refreshable part of a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section<T> {
    /// Last successfully derived value; kept across a failed refresh
    pub data: Option<T>,
    pub is_loading: bool,
    /// User-facing message for the last failed refresh
    pub error: Option<String>,
    /// Unix seconds of the last completed refresh
    pub updated_at: Option<u64>,
}

impl<T> Default for Section<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Balances,
    Voting,
    Unbonding,
    Cycle,
    Rewards,
    Delegations,
}

impl SectionKind {
    pub const ALL: [SectionKind; 6] = [
        SectionKind::Balances,
        SectionKind::Voting,
        SectionKind::Unbonding,
        SectionKind::Cycle,
        SectionKind::Rewards,
        SectionKind::Delegations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Balances => "balances",
            SectionKind::Voting => "voting",
            SectionKind::Unbonding => "unbonding",
            SectionKind::Cycle => "cycle",
            SectionKind::Rewards => "rewards",
            SectionKind::Delegations => "delegations",
        }
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Balances {
    /// Liquid EMARK
    pub emark_balance: U256,
    /// Staked wEMARK
    pub wemark_balance: U256,
    /// EMARK the staking contract may spend
    pub emark_allowance: U256,
}

/// Voting power with `reserved = total - available` built in.
///
/// Fields are private so the identity cannot be broken after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VotingPower {
    total: U256,
    available: U256,
    delegated: U256,
}

impl VotingPower {
    /// Available power above total is clamped to total
    pub fn new(total: U256, available: U256, delegated: U256) -> Self {
        Self {
            total,
            available: available.min(total),
            delegated,
        }
    }

    pub fn total(&self) -> U256 {
        self.total
    }

    pub fn available(&self) -> U256 {
        self.available
    }

    pub fn delegated(&self) -> U256 {
        self.delegated
    }

    pub fn reserved(&self) -> U256 {
        self.total - self.available
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unbonding {
    pub amount: U256,
    pub release_time: u64,
    pub can_claim: bool,
    pub time_until_release: u64,
    pub is_unbonding: bool,
}

impl Unbonding {
    pub fn derive(amount: U256, release_time: u64, can_claim: bool, now: u64) -> Self {
        Self {
            amount,
            release_time,
            can_claim,
            time_until_release: release_time.saturating_sub(now),
            is_unbonding: !amount.is_zero(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cycle {
    pub current_cycle: u64,
    pub time_remaining: u64,
    pub start_time: u64,
    pub end_time: u64,
    pub is_active: bool,
}

impl Cycle {
    pub fn derive(current_cycle: u64, time_remaining: u64, start_time: u64, end_time: u64, now: u64) -> Self {
        Self {
            current_cycle,
            time_remaining,
            start_time,
            end_time,
            is_active: (start_time..=end_time).contains(&now),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rewards {
    pub pending_eth: U256,
    pub pending_emark: U256,
    pub staked_amount: U256,
    pub period_eth_rewards: U256,
    pub period_emark_rewards: U256,
    pub next_rebalance: u64,
    pub total_pending: U256,
    pub has_claimable_rewards: bool,
}

impl Rewards {
    pub fn derive(
        pending_eth: U256,
        pending_emark: U256,
        staked_amount: U256,
        period_eth_rewards: U256,
        period_emark_rewards: U256,
        next_rebalance: u64,
    ) -> Self {
        let total_pending = pending_eth.saturating_add(pending_emark);
        Self {
            pending_eth,
            pending_emark,
            staked_amount,
            period_eth_rewards,
            period_emark_rewards,
            next_rebalance,
            total_pending,
            has_claimable_rewards: !total_pending.is_zero(),
        }
    }
}

/// Amount the principal has delegated to each watched subject this cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Delegations {
    pub by_subject: BTreeMap<SubjectId, U256>,
}

impl Delegations {
    pub fn amount_for(&self, subject: SubjectId) -> Option<U256> {
        self.by_subject.get(&subject).copied()
    }

    pub fn total(&self) -> U256 {
        self.by_subject
            .values()
            .fold(U256::zero(), |acc, v| acc.saturating_add(*v))
    }
}

/// Consolidated view of one principal's remote state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserDataSnapshot {
    pub principal: Address,
    pub balances: Section<Balances>,
    pub voting: Section<VotingPower>,
    pub unbonding: Section<Unbonding>,
    pub cycle: Section<Cycle>,
    pub rewards: Section<Rewards>,
    pub delegations: Section<Delegations>,
}

impl UserDataSnapshot {
    pub fn empty(principal: Address) -> Self {
        Self {
            principal,
            balances: Section::default(),
            voting: Section::default(),
            unbonding: Section::default(),
            cycle: Section::default(),
            rewards: Section::default(),
            delegations: Section::default(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.balances.is_loading
            || self.voting.is_loading
            || self.unbonding.is_loading
            || self.cycle.is_loading
            || self.rewards.is_loading
            || self.delegations.is_loading
    }

    /// Sections whose last refresh failed
    pub fn errors(&self) -> Vec<(SectionKind, &str)> {
        let all = [
            (SectionKind::Balances, self.balances.error.as_deref()),
            (SectionKind::Voting, self.voting.error.as_deref()),
            (SectionKind::Unbonding, self.unbonding.error.as_deref()),
            (SectionKind::Cycle, self.cycle.error.as_deref()),
            (SectionKind::Rewards, self.rewards.error.as_deref()),
            (SectionKind::Delegations, self.delegations.error.as_deref()),
        ];
        all.into_iter()
            .filter_map(|(kind, error)| error.map(|e| (kind, e)))
            .collect()
    }

    /// Copy with the clock-derived fields recomputed for `now`.
    ///
    /// Countdowns are measured from each section's `updated_at`, so the
    /// stored snapshot must hold fetch-time values.
    pub fn as_of(&self, now: u64) -> Self {
        let mut view = self.clone();
        if let Some(unbonding) = view.unbonding.data.as_mut() {
            unbonding.time_until_release = unbonding.release_time.saturating_sub(now);
        }
        let elapsed = view.cycle.updated_at.map_or(0, |at| now.saturating_sub(at));
        if let Some(cycle) = view.cycle.data.as_mut() {
            cycle.time_remaining = cycle.time_remaining.saturating_sub(elapsed);
            cycle.is_active = (cycle.start_time..=cycle.end_time).contains(&now);
        }
        view
    }

    pub fn available_voting_power(&self) -> Option<U256> {
        self.voting.data.as_ref().map(VotingPower::available)
    }

    pub fn delegated_to(&self, subject: SubjectId) -> Option<U256> {
        self.delegations.data.as_ref().and_then(|d| d.amount_for(subject))
    }
}
