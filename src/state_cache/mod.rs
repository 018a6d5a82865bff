//! Consolidated on-chain state cache
//!
//! Aggregates many independent remote reads into one per-principal
//! [`UserDataSnapshot`] with per-section loading and error state. One failing
//! read degrades only its own section.

mod cache;
mod clock;
mod decode;
mod reader;
mod snapshot;

pub use cache::UserDataCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use decode::{CycleBounds, DecodeError, NamedOutputs, RewardInfo, UnbondingInfo, UserSummary};
pub use reader::{CallTransport, EncodedReader, MockReader, ReadError, RemoteReader};
pub use snapshot::{
    Balances, Cycle, Delegations, Rewards, Section, SectionKind, Unbonding, UserDataSnapshot, VotingPower,
};
