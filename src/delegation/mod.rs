//! Vote delegation
//!
//! `delegate`, `undelegate` and `delegate_batch` validate locally against the
//! cached snapshot, submit through the executor and refresh the cache on
//! success. A call always resolves to success or failure before returning.

mod service;
pub mod validation;

pub use service::{DelegationPhase, DelegationService};
pub use validation::{DelegationError, DelegationRequest};
