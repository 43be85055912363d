//! TuneMatch domain core.
//!
//! The engines are plain functions over a [`store::Store`]; they hold no
//! state of their own, so the HTTP layer (or a test) decides which backend
//! to hand them.

pub mod catalog;
pub mod friends;
pub mod ledger;
pub mod models;
pub mod preferences;
pub mod profiles;
pub mod schema;
pub mod selector;
pub mod store;

pub use ledger::LikeOutcome;
pub use preferences::PreferenceLimits;
pub use selector::{Candidate, CandidateOptions, ExclusionPolicy, SwipeCursor};
pub use store::{MemoryStore, PgStore, Store};
