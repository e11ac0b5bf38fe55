//! runnerscale-state — read-only view of the runner job queue.
//!
//! Exposes the two readers the autoscaler consumes every cycle:
//!
//! - **Queue state**: job counts per [`JobState`] ([`FleetStore::job_counts`]).
//! - **Fleet inventory**: runner names matching a prefix plus at most one
//!   idle runner ([`FleetStore::inventory`]).
//!
//! # Backends
//!
//! ```text
//! FleetStore (trait)
//!   ├── PgFleetStore     → PeerTube PostgreSQL database (sqlx)
//!   └── MemoryFleetStore → in-process tables (testing)
//! ```
//!
//! Nothing here writes to the store. Fleet state is inferred fresh on
//! every call.

pub mod error;
pub mod memory;
pub mod store;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryFleetStore;
pub use store::{FleetStore, PgFleetStore};
pub use types::*;
