// crates/fairshare-store/src/lib.rs
//
// fairshare-store: Persistence layer for the Fairshare community currency.
//
// Provides two implementations of the `CommunityStore` trait family:
// an in-memory store (tests and ephemeral nodes) and a RocksDB-backed store
// whose ledger commits are single atomic write batches. The `test-utils`
// feature adds `FaultyStore` for failure-injection tests.

#[cfg(feature = "test-utils")]
pub mod faults;
pub mod memory;
pub mod rocks;

// Re-export key types for ergonomic access from downstream crates.
pub use memory::MemoryStore;
pub use rocks::RocksStore;

#[cfg(feature = "test-utils")]
pub use faults::{FaultyStore, ReadPause};
