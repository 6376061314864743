//! witpatch-mem: An in-memory `WorkItemStore`.
//!
//! Stands in for the remote store in the sample driver and the engine test
//! suites. It enforces the same contract surface the engine relies on:
//! store-assigned ids, revision bumps on committed updates only, required
//! `System.Title` on create, the 200-id per-call cap, and a deliberately
//! small slice of WIQL.

pub mod store;

pub use store::MemoryStore;
