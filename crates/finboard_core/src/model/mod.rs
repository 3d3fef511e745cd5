//! Domain model for the household ledger and its time-bucket rollups.
//!
//! # Responsibility
//! - Define canonical data structures used by services and repositories.
//! - Keep arithmetic on snapshots and slot selection pure and storage-free.
//!
//! # Invariants
//! - All monetary values are `i64` minor units (see `amount`).
//! - Balance is derived, never stored.

pub mod amount;
pub mod buckets;
pub mod history;
pub mod ledger;
pub mod transaction;
