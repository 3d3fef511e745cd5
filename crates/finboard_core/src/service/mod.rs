//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep HTTP and scheduler layers decoupled from storage details.
//!
//! # Invariants
//! - Every service reaches storage only through `FinanceStore`, never through
//!   a raw connection.

pub mod history_recorder;
pub mod ledger_service;
pub mod reset_service;
mod rollup;
pub mod transaction_service;

pub use rollup::LedgerEntry;
