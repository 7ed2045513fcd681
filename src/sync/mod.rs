//! Transaction Synchronization Module
//!
//! This module provides the core logic for copying bank transactions into a YNAB budget.
//! It is composed of several submodules, each responsible for a specific aspect of the sync:
//!
//! - `orchestrator`: Entry point for one connection. Wires the token manager, mapper and writer together.
//! - `connection`: Connection documents and the store they are loaded from.
//! - `mapper`: Fetches accounts and transactions from GoCardless and normalizes them.
//! - `payee`: Heuristics that turn bank counterparty data into a readable payee.
//! - `import_id`: Deterministic idempotency keys for the ledger.
//! - `writer`: Validates, reshapes and submits transactions to YNAB.

/// Connection documents and storage
pub mod connection;
/// Deterministic ledger import ids
pub mod import_id;
/// Source-to-internal transaction mapping
pub mod mapper;
/// Main coordinator for one sync run
pub mod orchestrator;
/// Payee extraction heuristics
pub mod payee;
/// Internal transaction model and errors
pub mod types;
/// Ledger validation and bulk write
pub mod writer;

pub use connection::{Connection, FileConnectionStore};
pub use orchestrator::*;
pub use types::*;
