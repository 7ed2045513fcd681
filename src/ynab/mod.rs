//! YNAB integration module
//!
//! Client and types for writing transactions into a YNAB budget.

/// HTTP client and the `LedgerApi` seam
mod client;
/// Type definitions for API payloads
mod types;

pub use client::{LedgerApi, YnabClient};
pub use types::*;
