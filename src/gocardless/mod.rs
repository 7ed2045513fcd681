//! GoCardless Bank Account Data integration
//!
//! This module provides the client, wire types and token management for reading
//! accounts and transactions from the open-banking aggregator.

/// HTTP client and the `SourceApi` seam
mod client;
/// OAuth token caching and refresh
mod oauth;
/// Type definitions for API payloads
mod types;

pub use client::{GoCardlessClient, SourceApi};
pub use oauth::{ClientSecret, TokenManager};
pub use types::*;
