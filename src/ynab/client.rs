//!
//! HTTP client for the YNAB budgeting API.
//!
//! Exposes the `LedgerApi` seam with a single bulk-create operation, authenticated with a
//! bearer token (personal access token or per-connection OAuth token).

use super::types::*;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Operations consumed from the target ledger API.
#[async_trait]
pub trait LedgerApi: Send + Sync {
	/// Create many transactions in one request. Transactions whose import id is already
	/// known are reported back as duplicates rather than created again.
	async fn create_transactions(
		&self,
		budget_id: &str,
		body: &SaveTransactionsWrapper,
	) -> Result<SaveTransactionsResponse, YnabError>;
}

/// YNAB REST client
#[derive(Clone)]
pub struct YnabClient {
	http_client: Client,
	/// Base URL including the version segment, e.g. `https://api.ynab.com/v1`.
	base_url: String,
	access_token: String,
}

impl YnabClient {
	pub fn new(base_url: String, access_token: String, timeout: Duration) -> Result<Self, YnabError> {
		let http_client = Client::builder().timeout(timeout).build()?;

		Ok(Self {
			http_client,
			base_url: base_url.trim_end_matches('/').to_string(),
			access_token,
		})
	}
}

#[async_trait]
impl LedgerApi for YnabClient {
	async fn create_transactions(
		&self,
		budget_id: &str,
		body: &SaveTransactionsWrapper,
	) -> Result<SaveTransactionsResponse, YnabError> {
		debug!(
			budget_id,
			count = body.transactions.len(),
			"Submitting transactions to YNAB"
		);

		let response = self
			.http_client
			.post(format!("{}/budgets/{}/transactions", self.base_url, budget_id))
			.bearer_auth(&self.access_token)
			.json(body)
			.send()
			.await?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(YnabError::Status {
				status: status.as_u16(),
				body,
			});
		}

		let bytes = response.bytes().await?;
		Ok(serde_json::from_slice(&bytes)?)
	}
}
