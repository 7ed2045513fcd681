//!
//! HTTP client for the GoCardless Bank Account Data API.
//!
//! This module provides the `SourceApi` seam used by the sync core and its reqwest-backed
//! implementation. Only the three operations the sync needs are exposed: account metadata,
//! account transactions within a date window, and a fresh access/refresh token pair.

use super::types::*;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Operations consumed from the source transaction API.
#[async_trait]
pub trait SourceApi: Send + Sync {
	/// Fetch status and IBAN of a single account.
	async fn retrieve_account_metadata(
		&self,
		access_token: &str,
		account_id: &str,
	) -> Result<AccountMetadata, GoCardlessError>;

	/// Fetch booked and pending transactions of an account within `range`.
	async fn retrieve_account_transactions(
		&self,
		access_token: &str,
		account_id: &str,
		range: DateRange,
	) -> Result<BankTransactions, GoCardlessError>;

	/// Exchange long-lived client credentials for a new token pair.
	async fn obtain_new_access_refresh_token_pair(
		&self,
		secret_id: &str,
		secret_key: &str,
	) -> Result<TokenPair, GoCardlessError>;
}

/// GoCardless Bank Account Data client
#[derive(Clone)]
pub struct GoCardlessClient {
	/// The underlying HTTP client.
	http_client: Client,
	/// Base URL, e.g. `https://bankaccountdata.gocardless.com`.
	base_url: String,
}

impl GoCardlessClient {
	/// Create a new client.
	///
	/// # Arguments
	/// * `base_url` - The API root without the `/api/v2` suffix.
	/// * `timeout` - Per-request timeout applied by the HTTP client.
	pub fn new(base_url: String, timeout: Duration) -> Result<Self, GoCardlessError> {
		let http_client = Client::builder().timeout(timeout).build()?;

		Ok(Self {
			http_client,
			base_url: base_url.trim_end_matches('/').to_string(),
		})
	}

	fn url(&self, path: &str) -> String {
		format!("{}/api/v2/{}", self.base_url, path)
	}

	/// Send a request and decode a JSON body, mapping 401 to `Unauthorized`.
	async fn execute<T: DeserializeOwned>(
		&self,
		request: RequestBuilder,
	) -> Result<T, GoCardlessError> {
		let response = request.header("Accept", "application/json").send().await?;
		let status = response.status();

		if status == StatusCode::UNAUTHORIZED {
			return Err(GoCardlessError::Unauthorized);
		}

		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(GoCardlessError::Status {
				status: status.as_u16(),
				body,
			});
		}

		let bytes = response.bytes().await?;
		Ok(serde_json::from_slice(&bytes)?)
	}
}

#[async_trait]
impl SourceApi for GoCardlessClient {
	async fn retrieve_account_metadata(
		&self,
		access_token: &str,
		account_id: &str,
	) -> Result<AccountMetadata, GoCardlessError> {
		debug!(account_id, "Retrieving account metadata");

		let request = self
			.http_client
			.get(self.url(&format!("accounts/{}/", account_id)))
			.bearer_auth(access_token);

		self.execute(request).await
	}

	async fn retrieve_account_transactions(
		&self,
		access_token: &str,
		account_id: &str,
		range: DateRange,
	) -> Result<BankTransactions, GoCardlessError> {
		debug!(
			account_id,
			date_from = %range.date_from,
			date_to = %range.date_to,
			"Retrieving account transactions"
		);

		let request = self
			.http_client
			.get(self.url(&format!("accounts/{}/transactions/", account_id)))
			.query(&range.as_query())
			.bearer_auth(access_token);

		let response: AccountTransactionsResponse = self.execute(request).await?;
		Ok(response.transactions)
	}

	async fn obtain_new_access_refresh_token_pair(
		&self,
		secret_id: &str,
		secret_key: &str,
	) -> Result<TokenPair, GoCardlessError> {
		let request = self
			.http_client
			.post(self.url("token/new/"))
			.json(&TokenPairRequest {
				secret_id,
				secret_key,
			});

		self.execute(request).await
	}
}
