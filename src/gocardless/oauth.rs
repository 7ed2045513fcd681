//! OAuth token lifecycle for the source API.
//!
//! `TokenManager` caches at most one token pair and hands out the access token until it
//! expires. Refreshes go through a single async gate: callers that find the cache stale
//! while another refresh is in flight wait for it and reuse its result instead of issuing
//! their own request.

use super::client::SourceApi;
use super::types::GoCardlessError;
use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Long-lived client credentials used to mint token pairs.
#[derive(Clone)]
pub struct ClientSecret {
	pub secret_id: String,
	pub secret_key: String,
}

impl fmt::Debug for ClientSecret {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ClientSecret")
			.field("secret_id", &self.secret_id)
			.field("secret_key", &"<redacted>")
			.finish()
	}
}

/// A cached access/refresh token pair.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthTokens {
	pub access: String,
	pub refresh: String,
	pub access_expires_at: DateTime<Utc>,
}

impl fmt::Debug for AuthTokens {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AuthTokens")
			.field("access_expires_at", &self.access_expires_at)
			.finish_non_exhaustive()
	}
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct TokenManager<A: SourceApi> {
	api: Arc<A>,
	credentials: ClientSecret,
	tokens: RwLock<Option<AuthTokens>>,
	refresh_gate: Mutex<()>,
	clock: Clock,
}

impl<A: SourceApi> TokenManager<A> {
	pub fn new(api: Arc<A>, credentials: ClientSecret) -> Self {
		Self::with_clock(api, credentials, Arc::new(Utc::now))
	}

	pub fn with_clock(api: Arc<A>, credentials: ClientSecret, clock: Clock) -> Self {
		Self {
			api,
			credentials,
			tokens: RwLock::new(None),
			refresh_gate: Mutex::new(()),
			clock,
		}
	}

	/// Return the cached access token, refreshing it first if missing or expired.
	pub async fn get_auth_token(&self) -> Result<String, GoCardlessError> {
		if let Some(access) = self.valid_access_token() {
			return Ok(access);
		}

		let _gate = self.refresh_gate.lock().await;

		// Another caller may have refreshed while we waited on the gate.
		if let Some(access) = self.valid_access_token() {
			debug!("Reusing token refreshed by a concurrent caller");
			return Ok(access);
		}

		Ok(self.request_new_tokens().await?.access)
	}

	/// Unconditionally obtain a new token pair and replace the cache.
	pub async fn refresh_auth_token(&self) -> Result<AuthTokens, GoCardlessError> {
		let _gate = self.refresh_gate.lock().await;
		self.request_new_tokens().await
	}

	/// True when no tokens are cached or the access token is past its expiry.
	pub fn is_access_expired(&self) -> bool {
		let now = (self.clock)();
		self.read_tokens()
			.as_ref()
			.is_none_or(|tokens| now > tokens.access_expires_at)
	}

	fn valid_access_token(&self) -> Option<String> {
		if self.is_access_expired() {
			return None;
		}
		self.read_tokens().as_ref().map(|tokens| tokens.access.clone())
	}

	fn read_tokens(&self) -> std::sync::RwLockReadGuard<'_, Option<AuthTokens>> {
		self.tokens.read().unwrap_or_else(PoisonError::into_inner)
	}

	/// Must be called with the refresh gate held.
	async fn request_new_tokens(&self) -> Result<AuthTokens, GoCardlessError> {
		let pair = self
			.api
			.obtain_new_access_refresh_token_pair(
				&self.credentials.secret_id,
				&self.credentials.secret_key,
			)
			.await?;

		let access_expires_at = TimeDelta::try_seconds(pair.access_expires)
			.and_then(|lifetime| (self.clock)().checked_add_signed(lifetime))
			.ok_or(GoCardlessError::InvalidExpiry(pair.access_expires))?;

		let tokens = AuthTokens {
			access: pair.access,
			refresh: pair.refresh,
			access_expires_at,
		};

		*self.tokens.write().unwrap_or_else(PoisonError::into_inner) = Some(tokens.clone());
		info!(expires_at = %tokens.access_expires_at, "Obtained new GoCardless access token");

		Ok(tokens)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::gocardless::types::{AccountMetadata, BankTransactions, DateRange, TokenPair};
	use async_trait::async_trait;
	use std::sync::Mutex as StdMutex;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::time::Duration;

	struct TokenEndpoint {
		calls: AtomicUsize,
		lifetime_secs: i64,
		delay: Duration,
	}

	impl TokenEndpoint {
		fn new(lifetime_secs: i64) -> Self {
			Self {
				calls: AtomicUsize::new(0),
				lifetime_secs,
				delay: Duration::ZERO,
			}
		}
	}

	#[async_trait]
	impl SourceApi for TokenEndpoint {
		async fn retrieve_account_metadata(
			&self,
			_access_token: &str,
			_account_id: &str,
		) -> Result<AccountMetadata, GoCardlessError> {
			unreachable!("token tests never fetch accounts")
		}

		async fn retrieve_account_transactions(
			&self,
			_access_token: &str,
			_account_id: &str,
			_range: DateRange,
		) -> Result<BankTransactions, GoCardlessError> {
			unreachable!("token tests never fetch transactions")
		}

		async fn obtain_new_access_refresh_token_pair(
			&self,
			secret_id: &str,
			secret_key: &str,
		) -> Result<TokenPair, GoCardlessError> {
			assert_eq!(secret_id, "id");
			assert_eq!(secret_key, "key");
			let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
			if !self.delay.is_zero() {
				tokio::time::sleep(self.delay).await;
			}
			Ok(TokenPair {
				access: format!("access-{}", n),
				refresh: format!("refresh-{}", n),
				access_expires: self.lifetime_secs,
				refresh_expires: None,
			})
		}
	}

	fn credentials() -> ClientSecret {
		ClientSecret {
			secret_id: "id".to_string(),
			secret_key: "key".to_string(),
		}
	}

	fn manual_clock(start: DateTime<Utc>) -> (Arc<StdMutex<DateTime<Utc>>>, Clock) {
		let now = Arc::new(StdMutex::new(start));
		let handle = now.clone();
		(now, Arc::new(move || *handle.lock().unwrap()))
	}

	#[tokio::test]
	async fn caches_token_until_expiry() {
		let api = Arc::new(TokenEndpoint::new(60));
		let start = Utc::now();
		let (now, clock) = manual_clock(start);
		let manager = TokenManager::with_clock(api.clone(), credentials(), clock);

		assert!(manager.is_access_expired());
		assert_eq!(manager.get_auth_token().await.unwrap(), "access-1");
		assert_eq!(manager.get_auth_token().await.unwrap(), "access-1");
		assert_eq!(api.calls.load(Ordering::SeqCst), 1);
		assert!(!manager.is_access_expired());

		// Exactly at the expiry instant the token is still usable.
		*now.lock().unwrap() = start + TimeDelta::seconds(60);
		assert!(!manager.is_access_expired());

		*now.lock().unwrap() = start + TimeDelta::seconds(61);
		assert!(manager.is_access_expired());
		assert_eq!(manager.get_auth_token().await.unwrap(), "access-2");
		assert_eq!(api.calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn forced_refresh_replaces_cache() {
		let api = Arc::new(TokenEndpoint::new(3600));
		let manager = TokenManager::new(api.clone(), credentials());

		assert_eq!(manager.get_auth_token().await.unwrap(), "access-1");
		let refreshed = manager.refresh_auth_token().await.unwrap();
		assert_eq!(refreshed.access, "access-2");
		assert_eq!(refreshed.refresh, "refresh-2");
		assert_eq!(manager.get_auth_token().await.unwrap(), "access-2");
		assert_eq!(api.calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn concurrent_callers_share_one_refresh() {
		let api = Arc::new(TokenEndpoint {
			delay: Duration::from_millis(20),
			..TokenEndpoint::new(3600)
		});
		let manager = TokenManager::new(api.clone(), credentials());

		let (a, b, c) = tokio::join!(
			manager.get_auth_token(),
			manager.get_auth_token(),
			manager.get_auth_token()
		);

		assert_eq!(a.unwrap(), "access-1");
		assert_eq!(b.unwrap(), "access-1");
		assert_eq!(c.unwrap(), "access-1");
		assert_eq!(api.calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn out_of_range_lifetime_is_an_error() {
		for lifetime in [i64::MAX, i64::MAX / 1000, i64::MIN / 1000] {
			let api = Arc::new(TokenEndpoint::new(lifetime));
			let manager = TokenManager::new(api.clone(), credentials());

			let err = manager.get_auth_token().await.unwrap_err();
			assert!(matches!(err, GoCardlessError::InvalidExpiry(l) if l == lifetime));
			assert!(manager.is_access_expired());
		}
	}

	#[test]
	fn debug_output_hides_secrets() {
		let rendered = format!("{:?}", credentials());
		assert!(!rendered.contains("\"key\""));
		assert!(rendered.contains("<redacted>"));

		let tokens = AuthTokens {
			access: "secret-access".to_string(),
			refresh: "secret-refresh".to_string(),
			access_expires_at: Utc::now(),
		};
		assert!(!format!("{:?}", tokens).contains("secret"));
	}
}
