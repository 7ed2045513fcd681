//! Command-line and environment configuration.

use crate::gocardless::ClientSecret;

use clap::Parser;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_GOCARDLESS_URL: &str = "https://bankaccountdata.gocardless.com";
pub const DEFAULT_YNAB_URL: &str = "https://api.ynab.com/v1";

#[derive(Parser, Clone)]
#[command(
	name = "ynabber-sync",
	about = "Copy bank transactions from GoCardless into a YNAB budget."
)]
pub struct Config {
	/// Id of the connection to sync
	#[arg(long, env = "YNABBER_CONNECTION_ID")]
	pub connection_id: String,

	/// JSON file holding the connection documents
	#[arg(long, env = "YNABBER_CONNECTIONS_FILE", default_value = "connections.json")]
	pub connections_file: PathBuf,

	#[arg(long, env = "GOCARDLESS_SECRET_ID")]
	pub gocardless_secret_id: String,

	#[arg(long, env = "GOCARDLESS_SECRET_KEY", hide_env_values = true)]
	pub gocardless_secret_key: String,

	/// Personal access token, used when the connection carries no OAuth token of its own
	#[arg(long, env = "YNAB_TOKEN", hide_env_values = true)]
	pub ynab_token: String,

	#[arg(long, env = "GOCARDLESS_URL", default_value = DEFAULT_GOCARDLESS_URL)]
	pub gocardless_url: String,

	#[arg(long, env = "YNAB_URL", default_value = DEFAULT_YNAB_URL)]
	pub ynab_url: String,

	/// Per-request HTTP timeout in seconds
	#[arg(long, env = "YNABBER_HTTP_TIMEOUT_SECS", default_value_t = 30)]
	pub http_timeout_secs: u64,

	/// Enable debug logging for this crate
	#[arg(short, long)]
	pub verbose: bool,
}

impl Config {
	pub fn client_secret(&self) -> ClientSecret {
		ClientSecret {
			secret_id: self.gocardless_secret_id.clone(),
			secret_key: self.gocardless_secret_key.clone(),
		}
	}

	pub fn http_timeout(&self) -> Duration {
		Duration::from_secs(self.http_timeout_secs)
	}
}

impl fmt::Debug for Config {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Config")
			.field("connection_id", &self.connection_id)
			.field("connections_file", &self.connections_file)
			.field("gocardless_secret_id", &self.gocardless_secret_id)
			.field("gocardless_secret_key", &"<redacted>")
			.field("ynab_token", &"<redacted>")
			.field("gocardless_url", &self.gocardless_url)
			.field("ynab_url", &self.ynab_url)
			.field("http_timeout_secs", &self.http_timeout_secs)
			.field("verbose", &self.verbose)
			.finish()
	}
}
