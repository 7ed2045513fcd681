mod config;
mod gocardless;
mod sync;
mod utils;
mod ynab;

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::gocardless::{GoCardlessClient, TokenManager};
use crate::sync::{Connection, FileConnectionStore, LedgerFactory, SyncError, SyncOrchestrator};
use crate::ynab::YnabClient;

fn init_tracing(verbose: bool) {
	let default_filter = if verbose {
		"info,ynabber_sync=debug"
	} else {
		"info"
	};

	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	let config = Config::parse();
	init_tracing(config.verbose);

	info!(connection_id = %config.connection_id, "Starting ynabber sync");

	match run(&config).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			error!("Sync failed: {}", e);
			ExitCode::FAILURE
		}
	}
}

async fn run(config: &Config) -> Result<(), SyncError> {
	let timeout = config.http_timeout();

	let source_api = Arc::new(GoCardlessClient::new(config.gocardless_url.clone(), timeout)?);
	let token_manager = Arc::new(TokenManager::new(source_api.clone(), config.client_secret()));
	let store = Arc::new(FileConnectionStore::new(config.connections_file.clone()));

	let ynab_url = config.ynab_url.clone();
	let ynab_token = config.ynab_token.clone();
	let ledger_factory: LedgerFactory<YnabClient> = Arc::new(
		move |connection: &Connection| -> Result<Arc<YnabClient>, SyncError> {
			let token = connection.ynab_access_token().unwrap_or(&ynab_token);
			Ok(Arc::new(YnabClient::new(
				ynab_url.clone(),
				token.to_string(),
				timeout,
			)?))
		},
	);

	let orchestrator = SyncOrchestrator::new(store, source_api, token_manager, ledger_factory);

	if let Some(report) = orchestrator.sync(&config.connection_id).await? {
		info!("Finished: {}", report.summary());
	}

	Ok(())
}
