pub mod api;
pub mod cli;
pub mod core;
pub mod fetcher;
pub mod providers;
pub mod reconcile;
pub mod store;
pub mod updater;

use crate::core::config::AppConfig;
use crate::fetcher::SourceFetcher;
use crate::providers::ReqwestFetcher;
use crate::store::WalletRepository;
use crate::updater::UpdateCoordinator;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Serve,
    Update { debug: bool },
    List,
    Show { id: String },
    Status { probe: bool },
}

/// Wires store, HTTP client and sources into a ready coordinator.
pub fn build_coordinator(config: &AppConfig) -> Result<UpdateCoordinator> {
    let store = store::open(config)?;
    let http = Arc::new(ReqwestFetcher::new(&config.http)?);
    let fetcher = SourceFetcher::from_config(config, http);
    let repository = WalletRepository::new(store, &config.store.collection);
    Ok(UpdateCoordinator::new(fetcher, repository))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load_with_env(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let coordinator = build_coordinator(&config)?;

    match command {
        AppCommand::Serve => {
            let state = Arc::new(api::AppState { coordinator });
            api::serve(state, config.server.port).await
        }
        AppCommand::Update { debug } => {
            let spinner = cli::ui::new_spinner("Updating wallet rates")?;
            let report = coordinator.update_all().await;
            spinner.finish_and_clear();
            info!(updated = report.wallets.len(), "Update finished");

            println!("{}", cli::wallets::update_table(&report));
            if debug {
                println!("\n{}", cli::wallets::reports_table(&report.sources));
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            Ok(())
        }
        AppCommand::List => {
            let wallets = coordinator.repository().list().await?;
            println!("{}", cli::wallets::wallets_table(&wallets));
            Ok(())
        }
        AppCommand::Show { id } => {
            let wallet = coordinator
                .repository()
                .get(&id)
                .await?
                .with_context(|| format!("Billetera no encontrada: {id}"))?;
            println!("{}", serde_json::to_string_pretty(&wallet)?);
            Ok(())
        }
        AppCommand::Status { probe } => {
            let status = coordinator.sources_status(probe).await;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(())
        }
    }
}
