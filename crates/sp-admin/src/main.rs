//! SearchParameter registry admin tool.
//!
//! Hosts the registry with the same start/stop ordering a server uses and
//! exposes its lookups and fingerprints from the command line.

mod config;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use helios_search_params::{Catalogue, RegistryUpdate, SearchParameterRegistry};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use config::{AdminConfig, Command};

/// Initializes tracing with the given default level.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("helios_search_params={},sp_admin={}", level, level))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Loads the embedded base catalogue, then every configured extension.
fn load_registry(
    registry: &SearchParameterRegistry,
    config: &AdminConfig,
) -> anyhow::Result<()> {
    registry
        .initialize()
        .context("embedded SearchParameter catalogue is invalid")?;

    for path in &config.catalogues {
        let catalogue = Catalogue::from_path(path)?;
        registry
            .extend_with(&catalogue)
            .with_context(|| format!("failed to merge catalogue {}", path.display()))?;
    }

    Ok(())
}

fn read_fingerprints(path: &Path) -> anyhow::Result<BTreeMap<String, String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("invalid fingerprint file {}", path.display()))
}

/// Logs registry updates and the resource types they leave stale.
async fn watch_updates(
    registry: Arc<SearchParameterRegistry>,
    recorded: Option<BTreeMap<String, String>>,
) {
    let mut rx = registry.subscribe();
    loop {
        match rx.recv().await {
            Ok(RegistryUpdate::Initialized) => {
                info!(parameters = registry.len(), "Base SearchParameters loaded");
            }
            Ok(RegistryUpdate::Extended { resource_types }) => {
                info!(resource_types = ?resource_types, "SearchParameters extended");
                if let Some(recorded) = &recorded {
                    let stale = registry.stale_resource_types(recorded);
                    if !stale.is_empty() {
                        warn!(resource_types = ?stale, "Search indexes need $reindex");
                    }
                }
            }
            Ok(RegistryUpdate::SupportChanged(url)) => {
                info!(url = %url, "SearchParameter support changed");
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Registry update listener lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Hosts the registry until Ctrl-C.
async fn serve(config: &AdminConfig) -> anyhow::Result<()> {
    let recorded = config
        .fingerprint_file
        .as_deref()
        .map(read_fingerprints)
        .transpose()?;

    let registry = Arc::new(SearchParameterRegistry::new());
    let watcher = tokio::spawn(watch_updates(Arc::clone(&registry), recorded.clone()));
    // Let the watcher subscribe before the first update is sent
    tokio::task::yield_now().await;

    load_registry(&registry, config)?;

    if let Some(recorded) = &recorded {
        let stale = registry.stale_resource_types(recorded);
        info!(stale = stale.len(), "Compared recorded fingerprints");
    }

    info!(
        parameters = registry.len(),
        resource_types = registry.resource_types().len(),
        "SearchParameter registry ready"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    registry.shutdown();
    watcher.abort();
    Ok(())
}

fn print_params(
    registry: &SearchParameterRegistry,
    resource_type: &str,
    code: Option<&str>,
) -> anyhow::Result<()> {
    match code {
        Some(code) => {
            let param = registry.get_parameter(resource_type, code)?;
            println!("{}", serde_json::to_string_pretty(param.as_ref())?);
            for index in 0..param.component.len() {
                let component_type = registry.resolve_component_type(&param, Some(index))?;
                println!(
                    "component[{}]: {} ({})",
                    index, param.component[index].definition, component_type
                );
            }
        }
        None => {
            for param in registry.get_parameters_for_type(resource_type)? {
                println!(
                    "{}\t{}\t{}",
                    param.code,
                    param.param_type,
                    param.url.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}

/// Runs a one-shot inspection command against a freshly loaded registry.
fn inspect(config: &AdminConfig) -> anyhow::Result<()> {
    let registry = SearchParameterRegistry::new();
    load_registry(&registry, config)?;

    match &config.command {
        Command::Serve => {}
        Command::Fingerprints => {
            println!("{}", serde_json::to_string_pretty(&registry.all_fingerprints())?);
        }
        Command::Params {
            resource_type,
            code,
        } => {
            print_params(&registry, resource_type, code.as_deref())?;
        }
        Command::Drift => {
            let path = config
                .fingerprint_file
                .as_deref()
                .context("--fingerprints is required")?;
            let stale = registry.stale_resource_types(&read_fingerprints(path)?);
            for resource_type in &stale {
                println!("{}", resource_type);
            }
            if !stale.is_empty() {
                std::process::exit(2);
            }
        }
    }

    registry.shutdown();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AdminConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    match config.command {
        Command::Serve => serve(&config).await,
        _ => inspect(&config),
    }
}
