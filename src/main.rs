//! Kourier control plane renderer.
//!
//! # Architecture Overview
//!
//! ```text
//!   section files (*.toml)
//!          │
//!          ▼
//!   ┌────────────┐    ┌──────────────┐    ┌───────────┐    ┌──────────────┐
//!   │   loader   │───▶│    Store     │───▶│  Context  │───▶│  generator   │───▶ JSON (stdout)
//!   │ RawSection │    │ ArcSwap per  │    │ one Config│    │ listeners,   │
//!   └────────────┘    │   section    │    │ per pass  │    │ routes,      │
//!          ▲          └──────────────┘    └───────────┘    │ clusters     │
//!          │                                               └──────────────┘
//!   ┌────────────┐
//!   │  watcher   │  (--watch: re-render on every accepted change)
//!   └────────────┘
//! ```

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use kourier_control::config::loader::ConfigError;
use kourier_control::config::watcher::{apply_updates, SectionWatcher};
use kourier_control::config::{Context, Store};
use kourier_control::generator::{generate_for_pass, GatewaySpec};
use kourier_control::observability::logging::{init_logging, DEFAULT_FILTER};

#[derive(Parser)]
#[command(name = "kourier-control")]
#[command(about = "Render Envoy resources from Kourier configuration sections", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render listeners, route tables and clusters as JSON
    Render {
        /// Directory holding config-kourier.toml / config-network.toml
        #[arg(short, long)]
        config_dir: PathBuf,

        #[arg(long, default_value = "external_services")]
        route_config: String,

        #[arg(long, default_value_t = 8080)]
        http_port: u16,

        #[arg(long, default_value_t = 8443)]
        https_port: u16,

        /// Keep running and re-render whenever a section file changes
        #[arg(short, long)]
        watch: bool,
    },
    /// Print the merged configuration snapshot
    Config {
        #[arg(short, long)]
        config_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_logging(DEFAULT_FILTER);

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            config_dir,
            route_config,
            http_port,
            https_port,
            watch,
        } => {
            let spec = GatewaySpec {
                route_config_name: route_config,
                http_port,
                https_port,
            };
            let store = Arc::new(load_store(&config_dir)?);
            render(&store, &spec)?;

            if watch {
                let (watcher, updates) = SectionWatcher::new(&config_dir);
                let _watcher = watcher.run()?;

                let on_applied = |store: &Store| {
                    if let Err(e) = render(store, &spec) {
                        tracing::error!(error = %e, "Failed to render resources");
                    }
                };

                tokio::select! {
                    _ = apply_updates(Arc::clone(&store), updates, on_applied) => {}
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Interrupt received, stopping watcher");
                    }
                }
            }
        }
        Commands::Config { config_dir } => {
            let store = load_store(&config_dir)?;
            println!("{}", serde_json::to_string_pretty(&store.load())?);
        }
    }

    Ok(())
}

/// Build a store from every section file in `dir`.
///
/// A rejected section fails startup rather than rendering with defaults.
fn load_store(dir: &Path) -> Result<Store, ConfigError> {
    let store = Store::builder()
        .on_after_store(|section, _| tracing::debug!(section, "Section stored"))
        .build();

    let applied = store.apply_dir(dir)?;
    if applied == 0 {
        tracing::warn!(dir = ?dir, "No section files found, using defaults");
    }

    let config = store.load();
    tracing::info!(
        ingress_class = %config.network.ingress_class,
        http_protocol = %config.network.http_protocol,
        ext_authz = config.kourier.external_authz.enabled,
        tracing = config.kourier.tracing.enabled,
        "Configuration loaded"
    );

    Ok(store)
}

fn render(store: &Store, spec: &GatewaySpec) -> Result<(), Box<dyn Error>> {
    let ctx = store.to_context(&Context::background());
    let resources = generate_for_pass(&ctx, spec, Vec::new(), Vec::new())?;
    println!("{}", serde_json::to_string_pretty(&resources)?);
    Ok(())
}
