// src/main.rs

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use xpkg::revision::select_for_gc;
use xpkg::{
    FileLockStore, ManagerConfig, NoPullSecrets, PackageRevision, RevisionState, RevisionWriter,
    TagIndex,
};

#[derive(Parser)]
#[command(name = "xpkg")]
#[command(author, version, long_about = None)]
#[command(about = "Package dependency resolution and revision activation")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one resolution pass over a lock snapshot
    Resolve {
        /// Lock snapshot (JSON)
        #[arg(short, long)]
        lock: PathBuf,
        /// Tag index mapping package to published tags (JSON)
        #[arg(short, long)]
        tags: PathBuf,
        /// Manager configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Compute the desired state of a package's revisions
    Activate {
        /// Revision list (JSON)
        #[arg(short, long)]
        revisions: PathBuf,
        /// Name of the revision to activate
        #[arg(long)]
        current: String,
        /// Manager configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// List revisions due for garbage collection
    Prune {
        /// Revision list (JSON)
        #[arg(short, long)]
        revisions: PathBuf,
        /// Manager configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Writer that only logs; the CLI never touches a cluster
struct DryRunWriter;

#[async_trait]
impl RevisionWriter for DryRunWriter {
    async fn set_desired_state(
        &self,
        revision: &PackageRevision,
        state: RevisionState,
    ) -> xpkg::Result<()> {
        info!("Would set {} to {}", revision.name, state);
        Ok(())
    }
}

fn load_config(path: Option<&Path>) -> Result<ManagerConfig> {
    match path {
        Some(path) => ManagerConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(ManagerConfig::default()),
    }
}

fn load_revisions(path: &Path) -> Result<Vec<PackageRevision>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(PackageRevision::list_from_json(&content)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Resolve { lock, tags, config }) => {
            let config = load_config(config.as_deref())?;
            info!("Resolving {} with {} policy", lock.display(), config.resolution_policy());

            let index = TagIndex::load(&tags)
                .with_context(|| format!("Failed to load tag index from {}", tags.display()))?;
            let manager = config.dependency_manager(
                Arc::new(FileLockStore::new(&lock)),
                Arc::new(index),
                Arc::new(NoPullSecrets),
            );

            let plan = manager.reconcile().await?;

            println!("Sort order:");
            for id in &plan.sort_order {
                println!("  {}", id);
            }
            if !plan.implied.is_empty() {
                println!("Missing dependencies: {}", plan.implied.join(", "));
            }
            println!("Next step: {}", plan.outcome);
            Ok(())
        }
        Some(Commands::Activate {
            revisions,
            current,
            config,
        }) => {
            let config = load_config(config.as_deref())?;
            let revisions = load_revisions(&revisions)?;
            info!(
                "Activating {} with {} strategy ({} revisions)",
                current,
                config.revision_activator(),
                revisions.len()
            );

            let updated = config
                .revision_activator()
                .activate(
                    config.activation_policy(),
                    Some(config.active_revision_limit()),
                    &current,
                    revisions,
                    &DryRunWriter,
                )
                .await?;

            for rev in &updated {
                println!("{} (revision {}): {}", rev.name, rev.revision, rev.desired_state);
            }
            Ok(())
        }
        Some(Commands::Prune { revisions, config }) => {
            let config = load_config(config.as_deref())?;
            let revisions = load_revisions(&revisions)?;

            let stale = select_for_gc(&revisions, config.revision_history_limit());
            if stale.is_empty() {
                println!("No revisions to prune");
            }
            for name in &stale {
                println!("{}", name);
            }
            Ok(())
        }
        None => {
            // No command provided, show help
            println!("xpkg v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'xpkg --help' for usage information");
            Ok(())
        }
    }
}
