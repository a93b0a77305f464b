//! Branchcount host binary
//!
//! Serves the collector API, or collects facts once from the command line.

use anyhow::Context;
use branchcount_domain::Entity;
use branchcount_host::{build_registry, start_server, Cli, CollectArgs, Command};
use branchcount_store::AppConfig;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let config = Arc::new(config);

    match cli.command {
        None | Some(Command::Serve) => start_server(config).await?,
        Some(Command::Collect(args)) => collect_once(config, args).await?,
    }

    Ok(())
}

async fn collect_once(config: Arc<AppConfig>, args: CollectArgs) -> anyhow::Result<()> {
    let contents = tokio::fs::read_to_string(&args.entities)
        .await
        .with_context(|| format!("reading {}", args.entities.display()))?;
    let entities: Vec<Entity> = serde_json::from_str(&contents)
        .with_context(|| format!("parsing entities in {}", args.entities.display()))?;

    let registry = build_registry(config)?;
    let ids = match args.collector {
        Some(id) => vec![id],
        None => registry.ids(),
    };

    let mut facts = Vec::new();
    for id in ids {
        let collected = registry
            .collect(&id, &entities, None)
            .await
            .with_context(|| format!("collector '{}'", id))?;
        facts.extend(collected);
    }

    println!("{}", serde_json::to_string_pretty(&facts)?);
    Ok(())
}
