//! # Bidder Server Entry Point
//!
//! Loads the configuration and the catalog, keeps the catalog fresh in the background
//! and flushes the important log until interrupted.
//!
//! Usage: `bidder-server <config.json> <catalog.json>`

use bidder::cache::open_backend;
use bidder::catalog::{CatalogLoader, JsonFileLoader, PersistingLoader, SnapshotFile};
use bidder::refresh::{RefreshScheduler, RefreshService};
use bidder::telemetry::ImportantLog;
use bidder::{BidEngine, EngineConfig, RuntimeManager};
use std::io;
use std::sync::Arc;
use tokio::time::interval;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("usage: {} <config.json> <catalog.json>", args[0]);
        std::process::exit(2);
    }

    println!("=================================================");
    println!("  Bidder - Real-Time Bid Decision Engine        ");
    println!("=================================================");
    println!();

    let config = match EngineConfig::from_json_file(&args[1]) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    println!("✓ Configuration loaded from {}", args[1]);
    println!("  - Test only: {}", config.test_only);
    println!("  - Revshare: {:.2}%", config.revshare_percent);
    println!("  - Recall shards: {}", config.shard_count);
    println!();

    let important = Arc::new(ImportantLog::new(config.important_log_capacity));
    important.push("bidder-server started");

    let source = JsonFileLoader::new(&args[2]);
    let loader: Box<dyn CatalogLoader> = match &config.snapshot_path {
        Some(path) => Box::new(PersistingLoader::new(source, SnapshotFile::new(path))),
        None => Box::new(source),
    };
    let runtime = Arc::new(RuntimeManager::new(loader));

    let router = Arc::new(open_backend(
        config.shard_count,
        config.recall_db_path.as_deref(),
    )?);
    let engine = Arc::new(
        BidEngine::new(Arc::clone(&runtime), config.clone())
            .with_recall_store(Box::new(Arc::clone(&router))),
    );

    // Initial catalog load
    println!("Loading catalog from {}...", runtime.loader_description());
    let service = RefreshService::new(Arc::clone(&runtime));
    match service.refresh() {
        Ok(stats) => {
            println!("✓ Catalog v{} published", stats.version);
            println!("  - Folders: {}", stats.folders_loaded);
            println!("  - Creatives: {}", stats.creatives_loaded);
            println!("  - Took: {}ms", stats.duration_ms);
        }
        Err(e) => {
            eprintln!("✗ Initial catalog load failed: {}", e);
            eprintln!("  Serving no-bids until a scheduled refresh succeeds");
            important.push(format!("initial catalog load failed: {}", e));
        }
    }
    println!();

    let scheduler = Arc::new(
        RefreshScheduler::new(service, config.refresh.clone())
            .with_important_log(Arc::clone(&important)),
    );
    tokio::spawn(Arc::clone(&scheduler).start());

    {
        let important = Arc::clone(&important);
        let engine = Arc::clone(&engine);
        let router = Arc::clone(&router);
        let log_path = config.important_log_path.clone();
        let mut ticker = interval(config.important_log_interval);
        tokio::spawn(async move {
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Some(report) = router.take_report() {
                    log::info!("{}", report);
                }
                let stats = engine.stats();
                log::info!(
                    "decisions {} (bids {}, no-bids {}, aborted {})",
                    stats.total_decisions,
                    stats.bids,
                    stats.no_bids,
                    stats.aborted
                );
                flush_important(&important, log_path.as_deref());
            }
        });
    }

    println!("Running with policy '{}'. Press Ctrl-C to stop.", engine.policy_name());
    tokio::signal::ctrl_c().await?;

    important.push("got interrupt, shutting down");
    flush_important(&important, config.important_log_path.as_deref());

    println!("=================================================");
    println!("  Bidder Shut Down");
    println!("=================================================");

    Ok(())
}

fn flush_important(important: &ImportantLog, path: Option<&std::path::Path>) {
    if let Err(e) = important.flush(&mut io::stdout()) {
        eprintln!("✗ {}", e);
    }
    if let Some(path) = path {
        if let Err(e) = important.flush_to_file(path) {
            eprintln!("✗ {}", e);
        }
    }
}
