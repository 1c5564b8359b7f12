//! # newsreel
//!
//! Runs one acquisition for the rotation display and writes the result as
//! JSON, either to stdout or into an archive directory with a `latest.json`
//! the display polls.
//!
//! ## Usage
//!
//! ```sh
//! newsreel -j ./rotations
//! newsreel --probe
//! ```
//!
//! ## Modes
//!
//! 1. **Acquire** (default): fetch every source, select and write a rotation
//! 2. **Probe**: fetch each source once and report transport, item counts and
//!    timing as JSON
//! 3. **List**: print the configured sources

use chrono::Utc;
use clap::Parser;
use newsreel::acquire::{acquire_with_config, probe_sources};
use newsreel::cli::Cli;
use newsreel::config::{EngineConfig, load_config};
use newsreel::models::Rotation;
use newsreel::outputs::json;
use newsreel::select::MAX_WINDOW_DAYS;
use newsreel::transport::TransportResolver;
use newsreel::utils::ensure_writable_dir;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("newsreel starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config = match &args.config {
        Some(path) => match load_config(path) {
            Ok(config) => {
                info!(path = %path, sources = config.sources.len(), "Loaded configuration");
                config
            }
            Err(e) => {
                error!(path = %path, error = %e, "Failed to load configuration");
                return Err(e.into());
            }
        },
        None => EngineConfig::default(),
    };

    if args.list_sources {
        for source in &config.sources {
            let kind = if source.is_feed() { "feed" } else { "page" };
            println!("{}\t{}\t{}", source.name, kind, source.fetch_url());
        }
        return Ok(());
    }

    if args.probe {
        let sources = config.sources_matching(args.source.as_deref());
        if sources.is_empty() {
            warn!(filter = ?args.source, "No configured source matches");
        }
        let resolver = TransportResolver::new(config.relays.clone())?;
        let reports = probe_sources(&resolver, &sources).await;
        let reachable = reports.iter().filter(|r| r.success).count();
        println!("{}", serde_json::to_string_pretty(&reports)?);
        info!(probed = reports.len(), reachable, "Probe complete");
        return Ok(());
    }

    // Early check: fail before spending a minute on fetches
    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir,
                error = %e,
                "JSON output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e.into());
        }
    }

    let items = acquire_with_config(&config, args.max_days_back, args.max_count).await;
    let rotation = Rotation {
        generated_at: Utc::now(),
        max_days_back: args.max_days_back.clamp(1, MAX_WINDOW_DAYS),
        max_count: args.max_count,
        items,
    };
    let fallback = rotation.items.iter().filter(|i| i.id.starts_with("fallback-")).count();
    info!(items = rotation.items.len(), fallback, "Rotation ready");

    match &args.json_output_dir {
        Some(dir) => {
            let path = json::write_rotation(&rotation, dir).await?;
            info!(path = %path.display(), "Rotation archived");
        }
        None => println!("{}", serde_json::to_string_pretty(&rotation)?),
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
