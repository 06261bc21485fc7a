//! GeoRoute Viewer - terminal front end for a live session.
//!
//! Connects to the decision engine feed, reads user actions from stdin and
//! prints the projected picture on every visibility tick:
//! - one status line per tick (connection, users, visible/total routes)
//! - optionally the full GeoJSON FeatureCollection (`--geojson`)

mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use commands::ViewerCommand;
use georoute_core::config::DEFAULT_FEED_URL;
use georoute_core::{spawn_session, ConnectionState, EngineConfig, NodeRegistry, Session, Snapshot};
use georoute_env::{TokioContext, WsFeed};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// GeoRoute live route viewer
#[derive(Parser, Debug)]
#[command(name = "georoute-viewer")]
#[command(about = "Visualize routing decisions from a live decision engine feed", long_about = None)]
struct Args {
    /// Decision engine WebSocket endpoint
    #[arg(long, default_value = DEFAULT_FEED_URL)]
    feed_url: String,

    /// Node topology JSON file (defaults to the built-in topology)
    #[arg(long)]
    nodes: Option<PathBuf>,

    /// Re-projection tick in milliseconds
    #[arg(long, default_value = "1000")]
    tick_ms: u64,

    /// Route visibility window in milliseconds
    #[arg(long, default_value = "3000")]
    window_ms: u64,

    /// Delay before reconnecting a dropped feed, in milliseconds
    #[arg(long, default_value = "3000")]
    reconnect_ms: u64,

    /// Drop routes older than this many milliseconds (default: keep all)
    #[arg(long)]
    retention_ms: Option<u64>,

    /// Waypoints per geodesic path (2 to 10000)
    #[arg(long, default_value = "100")]
    path_points: usize,

    /// Print the rendered paths as GeoJSON on every tick
    #[arg(long)]
    geojson: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_feed_url(self.feed_url.clone())
            .with_tick_interval(Duration::from_millis(self.tick_ms))
            .with_visibility_window(Duration::from_millis(self.window_ms))
            .with_reconnect_delay(Duration::from_millis(self.reconnect_ms))
            .with_retention(self.retention_ms.map(Duration::from_millis))
            .with_path_points(self.path_points)
    }
}

fn print_nodes(registry: &NodeRegistry) {
    for node in registry.all_nodes() {
        println!(
            "{:<18} {:<5} {:>9.4} {:>10.4}  {}",
            node.id,
            node.tier.as_str(),
            node.lat,
            node.lng,
            node.name
        );
    }
}

/// Prints a status line (and GeoJSON if requested) once per tick or state change.
fn render(snapshot: &Snapshot, geojson: bool, last: &mut Option<(u64, ConnectionState)>) {
    let key = (snapshot.tick, snapshot.connection);
    if *last == Some(key) {
        return;
    }
    *last = Some(key);

    let stats = &snapshot.stats;
    println!(
        "[t={:>7.1}s tick {:>4}] {:<12} users={} routes={}/{} paths={}{}",
        snapshot.at_ms as f64 / 1000.0,
        snapshot.tick,
        snapshot.connection.as_str(),
        stats.users,
        stats.visible_routes,
        stats.total_routes,
        snapshot.paths.len(),
        snapshot
            .hovered
            .as_ref()
            .map(|u| format!(" hover={u}"))
            .unwrap_or_default()
    );
    if geojson {
        println!("{}", snapshot.feature_collection());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging (RUST_LOG overrides --verbose)
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let registry = match &args.nodes {
        Some(path) => NodeRegistry::from_json_file(path)
            .with_context(|| format!("loading node topology from {}", path.display()))?,
        None => NodeRegistry::default_topology(),
    };
    let registry = Arc::new(registry);

    let config = args.engine_config();
    let feed = Arc::new(WsFeed::new(&config.feed_url).context("parsing --feed-url")?);
    let session = Session::new(TokioContext::shared(), registry.clone(), config)
        .context("invalid engine configuration")?;

    info!("GeoRoute Viewer v{}", env!("CARGO_PKG_VERSION"));
    info!("{}", commands::HELP);

    let handle = spawn_session(session, feed);
    let mut snapshots = handle.snapshots();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last = None;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                match commands::parse(&line) {
                    Ok(Some(ViewerCommand::Quit)) => break,
                    Ok(Some(ViewerCommand::Nodes)) => print_nodes(&registry),
                    Ok(Some(ViewerCommand::Session(command))) => {
                        if !handle.send(command) {
                            warn!("session has stopped");
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => eprintln!("{e}"),
                }
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                render(&snapshot, args.geojson, &mut last);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    handle.stop().await;
    Ok(())
}
