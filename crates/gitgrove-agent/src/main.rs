mod config;
mod driver;
mod server;
mod watch_log;

use anyhow::{Context, Result};
use config::parse_args;
use driver::{Control, Playback};
use gitgrove_core::Msg;
use gitgrove_engine::util::config as engine_config;
use gitgrove_engine::{load_commit_log, Engine};
use std::path::PathBuf;
use tokio::sync::{broadcast, mpsc};

fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

fn runtime_sock_path() -> PathBuf {
    // Wayland-friendly: prefer XDG_RUNTIME_DIR
    match std::env::var_os("XDG_RUNTIME_DIR") {
        Some(dir) => PathBuf::from(dir).join("gitgrove.sock"),
        None => PathBuf::from("/tmp/gitgrove.sock"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = parse_args()?;

    let engine_cfg = match &args.config {
        Some(path) => engine_config::load_from_path(path)?,
        None => engine_config::load_or_default(),
    };
    let events = load_commit_log(&args.log)
        .with_context(|| format!("loading {}", args.log.display()))?;
    let engine = Engine::with_events(engine_cfg, events);

    let start = engine.time_range().map(|(first, _)| first).unwrap_or(0);
    let clock = Playback::new(start, args.speed);
    tracing::info!(start, speed = args.speed, fps = args.fps, "playback configured");

    let sock_path = args.socket.clone().unwrap_or_else(runtime_sock_path);
    // Clean stale socket
    let _ = std::fs::remove_file(&sock_path);

    // broadcast so multiple renderers can subscribe
    let (bus_tx, _bus_rx) = broadcast::channel::<Msg>(64);
    let (control_tx, control_rx) = mpsc::channel::<Control>(64);

    if args.watch {
        watch_log::spawn(args.log.clone(), control_tx.clone())?;
    }

    tokio::spawn(driver::run(engine, clock, args.fps, control_rx, bus_tx.clone()));

    server::run(&sock_path, bus_tx, control_tx).await
}
