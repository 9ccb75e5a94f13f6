//! Tower Builder headless host (default binary).
//!
//! Runs one game session on an in-memory scene, driven by front-ends over the
//! TCP adapter. `tower-builder observe [--host H] [--port P]` instead connects
//! as an observer and prints the session's log lines.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tower_builder::adapter::Adapter;
use tower_builder::core::{GameConfig, GameSession};
use tower_builder::host::{Host, HostConfig};
use tower_builder::observe::{
    connect_observer, parse_observe_args, render_event, wait_for_welcome, ObserveConfig,
    ObserveEvent,
};
use tower_builder::scene::MemoryScene;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Some(config) = parse_observe_args(&args)? {
        return observe(&config);
    }
    run()
}

fn run() -> Result<()> {
    let game = GameConfig::from_env();
    let host_config = HostConfig::from_env();

    let Some(mut adapter) = Adapter::start_from_env()? else {
        warn!("adapter disabled, nothing can drive the session; exiting");
        return Ok(());
    };

    info!(
        seed = game.seed,
        difficulty = game.difficulty.label(),
        rule = game.collision_rule.as_str(),
        fps = host_config.fps,
        "headless host running"
    );

    let mut host = Host::new(GameSession::new(MemoryScene::new(), game));
    let tick = Duration::from_secs_f64(host_config.tick_secs());

    loop {
        let started = Instant::now();

        while let Some(inbound) = adapter.try_recv() {
            for msg in host.handle(inbound) {
                adapter.send(msg);
            }
        }
        for msg in host.tick(1.0) {
            adapter.send(msg);
        }

        thread::sleep(tick.saturating_sub(started.elapsed()));
    }
}

fn observe(config: &ObserveConfig) -> Result<()> {
    let rx = connect_observer(config)?;
    let (client_id, role) = wait_for_welcome(&rx, Duration::from_secs(5))?;
    info!(client_id, ?role, host = %config.host, port = config.port, "observing");

    for event in rx.iter() {
        if let Some(line) = render_event(&event) {
            println!("{line}");
        }
        if matches!(event, ObserveEvent::Closed) {
            break;
        }
    }
    Ok(())
}
