mod config;
mod game;

use scene2d::{run_engine, Engine, RunConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const CONFIG_PATH: &str = "config.json";

fn main() {
    init_tracing();
    info!("=== scene2d demo startup ===");

    let game_config = config::load_or_default(CONFIG_PATH);
    let mut engine = Engine::new(game_config.engine);
    if let Err(err) = game::setup(&mut engine, &game_config) {
        error!(error = %err, "game_setup_failed");
        std::process::exit(1);
    }
    info!(entity_count = engine.entity_count(), "game_ready");

    let run_config = RunConfig {
        window_title: game_config.window_title.clone(),
        ..RunConfig::default()
    };
    if let Err(err) = run_engine(engine, run_config) {
        error!(error = %err, "startup_failed");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
