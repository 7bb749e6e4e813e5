//! arplace demo: runs one scripted placement session (find surface, place,
//! drag, auto-rotate, hot-swap, reselect, end) against the simulated platform
//! and logs what happens.
//!
//! Usage: `arplace [config.json]`

mod app;

use arplace::config::{self, Config, ConfigError};
use std::path::Path;

const DEMO_MODELS: [&str; 3] = [
    "Pizza_Margherita.glb",
    "Pizza_Carbonara.glb",
    "bruschetta.glb",
];
const DEMO_FRAMES: u32 = 360;

fn main() -> Result<(), ConfigError> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading config from {}", path);
            config::load_from_file(Path::new(&path))?
        }
        None => Config::default(),
    };

    log::info!("🚀 arplace surface placement demo");
    let mut app = app::DemoApp::new(config, &DEMO_MODELS);
    app.run(DEMO_FRAMES);

    log::info!("👋 Goodbye!");
    Ok(())
}
