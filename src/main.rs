//! Water Block executable
//!
//! Usage: `water-block [config.toml]`

use std::path::PathBuf;
use water_block::WaterConfig;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = WaterConfig::resolve(config_path)?;

    if let Err(e) = water_block::run(config) {
        log::error!("[main] Water Block exited with error: {:#}", e);
        return Err(e);
    }
    Ok(())
}
