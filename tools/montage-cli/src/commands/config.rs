//! Show or write the effective configuration.

use montage_common::config::{config_file_path, AppConfig};

pub fn run(config: &AppConfig, init: bool) -> anyhow::Result<()> {
    println!("Config file: {}", config_file_path().display());
    println!("{}", serde_json::to_string_pretty(config)?);

    if let Err(e) = config.playback.validate() {
        println!();
        println!("Warning: {e}");
    }

    if init {
        config
            .save()
            .map_err(|e| anyhow::anyhow!("Failed to write config: {e}"))?;
        println!();
        println!("Wrote {}", config_file_path().display());
    }
    Ok(())
}
