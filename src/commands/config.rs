use anyhow::Result;

use super::load;
use crate::Context;
use crate::ui;

/// Show where the config came from and what is in effect
pub fn run(ctx: &Context) -> Result<()> {
    let loaded = load(ctx)?;
    let config = &loaded.config;
    let paths = config.paths.resolve();

    ui::header("Configuration");
    let origin = if loaded.path.exists() {
        loaded.path.display().to_string()
    } else {
        format!("{} (not found, using defaults)", loaded.path.display())
    };
    ui::kv("Config file", &origin);

    ui::section("Cobbler");
    ui::kv("Executable", &config.cobbler.bin.display().to_string());
    ui::kv("Timeout", &format!("{}s", config.cobbler.timeout_secs));

    ui::section("Paths");
    ui::kv("File cache", &paths.file_cache.display().to_string());
    ui::kv("Kickstarts", &paths.kickstart_dir.display().to_string());
    ui::kv("TFTP images", &paths.tftp_images_dir.display().to_string());

    ui::section("Objects");
    ui::kv("Images", &config.images.len().to_string());
    ui::kv("Profiles", &config.profiles.len().to_string());

    if ctx.verbose > 0 {
        ui::section("Effective TOML");
        println!("{}", config.to_toml()?);
    }
    Ok(())
}
