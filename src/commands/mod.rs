pub mod config;
pub mod declarative;
pub mod delete;
pub mod sync;
pub mod validate;

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use crate::Context;
use crate::config::Config;
use crate::orchestrator::Server;

/// Loaded configuration and the server it describes
pub struct Loaded {
    pub config: Config,
    pub path: PathBuf,
    pub server: Arc<Server>,
}

/// Load the config selected by the global flags
pub fn load(ctx: &Context) -> Result<Loaded> {
    let (config, path) = Config::load(ctx.config.as_deref())?;
    let server = Arc::new(Server::from_config(&config));
    Ok(Loaded {
        config,
        path,
        server,
    })
}
