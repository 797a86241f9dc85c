//! Command implementations.

mod info;
mod run;
mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use contracts::GatewayConfig;

use crate::error::CliError;

pub use info::run_info;
pub use run::run_gateway;
pub use validate::run_validate;

/// Load and validate a configuration file
fn load_config(path: &Path) -> Result<GatewayConfig> {
    if !path.exists() {
        return Err(CliError::config_not_found(path).into());
    }

    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
