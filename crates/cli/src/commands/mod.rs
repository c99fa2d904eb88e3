//! Command implementations.

mod info;
mod locate;
mod run;
mod validate;

pub use info::run_info;
pub use locate::run_locate;
pub use run::run_forwarder;
pub use validate::run_validate;

use std::path::Path;

use contracts::ForwarderBlueprint;

use crate::error::{CliError, Result};

/// Load and validate the configuration at `path`
pub(crate) fn load_blueprint(path: &Path) -> Result<ForwarderBlueprint> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()));
    }
    Ok(config_loader::ConfigLoader::load_from_path(path)?)
}
