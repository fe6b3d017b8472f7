//! Config loading
//!
//! Layers, lowest precedence first: built-in defaults, the optional config
//! file (format picked by extension), then `TURBOMCP_JWKS_*` environment
//! variables. Nested keys in the environment use `__`, so
//! `TURBOMCP_JWKS_REFRESH_INTERVAL_SECS=3600` sets `refresh_interval_secs`.

use std::path::Path;

use config::{Config, Environment, File};
use tracing::debug;
use turbomcp_jwks::JwksConfig;

use crate::error::CliResult;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "TURBOMCP_JWKS";

/// Load the cache config from `path` (if any) and the environment
///
/// # Errors
///
/// Returns [`crate::error::CliError::Config`] if the file is missing or
/// malformed, or a value has the wrong type.
pub fn load(path: Option<&Path>) -> CliResult<JwksConfig> {
    load_with_env(path, Environment::with_prefix(ENV_PREFIX))
}

fn load_with_env(path: Option<&Path>, env: Environment) -> CliResult<JwksConfig> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        debug!(path = %path.display(), "Loading JWKS config file");
        builder = builder.add_source(File::from(path).required(true));
    }

    let config = builder
        .add_source(
            env.prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize::<JwksConfig>()?;

    Ok(config)
}
