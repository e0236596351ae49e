//! Facilities for reading runtime configuration values
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn};

/// Standalone front-end configuration, layered from an optional
/// `forge.toml` in the working directory and `FORGE__`-prefixed
/// environment variables.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Worker thread count used when `--workers` is not given on the
    /// command line
    #[serde(default = "Config::default_worker_count")]
    pub worker_count: usize,
    /// Bundled common-password list size used when no candidate source
    /// is given on the command line
    #[serde(default = "Config::default_common_list")]
    pub default_common_list: u32,
    /// Minimum string length for the strings-from-scope candidate source
    #[serde(default = "Config::default_strings_min_len")]
    pub strings_min_len: usize,
}

impl Config {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = Figment::new()
            .merge(Toml::file("forge.toml"))
            .merge(Env::prefixed("FORGE__").split("__"))
            .extract()
            .map_err(|err| {
                error!("failed to validate configuration: {err}");
                err
            })?;
        Ok(config)
    }

    fn default_worker_count() -> usize {
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    }

    fn default_common_list() -> u32 {
        1000
    }

    fn default_strings_min_len() -> usize {
        6
    }
}
