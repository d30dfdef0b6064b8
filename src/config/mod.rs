use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use crate::Result;
use crate::error::Error as BucketError;

mod defaults;
mod duration;
mod env;
mod raw;

use duration::HumantimeDuration;

#[derive(Debug, Clone)]
pub struct Config {
    /// `host:port` to listen on; host names are resolved when binding.
    pub bind_addr: String,
    pub admission: Admission,
    pub max_keys: NonZeroUsize,
    pub sweep_interval: Duration,
}

/// Arguments every request passes to the limiter.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Admission {
    /// Calls per minute; zero disables limiting.
    pub limit_per_window: u64,
    /// Tokens one request costs.
    pub amount: u64,
}

impl Default for Admission {
    fn default() -> Self {
        Self {
            limit_per_window: defaults::default_limit_per_minute(),
            amount: defaults::default_request_cost(),
        }
    }
}

impl Config {
    /// Load configuration from an optional TOML file and the environment.
    ///
    /// `BUCKETD__SECTION__KEY` variables feed the layered source; the plain
    /// `BIND_ADDR`, `LIMIT_PER_MINUTE`, `REQUEST_COST`, `MAX_KEYS` and
    /// `SWEEP_INTERVAL` variables override both.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration file exists but cannot be
    /// read or parsed, when environment overrides are invalid, or when the
    /// resulting values fail validation.
    pub fn from_env_and_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut raw = raw::load(path.as_ref()).map_err(BucketError::from)?;
        raw.apply_env_overrides(&env::ProcessEnv)
            .map_err(BucketError::from)?;
        raw.validate_and_build()
    }

    /// Replaces the listen address, accepting the same forms as `BIND_ADDR`.
    ///
    /// # Errors
    ///
    /// Returns an error when `addr` has no valid port.
    pub fn override_bind_addr(&mut self, addr: &str) -> Result<()> {
        self.bind_addr = raw::normalize_bind_addr(addr).map_err(BucketError::from)?;
        Ok(())
    }
}
