use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use ::config::builder::DefaultState;
use ::config::{ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;
use serde_with::serde_as;

use crate::Result;
use crate::error::ConfigError;

use super::defaults::{
    ALL_INTERFACES, HTTP_PORT, default_bind_addr, default_limit_per_minute, default_max_keys, default_request_cost,
    default_sweep_interval,
};
use super::env::{EnvSource, env_duration, env_parse, env_string};
use super::{Admission, Config, HumantimeDuration};

pub(super) fn load(path: &Path) -> std::result::Result<RawConfig, ConfigError> {
    let mut builder = ::config::Config::builder();
    if path.exists() {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        builder = builder.add_source(File::from_str(&text, FileFormat::Toml));
    }
    builder = builder.add_source(
        Environment::with_prefix("BUCKETD")
            .separator("__")
            .try_parsing(true),
    );
    deserialize(builder)
}

#[cfg(test)]
pub(super) fn from_toml_str(text: &str) -> std::result::Result<RawConfig, ConfigError> {
    deserialize(::config::Config::builder().add_source(File::from_str(text, FileFormat::Toml)))
}

fn deserialize(
    builder: ConfigBuilder<DefaultState>,
) -> std::result::Result<RawConfig, ConfigError> {
    builder
        .build()
        .map_err(|err| ConfigError::Other(err.to_string()))?
        .try_deserialize()
        .map_err(|err| ConfigError::Parse(err.to_string()))
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct RawConfig {
    #[serde(default)]
    pub(super) server: RawServer,
    #[serde(default)]
    pub(super) limiter: RawLimiter,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawServer {
    #[serde(default = "default_bind_addr")]
    pub(super) bind_addr: String,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub(super) struct RawLimiter {
    #[serde(default = "default_limit_per_minute")]
    pub(super) limit_per_minute: u64,
    #[serde(default = "default_request_cost")]
    pub(super) request_cost: u64,
    #[serde(default = "default_max_keys")]
    pub(super) max_keys: usize,
    #[serde(default = "default_sweep_interval")]
    #[serde_as(as = "HumantimeDuration")]
    pub(super) sweep_interval: Duration,
}

impl RawConfig {
    pub(super) fn apply_env_overrides(
        &mut self,
        env: &impl EnvSource,
    ) -> std::result::Result<(), ConfigError> {
        if let Some(bind_addr) = env_string(env, "BIND_ADDR")? {
            self.server.bind_addr = bind_addr;
        }
        if let Some(limit) = env_parse::<u64>(env, "LIMIT_PER_MINUTE")? {
            self.limiter.limit_per_minute = limit;
        }
        if let Some(cost) = env_parse::<u64>(env, "REQUEST_COST")? {
            self.limiter.request_cost = cost;
        }
        if let Some(max_keys) = env_parse::<usize>(env, "MAX_KEYS")? {
            self.limiter.max_keys = max_keys;
        }
        if let Some(interval) = env_duration(env, "SWEEP_INTERVAL")? {
            self.limiter.sweep_interval = interval;
        }
        Ok(())
    }

    pub(super) fn validate_and_build(self) -> Result<Config> {
        let bind_addr = normalize_bind_addr(&self.server.bind_addr)?;

        if self.limiter.request_cost == 0 {
            return Err(ConfigError::InvalidField {
                field: "limiter.request_cost",
                message: "each request must cost at least one token".to_string(),
            }
            .into());
        }
        let max_keys =
            NonZeroUsize::new(self.limiter.max_keys).ok_or_else(|| ConfigError::InvalidField {
                field: "limiter.max_keys",
                message: "key capacity must be greater than zero".to_string(),
            })?;
        if self.limiter.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidField {
                field: "limiter.sweep_interval",
                message: "sweep interval must be greater than zero".to_string(),
            }
            .into());
        }

        Ok(Config {
            bind_addr,
            admission: Admission {
                limit_per_window: self.limiter.limit_per_minute,
                amount: self.limiter.request_cost,
            },
            max_keys,
            sweep_interval: self.limiter.sweep_interval,
        })
    }
}

/// Checks a `host:port` listen address without resolving it.
///
/// `:port` listens on every interface, and an empty value on every interface
/// at port 80. Host names are kept as written and resolved when binding.
pub(super) fn normalize_bind_addr(raw: &str) -> std::result::Result<String, ConfigError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(format!("{ALL_INTERFACES}:{HTTP_PORT}"));
    }
    let invalid = |message: String| ConfigError::InvalidField {
        field: "server.bind_addr",
        message,
    };

    let Some((host, port)) = raw.rsplit_once(':') else {
        return Err(invalid(format!("missing port in address {raw:?}")));
    };
    port.parse::<u16>()
        .map_err(|err| invalid(format!("invalid port in address {raw:?}: {err}")))?;
    if host.is_empty() {
        return Ok(format!("{ALL_INTERFACES}:{port}"));
    }
    let bracketed = host.starts_with('[') && host.ends_with(']');
    if host.contains(':') && !bracketed {
        return Err(invalid(format!(
            "IPv6 hosts must be written in brackets: {raw:?}"
        )));
    }
    Ok(raw.to_string())
}

impl Default for RawServer {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

impl Default for RawLimiter {
    fn default() -> Self {
        Self {
            limit_per_minute: default_limit_per_minute(),
            request_cost: default_request_cost(),
            max_keys: default_max_keys(),
            sweep_interval: default_sweep_interval(),
        }
    }
}
