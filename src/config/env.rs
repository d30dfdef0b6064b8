use std::env::VarError;
use std::time::Duration;

use humantime::parse_duration;

use crate::error::ConfigError;

/// Where environment overrides are read from.
pub(super) trait EnvSource {
    fn var(&self, key: &str) -> std::result::Result<String, VarError>;
}

pub(super) struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> std::result::Result<String, VarError> {
        std::env::var(key)
    }
}

#[cfg(test)]
impl EnvSource for std::collections::HashMap<&'static str, &'static str> {
    fn var(&self, key: &str) -> std::result::Result<String, VarError> {
        self.get(key)
            .map(|value| (*value).to_string())
            .ok_or(VarError::NotPresent)
    }
}

pub(super) fn env_string(
    env: &impl EnvSource,
    key: &'static str,
) -> std::result::Result<Option<String>, ConfigError> {
    match env.var(key) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(err) => Err(ConfigError::Other(format!("{key}: {err}"))),
    }
}

pub(super) fn env_parse<T>(
    env: &impl EnvSource,
    key: &'static str,
) -> std::result::Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(value) = env_string(env, key)? {
        if value.trim().is_empty() {
            return Ok(None);
        }
        return value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|err| ConfigError::InvalidField {
                field: key,
                message: err.to_string(),
            });
    }
    Ok(None)
}

pub(super) fn env_duration(
    env: &impl EnvSource,
    key: &'static str,
) -> std::result::Result<Option<Duration>, ConfigError> {
    if let Some(value) = env_string(env, key)? {
        if value.trim().is_empty() {
            return Ok(None);
        }
        return parse_duration(value.trim())
            .map(Some)
            .map_err(|err| ConfigError::InvalidField {
                field: key,
                message: err.to_string(),
            });
    }
    Ok(None)
}
