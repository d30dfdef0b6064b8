use std::time::Duration;

use crate::limiter::DEFAULT_MAX_KEYS;

/// Host used when a bind address names only a port.
pub(super) const ALL_INTERFACES: &str = "0.0.0.0";

/// Port used when the bind address is empty, as for a plain HTTP listener.
pub(super) const HTTP_PORT: u16 = 80;

pub(super) fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

pub(super) const fn default_limit_per_minute() -> u64 {
    120
}

pub(super) const fn default_request_cost() -> u64 {
    1
}

pub(super) const fn default_max_keys() -> usize {
    DEFAULT_MAX_KEYS
}

pub(super) const fn default_sweep_interval() -> Duration {
    Duration::from_secs(30)
}
