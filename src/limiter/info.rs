use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of one admission check.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Info {
    /// Key the decision was made for.
    pub bucket: String,
    /// When an allowed call's bucket is back to one token of headroom, or when
    /// a rejected call's amount would fit.
    pub reset_at: DateTime<Utc>,
    pub bucket_size: u64,
    pub remaining: u64,
    pub allowed: bool,
}

impl Info {
    pub(crate) fn unlimited(key: &str, now: DateTime<Utc>) -> Self {
        Self {
            bucket: key.to_string(),
            reset_at: now,
            bucket_size: 0,
            remaining: 0,
            allowed: true,
        }
    }
}
