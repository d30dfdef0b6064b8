//! Leaky-bucket admission control.
//!
//! A [`Bucket`] holds a fractional token count that drains continuously at the
//! rate it was last written with. [`Counter`] keeps one bucket per client key
//! and decides whether the next unit of work fits. Every operation takes the
//! current instant as a parameter; nothing in this module reads a clock.

use std::time::Duration;

pub(crate) mod bucket;
pub(crate) mod counter;
pub(crate) mod info;
pub mod sweep;

pub use bucket::{Bucket, bucket_size};
pub use counter::Counter;
pub use info::Info;

/// Duration which all limits are expressed in (calls per minute).
pub const WINDOW: Duration = Duration::from_secs(60);

/// Burst headroom on top of the steady rate. Buckets hold one second's worth
/// of tokens, and never less than one token.
pub const BURST_TOLERANCE: Duration = Duration::from_secs(1);

/// Key capacity used by [`Counter::default`].
pub const DEFAULT_MAX_KEYS: usize = 100_000;
