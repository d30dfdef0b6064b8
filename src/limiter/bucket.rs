use chrono::{DateTime, TimeDelta, Utc};

use super::{BURST_TOLERANCE, WINDOW};

/// Token count of one client as of `updated_at`, draining at
/// `limit_per_window` tokens per [`WINDOW`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bucket {
    pub updated_at: DateTime<Utc>,
    pub limit_per_window: u64,
    pub count: f64,
}

impl Default for Bucket {
    fn default() -> Self {
        Self {
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
            limit_per_window: 0,
            count: 0.0,
        }
    }
}

impl Bucket {
    /// Stored count after draining up to `now`, floored at zero.
    ///
    /// `now` must not precede `updated_at`; an earlier instant makes the
    /// bucket grow instead of drain.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn decayed_count(&self, now: DateTime<Utc>) -> f64 {
        let elapsed = nanos_between(self.updated_at, now);
        let leakage = self.limit_per_window as f64 * elapsed / window_nanos();
        (self.count - leakage).max(0.0)
    }

    /// Whole-token view of [`Bucket::decayed_count`], rounded up.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn display_count(&self, now: DateTime<Utc>) -> u64 {
        self.decayed_count(now).ceil() as u64
    }

    /// Drains to `now`, then adds `amount` tokens under `limit_per_window`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn plus(&self, now: DateTime<Utc>, limit_per_window: u64, amount: u64) -> Self {
        Self {
            updated_at: now,
            limit_per_window,
            count: self.decayed_count(now) + amount as f64,
        }
    }

    /// Instant at which the stored count drains down to `target`, never
    /// earlier than `now`. A negative target is already reached.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn will_reach(&self, target: i64, now: DateTime<Utc>) -> DateTime<Utc> {
        if target < 0 {
            return now;
        }
        let need_to_leak = self.count - target as f64;
        if need_to_leak <= 0.0 {
            return now;
        }
        let Some(leak_nanos) = i64::try_from(self.limit_per_window)
            .ok()
            .and_then(|limit| ((need_to_leak * window_nanos()) as i64).checked_div(limit))
        else {
            return now;
        };
        let reset_at = self
            .updated_at
            .checked_add_signed(TimeDelta::nanoseconds(leak_nanos))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        reset_at.max(now)
    }
}

/// Capacity of a bucket draining at `limit_per_window`: one
/// [`BURST_TOLERANCE`] worth of tokens, rounded up. Zero only for the
/// unlimited rate.
#[must_use]
pub fn bucket_size(limit_per_window: u64) -> u64 {
    if limit_per_window == 0 {
        return 0;
    }
    let size =
        (u128::from(limit_per_window) * BURST_TOLERANCE.as_nanos()).div_ceil(WINDOW.as_nanos());
    u64::try_from(size).unwrap_or(u64::MAX).max(1)
}

#[allow(clippy::cast_precision_loss)]
fn window_nanos() -> f64 {
    WINDOW.as_nanos() as f64
}

#[allow(clippy::cast_precision_loss)]
fn nanos_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to.signed_duration_since(from);
    delta.num_nanoseconds().map_or_else(
        || delta.num_milliseconds() as f64 * 1_000_000.0,
        |nanos| nanos as f64,
    )
}

#[cfg(test)]
mod tests {
    use super::{Bucket, bucket_size};
    use chrono::{DateTime, TimeDelta, Utc};

    fn at(secs: i64, millis: i64) -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(secs) + TimeDelta::milliseconds(millis)
    }

    fn bucket(count: f64, limit: u64, updated_at: DateTime<Utc>) -> Bucket {
        Bucket {
            updated_at,
            limit_per_window: limit,
            count,
        }
    }

    #[test]
    fn decay_is_linear_in_elapsed_time() {
        let b = bucket(10.0, 60, at(100, 0));
        assert!((b.decayed_count(at(100, 0)) - 10.0).abs() < f64::EPSILON);
        assert!((b.decayed_count(at(103, 0)) - 7.0).abs() < 1e-9);
        assert!((b.decayed_count(at(104, 500)) - 5.5).abs() < 1e-9);
    }

    #[test]
    fn decay_never_goes_negative() {
        let b = bucket(2.0, 120, at(0, 0));
        assert!(b.decayed_count(at(3_600, 0)).abs() < f64::EPSILON);
        assert_eq!(b.display_count(at(3_600, 0)), 0);
    }

    #[test]
    fn decay_is_monotonic() {
        let b = bucket(5.0, 30, at(10, 0));
        let mut previous = b.decayed_count(at(10, 0));
        for step in 1..40 {
            let current = b.decayed_count(at(10, step * 250));
            assert!(current <= previous, "count grew at step {step}");
            previous = current;
        }
    }

    #[test]
    fn display_count_rounds_partial_tokens_up() {
        let b = bucket(2.0, 120, at(0, 0));
        // 120/min drains one token every 500ms.
        assert_eq!(b.display_count(at(0, 0)), 2);
        assert_eq!(b.display_count(at(0, 1)), 2);
        assert_eq!(b.display_count(at(0, 500)), 1);
        assert_eq!(b.display_count(at(0, 700)), 1);
        assert_eq!(b.display_count(at(1, 0)), 0);
    }

    #[test]
    fn plus_decays_then_adds_and_takes_new_limit() {
        let b = bucket(2.0, 120, at(0, 0));
        let next = b.plus(at(0, 250), 60, 3);
        assert_eq!(next.updated_at, at(0, 250));
        assert_eq!(next.limit_per_window, 60);
        assert!((next.count - 4.5).abs() < 1e-9);
    }

    #[test]
    fn plus_on_default_bucket_starts_from_zero() {
        let next = Bucket::default().plus(at(1_700_000_000, 0), 120, 1);
        assert!((next.count - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn will_reach_returns_now_for_satisfied_targets() {
        let b = bucket(2.0, 120, at(0, 0));
        let now = at(0, 100);
        assert_eq!(b.will_reach(2, now), now);
        assert_eq!(b.will_reach(5, now), now);
        assert_eq!(b.will_reach(-1, now), now);
    }

    #[test]
    fn will_reach_projects_from_updated_at() {
        let b = bucket(2.0, 120, at(0, 0));
        assert_eq!(b.will_reach(1, at(0, 0)), at(0, 500));
        assert_eq!(b.will_reach(0, at(0, 0)), at(1, 0));
        assert_eq!(b.will_reach(1, at(0, 200)), at(0, 500));
    }

    #[test]
    fn will_reach_is_clamped_to_now() {
        let b = bucket(2.0, 120, at(0, 0));
        assert_eq!(b.will_reach(1, at(5, 0)), at(5, 0));
    }

    #[test]
    fn will_reach_with_zero_rate_returns_now() {
        let b = bucket(3.0, 0, at(0, 0));
        assert_eq!(b.will_reach(1, at(2, 0)), at(2, 0));
    }

    #[test]
    fn bucket_size_allows_one_second_of_burst() {
        assert_eq!(bucket_size(120), 2);
        assert_eq!(bucket_size(600), 10);
        assert_eq!(bucket_size(61), 2);
        assert_eq!(bucket_size(60), 1);
    }

    #[test]
    fn bucket_size_has_a_floor_of_one() {
        assert_eq!(bucket_size(30), 1);
        assert_eq!(bucket_size(1), 1);
    }

    #[test]
    fn bucket_size_of_unlimited_rate_is_zero() {
        assert_eq!(bucket_size(0), 0);
    }

    #[test]
    fn bucket_size_saturates_for_huge_rates() {
        assert_eq!(bucket_size(u64::MAX), u64::MAX.div_ceil(60));
    }
}
