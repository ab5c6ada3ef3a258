//! Partition arithmetic for export jobs.
//!
//! An export's time range is cut into fixed-length partitions whose
//! boundaries are measured from midnight in the timezone of the requested
//! timestamps. Partitioning is a pure function of `(from, to, part_length)`,
//! so a resumed export regenerates exactly the partitions it started with.
//!
//! ```text
//!   from                                                           to
//!    |<---- part 2 ---->|<---- part 1 ---->|<---- part 0 ---->|
//!                                          |<-w->|<-w->|<-w->|   windows of part 0
//! ```
//!
//! Partitions are indexed walking backward from `to`, and each partition is
//! fetched in windows walking backward from its own upper bound.

use std::time::Duration;

use chrono::{DateTime, NaiveTime, TimeDelta, TimeZone, Utc};

use crate::error::{Error, Result};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);
const MINUTE: Duration = Duration::from_secs(60);

/// A validated partition length.
///
/// The length is a whole number of minutes and divides 24 hours evenly, so
/// every day starts on a partition boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartLength(Duration);

impl PartLength {
    pub fn new(length: Duration) -> Result<Self> {
        if length.is_zero() {
            return Err(Error::Config("partition length must be positive".to_string()));
        }
        if length.as_nanos() % MINUTE.as_nanos() != 0 {
            return Err(Error::Config(format!(
                "partition length {:?} is not a whole number of minutes",
                length
            )));
        }
        if DAY.as_nanos() % length.as_nanos() != 0 {
            return Err(Error::Config(format!(
                "partition length {:?} does not evenly divide 24h",
                length
            )));
        }
        Ok(Self(length))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    /// Rounds `t` down to the nearest partition boundary.
    pub fn floor<Tz: TimeZone>(&self, t: &DateTime<Tz>) -> DateTime<Tz> {
        let rem = self.offset_into_part(t);
        t.clone() - TimeDelta::nanoseconds(rem)
    }

    /// Rounds `t` up to the nearest partition boundary. Aligned timestamps
    /// are returned unchanged.
    pub fn ceil<Tz: TimeZone>(&self, t: &DateTime<Tz>) -> DateTime<Tz> {
        let rem = self.offset_into_part(t);
        if rem == 0 {
            t.clone()
        } else {
            t.clone() + TimeDelta::nanoseconds(self.step_nanos() - rem)
        }
    }

    /// Widens `[from, to)` to `[floor(from), ceil(to))`.
    pub fn normalize<Tz: TimeZone>(
        &self,
        from: &DateTime<Tz>,
        to: &DateTime<Tz>,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            self.floor(from).with_timezone(&Utc),
            self.ceil(to).with_timezone(&Utc),
        )
    }

    fn step_nanos(&self) -> i64 {
        // bounded by 24h, always fits
        self.0.as_nanos() as i64
    }

    /// Nanoseconds elapsed since the last boundary at or before `t`.
    fn offset_into_part<Tz: TimeZone>(&self, t: &DateTime<Tz>) -> i64 {
        let local = t.naive_local();
        let midnight = local.date().and_time(NaiveTime::MIN);
        let since_midnight = (local - midnight).num_nanoseconds().unwrap_or(0);
        since_midnight.rem_euclid(self.step_nanos())
    }
}

/// One partition of an export's time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    /// Position in the session's `part_is_uploaded` vector.
    pub index: usize,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Converts a std duration into a chrono delta, saturating on overflow.
pub(crate) fn to_delta(duration: Duration) -> TimeDelta {
    TimeDelta::nanoseconds(i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX))
}

/// Number of partitions covering `[from, to)`: `ceil((to - from) / part_length)`.
pub fn partition_count(from: DateTime<Utc>, to: DateTime<Utc>, part_length: Duration) -> usize {
    let span = (to - from).num_milliseconds();
    let step = part_length.as_millis() as i64;
    if span <= 0 || step <= 0 {
        return 0;
    }
    ((span + step - 1) / step) as usize
}

/// Generates the partitions of `[from, to)` newest first.
///
/// Partition `i` covers `[to - (i+1)*part_length, to - i*part_length)`,
/// clipped at `from`.
pub fn partitions(from: DateTime<Utc>, to: DateTime<Utc>, part_length: Duration) -> Vec<Partition> {
    let step = to_delta(part_length);
    let count = partition_count(from, to, part_length);
    let mut result = Vec::with_capacity(count);
    let mut upper = to;
    for index in 0..count {
        let lower = (upper - step).max(from);
        result.push(Partition {
            index,
            from: lower,
            to: upper,
        });
        upper = lower;
    }
    result
}

/// Splits `[from, to)` into sub-windows of at most `window`, newest first.
pub fn windows(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    window: Duration,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let step = to_delta(window);
    let mut result = Vec::new();
    if step <= TimeDelta::zero() {
        return result;
    }
    let mut upper = to;
    while upper > from {
        let lower = (upper - step).max(from);
        result.push((lower, upper));
        upper = lower;
    }
    result
}
