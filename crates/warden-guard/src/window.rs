//! Sliding-window trigger evaluation.

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::log_reader::AttemptRecord;

/// Seconds-since-zero under the historical component-sum conversion:
/// years, months (fixed 30 days), days, hours, minutes, and seconds
/// summed. Deliberately approximate; ban triggering depends on this
/// exact arithmetic, including at month boundaries.
#[must_use]
pub fn approx_secs(ts: &NaiveDateTime) -> i64 {
    i64::from(ts.year()) * 31_536_000
        + i64::from(ts.month()) * 2_592_000
        + i64::from(ts.day()) * 86_400
        + i64::from(ts.hour()) * 3_600
        + i64::from(ts.minute()) * 60
        + i64::from(ts.second())
}

/// Verdict for one source address's attempt history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowVerdict {
    /// Fewer records than the threshold; nothing to decide yet.
    Insufficient,
    /// Enough records, but they span more than the window allows.
    NoTrigger {
        /// Seconds between the oldest qualifying attempt and the latest.
        span_secs: i64,
    },
    /// The last `threshold` attempts all fit inside the window.
    Trigger {
        /// Seconds between the oldest qualifying attempt and the latest.
        span_secs: i64,
    },
}

impl WindowVerdict {
    /// Whether this verdict inserts a ban.
    #[must_use]
    pub const fn is_trigger(&self) -> bool {
        matches!(self, Self::Trigger { .. })
    }
}

/// Evaluate the attempt window for one address.
///
/// The oldest qualifying attempt sits at index `len - threshold`; the
/// trigger fires iff the span to the latest attempt is strictly less
/// than `window_secs`.
#[must_use]
pub fn evaluate(records: &[AttemptRecord], threshold: u32, window_secs: u64) -> WindowVerdict {
    let threshold = threshold as usize;
    if threshold == 0 || records.len() < threshold {
        return WindowVerdict::Insufficient;
    }
    let oldest = &records[records.len() - threshold];
    let latest = &records[records.len() - 1];
    let span_secs = approx_secs(&latest.timestamp) - approx_secs(&oldest.timestamp);
    if span_secs < window_secs as i64 {
        WindowVerdict::Trigger { span_secs }
    } else {
        WindowVerdict::NoTrigger { span_secs }
    }
}
