//! Time-of-day rotation schedule.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::{RotateError, RotateResult};

/// One rotation window. Bounds are inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationWindow {
    /// First instant of the window.
    pub start: NaiveTime,
    /// Last instant of the window.
    pub end: NaiveTime,
    /// Listening port while the window is active.
    pub port: String,
}

impl RotationWindow {
    /// Whether `t` falls inside this window.
    #[must_use]
    pub fn contains(&self, t: NaiveTime) -> bool {
        self.start <= t && t <= self.end
    }
}

/// Four fixed windows that together must cover the whole day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationSchedule {
    /// Rotation windows, ordered by time of day.
    pub windows: [RotationWindow; 4],
}

fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, s).unwrap_or(NaiveTime::MIN)
}

impl Default for RotationSchedule {
    fn default() -> Self {
        let window = |start: NaiveTime, end: NaiveTime, port: &str| RotationWindow {
            start,
            end,
            port: port.to_string(),
        };
        Self {
            windows: [
                window(hms(0, 0, 0), hms(5, 59, 59), "922"),
                window(hms(6, 0, 0), hms(11, 59, 59), "922"),
                window(hms(12, 0, 0), hms(17, 59, 59), "923"),
                window(hms(18, 0, 0), hms(23, 59, 59), "923"),
            ],
        }
    }
}

impl RotationSchedule {
    /// Check that the windows cover every instant of the day exactly
    /// once and carry numeric ports.
    ///
    /// # Errors
    ///
    /// Returns `RotateError::Config` describing the first violation.
    pub fn validate(&self) -> RotateResult<()> {
        if self.windows[0].start != NaiveTime::MIN {
            return Err(RotateError::Config(
                "first rotation window must start at 00:00:00".into(),
            ));
        }
        if self.windows[3].end != hms(23, 59, 59) {
            return Err(RotateError::Config(
                "last rotation window must end at 23:59:59".into(),
            ));
        }
        for w in &self.windows {
            if w.start > w.end {
                return Err(RotateError::Config(format!(
                    "rotation window {}..{} is inverted",
                    w.start, w.end
                )));
            }
            if w.port.is_empty() || !w.port.bytes().all(|b| b.is_ascii_digit()) {
                return Err(RotateError::Config(format!(
                    "rotation port '{}' is not numeric",
                    w.port
                )));
            }
        }
        for pair in self.windows.windows(2) {
            let expected = pair[0].end + chrono::Duration::seconds(1);
            if pair[1].start != expected {
                return Err(RotateError::Config(format!(
                    "rotation windows must abut: expected a window starting at {expected}, found {}",
                    pair[1].start
                )));
            }
        }
        Ok(())
    }

    /// Port for the given time of day.
    ///
    /// Total once [`validate`](Self::validate) has passed; `None` only
    /// for schedules that would have failed validation.
    #[must_use]
    pub fn port_for(&self, t: NaiveTime) -> Option<&str> {
        self.windows
            .iter()
            .find(|w| w.contains(t))
            .map(|w| w.port.as_str())
    }
}
