//! Attempt-log reading and normalization.
//!
//! The attempt log is an append-only text file written by the spawn
//! hook, one line per connection attempt. This module parses the whole
//! log into per-source history on every invocation; the log file itself
//! is the only durable state.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, warn};

use crate::config::LogLayout;
use crate::error::{GuardError, GuardResult};
use crate::fsutil::replace_file;

/// One parsed line of the attempt log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    /// Source address of the connection attempt.
    pub address: String,
    /// Timestamp assembled from the configured month/day/time/year fields.
    pub timestamp: NaiveDateTime,
}

/// Per-source attempt history, in log order.
#[derive(Debug, Default)]
pub struct AttemptHistory {
    per_source: HashMap<String, Vec<AttemptRecord>>,
    last_address: Option<String>,
}

impl AttemptHistory {
    /// Attempts recorded for `address`, oldest first.
    #[must_use]
    pub fn attempts(&self, address: &str) -> &[AttemptRecord] {
        self.per_source.get(address).map_or(&[], Vec::as_slice)
    }

    /// Address on the last log line — the attempt that invoked us.
    #[must_use]
    pub fn last_address(&self) -> Option<&str> {
        self.last_address.as_deref()
    }

    /// Number of distinct source addresses seen.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.per_source.len()
    }

    fn push(&mut self, record: AttemptRecord) {
        self.last_address = Some(record.address.clone());
        self.per_source
            .entry(record.address.clone())
            .or_default()
            .push(record);
    }
}

/// Outcome of reading the attempt log.
#[derive(Debug)]
pub enum ReadOutcome {
    /// The full, normalized history.
    History(AttemptHistory),
    /// A blank line was found (or the log is empty); the triggering
    /// address cannot be trusted, so no partial history is produced.
    Insufficient,
}

/// Read and parse the attempt log.
///
/// If the final line carries a 12-hour AM/PM time, the log file is
/// rewritten once with that line in canonical 24-hour form before the
/// history is built (self-healing, bounded to a single repair).
/// Earlier suffixed lines are normalized in memory only.
///
/// # Errors
///
/// Returns `GuardError::Io` when the log cannot be read or repaired and
/// `GuardError::MalformedRecord` when a line does not match the layout.
pub fn read_attempt_log(path: &Path, layout: &LogLayout) -> GuardResult<ReadOutcome> {
    let text = fs::read_to_string(path)?;
    if let Some(repaired) = repair_last_line(&text, layout) {
        debug!(path = %path.display(), "normalized 12-hour time on final log line");
        replace_file(path, &repaired)?;
        return build_history(&repaired, layout);
    }
    build_history(&text, layout)
}

/// Rewrite the final log line in 24-hour form, if it needs it.
///
/// Returns `None` when the line is already canonical, which makes the
/// repair idempotent: a corrected line never triggers another rewrite.
fn repair_last_line(text: &str, layout: &LogLayout) -> Option<String> {
    let end = text.trim_end_matches(['\n', '\r']).len();
    let start = text[..end].rfind('\n').map_or(0, |i| i + 1);
    let fixed = normalize_line(&text[start..end], layout)?;
    let mut repaired = String::with_capacity(text.len());
    repaired.push_str(&text[..start]);
    repaired.push_str(&fixed);
    repaired.push_str(&text[end..]);
    Some(repaired)
}

fn build_history(text: &str, layout: &LogLayout) -> GuardResult<ReadOutcome> {
    let mut history = AttemptHistory::default();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            warn!(line = idx + 1, "blank line in attempt log; history cannot be trusted");
            return Ok(ReadOutcome::Insufficient);
        }
        history.push(parse_line(line, idx + 1, layout)?);
    }
    if history.last_address.is_none() {
        return Ok(ReadOutcome::Insufficient);
    }
    Ok(ReadOutcome::History(history))
}

fn parse_line(line: &str, line_no: usize, layout: &LogLayout) -> GuardResult<AttemptRecord> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let field = |index: usize, what: &str| {
        fields.get(index).copied().ok_or_else(|| GuardError::MalformedRecord {
            line: line_no,
            reason: format!("missing {what} field (index {index})"),
        })
    };
    let malformed = |reason: String| GuardError::MalformedRecord { line: line_no, reason };

    let address = field(layout.address, "address")?;
    let month_abbr = field(layout.month, "month")?;
    let month = month_number(month_abbr)
        .ok_or_else(|| malformed(format!("unrecognized month abbreviation '{month_abbr}'")))?;
    // Solaris writes the day with a trailing comma.
    let day_txt = field(layout.day, "day")?.trim_matches(',');
    let day: u32 = day_txt
        .parse()
        .map_err(|_| malformed(format!("invalid day of month '{day_txt}'")))?;
    let year_txt = field(layout.year, "year")?.trim_matches(',');
    let year: i32 = year_txt
        .parse()
        .map_err(|_| malformed(format!("invalid year '{year_txt}'")))?;
    let time_raw = field(layout.time, "time")?;
    let time_txt = normalize_time(time_raw).unwrap_or_else(|| time_raw.to_string());
    let time = NaiveTime::parse_from_str(&time_txt, "%H:%M:%S")
        .map_err(|_| malformed(format!("invalid time of day '{time_raw}'")))?;
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| malformed(format!("invalid calendar date {year}-{month}-{day}")))?;

    Ok(AttemptRecord {
        address: address.to_string(),
        timestamp: NaiveDateTime::new(date, time),
    })
}

/// Map a three-letter month abbreviation to its number.
fn month_number(abbr: &str) -> Option<u32> {
    match abbr.to_ascii_lowercase().as_str() {
        "jan" => Some(1),
        "feb" => Some(2),
        "mar" => Some(3),
        "apr" => Some(4),
        "may" => Some(5),
        "jun" => Some(6),
        "jul" => Some(7),
        "aug" => Some(8),
        "sep" => Some(9),
        "oct" => Some(10),
        "nov" => Some(11),
        "dec" => Some(12),
        _ => None,
    }
}

/// Convert a 12-hour `HH:MM:SS` time field with an AM/PM suffix to
/// 24-hour form, stripping the suffix.
///
/// Returns `None` when the field is already canonical. 12:xx AM maps
/// to 00:xx; 12:xx PM keeps its numeric value.
fn normalize_time(field: &str) -> Option<String> {
    let (rest, pm) = if let Some(r) = strip_suffix_ci(field, "PM") {
        (r, true)
    } else if let Some(r) = strip_suffix_ci(field, "AM") {
        (r, false)
    } else {
        return None;
    };
    let rest = rest.trim_end();
    let mut parts = rest.splitn(2, ':');
    let hour: u32 = parts.next()?.parse().ok()?;
    let tail = parts.next()?;
    let hour24 = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };
    Some(format!("{hour24:02}:{tail}"))
}

fn strip_suffix_ci<'a>(field: &'a str, suffix: &str) -> Option<&'a str> {
    let stripped = field.strip_suffix(suffix);
    stripped.or_else(|| field.strip_suffix(suffix.to_ascii_lowercase().as_str()))
}

/// Byte span of the `index`-th whitespace-delimited field, so a single
/// field can be spliced without collapsing the line's spacing.
fn field_span(line: &str, index: usize) -> Option<(usize, usize)> {
    let mut field = 0usize;
    let mut start: Option<usize> = None;
    for (i, ch) in line.char_indices() {
        if ch.is_whitespace() {
            if let Some(s) = start.take() {
                if field == index {
                    return Some((s, i));
                }
                field += 1;
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        if field == index {
            return Some((s, line.len()));
        }
    }
    None
}

fn normalize_line(line: &str, layout: &LogLayout) -> Option<String> {
    let (start, end) = field_span(line, layout.time)?;
    let fixed = normalize_time(&line[start..end])?;
    let mut out = String::with_capacity(line.len());
    out.push_str(&line[..start]);
    out.push_str(&fixed);
    out.push_str(&line[end..]);
    Some(out)
}
