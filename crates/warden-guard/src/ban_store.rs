//! Rule-file ban storage.
//!
//! Bans live only in the access-control rule file, as managed two-line
//! blocks: a marker comment carrying the address and creation
//! timestamp, then the deny rule. No ban state survives in memory
//! between invocations.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::GuardConfig;
use crate::error::GuardResult;
use crate::fsutil::replace_file;

/// Timestamp format embedded in marker lines.
const MARKER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Matches a managed-block marker line.
static MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^###\s+(\S+)\s+banned\s+@\s+(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}(?:\.\d+)?)\s+###\s*$",
    )
    .expect("marker pattern is valid")
});

/// One active ban parsed back out of the rule file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanRule {
    /// Banned source address.
    pub address: String,
    /// When the ban was inserted.
    pub created_at: NaiveDateTime,
}

/// Reads, mutates, and rewrites the access-control rule file.
#[derive(Debug)]
pub struct BanStore {
    rule_file: PathBuf,
    daemon: String,
    hook_command: String,
    ban_duration_secs: u64,
}

impl BanStore {
    /// Create a store from the pipeline configuration.
    #[must_use]
    pub fn from_config(config: &GuardConfig) -> Self {
        Self {
            rule_file: config.rule_file.clone(),
            daemon: config.daemon.clone(),
            hook_command: config.hook_command.clone(),
            ban_duration_secs: config.ban_duration_secs,
        }
    }

    /// Path of the rule file this store manages.
    #[must_use]
    pub fn rule_file(&self) -> &Path {
        &self.rule_file
    }

    /// Configured ban lifetime in seconds.
    #[must_use]
    pub const fn ban_duration_secs(&self) -> u64 {
        self.ban_duration_secs
    }

    /// Prepend a managed block banning `address`.
    ///
    /// The deny rule re-invokes the spawn hook, so attempts from a
    /// banned address are still logged and re-evaluated rather than
    /// dropped silently. The write is read-all, prepend, write-all.
    ///
    /// # Errors
    ///
    /// Returns `GuardError::Io` when the rule file cannot be read or
    /// written; nothing is committed in that case.
    pub fn insert(&self, address: &str, now: NaiveDateTime) -> GuardResult<()> {
        let existing = fs::read_to_string(&self.rule_file)?;
        let block = self.managed_block(address, now);
        let mut contents = String::with_capacity(block.len() + existing.len());
        contents.push_str(&block);
        contents.push_str(&existing);
        fs::write(&self.rule_file, contents)?;
        info!(address, path = %self.rule_file.display(), "ban rule inserted");
        Ok(())
    }

    fn managed_block(&self, address: &str, now: NaiveDateTime) -> String {
        format!(
            "### {address} banned @ {stamp} ###\n{daemon} : {address} : spawn {hook} : DENY\n",
            stamp = now.format(MARKER_TIME_FORMAT),
            daemon = self.daemon,
            hook = self.hook_command,
        )
    }

    /// Drop managed blocks whose ban has expired; returns how many
    /// blocks were removed.
    ///
    /// A block is removed iff `now - created_at` strictly exceeds the
    /// ban duration; a block exactly at the boundary stays. Removal is
    /// a fixed two-line skip (marker plus enforcement line). All other
    /// lines pass through byte-for-byte in their original order. The
    /// result lands in a sibling temp file that is atomically renamed
    /// over the rule file, so a mid-rewrite crash never leaves a
    /// half-written file live.
    ///
    /// # Errors
    ///
    /// Returns `GuardError::Io` on read or write failure; the rule file
    /// keeps its prior contents.
    pub fn expire_scan(&self, now: NaiveDateTime) -> GuardResult<usize> {
        let text = fs::read_to_string(&self.rule_file)?;
        let mut kept = String::with_capacity(text.len());
        let mut removed = 0usize;
        let mut skip = 0usize;
        for segment in text.split_inclusive('\n') {
            if skip > 0 {
                skip -= 1;
                continue;
            }
            let line = segment.trim_end_matches(['\n', '\r']);
            if let Some(caps) = MARKER_RE.captures(line) {
                match parse_marker_time(&caps[2]) {
                    Ok(created_at) => {
                        let elapsed = now.signed_duration_since(created_at).num_seconds();
                        if elapsed > self.ban_duration_secs as i64 {
                            debug!(address = &caps[1], elapsed, "ban expired, dropping block");
                            removed += 1;
                            skip = 1; // enforcement line
                            continue;
                        }
                        debug!(address = &caps[1], elapsed, "ban has not expired");
                    }
                    Err(reason) => {
                        // Dropping a block we cannot date would unban it.
                        warn!(line, reason, "marker timestamp unparsable; keeping block");
                    }
                }
            }
            kept.push_str(segment);
        }
        if removed > 0 {
            replace_file(&self.rule_file, &kept)?;
            info!(removed, path = %self.rule_file.display(), "expired ban rules removed");
        }
        Ok(removed)
    }

    /// Parse the managed blocks still in force at `now`.
    ///
    /// # Errors
    ///
    /// Returns `GuardError::Io` when the rule file cannot be read.
    pub fn active_bans(&self, now: NaiveDateTime) -> GuardResult<Vec<BanRule>> {
        let text = fs::read_to_string(&self.rule_file)?;
        let mut bans = Vec::new();
        for line in text.lines() {
            let Some(caps) = MARKER_RE.captures(line) else {
                continue;
            };
            let Ok(created_at) = parse_marker_time(&caps[2]) else {
                continue;
            };
            let elapsed = now.signed_duration_since(created_at).num_seconds();
            if elapsed <= self.ban_duration_secs as i64 {
                bans.push(BanRule {
                    address: caps[1].to_string(),
                    created_at,
                });
            }
        }
        Ok(bans)
    }
}

fn parse_marker_time(text: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f").map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn store(dir: &tempfile::TempDir) -> BanStore {
        let config = GuardConfig {
            rule_file: dir.path().join("hosts.allow"),
            ban_duration_secs: 600,
            ..GuardConfig::default()
        };
        BanStore::from_config(&config)
    }

    fn seed(store: &BanStore, contents: &str) {
        fs::write(store.rule_file(), contents).unwrap();
    }

    // ==================== Insert Tests ====================

    #[test]
    fn test_insert_prepends_two_line_block() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        seed(&store, "sshd : ALL : spawn hook\n");

        store.insert("5.6.7.8", now()).unwrap();

        let text = fs::read_to_string(store.rule_file()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "### 5.6.7.8 banned @ 2025-06-10 12:00:00.000000 ###");
        assert!(lines[1].starts_with("sshd : 5.6.7.8 : spawn "));
        assert!(lines[1].ends_with(" : DENY"));
        // Pre-existing content is untouched below the new block.
        assert_eq!(lines[2], "sshd : ALL : spawn hook");
    }

    #[test]
    fn test_insert_embeds_reentry_hook() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        seed(&store, "");

        store.insert("5.6.7.8", now()).unwrap();

        let text = fs::read_to_string(store.rule_file()).unwrap();
        assert!(text.contains("gatewarden"));
    }

    #[test]
    fn test_insert_missing_rule_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        assert!(store.insert("5.6.7.8", now()).is_err());
    }

    #[test]
    fn test_inserted_marker_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        seed(&store, "");

        store.insert("5.6.7.8", now()).unwrap();

        let bans = store.active_bans(now()).unwrap();
        assert_eq!(
            bans,
            vec![BanRule {
                address: "5.6.7.8".into(),
                created_at: now(),
            }]
        );
    }

    // ==================== Expire-Scan Tests ====================

    fn marker(address: &str, created_at: NaiveDateTime) -> String {
        format!(
            "### {address} banned @ {} ###\nsshd : {address} : spawn hook : DENY\n",
            created_at.format(MARKER_TIME_FORMAT)
        )
    }

    #[test]
    fn test_expire_removes_old_block() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let old = now() - chrono::Duration::seconds(700);
        seed(&store, &format!("{}trailing line\n", marker("5.6.7.8", old)));

        let removed = store.expire_scan(now()).unwrap();

        assert_eq!(removed, 1);
        let text = fs::read_to_string(store.rule_file()).unwrap();
        assert_eq!(text, "trailing line\n");
    }

    #[test]
    fn test_expire_retains_block_at_exact_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let edge = now() - chrono::Duration::seconds(600);
        let contents = marker("5.6.7.8", edge);
        seed(&store, &contents);

        let removed = store.expire_scan(now()).unwrap();

        assert_eq!(removed, 0);
        assert_eq!(fs::read_to_string(store.rule_file()).unwrap(), contents);
    }

    #[test]
    fn test_expire_keeps_fresh_blocks_and_passthrough_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let fresh = now() - chrono::Duration::seconds(30);
        let stale = now() - chrono::Duration::seconds(5000);
        let contents = format!(
            "# local policy\n{}{}sshd : ALL : ALLOW\n",
            marker("1.1.1.1", stale),
            marker("2.2.2.2", fresh),
        );
        seed(&store, &contents);

        let removed = store.expire_scan(now()).unwrap();

        assert_eq!(removed, 1);
        let text = fs::read_to_string(store.rule_file()).unwrap();
        assert_eq!(
            text,
            format!("# local policy\n{}sshd : ALL : ALLOW\n", marker("2.2.2.2", fresh))
        );
    }

    #[test]
    fn test_expire_scan_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let stale = now() - chrono::Duration::seconds(700);
        seed(
            &store,
            &format!("keep me\n{}also keep\n", marker("1.1.1.1", stale)),
        );

        assert_eq!(store.expire_scan(now()).unwrap(), 1);
        let first = fs::read_to_string(store.rule_file()).unwrap();
        assert_eq!(store.expire_scan(now()).unwrap(), 0);
        let second = fs::read_to_string(store.rule_file()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_expire_keeps_block_with_bad_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let contents = "### 1.1.1.1 banned @ 2025-13-99 99:99:99 ###\nsshd : 1.1.1.1 : spawn hook : DENY\n";
        seed(&store, contents);

        assert_eq!(store.expire_scan(now()).unwrap(), 0);
        assert_eq!(fs::read_to_string(store.rule_file()).unwrap(), contents);
    }

    #[test]
    fn test_non_marker_comment_lines_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let contents = "### plain comment, not a marker ###\nsshd : ALL : ALLOW\n";
        seed(&store, contents);

        assert_eq!(store.expire_scan(now()).unwrap(), 0);
        assert_eq!(fs::read_to_string(store.rule_file()).unwrap(), contents);
    }

    // ==================== Active-Ban Listing Tests ====================

    #[test]
    fn test_active_bans_skips_expired() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let fresh = now() - chrono::Duration::seconds(30);
        let stale = now() - chrono::Duration::seconds(5000);
        seed(
            &store,
            &format!("{}{}", marker("1.1.1.1", stale), marker("2.2.2.2", fresh)),
        );

        let bans = store.active_bans(now()).unwrap();
        assert_eq!(bans.len(), 1);
        assert_eq!(bans[0].address, "2.2.2.2");
    }
}
