//! Subcommand execution.
//!
//! Each entry point reports its own failures and returns; a fault in
//! one subsystem must never keep the other from running, and nothing
//! here may propagate a panic back into the spawn hook chain.

use chrono::{NaiveDateTime, NaiveTime};
use tracing::error;

use warden_guard::{BanController, BanStore, EvaluationOutcome};
use warden_rotate::{PortRotator, RotationOutcome};

use crate::config::AppConfig;

/// Full per-attempt pass: ban pipeline first and unconditionally, port
/// rotation after, independent of the ban outcome.
pub fn run(config: &AppConfig, now: NaiveDateTime) {
    guard(config, now);
    rotate(config, now.time());
}

/// Run the ban pipeline once.
pub fn guard(config: &AppConfig, now: NaiveDateTime) {
    let controller = BanController::new(config.guard.clone());
    match controller.run(now) {
        Ok(report) => {
            match &report.outcome {
                EvaluationOutcome::Banned { address, span_secs } => {
                    println!(
                        "{address} banned: {} attempts within {span_secs}s",
                        config.guard.attempts_threshold
                    );
                }
                EvaluationOutcome::NoTrigger { address, span_secs } => {
                    println!(
                        "{address}: attempts spread over {span_secs}s, window is {}s, no ban",
                        config.guard.attempts_window_secs
                    );
                }
                EvaluationOutcome::Insufficient => {
                    println!("not enough connection attempts to ban");
                }
                EvaluationOutcome::Skipped { reason } => {
                    println!("ban evaluation skipped: {reason}");
                }
            }
            if report.expired > 0 {
                println!("{} expired ban rule(s) removed", report.expired);
            }
        }
        Err(e) => error!(error = %e, "ban pipeline failed"),
    }
}

/// Sweep expired ban rules only.
pub fn sweep(config: &AppConfig, now: NaiveDateTime) {
    let store = BanStore::from_config(&config.guard);
    match store.expire_scan(now) {
        Ok(0) => println!("no expired ban rules"),
        Ok(removed) => println!("{removed} expired ban rule(s) removed"),
        Err(e) => error!(error = %e, "expire scan failed"),
    }
}

/// List active ban rules with their remaining lifetime.
pub fn status(config: &AppConfig, now: NaiveDateTime) {
    let store = BanStore::from_config(&config.guard);
    match store.active_bans(now) {
        Ok(bans) if bans.is_empty() => println!("no active bans"),
        Ok(bans) => {
            for ban in bans {
                let elapsed = now.signed_duration_since(ban.created_at).num_seconds();
                let remaining = store.ban_duration_secs() as i64 - elapsed;
                println!(
                    "{} banned at {} ({remaining}s remaining)",
                    ban.address,
                    ban.created_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        Err(e) => error!(error = %e, "could not read rule file"),
    }
}

/// Run the port-rotation pass only.
pub fn rotate(config: &AppConfig, now: NaiveTime) {
    let rotator = PortRotator::new(config.rotation.clone());
    match rotator.rotate(now) {
        Ok(RotationOutcome::Disabled) => {}
        Ok(RotationOutcome::AlreadyCorrect { port }) => {
            println!("no change needed, port is already {port}");
        }
        Ok(RotationOutcome::Rotated { from, to }) => {
            println!("listening port rotated from {from} to {to}");
        }
        Err(e) => error!(error = %e, "port rotation failed"),
    }
}
