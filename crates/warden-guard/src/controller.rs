//! Per-invocation orchestration of the ban pipeline.

use chrono::NaiveDateTime;
use tracing::{info, warn};

use crate::ban_store::BanStore;
use crate::config::GuardConfig;
use crate::error::{GuardError, GuardResult};
use crate::log_reader::{read_attempt_log, ReadOutcome};
use crate::window::{evaluate, WindowVerdict};

/// How evaluation of the triggering address concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluationOutcome {
    /// Not enough history for the triggering address.
    Insufficient,
    /// Enough attempts, but spread over more than the window.
    NoTrigger {
        /// The triggering address.
        address: String,
        /// Observed span of the qualifying attempts, in seconds.
        span_secs: i64,
    },
    /// Window trigger; a ban was inserted.
    Banned {
        /// The banned address.
        address: String,
        /// Observed span of the qualifying attempts, in seconds.
        span_secs: i64,
    },
    /// The log could not be parsed; evaluation was skipped.
    Skipped {
        /// Why evaluation was skipped.
        reason: String,
    },
}

/// Report for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Evaluation outcome for the triggering address.
    pub outcome: EvaluationOutcome,
    /// Number of expired managed blocks swept away.
    pub expired: usize,
}

/// Orchestrates log reading, window evaluation, and the ban store for
/// the connection attempt that invoked this process.
#[derive(Debug)]
pub struct BanController {
    config: GuardConfig,
    store: BanStore,
}

impl BanController {
    /// Create a controller from validated configuration.
    #[must_use]
    pub fn new(config: GuardConfig) -> Self {
        let store = BanStore::from_config(&config);
        Self { config, store }
    }

    /// The ban store backing this controller.
    #[must_use]
    pub const fn store(&self) -> &BanStore {
        &self.store
    }

    /// Run the pipeline once.
    ///
    /// The expire scan runs on every terminal path — including a
    /// malformed attempt log — so bans always age out.
    ///
    /// # Errors
    ///
    /// Returns `GuardError::Io` when the attempt log or rule file
    /// cannot be accessed.
    pub fn run(&self, now: NaiveDateTime) -> GuardResult<RunReport> {
        let outcome = match self.evaluate_attempt(now) {
            Ok(outcome) => outcome,
            Err(GuardError::MalformedRecord { line, reason }) => {
                warn!(line, reason, "attempt log malformed; skipping ban evaluation");
                EvaluationOutcome::Skipped {
                    reason: format!("line {line}: {reason}"),
                }
            }
            Err(e) => return Err(e),
        };
        let expired = self.store.expire_scan(now)?;
        Ok(RunReport { outcome, expired })
    }

    fn evaluate_attempt(&self, now: NaiveDateTime) -> GuardResult<EvaluationOutcome> {
        let history = match read_attempt_log(&self.config.attempt_log, &self.config.layout)? {
            ReadOutcome::Insufficient => {
                info!("not enough attempt history to evaluate");
                return Ok(EvaluationOutcome::Insufficient);
            }
            ReadOutcome::History(history) => history,
        };
        let Some(address) = history.last_address().map(str::to_string) else {
            return Ok(EvaluationOutcome::Insufficient);
        };
        let records = history.attempts(&address);
        match evaluate(
            records,
            self.config.attempts_threshold,
            self.config.attempts_window_secs,
        ) {
            WindowVerdict::Insufficient => {
                info!(
                    address,
                    attempts = records.len(),
                    "not enough connection attempts to ban"
                );
                Ok(EvaluationOutcome::Insufficient)
            }
            WindowVerdict::NoTrigger { span_secs } => {
                info!(
                    address,
                    span_secs,
                    window_secs = self.config.attempts_window_secs,
                    "attempts spread outside the ban window"
                );
                Ok(EvaluationOutcome::NoTrigger { address, span_secs })
            }
            WindowVerdict::Trigger { span_secs } => {
                info!(
                    address,
                    span_secs,
                    threshold = self.config.attempts_threshold,
                    "window trigger, inserting ban"
                );
                self.store.insert(&address, now)?;
                Ok(EvaluationOutcome::Banned { address, span_secs })
            }
        }
    }
}
