//! Step outcomes and their aggregation into one exit status.
//!
//! Every component reports an [`OperationResult`]; the dispatcher folds the
//! results of a verb's steps into an [`AggregateStatus`] whose exit code is
//! what the controller process returns to the init system.

use std::fmt;

/// Exit code for a successful verb.
pub const SUCCESS_EXIT_CODE: u8 = 0;
/// Generic failure code; replaced by any more specific failure.
pub const GENERIC_FAILURE_EXIT_CODE: u8 = 1;
/// Exit code for an invalid invocation (unknown verb, bad flags).
pub const USAGE_EXIT_CODE: u8 = 2;
/// Exit code for "not running" status results and skipped steps.
pub const NOT_RUNNING_EXIT_CODE: u8 = 3;

/// Why a step failed, with the exit code the init system expects for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// The daemon binary is missing or not executable.
    NotInstalled,
    /// Configuration cannot be applied (unknown user or group, bad descriptor).
    NotConfigured,
    /// The controller lacks the privilege to spawn or signal the daemon.
    Permission,
    /// A bounded wait expired without a definite outcome.
    Timeout,
    /// The daemon exited during a watched window with this code.
    ///
    /// Codes outside 1 and 4..=255 are reported as a generic failure.
    DaemonExit(i32),
    /// The daemon was still present when a step required it to be gone.
    StillRunning,
    /// The pid file names a process that no longer exists.
    StaleTracking,
    /// The daemon's state could not be determined by `status`.
    Unknown,
    /// Any other operating-system failure.
    Generic,
}

impl Failure {
    /// Exit code reported for this failure.
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::NotInstalled => 5,
            Self::NotConfigured => 6,
            Self::Permission | Self::Unknown => 4,
            // 2 and 3 would read as a usage error or "not running".
            Self::DaemonExit(code @ (1 | 4..=255)) => code as u8,
            Self::Timeout
            | Self::DaemonExit(_)
            | Self::StillRunning
            | Self::StaleTracking
            | Self::Generic => GENERIC_FAILURE_EXIT_CODE,
        }
    }

    const fn is_generic(self) -> bool {
        self.exit_code() == GENERIC_FAILURE_EXIT_CODE
    }
}

/// Tri-state result of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The step achieved its goal (including idempotent no-ops).
    Success,
    /// The step found nothing to act on; the service is not running.
    Skipped,
    /// The step failed.
    Failed(Failure),
}

impl Outcome {
    const fn severity(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Skipped => 1,
            Self::Failed(_) => 2,
        }
    }

    /// Exit code for this outcome in isolation.
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Success => SUCCESS_EXIT_CODE,
            Self::Skipped => NOT_RUNNING_EXIT_CODE,
            Self::Failed(failure) => failure.exit_code(),
        }
    }
}

/// Outcome of one component-level action plus an optional detail line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
    outcome: Outcome,
    message: Option<String>,
}

impl OperationResult {
    pub fn success() -> Self {
        Self {
            outcome: Outcome::Success,
            message: None,
        }
    }

    pub fn skipped() -> Self {
        Self {
            outcome: Outcome::Skipped,
            message: None,
        }
    }

    pub fn failed(failure: Failure) -> Self {
        Self {
            outcome: Outcome::Failed(failure),
            message: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub const fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub const fn is_failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failed(_))
    }
}

impl fmt::Display for OperationResult {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.outcome, self.message()) {
            (_, Some(message)) => formatter.write_str(message),
            (Outcome::Success, None) => formatter.write_str("ok"),
            (Outcome::Skipped, None) => formatter.write_str("skipped"),
            (Outcome::Failed(failure), None) => write!(formatter, "failed ({failure:?})"),
        }
    }
}

/// Accumulated result across the steps of one verb.
///
/// Failure is sticky: once a step fails, later successes cannot clear it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateStatus {
    outcome: Outcome,
    steps: usize,
}

impl Default for AggregateStatus {
    fn default() -> Self {
        Self {
            outcome: Outcome::Success,
            steps: 0,
        }
    }
}

impl AggregateStatus {
    /// Folds one step result into the aggregate.
    ///
    /// Higher severity wins (Success < Skipped < Failed). Between two
    /// failures a specific code replaces the generic one; otherwise the
    /// earlier failure is kept.
    pub fn absorb(&mut self, result: &OperationResult) {
        self.steps += 1;
        let incoming = result.outcome();
        let replace = match (self.outcome, incoming) {
            (Outcome::Failed(current), Outcome::Failed(next)) => {
                current.is_generic() && !next.is_generic()
            }
            (current, next) => next.severity() > current.severity(),
        };
        if replace {
            self.outcome = incoming;
        }
    }

    pub const fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub const fn steps(&self) -> usize {
        self.steps
    }

    /// Exit code the controller process returns.
    pub const fn exit_code(&self) -> u8 {
        self.outcome.exit_code()
    }
}

impl FromIterator<OperationResult> for AggregateStatus {
    fn from_iter<I: IntoIterator<Item = OperationResult>>(iter: I) -> Self {
        let mut aggregate = Self::default();
        for result in iter {
            aggregate.absorb(&result);
        }
        aggregate
    }
}
