//! Verb dispatch for the service controller.
//!
//! Each verb runs a fixed sequence of steps against the process backend,
//! prints one progress line per step, and folds the step results into an
//! [`AggregateStatus`]. Steps never share runtime handles: every step that
//! depends on whether the daemon runs asks the locator again.

use std::io::Write;

use cobalt_config::ServiceDescriptor;
use tracing::info;

use super::LIFECYCLE_TARGET;
use super::error::LifecycleError;
use super::locator::ProcessLocator;
use super::outcome::{AggregateStatus, Failure, OperationResult};
use super::shutdown::ProcessTerminator;
use super::spawning::ProcessLauncher;
use super::status::report_status;
use super::types::LifecycleOutput;
use crate::cli::Verb;

/// Progress label printed before each step's indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Start,
    Stop,
    Reload,
}

impl Step {
    const fn label(self) -> &'static str {
        match self {
            Self::Start => "Starting",
            Self::Stop => "Stopping",
            Self::Reload => "Reloading",
        }
    }
}

/// What the start step does when it finds an instance already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WhenRunning {
    /// A plain `start` is idempotent.
    Succeed,
    /// The start half of a restart refuses to spawn a second instance.
    Refuse,
}

/// Runs lifecycle verbs for one service.
pub struct ServiceController<'a, P> {
    descriptor: &'a ServiceDescriptor,
    processes: &'a P,
}

impl<'a, P> ServiceController<'a, P>
where
    P: ProcessLocator + ProcessLauncher + ProcessTerminator,
{
    pub const fn new(descriptor: &'a ServiceDescriptor, processes: &'a P) -> Self {
        Self {
            descriptor,
            processes,
        }
    }

    /// Executes `verb` and returns the aggregate of its steps.
    ///
    /// # Errors
    ///
    /// Only failures to write progress output are returned; step failures are
    /// folded into the aggregate.
    pub fn dispatch<W: Write, E: Write>(
        &self,
        verb: Verb,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<AggregateStatus, LifecycleError> {
        info!(
            target: LIFECYCLE_TARGET,
            verb = verb.as_str(),
            service = self.descriptor.name(),
            "dispatching lifecycle verb"
        );
        let mut aggregate = AggregateStatus::default();
        match verb {
            Verb::Start => {
                let result = self.start(WhenRunning::Succeed);
                self.record(Step::Start, &result, output, &mut aggregate)?;
            }
            Verb::Stop => {
                let result = self.stop();
                self.record(Step::Stop, &result, output, &mut aggregate)?;
            }
            Verb::Restart | Verb::Condrestart | Verb::TryRestart => {
                let stopped = self.stop();
                self.record(Step::Stop, &stopped, output, &mut aggregate)?;
                // Start runs even after a failed stop; the aggregate keeps
                // the failure either way.
                let started = self.start(WhenRunning::Refuse);
                self.record(Step::Start, &started, output, &mut aggregate)?;
            }
            Verb::Reload => {
                let result =
                    OperationResult::success().with_message("reload not supported; nothing to do");
                self.record(Step::Reload, &result, output, &mut aggregate)?;
            }
            Verb::Status => {
                let result = report_status(self.processes, self.descriptor);
                output.stdout_line(format_args!("{result}"))?;
                aggregate.absorb(&result);
            }
        }
        info!(
            target: LIFECYCLE_TARGET,
            verb = verb.as_str(),
            steps = aggregate.steps(),
            outcome = ?aggregate.outcome(),
            exit_code = aggregate.exit_code(),
            "lifecycle verb finished"
        );
        Ok(aggregate)
    }

    fn start(&self, when_running: WhenRunning) -> OperationResult {
        let name = self.descriptor.name();
        match self.processes.locate(self.descriptor) {
            Ok(None) => self
                .processes
                .launch(self.descriptor, self.descriptor.startup_timeout()),
            Ok(Some(handle)) => match when_running {
                WhenRunning::Succeed => OperationResult::success()
                    .with_message(format!("{name} already running (pid {})", handle.pid)),
                WhenRunning::Refuse => OperationResult::failed(Failure::StillRunning)
                    .with_message(format!(
                        "{name} still running (pid {}); not starting a second instance",
                        handle.pid
                    )),
            },
            Err(error) => OperationResult::from(error),
        }
    }

    fn stop(&self) -> OperationResult {
        match self.processes.locate(self.descriptor) {
            Ok(Some(handle)) => self.processes.terminate(self.descriptor, handle),
            Ok(None) => OperationResult::success()
                .with_message(format!("{} not running", self.descriptor.name())),
            Err(error) => OperationResult::from(error),
        }
    }

    fn record<W: Write, E: Write>(
        &self,
        step: Step,
        result: &OperationResult,
        output: &mut LifecycleOutput<W, E>,
        aggregate: &mut AggregateStatus,
    ) -> Result<(), LifecycleError> {
        aggregate.absorb(result);
        let indicator = if result.is_failed() {
            "[FAILED]"
        } else {
            "[  OK  ]"
        };
        output.stdout_line(format_args!(
            "{} {}: {indicator}",
            step.label(),
            self.descriptor.name()
        ))?;
        match result.message() {
            Some(message) if result.is_failed() => output.stderr_line(format_args!("{message}")),
            Some(message) => output.stdout_line(format_args!("{message}")),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
