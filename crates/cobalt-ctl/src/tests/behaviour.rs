//! BDD step definitions for service lifecycle behaviour.
//!
//! Steps drive the full runner against the scripted process backend in
//! [`TestProcesses`], so scenarios cover argument parsing, dispatch and exit
//! codes without touching real processes.

use std::cell::RefCell;

use rstest_bdd_macros::{given, scenario, then, when};

use super::support::*;
use crate::lifecycle::{Failure, Lookup, OperationResult};

#[given("the daemon is not running")]
fn given_not_running(world: &RefCell<TestWorld>) {
    world.borrow().processes.set_steady(Lookup::Absent);
}

#[given("the daemon is running with pid {pid}")]
fn given_running(world: &RefCell<TestWorld>, pid: u32) {
    world.borrow().processes.set_steady(running_lookup(pid));
}

#[given("the launcher fails with exit code {code}")]
fn given_launch_failure(world: &RefCell<TestWorld>, code: i32) {
    world.borrow().processes.enqueue_launch(
        OperationResult::failed(Failure::DaemonExit(code))
            .with_message(format!("daemon exited during startup with status {code}")),
    );
}

#[when("the operator runs {verb}")]
fn when_operator_runs(world: &RefCell<TestWorld>, verb: String) {
    world.borrow_mut().run(&verb);
}

#[then("the controller exits with code {code}")]
fn then_exit_code(world: &RefCell<TestWorld>, code: u8) {
    world.borrow().assert_exit_code(code);
}

#[then("one daemon was spawned")]
fn then_one_spawn(world: &RefCell<TestWorld>) {
    assert_eq!(world.borrow().processes.launch_count(), 1);
}

#[then("no daemon was spawned")]
fn then_no_spawn(world: &RefCell<TestWorld>) {
    assert_eq!(world.borrow().processes.launch_count(), 0);
}

#[then("the process backend was not consulted")]
fn then_backend_untouched(world: &RefCell<TestWorld>) {
    assert!(world.borrow().processes.calls().is_empty());
}

#[then("stdout contains \"{snippet}\"")]
fn then_stdout_contains(world: &RefCell<TestWorld>, snippet: String) {
    let stdout = world.borrow().stdout_text();
    assert!(stdout.contains(&snippet), "stdout {stdout:?} lacks {snippet:?}");
}

#[then("stderr contains \"{snippet}\"")]
fn then_stderr_contains(world: &RefCell<TestWorld>, snippet: String) {
    let stderr = world.borrow().stderr_text();
    assert!(stderr.contains(&snippet), "stderr {stderr:?} lacks {snippet:?}");
}

#[scenario(path = "tests/features/service_lifecycle.feature")]
fn service_lifecycle_behaviour(world: RefCell<TestWorld>) {
    let _ = world;
}
