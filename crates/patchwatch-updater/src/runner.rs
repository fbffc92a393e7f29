//! Command runner
//!
//! Executes the patch steps in order and captures merged stdout/stderr.
//! A failing step marks the run as failed but never stops the remaining
//! steps. Process execution sits behind [`Executor`] so the runner can be
//! driven without spawning anything.

use std::io::Read;
use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use patchwatch_common::text::decode_best_effort;
use tracing::{debug, info, warn};

use crate::os::OsFamily;
use crate::plan::Step;

/// Hard wall-clock limit per command (30 minutes)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1800);

/// `yum check-update` exits 100 when updates are available
pub const YUM_UPDATES_AVAILABLE: i32 = 100;

/// Exit code recorded when no real one exists (timeout, signal, spawn failure)
pub const NO_EXIT_CODE: i32 = -1;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long output is still collected once the command has ended. A
/// detached grandchild may hold the pipe open indefinitely.
const OUTPUT_GRACE: Duration = Duration::from_secs(2);

/// Runs argv with stderr folded into stdout, without re-quoting arguments
const MERGE_STREAMS_SCRIPT: &str = "exec \"$@\" 2>&1";

/// How a command ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Process exited with a status code
    Exited(i32),
    /// Process was terminated by a signal
    Signaled,
    /// Process was killed after exceeding the timeout
    TimedOut(Duration),
    /// Process could not be started or waited on
    SpawnFailed(String),
}

impl Termination {
    /// Exit code as written to the log
    pub fn raw_code(&self) -> i32 {
        match self {
            Termination::Exited(code) => *code,
            _ => NO_EXIT_CODE,
        }
    }
}

/// Captured result of one process execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Combined stdout and stderr
    pub output: String,
    pub termination: Termination,
}

/// Process execution seam
pub trait Executor {
    fn execute(&self, argv: &[String]) -> Execution;
}

/// Executes commands as child processes with a timeout
#[derive(Debug, Clone)]
pub struct SystemExecutor {
    timeout: Duration,
}

impl Default for SystemExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl SystemExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Executor for SystemExecutor {
    fn execute(&self, argv: &[String]) -> Execution {
        if argv.is_empty() {
            return Execution {
                output: String::new(),
                termination: Termination::SpawnFailed("empty command".to_string()),
            };
        }

        // The shell wrapper would turn a missing binary into exit 127
        if let Err(e) = which::which(&argv[0]) {
            return Execution {
                output: String::new(),
                termination: Termination::SpawnFailed(format!("{}: {}", argv[0], e)),
            };
        }

        // Own process group, so a timeout kill also reaches grandchildren
        // that inherited the output pipe.
        let spawned = Command::new("sh")
            .arg("-c")
            .arg(MERGE_STREAMS_SCRIPT)
            .arg("sh")
            .args(argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .process_group(0)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                return Execution {
                    output: String::new(),
                    termination: Termination::SpawnFailed(e.to_string()),
                };
            }
        };

        // Drain the pipe concurrently, otherwise a chatty command blocks on a
        // full pipe and never exits.
        let (tx, rx) = mpsc::channel::<Vec<u8>>();
        match child.stdout.take() {
            Some(mut stdout) => {
                thread::spawn(move || {
                    let mut buf = [0u8; 8192];
                    loop {
                        match stdout.read(&mut buf) {
                            Ok(0) | Err(_) => break,
                            Ok(n) => {
                                if tx.send(buf[..n].to_vec()).is_err() {
                                    break;
                                }
                            }
                        }
                    }
                });
            }
            None => drop(tx),
        }

        let mut bytes = Vec::new();
        let start = Instant::now();
        let termination = loop {
            bytes.extend(rx.try_iter().flatten());
            match child.try_wait() {
                Ok(Some(status)) => {
                    break match status.code() {
                        Some(code) => Termination::Exited(code),
                        None => Termination::Signaled,
                    };
                }
                Ok(None) if start.elapsed() >= self.timeout => {
                    kill_group(child.id());
                    let _ = child.kill();
                    let _ = child.wait();
                    break Termination::TimedOut(self.timeout);
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    kill_group(child.id());
                    let _ = child.wait();
                    break Termination::SpawnFailed(e.to_string());
                }
            }
        };

        if !drain_output(&rx, &mut bytes, OUTPUT_GRACE) {
            warn!("{} left its output open after exiting; output may be incomplete", argv[0]);
        }

        debug!(
            "{} finished after {}ms: {:?}",
            argv[0],
            start.elapsed().as_millis(),
            termination
        );

        Execution {
            output: decode_best_effort(&bytes),
            termination,
        }
    }
}

/// Collect remaining output until the pipe closes or `grace` runs out.
/// Returns `false` when the pipe was still open at the deadline.
fn drain_output(rx: &Receiver<Vec<u8>>, bytes: &mut Vec<u8>, grace: Duration) -> bool {
    let deadline = Instant::now() + grace;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(chunk) => bytes.extend(chunk),
            Err(mpsc::RecvTimeoutError::Disconnected) => return true,
            Err(mpsc::RecvTimeoutError::Timeout) => return false,
        }
    }
}

fn kill_group(pid: u32) {
    if let Ok(pid) = i32::try_from(pid) {
        let _ = killpg(Pid::from_raw(pid), Signal::SIGKILL);
    }
}

/// Map tool-specific non-error exit codes to success
pub fn normalize_exit_code(family: OsFamily, argv: &[String], code: i32) -> i32 {
    let is_yum_check_update = argv.first().is_some_and(|p| p == "yum")
        && argv.iter().any(|a| a == "check-update");

    if family == OsFamily::Rhel && is_yum_check_update && code == YUM_UPDATES_AVAILABLE {
        0
    } else {
        code
    }
}

/// Outcome of one executed (or simulated) step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub label: String,
    pub command_line: String,
    /// Captured output, empty for dry runs
    pub output: String,
    pub termination: Termination,
    /// Exit code after normalization; 0 means the step succeeded
    pub exit_code: i32,
    pub dry_run: bool,
}

impl StepRecord {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs a step plan with one executor
pub struct CommandRunner<E> {
    executor: E,
    family: OsFamily,
    dry_run: bool,
}

impl<E: Executor> CommandRunner<E> {
    pub fn new(executor: E, family: OsFamily, dry_run: bool) -> Self {
        Self {
            executor,
            family,
            dry_run,
        }
    }

    pub fn family(&self) -> OsFamily {
        self.family
    }

    /// Run a single step
    pub fn run_step(&self, step: &Step) -> StepRecord {
        let command_line = step.command_line();

        if self.dry_run {
            info!("[DRY-RUN] {}", command_line);
            return StepRecord {
                label: step.label.clone(),
                command_line,
                output: String::new(),
                termination: Termination::Exited(0),
                exit_code: 0,
                dry_run: true,
            };
        }

        info!("Running: {}", command_line);
        let execution = self.executor.execute(&step.argv);
        let exit_code = normalize_exit_code(self.family, &step.argv, execution.termination.raw_code());

        let mut output = execution.output;
        match &execution.termination {
            Termination::TimedOut(limit) => {
                if !output.is_empty() && !output.ends_with('\n') {
                    output.push('\n');
                }
                output.push_str(&format!("[failed: timed out after {}s]\n", limit.as_secs()));
            }
            Termination::SpawnFailed(reason) => {
                output.push_str(&format!("[failed to start: {}]\n", reason));
            }
            Termination::Exited(_) | Termination::Signaled => {}
        }

        if exit_code != 0 {
            let program = step.argv.first().map(String::as_str).unwrap_or("");
            warn!("Command '{}' exited with code {}", program, exit_code);
        }

        StepRecord {
            label: step.label.clone(),
            command_line,
            output,
            termination: execution.termination,
            exit_code,
            dry_run: false,
        }
    }

    /// Run every step in order; failures never short-circuit
    pub fn run_all(&self, steps: &[Step]) -> Vec<StepRecord> {
        steps.iter().map(|step| self.run_step(step)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Replies with canned executions and remembers every call
    struct ScriptedExecutor {
        replies: RefCell<Vec<Execution>>,
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl ScriptedExecutor {
        fn new(replies: Vec<Execution>) -> Self {
            Self {
                replies: RefCell::new(replies),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Executor for ScriptedExecutor {
        fn execute(&self, argv: &[String]) -> Execution {
            self.calls.borrow_mut().push(argv.to_vec());
            self.replies.borrow_mut().remove(0)
        }
    }

    fn exited(code: i32, output: &str) -> Execution {
        Execution {
            output: output.to_string(),
            termination: Termination::Exited(code),
        }
    }

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_dry_run_never_executes() {
        let executor = ScriptedExecutor::new(vec![]);
        let runner = CommandRunner::new(executor, OsFamily::Debian, true);

        let records = runner.run_all(&crate::plan::plan_for(OsFamily::Debian));

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.exit_code == 0 && r.dry_run));
        assert!(runner.executor.calls.borrow().is_empty());
    }

    #[test]
    fn test_check_update_100_is_success() {
        let executor = ScriptedExecutor::new(vec![exited(100, "openssl.x86_64  1:3.0.8-1.amzn2023\n")]);
        let runner = CommandRunner::new(executor, OsFamily::Rhel, false);

        let step = Step::new("check", &["yum", "check-update", "--security"]);
        let record = runner.run_step(&step);

        assert!(record.succeeded());
        assert_eq!(record.termination.raw_code(), 100);
    }

    #[test]
    fn test_check_update_1_is_failure() {
        let executor = ScriptedExecutor::new(vec![exited(1, "Error: Failed to download metadata\n")]);
        let runner = CommandRunner::new(executor, OsFamily::Rhel, false);

        let step = Step::new("check", &["yum", "check-update", "--security"]);
        let record = runner.run_step(&step);

        assert!(!record.succeeded());
        assert_eq!(record.exit_code, 1);
    }

    #[test]
    fn test_normalize_is_specific_to_yum_check_update() {
        let check = argv(&["yum", "check-update", "--security"]);
        let update = argv(&["yum", "update", "--security", "-y"]);

        assert_eq!(normalize_exit_code(OsFamily::Rhel, &check, 100), 0);
        assert_eq!(normalize_exit_code(OsFamily::Rhel, &update, 100), 100);
        assert_eq!(normalize_exit_code(OsFamily::Debian, &check, 100), 100);
        assert_eq!(normalize_exit_code(OsFamily::Rhel, &check, 0), 0);
    }

    #[test]
    fn test_failure_does_not_stop_later_steps() {
        let executor = ScriptedExecutor::new(vec![exited(2, "E: could not lock\n"), exited(0, "done\n")]);
        let runner = CommandRunner::new(executor, OsFamily::Debian, false);

        let records = runner.run_all(&crate::plan::plan_for(OsFamily::Debian));

        assert_eq!(records.len(), 2);
        assert!(!records[0].succeeded());
        assert!(records[1].succeeded());
        assert_eq!(runner.executor.calls.borrow().len(), 2);
    }

    #[test]
    fn test_timeout_is_failure_with_marker() {
        let executor = ScriptedExecutor::new(vec![Execution {
            output: "partial".to_string(),
            termination: Termination::TimedOut(Duration::from_secs(1800)),
        }]);
        let runner = CommandRunner::new(executor, OsFamily::Debian, false);

        let record = runner.run_step(&Step::new("upgrade", &["unattended-upgrade", "-d"]));

        assert_eq!(record.exit_code, NO_EXIT_CODE);
        assert_eq!(record.output, "partial\n[failed: timed out after 1800s]\n");
    }

    #[test]
    fn test_system_executor_merges_streams() {
        let executor = SystemExecutor::default();
        let execution = executor.execute(&argv(&["sh", "-c", "echo out; echo err >&2"]));

        assert_eq!(execution.termination, Termination::Exited(0));
        assert_eq!(execution.output, "out\nerr\n");
    }

    #[test]
    fn test_system_executor_exit_code() {
        let executor = SystemExecutor::default();
        let execution = executor.execute(&argv(&["sh", "-c", "exit 3"]));
        assert_eq!(execution.termination, Termination::Exited(3));
    }

    #[test]
    fn test_system_executor_keeps_arguments_intact() {
        let executor = SystemExecutor::default();
        let execution = executor.execute(&argv(&["printf", "%s|", "a b", "$HOME"]));
        assert_eq!(execution.output, "a b|$HOME|");
    }

    #[test]
    fn test_system_executor_timeout() {
        let executor = SystemExecutor::new(Duration::from_millis(300));
        let start = Instant::now();
        let execution = executor.execute(&argv(&["sleep", "5"]));

        assert_eq!(execution.termination, Termination::TimedOut(Duration::from_millis(300)));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_system_executor_missing_binary() {
        let executor = SystemExecutor::default();
        let execution = executor.execute(&argv(&["patchwatch-no-such-binary", "-d"]));

        match execution.termination {
            Termination::SpawnFailed(reason) => assert!(reason.contains("patchwatch-no-such-binary")),
            other => panic!("expected spawn failure, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_binary_step_gets_marker() {
        let runner = CommandRunner::new(SystemExecutor::default(), OsFamily::Debian, false);
        let record = runner.run_step(&Step::new("upgrade", &["patchwatch-no-such-binary", "-d"]));

        assert_eq!(record.exit_code, NO_EXIT_CODE);
        assert!(record.output.starts_with("[failed to start: patchwatch-no-such-binary"));
    }

    #[test]
    fn test_background_child_holding_pipe_does_not_block() {
        let executor = SystemExecutor::default();
        let start = Instant::now();
        let execution = executor.execute(&argv(&["sh", "-c", "sleep 6 & echo done"]));

        assert_eq!(execution.termination, Termination::Exited(0));
        assert_eq!(execution.output, "done\n");
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_drain_output_stops_at_deadline() {
        let (tx, rx) = mpsc::channel();
        tx.send(b"partial".to_vec()).unwrap();
        let mut bytes = Vec::new();

        assert!(!drain_output(&rx, &mut bytes, Duration::from_millis(50)));
        assert_eq!(bytes, b"partial");

        drop(tx);
        assert!(drain_output(&rx, &mut bytes, Duration::from_millis(50)));
    }
}
