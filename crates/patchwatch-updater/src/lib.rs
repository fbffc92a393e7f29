//! Patchwatch Updater - Security patch run with a timestamped log
//!
//! Pipeline: [`os`] detects the package-manager family, [`plan`] picks the
//! commands, [`runner`] executes them, [`update_log`] persists the run.
//! [`workflow`] wires the pieces together for the binary.

pub mod os;
pub mod plan;
pub mod runner;
pub mod update_log;
pub mod workflow;

pub use os::OsFamily;
pub use plan::Step;
pub use runner::{CommandRunner, Execution, Executor, StepRecord, SystemExecutor, Termination};
pub use update_log::{UpdateLogWriter, UpdateRun};
pub use workflow::{execute_plan, run_updates, UpdateError, UpdateOutcome};
