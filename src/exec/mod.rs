// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] describes a process to launch (`CommandSpec`).
//! - [`runner`] owns the single-run slot: the runner loop and its cloneable
//!   client `ProcessRunner`.
//! - [`supervisor`] drives one child from spawn to exit, including
//!   cancellation.
//! - [`pipe`] spawns children with merged output and runs the blocking reader
//!   thread.
//! - [`handle`] is the consumer side of a run (`RunHandle`).
//! - [`post_step`] runs short sequential commands to completion.

pub mod command;
pub mod handle;
pub mod pipe;
pub mod post_step;
pub mod runner;
pub mod supervisor;

pub use command::CommandSpec;
pub use handle::{ReadNext, RunHandle};
pub use post_step::{run_post_step, PostStepReport};
pub use runner::{spawn_runner, ProcessRunner, RunnerOptions};
pub use supervisor::terminal_line;
