//! Run planning and dispatch
//!
//! A `RunPlan` lists the benchmark runs; the `Dispatcher` turns each run into
//! a `LaunchRequest` and hands it to a `SessionLauncher`.

pub mod dispatcher;
pub mod error;
pub mod launcher;
pub mod plan;
pub mod run_spec;

pub use dispatcher::Dispatcher;
pub use error::DispatchError;
pub use launcher::TmuxLauncher;
pub use plan::RunPlan;
