#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod error;
mod graph;
mod io;
mod pipeline;
mod runner;
mod task;
mod transforms;
#[cfg(feature = "live")]
mod watch;

pub use crate::error::*;
pub use crate::graph::{TaskGraph, TaskGraphBuilder};
#[cfg(feature = "live")]
pub use crate::pipeline::default_bindings;
pub use crate::pipeline::{DIST, default_graph};
pub use crate::runner::{RunMode, Runner};
pub use crate::task::{Task, TaskResult};
#[cfg(feature = "live")]
pub use crate::watch::{WatchBinding, reserve_port, watch};

/// This value controls whether the pipeline runs in `Build` or `Watch` mode.
/// In `Build` mode, the pipeline produces the output tree once and stops. In
/// `Watch` mode, it keeps running: the markup gets a live-reload snippet
/// pointing at the websocket port, bound tasks re-run on file-system change,
/// and connected browsers are told to refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Produce the output tree once and stop.
    Build,
    /// Rebuild on change and push live reloads.
    Watch,
}
