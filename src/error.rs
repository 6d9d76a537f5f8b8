use thiserror::Error;

/// Errors detected while constructing the task graph. All of these are
/// configuration errors, reported before any task executes.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Task '{0}' is already registered")]
    DuplicateTask(&'static str),

    #[error("Task '{0}' references unknown task '{1}'")]
    UnknownTask(&'static str, &'static str),

    #[error("Dependency cycle detected through task '{0}'")]
    CyclicDependency(&'static str),
}

/// Errors surfaced by a run of the task graph.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Unknown task '{0}'")]
    UnknownTask(String),

    /// A unit of work failed. Carries the failing task's name and the
    /// underlying error; dependents of that task were not launched.
    #[error("Task '{0}':\n{1}")]
    Task(&'static str, anyhow::Error),
}

/// Error while clearing the output directory.
#[derive(Debug, Error)]
pub enum CleanError {
    #[error("Couldn't remove the output directory\n{0}")]
    Remove(std::io::Error),

    #[error("Couldn't create the output directory\n{0}")]
    Create(std::io::Error),
}

#[cfg(feature = "live")]
#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Notify(#[from] notify::Error),

    #[error(transparent)]
    Pattern(#[from] glob::PatternError),

    #[error(transparent)]
    Recv(#[from] std::sync::mpsc::RecvError),

    #[error(transparent)]
    Send(#[from] std::sync::mpsc::SendError<()>),
}
