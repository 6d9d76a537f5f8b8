//! The task model: a named unit of work with declared prerequisites.

use std::fmt::Debug;
use std::sync::Arc;

/// Result from a single executed unit of work.
pub type TaskResult = anyhow::Result<()>;

/// The opaque action a task performs. Both synchronous and asynchronous work
/// is expressed the same way: the function runs on a pool worker and signals
/// completion by returning.
pub(crate) type WorkFn = Arc<dyn Fn() -> TaskResult + Send + Sync>;

/// A named unit of work. Prerequisites are resolved into graph edges when the
/// builder is finished; a task may begin only after all of them completed.
pub struct Task {
    pub(crate) name: &'static str,
    pub(crate) prerequisites: Vec<&'static str>,
    pub(crate) work: WorkFn,
}

impl Task {
    pub(crate) fn new<F>(name: &'static str, prerequisites: &[&'static str], work: F) -> Self
    where
        F: Fn() -> TaskResult + Send + Sync + 'static,
    {
        Self {
            name,
            prerequisites: prerequisites.to_vec(),
            work: Arc::new(work),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Task({})", self.name)
    }
}

/// Run state of a single task instance. `Completed` and `Failed` are both
/// terminal; the runner never retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskState {
    Pending,
    Running,
    Completed,
    Failed,
}
