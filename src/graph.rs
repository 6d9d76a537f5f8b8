//! Task graph construction and validation.
//!
//! The graph is built once at startup from static declarations and is
//! immutable afterwards. Prerequisite edges point from a prerequisite to the
//! task that depends on it, so a topological order of the graph is a valid
//! execution order. All referential integrity is checked before the first
//! run: duplicate names when a task is added, dangling references and cycles
//! when the builder is finished.

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};

use crate::error::{GraphError, RunError};
use crate::task::{Task, TaskResult};

/// Collects task declarations before they are validated into a [`TaskGraph`].
/// Prerequisites may reference tasks added later; resolution happens in
/// [`finish`](Self::finish).
#[derive(Debug, Default)]
pub struct TaskGraphBuilder {
    tasks: Vec<Task>,
    names: HashSet<&'static str>,
}

impl TaskGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a task to the graph. Fails with [`GraphError::DuplicateTask`] if
    /// the name is taken, leaving the builder unchanged.
    pub fn add_task<F>(
        &mut self,
        name: &'static str,
        prerequisites: &[&'static str],
        work: F,
    ) -> Result<&mut Self, GraphError>
    where
        F: Fn() -> TaskResult + Send + Sync + 'static,
    {
        if !self.names.insert(name) {
            return Err(GraphError::DuplicateTask(name));
        }

        self.tasks.push(Task::new(name, prerequisites, work));
        Ok(self)
    }

    /// Validates the declarations and produces an immutable [`TaskGraph`].
    /// Fails with [`GraphError::UnknownTask`] on a dangling prerequisite
    /// reference and [`GraphError::CyclicDependency`] if the prerequisite
    /// relation is not acyclic.
    pub fn finish(self) -> Result<TaskGraph, GraphError> {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();

        let prerequisites: Vec<_> = self
            .tasks
            .iter()
            .map(|task| (task.name, task.prerequisites.clone()))
            .collect();

        for task in self.tasks {
            let node = graph.add_node(task);
            index.insert(graph[node].name, node);
        }

        for (name, prereqs) in prerequisites {
            let target = index[name];
            for prereq in prereqs {
                let source = *index
                    .get(prereq)
                    .ok_or(GraphError::UnknownTask(name, prereq))?;
                graph.add_edge(source, target, ());
            }
        }

        // Toposort is run purely to reject cyclic declarations.
        toposort(&graph, None)
            .map_err(|cycle| GraphError::CyclicDependency(graph[cycle.node_id()].name))?;

        Ok(TaskGraph { graph, index })
    }
}

/// An immutable, validated task graph. Process-wide, read-mostly state; the
/// runner never mutates it.
#[derive(Debug)]
pub struct TaskGraph {
    pub(crate) graph: DiGraph<Task, ()>,
    index: HashMap<&'static str, NodeIndex>,
}

impl TaskGraph {
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub(crate) fn resolve(&self, name: &str) -> Result<NodeIndex, RunError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| RunError::UnknownTask(name.to_string()))
    }

    /// The transitive prerequisite closure of a task, including the task
    /// itself. Walks the reversed graph, so it follows edges from a task back
    /// to everything it requires.
    pub(crate) fn closure(&self, start: NodeIndex) -> HashSet<NodeIndex> {
        let reversed = Reversed(&self.graph);
        let mut dfs = Dfs::new(reversed, start);
        let mut nodes = HashSet::new();

        while let Some(node) = dfs.next(reversed) {
            nodes.insert(node);
        }

        nodes
    }
}
