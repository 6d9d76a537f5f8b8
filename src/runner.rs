//! Parallel execution of the task graph.
//!
//! The runner performs a parallel topological traversal: tasks are handed to
//! a rayon pool as soon as every prerequisite has completed, and the main
//! thread is the single writer over all run state (per-task flags, blocker
//! counts), serializing transitions so a task can never be launched twice.
//!
//! The algorithm mirrors a classic worker-pool toposort:
//! 1. A results channel is created; rayon distributes the work itself.
//! 2. Tasks with no unmet prerequisites are seeded onto the pool.
//! 3. The scheduler loop waits for any task to finish, flips its state and
//!    decrements the blocker count of each dependent.
//! 4. A dependent whose count reaches zero is spawned immediately.
//! 5. The loop drains until nothing is in flight.
//!
//! On failure the runner stops launching new tasks, lets already-started
//! independent tasks finish, and surfaces the first failure together with the
//! failing task's name. Completed tasks are not rolled back.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::channel;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use petgraph::Direction;
use petgraph::graph::NodeIndex;

use crate::error::RunError;
use crate::graph::TaskGraph;
use crate::task::TaskState;

/// Composition mode for a run request with several task names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// The union of the requested closures executes as one partial order.
    Parallel,
    /// Each requested name forms a group; a group starts only after the
    /// previous group's entire closure has completed.
    Sequential,
}

/// Executes tasks from an immutable [`TaskGraph`].
#[derive(Debug)]
pub struct Runner {
    graph: TaskGraph,
}

impl Runner {
    pub fn new(graph: TaskGraph) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Resolves the transitive prerequisite closure of every requested name
    /// and executes it. All names are resolved up front, so an unknown name
    /// fails before any task runs.
    pub fn run(&self, names: &[&str], mode: RunMode) -> Result<(), RunError> {
        let requested = names
            .iter()
            .map(|name| self.graph.resolve(name))
            .collect::<Result<Vec<_>, _>>()?;

        match mode {
            RunMode::Parallel => {
                let mut nodes = HashSet::new();
                for index in requested {
                    nodes.extend(self.graph.closure(index));
                }
                self.run_group(&nodes)
            }
            RunMode::Sequential => {
                for index in requested {
                    self.run_group(&self.graph.closure(index))?;
                }
                Ok(())
            }
        }
    }

    fn run_group(&self, nodes: &HashSet<NodeIndex>) -> Result<(), RunError> {
        let graph = &self.graph.graph;

        let total = nodes.len() as u64;
        if total == 0 {
            return Ok(());
        }

        // Map from a prerequisite to its dependents, restricted to the group.
        let mut dependents: HashMap<NodeIndex, Vec<NodeIndex>> = HashMap::new();
        for edge in graph.raw_edges() {
            if nodes.contains(&edge.source()) && nodes.contains(&edge.target()) {
                dependents
                    .entry(edge.source())
                    .or_default()
                    .push(edge.target());
            }
        }

        // Count unmet prerequisites for each task in the group.
        let mut blockers: HashMap<NodeIndex, usize> = nodes
            .iter()
            .map(|&index| {
                (
                    index,
                    graph
                        .neighbors_directed(index, Direction::Incoming)
                        .filter(|dep| nodes.contains(dep))
                        .count(),
                )
            })
            .collect();

        let mut states: HashMap<NodeIndex, TaskState> = nodes
            .iter()
            .map(|&index| (index, TaskState::Pending))
            .collect();

        let mp = MultiProgress::new();
        let main_pb = mp.add(ProgressBar::new(total));
        main_pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("invalid progress bar template")
                .progress_chars("=>-"),
        );
        main_pb.set_message("Running tasks...");

        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner:.blue} {msg}")
            .expect("invalid progress bar template");

        let mut first_failure: Option<RunError> = None;
        let mut in_flight = 0usize;

        // The scheduler loop blocks on the results channel, so it must stay
        // on the caller thread; an ordinary scope would migrate it onto the
        // pool and starve the workers it is waiting for.
        rayon::in_place_scope(|s| {
            let (result_sender, result_receiver) = channel::<(NodeIndex, anyhow::Result<()>)>();

            // A helper closure to hand a ready task to the pool.
            let spawn_task = |index: NodeIndex| {
                let task = &graph[index];
                let work = task.work.clone();
                let name = task.name;

                let sender = result_sender.clone();
                let spinner = mp.add(ProgressBar::new_spinner());
                spinner.set_style(spinner_style.clone());
                spinner.set_message(name);
                spinner.enable_steady_tick(Duration::from_millis(100));

                s.spawn(move |_| {
                    let result = (work)();
                    spinner.finish_and_clear();

                    // The receiver only hangs up once the group is settled.
                    let _ = sender.send((index, result));
                });
            };

            // Seed tasks with no unmet prerequisites.
            for &index in nodes {
                if blockers[&index] == 0 {
                    states.insert(index, TaskState::Running);
                    in_flight += 1;
                    spawn_task(index);
                }
            }

            // Scheduler loop. The main thread is the sole writer of `states`
            // and `blockers` while rayon workers execute the units of work.
            while in_flight > 0 {
                let Ok((index, result)) = result_receiver.recv() else {
                    break;
                };

                in_flight -= 1;
                main_pb.inc(1);

                match result {
                    Ok(()) => {
                        states.insert(index, TaskState::Completed);

                        if first_failure.is_some() {
                            continue;
                        }

                        // Unlock dependents of the completed task.
                        if let Some(waiting) = dependents.get(&index) {
                            for &next in waiting {
                                if let Some(count) = blockers.get_mut(&next) {
                                    *count -= 1;
                                    if *count == 0 && states[&next] == TaskState::Pending {
                                        states.insert(next, TaskState::Running);
                                        in_flight += 1;
                                        spawn_task(next);
                                    }
                                }
                            }
                        }
                    }
                    Err(err) => {
                        states.insert(index, TaskState::Failed);

                        if first_failure.is_none() {
                            first_failure = Some(RunError::Task(graph[index].name, err));
                        }
                    }
                }
            }
        });

        main_pb.finish_and_clear();

        match first_failure {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}
