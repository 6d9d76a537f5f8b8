//! Runs a dependent chain with the global rayon pool pinned to a single
//! worker. The scheduler must stay off the pool for this to terminate.

use sluice::{RunMode, Runner, TaskGraphBuilder};

#[test]
fn dependent_chains_complete_on_a_single_worker_thread() {
    rayon::ThreadPoolBuilder::new()
        .num_threads(1)
        .build_global()
        .unwrap();

    let mut builder = TaskGraphBuilder::new();
    builder.add_task("scripts", &[], || Ok(())).unwrap();
    builder.add_task("styles", &[], || Ok(())).unwrap();
    builder
        .add_task("markup", &["scripts", "styles"], || Ok(()))
        .unwrap();
    builder
        .add_task("build", &["markup"], || Ok(()))
        .unwrap();

    let runner = Runner::new(builder.finish().unwrap());
    runner.run(&["build"], RunMode::Parallel).unwrap();
}
