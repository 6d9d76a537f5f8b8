use clap::Parser;
use console::style;
use sluice::{Mode, RunMode, Runner, default_graph};

/// Static site build pipeline.
///
/// Run without arguments for a full clean build. The special task `watch`
/// builds the site, serves it locally, and re-runs bound tasks on change
/// until interrupted.
#[derive(Debug, Parser)]
#[command(name = "sluice", version, about)]
struct Cli {
    /// Tasks to run, as strictly ordered groups.
    tasks: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {e}", style("Error:").red().bold());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if cli.tasks.iter().any(|task| task == "watch") {
        return watch_mode();
    }

    eprintln!(
        "Running {} in {} mode.",
        style("sluice").red(),
        style("build").blue()
    );

    let runner = Runner::new(default_graph(Mode::Build, None)?);

    match cli.tasks.is_empty() {
        true => runner.run(&["clean", "build"], RunMode::Sequential)?,
        false => {
            let names: Vec<&str> = cli.tasks.iter().map(String::as_str).collect();
            runner.run(&names, RunMode::Sequential)?;
        }
    }

    Ok(())
}

#[cfg(feature = "live")]
fn watch_mode() -> anyhow::Result<()> {
    use sluice::{default_bindings, reserve_port, watch};

    eprintln!(
        "Running {} in {} mode.",
        style("sluice").red(),
        style("watch").blue()
    );

    // The reload port has to exist before the graph is built, because the
    // markup task bakes it into the injected snippet.
    let (listener, port) = reserve_port()?;

    let runner = Runner::new(default_graph(Mode::Watch, Some(port))?);
    runner.run(&["clean", "build"], RunMode::Sequential)?;

    watch(&runner, &default_bindings(), listener)?;

    Ok(())
}

#[cfg(not(feature = "live"))]
fn watch_mode() -> anyhow::Result<()> {
    anyhow::bail!("this build of sluice was compiled without the 'live' feature")
}
