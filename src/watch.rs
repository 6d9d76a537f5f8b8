//! Watch mode: re-run bound tasks on file-system change and push a reload
//! signal to connected browsers over a websocket.

use std::collections::HashSet;
use std::env;
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use glob::{MatchOptions, Pattern};
use notify::{EventKind, RecursiveMode};
use notify_debouncer_full::new_debouncer;
use tungstenite::WebSocket;

use crate::error::WatchError;
use crate::io::as_overhead;
use crate::runner::{RunMode, Runner};

/// A set of file patterns bound to a task to re-run on change. Bindings are
/// registered once at startup and stay immutable for the lifetime of the
/// watch process.
#[derive(Debug, Clone)]
pub struct WatchBinding {
    task: &'static str,
    patterns: Vec<&'static str>,
}

impl WatchBinding {
    pub fn new(task: &'static str, patterns: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            task,
            patterns: patterns.into_iter().collect(),
        }
    }

    pub fn task(&self) -> &'static str {
        self.task
    }
}

/// `*` and `?` must not cross a path separator, otherwise a root-level
/// pattern like `*.html` would also match files inside the output tree.
const MATCH_OPTS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

struct CompiledBinding {
    task: &'static str,
    patterns: Vec<Pattern>,
}

impl CompiledBinding {
    fn matches(&self, path: &Path) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches_path_with(path, MATCH_OPTS))
    }
}

/// Map one debounced event batch onto the tasks to re-run: event paths are
/// made relative to the workspace root, anything under the output tree is
/// ignored so a rebuild never re-triggers itself, and each binding fires at
/// most once per batch.
fn triggered_tasks(
    compiled: &[CompiledBinding],
    root: &Path,
    paths: &[std::path::PathBuf],
) -> Vec<&'static str> {
    let changed: Vec<&Path> = paths
        .iter()
        .filter_map(|path| path.strip_prefix(root).ok())
        .filter(|path| !path.starts_with(crate::pipeline::DIST))
        .collect();

    compiled
        .iter()
        .filter(|binding| changed.iter().any(|path| binding.matches(path)))
        .map(|binding| binding.task)
        .collect()
}

fn compile(bindings: &[WatchBinding]) -> Result<Vec<CompiledBinding>, glob::PatternError> {
    bindings
        .iter()
        .map(|binding| {
            Ok(CompiledBinding {
                task: binding.task,
                patterns: binding
                    .patterns
                    .iter()
                    .map(|p| Pattern::new(p))
                    .collect::<Result<_, _>>()?,
            })
        })
        .collect()
}

/// The directory a glob pattern is anchored in, used as the notify root.
fn watch_root(pattern: &str) -> &Path {
    let meta = pattern.find(['*', '?', '[']).unwrap_or(pattern.len());
    let prefix = match pattern[..meta].rfind('/') {
        Some(pos) => &pattern[..pos],
        None => "",
    };

    match prefix.is_empty() {
        true => Path::new("."),
        false => Path::new(prefix),
    }
}

/// Reserve the websocket port used for live-reload. Prefers 1337 and falls
/// back to an ephemeral port.
pub fn reserve_port() -> std::io::Result<(TcpListener, u16)> {
    let listener = match TcpListener::bind("127.0.0.1:1337") {
        Ok(sock) => sock,
        Err(_) => TcpListener::bind("127.0.0.1:0")?,
    };

    let addr = listener.local_addr()?;
    let port = addr.port();
    Ok((listener, port))
}

/// Monitor the bindings' glob sets; each debounced event batch triggers a
/// sequential run of every bound task whose patterns match a changed path.
/// Re-triggering is at-least-once per batch; a run failure is reported and
/// watching continues.
pub fn watch(runner: &Runner, bindings: &[WatchBinding], listener: TcpListener) -> Result<(), WatchError> {
    let root = env::current_dir()?;
    let compiled = compile(bindings)?;

    let clients = Arc::new(Mutex::new(vec![]));
    let _thread_i = new_thread_ws_incoming(listener, clients.clone());
    let (tx_reload, _thread_o) = new_thread_ws_reload(clients.clone());

    let (tx, rx) = std::sync::mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_millis(250), None, tx)?;

    for dir in bindings
        .iter()
        .flat_map(|b| b.patterns.iter().map(|p| watch_root(p)))
        .collect::<HashSet<_>>()
    {
        if dir.exists() {
            debouncer.watch(dir, RecursiveMode::Recursive)?;
        }
    }

    #[cfg(feature = "server")]
    let _thread_http = server::start();

    eprintln!("Watching for changes...");

    while let Ok(events) = rx.recv()? {
        let changed: Vec<_> = events
            .iter()
            .filter(|de| {
                matches!(
                    de.event.kind,
                    EventKind::Create(..) | EventKind::Modify(..) | EventKind::Remove(..)
                )
            })
            .flat_map(|de| de.event.paths.clone())
            .collect();

        let triggered = triggered_tasks(&compiled, &root, &changed);

        if triggered.is_empty() {
            continue;
        }

        let start = Instant::now();

        match runner.run(&triggered, RunMode::Sequential) {
            Ok(()) => {
                tx_reload.send(())?;
                eprintln!("Rebuilt {} {}", triggered.join(", "), as_overhead(start));
            }
            Err(e) => {
                eprintln!("Encountered an error while rebuilding:\n{e}");
            }
        }
    }

    Ok(())
}

fn new_thread_ws_incoming(
    server: TcpListener,
    client: Arc<Mutex<Vec<WebSocket<TcpStream>>>>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for stream in server.incoming().flatten() {
            if let Ok(socket) = tungstenite::accept(stream) {
                client.lock().unwrap().push(socket);
            }
        }
    })
}

fn new_thread_ws_reload(
    client: Arc<Mutex<Vec<WebSocket<TcpStream>>>>,
) -> (Sender<()>, JoinHandle<()>) {
    let (tx, rx) = std::sync::mpsc::channel();

    let thread = std::thread::spawn(move || {
        while rx.recv().is_ok() {
            let mut clients = client.lock().unwrap();
            let mut broken = vec![];

            for (i, socket) in clients.iter_mut().enumerate() {
                match socket.send("reload".into()) {
                    Ok(_) => {}
                    Err(tungstenite::error::Error::Io(e)) => {
                        if e.kind() == std::io::ErrorKind::BrokenPipe {
                            broken.push(i);
                        }
                    }
                    Err(e) => {
                        eprintln!("Error: {e:?}");
                    }
                }
            }

            for i in broken.into_iter().rev() {
                clients.remove(i);
            }

            // Close all but the last 10 connections
            let len = clients.len();
            if len > 10 {
                for mut socket in clients.drain(0..len - 10) {
                    socket.close(None).ok();
                }
            }
        }
    });

    (tx, thread)
}

#[cfg(feature = "server")]
mod server {
    use std::{net::SocketAddr, thread};

    use axum::Router;
    use console::style;
    use tower_http::services::ServeDir;

    use crate::pipeline::DIST;

    pub fn start() -> thread::JoinHandle<Result<(), anyhow::Error>> {
        let port = 8080;
        let url = style(format!("http://localhost:{port}/")).yellow();
        eprintln!("Starting a HTTP server on {url}");

        thread::spawn(move || {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?
                .block_on(serve(port))
        })
    }

    async fn serve(port: u16) -> Result<(), anyhow::Error> {
        let address = SocketAddr::from(([127, 0, 0, 1], port));
        let address = tokio::net::TcpListener::bind(address).await?;

        let router = Router::new()
            // path to the directory with the generated site
            .fallback_service(ServeDir::new(DIST));

        axum::serve(address, router).await?;

        Ok(())
    }
}
