//! The default build graph: the concrete wiring of the site pipeline.
//!
//! The output tree under [`DIST`] is shared mutable state, so every pair of
//! tasks that touches overlapping paths is connected by an edge here. The
//! `clean` task is deliberately left out of the `build` closure; callers run
//! it as its own sequential group so the wipe is guaranteed to finish before
//! any writer starts.

use camino::Utf8Path;

use crate::error::GraphError;
use crate::graph::{TaskGraph, TaskGraphBuilder};
use crate::{Mode, io, transforms};

/// Deployable output root.
pub const DIST: &str = "dist";

const SCRIPTS_GLOB: &str = "js/**/*.js";
const SCRIPT_BUNDLE: &str = "dist/js/all.js";
const SCRIPT_BUNDLE_MIN: &str = "dist/js/all.min.js";
const STYLES_GLOB: &str = "styles/**/[!_]*.scss";
const STYLES_OUT: &str = "dist/css";
const IMAGES_SRC: &str = "img";
const IMAGES_OUT: &str = "dist/content";
const ICONS_SRC: &str = "icons";
const ICONS_OUT: &str = "dist/icons";
const MARKUP_GLOB: &str = "*.html";

/// Construct the default task graph. `reload_port` is the websocket port
/// injected into the markup in watch mode.
pub fn default_graph(mode: Mode, reload_port: Option<u16>) -> Result<TaskGraph, GraphError> {
    let mut builder = TaskGraphBuilder::new();

    builder.add_task("clean", &[], || {
        io::clean(Utf8Path::new(DIST))?;
        Ok(())
    })?;

    builder.add_task("scripts", &[], || {
        transforms::scripts::concat(SCRIPTS_GLOB, Utf8Path::new(SCRIPT_BUNDLE))
    })?;

    builder.add_task("scripts-min", &["scripts"], || {
        transforms::scripts::compact(
            Utf8Path::new(SCRIPT_BUNDLE),
            Utf8Path::new(SCRIPT_BUNDLE_MIN),
        )
    })?;

    builder.add_task("styles", &[], || {
        transforms::styles::build(STYLES_GLOB, Utf8Path::new(STYLES_OUT))
    })?;

    builder.add_task("images", &[], || {
        transforms::images::optimize(Utf8Path::new(IMAGES_SRC), Utf8Path::new(IMAGES_OUT))
    })?;

    builder.add_task("icons", &[], || {
        io::copy_assets(Utf8Path::new(ICONS_SRC), Utf8Path::new(ICONS_OUT))?;
        Ok(())
    })?;

    builder.add_task("markup", &["scripts-min", "styles"], move || {
        transforms::markup::build(MARKUP_GLOB, Utf8Path::new(DIST), mode, reload_port)
    })?;

    // Aggregation only; ordering comes entirely from the edges.
    builder.add_task("build", &["markup", "images", "icons"], || Ok(()))?;

    builder.finish()
}

/// The watch bindings matching the default graph. Markup re-runs pull the
/// script and style closures with them, so a bundle referenced from a fresh
/// page is never stale.
#[cfg(feature = "live")]
pub fn default_bindings() -> Vec<crate::watch::WatchBinding> {
    use crate::watch::WatchBinding;

    vec![
        WatchBinding::new("scripts-min", ["js/**/*.js"]),
        WatchBinding::new("styles", ["styles/**/*.scss"]),
        WatchBinding::new("images", ["img/**/*"]),
        WatchBinding::new("icons", ["icons/**/*"]),
        WatchBinding::new("markup", ["*.html"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_graph_is_valid_and_complete() {
        let graph = default_graph(Mode::Build, None).unwrap();

        assert_eq!(graph.len(), 8);
        for name in [
            "clean",
            "scripts",
            "scripts-min",
            "styles",
            "images",
            "icons",
            "markup",
            "build",
        ] {
            assert!(graph.contains(name), "missing task '{name}'");
        }
    }

    #[cfg(feature = "live")]
    #[test]
    fn every_binding_references_a_registered_task() {
        let graph = default_graph(Mode::Watch, Some(1337)).unwrap();

        for binding in default_bindings() {
            assert!(graph.contains(binding.task()));
        }
    }
}
