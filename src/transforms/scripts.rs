//! Script bundle tasks: concatenation and a conservative compaction pass.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use camino::Utf8Path;

/// Concatenate every script matched by `pattern` into a single bundle.
/// Sources are joined in lexicographic path order, so the bundle layout is
/// stable across runs.
pub fn concat(pattern: &str, dest: &Utf8Path) -> anyhow::Result<()> {
    let mut sources = glob::glob(pattern)?.collect::<Result<Vec<PathBuf>, _>>()?;
    sources.sort();

    let mut bundle = String::new();
    for path in &sources {
        let text = fs::read_to_string(path) //
            .with_context(|| format!("reading {}", path.display()))?;

        bundle.push_str(&text);
        if !text.ends_with('\n') {
            bundle.push('\n');
        }
    }

    write(dest, &bundle)
}

/// Compact a bundle into its `.min` counterpart.
pub fn compact(src: &Utf8Path, dest: &Utf8Path) -> anyhow::Result<()> {
    let text = fs::read_to_string(src) //
        .with_context(|| format!("reading {src}"))?;

    write(dest, &compact_source(&text))
}

fn write(dest: &Utf8Path, text: &str) -> anyhow::Result<()> {
    if let Some(dir) = dest.parent() {
        fs::create_dir_all(dir)?;
    }

    fs::write(dest, text).with_context(|| format!("writing {dest}"))?;
    Ok(())
}

/// Strips whole-line comments, surrounding whitespace and blank lines.
/// Deliberately conservative: mid-line content is never touched, so string
/// literals containing `//` survive intact.
pub(crate) fn compact_source(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut in_block = false;

    for line in source.lines() {
        let mut rest = line.trim();

        if in_block {
            match rest.find("*/") {
                Some(pos) => {
                    rest = rest[pos + 2..].trim_start();
                    in_block = false;
                }
                None => continue,
            }
        }

        while let Some(stripped) = rest.strip_prefix("/*") {
            match stripped.find("*/") {
                Some(pos) => rest = stripped[pos + 2..].trim_start(),
                None => {
                    in_block = true;
                    rest = "";
                    break;
                }
            }
        }

        if rest.is_empty() || rest.starts_with("//") {
            continue;
        }

        out.push_str(rest);
        out.push('\n');
    }

    out
}
