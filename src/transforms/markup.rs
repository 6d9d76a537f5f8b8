//! HTML reference rewriting.
//!
//! Source markup references development assets through comment-delimited
//! build blocks:
//!
//! ```html
//! <!-- build:js js/all.min.js -->
//! <script src="js/app.js"></script>
//! <script src="js/nav.js"></script>
//! <!-- endbuild -->
//! ```
//!
//! The whole block collapses into a single reference to the built bundle.
//! In watch mode a small websocket snippet is injected so the browser
//! reloads whenever a rebuild completes.

use std::fs;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};

use crate::Mode;

const BUILD_OPEN: &str = "<!-- build:";
const BUILD_CLOSE: &str = "<!-- endbuild -->";

/// Rewrite every markup file matched by `pattern` into the output root.
pub fn build(
    pattern: &str,
    out: &Utf8Path,
    mode: Mode,
    reload_port: Option<u16>,
) -> anyhow::Result<()> {
    for entry in glob::glob(pattern)? {
        let path = Utf8PathBuf::try_from(entry?)?;
        let name = path
            .file_name()
            .with_context(|| format!("no file name in {path}"))?;

        let html = fs::read_to_string(&path)?;
        let mut html = rewrite_blocks(&html).with_context(|| path.clone())?;

        if let (Mode::Watch, Some(port)) = (mode, reload_port) {
            html = inject_reload(&html, port);
        }

        fs::create_dir_all(out)?;
        fs::write(out.join(name), html)?;
    }

    Ok(())
}

/// Collapse each build block into a reference to its target bundle.
pub(crate) fn rewrite_blocks(html: &str) -> anyhow::Result<String> {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(start) = rest.find(BUILD_OPEN) {
        out.push_str(&rest[..start]);

        let after = &rest[start + BUILD_OPEN.len()..];
        let head_end = after.find("-->").context("unterminated build block header")?;
        let header = after[..head_end].trim();

        let (kind, target) = header
            .split_once(char::is_whitespace)
            .context("build block without a target path")?;
        let target = target.trim();

        let body = &after[head_end + 3..];
        let end = body.find(BUILD_CLOSE).context("build block without endbuild")?;

        match kind {
            "js" => out.push_str(&format!("<script src=\"{target}\"></script>")),
            "css" => out.push_str(&format!("<link rel=\"stylesheet\" href=\"{target}\">")),
            other => anyhow::bail!("unknown build block kind '{other}'"),
        }

        rest = &body[end + BUILD_CLOSE.len()..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Insert the live-reload snippet just before `</body>`, or append it when
/// the markup has no body close tag.
pub(crate) fn inject_reload(html: &str, port: u16) -> String {
    let snippet = format!(
        "<script>new WebSocket(\"ws://localhost:{port}\")\
         .addEventListener(\"message\", () => location.reload());</script>"
    );

    match html.rfind("</body>") {
        Some(pos) => format!("{}{snippet}\n{}", &html[..pos], &html[pos..]),
        None => format!("{html}\n{snippet}\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_blocks_collapse_into_bundle_references() {
        let html = "\
<head>
<!-- build:css css/main.min.css -->
<link rel=\"stylesheet\" href=\"styles/main.css\">
<!-- endbuild -->
</head>
<body>
<!-- build:js js/all.min.js -->
<script src=\"js/app.js\"></script>
<script src=\"js/nav.js\"></script>
<!-- endbuild -->
</body>
";
        let rewritten = rewrite_blocks(html).unwrap();

        assert!(rewritten.contains("<link rel=\"stylesheet\" href=\"css/main.min.css\">"));
        assert!(rewritten.contains("<script src=\"js/all.min.js\"></script>"));
        assert!(!rewritten.contains("js/app.js"));
        assert!(!rewritten.contains("endbuild"));
    }

    #[test]
    fn markup_without_blocks_is_untouched() {
        let html = "<body><p>plain</p></body>";
        assert_eq!(rewrite_blocks(html).unwrap(), html);
    }

    #[test]
    fn unterminated_block_is_an_error() {
        let html = "<!-- build:js js/all.min.js -->\n<script src=\"js/app.js\"></script>\n";
        assert!(rewrite_blocks(html).is_err());
    }

    #[test]
    fn unknown_block_kind_is_an_error() {
        let html = "<!-- build:wasm pkg/app.wasm -->\n<!-- endbuild -->";
        assert!(rewrite_blocks(html).is_err());
    }

    #[test]
    fn reload_snippet_lands_before_body_close() {
        let html = "<body><p>hi</p></body>";
        let injected = inject_reload(html, 1337);

        let snippet = injected.find("ws://localhost:1337").unwrap();
        let close = injected.find("</body>").unwrap();
        assert!(snippet < close);
    }

    #[test]
    fn reload_snippet_appends_without_body() {
        let injected = inject_reload("<p>fragment</p>", 4000);
        assert!(injected.contains("ws://localhost:4000"));
    }
}
