//! Stylesheet compilation. Each non-partial source is compiled with `grass`
//! straight to a compressed `.min.css`, so there is no separate minify step.
//! Output paths mirror the source tree below the pattern's base directory,
//! so sources with the same stem in different subdirectories never collide.

use camino::Utf8Path;

/// The directory a glob pattern is anchored in; output paths are computed
/// relative to it.
#[cfg(feature = "grass")]
fn pattern_base(pattern: &str) -> &std::path::Path {
    let meta = pattern.find(['*', '?', '[']).unwrap_or(pattern.len());
    let prefix = match pattern[..meta].rfind('/') {
        Some(pos) => &pattern[..pos],
        None => "",
    };

    std::path::Path::new(prefix)
}

#[cfg(feature = "grass")]
pub fn build(pattern: &str, out: &Utf8Path) -> anyhow::Result<()> {
    use std::fs;
    use std::path::Path;

    use anyhow::Context;
    use rayon::iter::{ParallelBridge, ParallelIterator};

    fn compile(path: &Path, base: &Path, out: &Utf8Path) -> anyhow::Result<()> {
        let opts = grass::Options::default().style(grass::OutputStyle::Compressed);
        let css = grass::from_path(path, &opts)
            .map_err(|e| anyhow::anyhow!("{}:\n{e}", path.display()))?;

        let name = path
            .file_stem()
            .with_context(|| format!("no file stem in {}", path.display()))?
            .to_string_lossy();

        let rel = path.strip_prefix(base).unwrap_or(path);
        let mut dest = out.as_std_path().join(rel);
        dest.set_file_name(format!("{name}.min.css"));

        if let Some(dir) = dest.parent() {
            fs::create_dir_all(dir)?;
        }

        fs::write(dest, css)?;
        Ok(())
    }

    let base = pattern_base(pattern);

    glob::glob(pattern)?
        .par_bridge()
        .try_for_each(|entry| -> anyhow::Result<()> {
            let path = entry?;
            compile(&path, base, out)
        })?;

    Ok(())
}

#[cfg(not(feature = "grass"))]
pub fn build(_pattern: &str, _out: &Utf8Path) -> anyhow::Result<()> {
    anyhow::bail!("stylesheet compilation requires the 'grass' feature")
}

#[cfg(all(test, feature = "grass"))]
mod tests {
    use std::fs;

    use camino::Utf8PathBuf;

    use super::*;

    #[test]
    fn compiles_non_partial_sources_to_compressed_css() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();

        fs::create_dir_all(root.join("styles")).unwrap();
        fs::write(
            root.join("styles/_palette.scss"),
            "$accent: #663399;\n",
        )
        .unwrap();
        fs::write(
            root.join("styles/main.scss"),
            "@use 'palette';\nbody {\n  color: palette.$accent;\n}\n",
        )
        .unwrap();

        let out = root.join("dist/css");
        build(&format!("{root}/styles/**/[!_]*.scss"), &out).unwrap();

        let css = fs::read_to_string(out.join("main.min.css")).unwrap();
        assert!(css.contains("#639") || css.contains("#663399"));
        // Partials are inlined, never emitted on their own.
        assert!(!out.join("_palette.min.css").as_std_path().exists());
        assert!(!out.join("palette.min.css").as_std_path().exists());
    }

    #[test]
    fn nested_sources_with_the_same_stem_do_not_collide() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();

        fs::create_dir_all(root.join("styles/light")).unwrap();
        fs::create_dir_all(root.join("styles/dark")).unwrap();
        fs::write(root.join("styles/light/theme.scss"), "body { color: #111; }\n").unwrap();
        fs::write(root.join("styles/dark/theme.scss"), "body { color: #eee; }\n").unwrap();

        let out = root.join("dist/css");
        build(&format!("{root}/styles/**/[!_]*.scss"), &out).unwrap();

        let light = fs::read_to_string(out.join("light/theme.min.css")).unwrap();
        let dark = fs::read_to_string(out.join("dark/theme.min.css")).unwrap();
        assert_ne!(light, dark);
    }

    #[test]
    fn syntax_errors_carry_the_source_file() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();

        fs::create_dir_all(root.join("styles")).unwrap();
        fs::write(root.join("styles/broken.scss"), "body { color: }\n").unwrap();

        let err = build(&format!("{root}/styles/**/[!_]*.scss"), &root.join("out")).unwrap_err();
        assert!(err.to_string().contains("broken.scss"));
    }
}
