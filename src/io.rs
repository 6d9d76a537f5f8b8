use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::time::Instant;

use camino::Utf8Path;
use console::Style;

use crate::error::CleanError;

const ANSI_BLUE: Style = Style::new().blue();

pub fn as_overhead(s: Instant) -> impl Display {
    let e = Instant::now();
    let f = format!("(+{}ms)", e.duration_since(s).as_millis());
    ANSI_BLUE.apply_to(f)
}

/// Delete the entire output directory if it exists and recreate it empty.
pub fn clean(dist: &Utf8Path) -> Result<(), CleanError> {
    let s = Instant::now();

    if fs::metadata(dist).is_ok() {
        fs::remove_dir_all(dist) //
            .map_err(CleanError::Remove)?;
    }

    fs::create_dir_all(dist) //
        .map_err(CleanError::Create)?;

    eprintln!("Cleaned the {dist} directory {}", as_overhead(s));

    Ok(())
}

/// Copy a directory tree verbatim. A missing source directory is not an
/// error; the pipeline simply has nothing of that kind to copy.
pub fn copy_assets(src: &Utf8Path, dst: &Utf8Path) -> std::io::Result<()> {
    if !src.as_std_path().exists() {
        return Ok(());
    }

    let s = Instant::now();
    let count = copy_rec(src, dst)?;
    eprintln!("Copied {count} files from {src} {}", as_overhead(s));

    Ok(())
}

fn copy_rec(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> std::io::Result<usize> {
    fs::create_dir_all(&dst)?;
    let mut count = 0;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let filetype = entry.file_type()?;
        if filetype.is_dir() {
            count += copy_rec(entry.path(), dst.as_ref().join(entry.file_name()))?;
        } else {
            fs::copy(entry.path(), dst.as_ref().join(entry.file_name()))?;
            count += 1;
        }
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    #[test]
    fn copy_preserves_nested_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();

        let src = root.join("icons");
        fs::create_dir_all(src.join("social")).unwrap();
        fs::write(src.join("favicon.ico"), b"ico").unwrap();
        fs::write(src.join("social/mastodon.svg"), b"svg").unwrap();

        let dst = root.join("dist/icons");
        copy_assets(&src, &dst).unwrap();

        assert_eq!(fs::read(dst.join("favicon.ico")).unwrap(), b"ico");
        assert_eq!(fs::read(dst.join("social/mastodon.svg")).unwrap(), b"svg");
    }

    #[test]
    fn missing_source_is_a_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();

        copy_assets(&root.join("absent"), &root.join("dist")).unwrap();
        assert!(!root.join("dist").as_std_path().exists());
    }

    #[test]
    fn clean_recreates_an_empty_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();

        let dist = root.join("dist");
        fs::create_dir_all(dist.join("js")).unwrap();
        fs::write(dist.join("js/all.js"), b"stale").unwrap();

        clean(&dist).unwrap();

        assert!(dist.as_std_path().exists());
        assert_eq!(fs::read_dir(&dist).unwrap().count(), 0);
    }
}
