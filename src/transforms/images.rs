//! Image optimization: every raster file under the source tree is decoded
//! and re-encoded into the output tree, which strips metadata and normalizes
//! the encoding. Files the codec does not recognize pass through untouched.

use camino::Utf8Path;

#[cfg(feature = "image")]
pub fn optimize(src: &Utf8Path, out: &Utf8Path) -> anyhow::Result<()> {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::Instant;

    use anyhow::Context;
    use image::ImageReader;
    use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

    use crate::io::as_overhead;

    fn collect(src: &Path, dst: &Path, acc: &mut Vec<(PathBuf, PathBuf)>) -> std::io::Result<()> {
        fs::create_dir_all(dst)?;

        for entry in fs::read_dir(src)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                collect(&entry.path(), &dst.join(entry.file_name()), acc)?;
            } else {
                acc.push((entry.path(), dst.join(entry.file_name())));
            }
        }

        Ok(())
    }

    fn reencode(from: &Path, to: &Path) -> anyhow::Result<()> {
        let decoded = ImageReader::open(from)?.with_guessed_format()?.decode();

        match decoded {
            Ok(image) => image
                .save(to)
                .with_context(|| format!("encoding {}", to.display()))?,
            // Not a raster format we handle; copy it verbatim.
            Err(_) => {
                fs::copy(from, to)?;
            }
        }

        Ok(())
    }

    if !src.as_std_path().exists() {
        return Ok(());
    }

    let s = Instant::now();
    let mut files = Vec::new();
    collect(src.as_std_path(), out.as_std_path(), &mut files)?;

    files
        .par_iter()
        .try_for_each(|(from, to)| reencode(from, to))?;

    eprintln!("Optimized {} images {}", files.len(), as_overhead(s));

    Ok(())
}

/// Without a codec the best available transform is a verbatim copy.
#[cfg(not(feature = "image"))]
pub fn optimize(src: &Utf8Path, out: &Utf8Path) -> anyhow::Result<()> {
    crate::io::copy_assets(src, out)?;
    Ok(())
}

#[cfg(all(test, feature = "image"))]
mod tests {
    use std::fs;

    use camino::Utf8PathBuf;

    use super::*;

    #[test]
    fn reencodes_rasters_and_copies_the_rest() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();

        let src = root.join("img");
        fs::create_dir_all(src.join("photos")).unwrap();

        image::RgbaImage::from_pixel(4, 4, image::Rgba([120, 80, 40, 255]))
            .save(src.join("photos/pixel.png").as_std_path())
            .unwrap();
        fs::write(src.join("diagram.svg"), "<svg></svg>").unwrap();

        let out = root.join("dist/content");
        optimize(&src, &out).unwrap();

        let reencoded = image::open(out.join("photos/pixel.png").as_std_path()).unwrap();
        assert_eq!(reencoded.width(), 4);
        assert_eq!(
            fs::read_to_string(out.join("diagram.svg")).unwrap(),
            "<svg></svg>"
        );
    }

    #[test]
    fn missing_source_tree_is_a_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();

        optimize(&root.join("img"), &root.join("dist/content")).unwrap();
        assert!(!root.join("dist/content").as_std_path().exists());
    }
}
