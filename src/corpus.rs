//! Reference image corpus.
//!
//! Loads the `.png` screenshots the loop searches for. Files are loaded
//! in lexical filename order and that order is the match priority: the
//! first reference that produces an accepted match in a cycle wins.

use image::GrayImage;
use std::path::{Path, PathBuf};

use crate::error::ClickerError;

/// A single reference image, grayscale-normalized at load time.
///
/// Immutable after loading. Dimensions are always nonzero; files that
/// decode to an empty image are rejected by [`Corpus::load`].
pub struct ReferenceImage {
    /// File stem, used in status output and match reporting.
    pub name: String,
    /// Luminance pixels, same representation the matcher searches in.
    pub pixels: GrayImage,
    pub width: u32,
    pub height: u32,
}

/// The full set of loaded references, in priority order.
pub struct Corpus {
    references: Vec<ReferenceImage>,
}

impl Corpus {
    /// Loads all `.png` files from `dir`, sorted lexically by filename.
    ///
    /// A file that fails to decode (or decodes to a zero-dimension
    /// image) is logged and skipped; it does not fail the whole load.
    ///
    /// # Errors
    /// - [`ClickerError::DirectoryMissing`] if `dir` does not exist.
    /// - [`ClickerError::EmptyCorpus`] if `dir` exists but yields no
    ///   usable reference image.
    pub fn load(dir: &Path) -> Result<Self, ClickerError> {
        if !dir.is_dir() {
            return Err(ClickerError::DirectoryMissing(dir.to_path_buf()));
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|_| ClickerError::DirectoryMissing(dir.to_path_buf()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| e.eq_ignore_ascii_case("png"))
            })
            .collect();

        // Lexical order keeps match priority stable across runs.
        paths.sort();

        let mut references = Vec::with_capacity(paths.len());
        for path in &paths {
            match load_reference(path) {
                Ok(reference) => references.push(reference),
                Err(e) => crate::log(&format!("Warning: skipping reference: {}", e)),
            }
        }

        if references.is_empty() {
            return Err(ClickerError::EmptyCorpus(dir.to_path_buf()));
        }

        Ok(Self { references })
    }

    /// Builds a corpus directly from references, bypassing the
    /// filesystem. Scheduler tests use this.
    #[cfg(test)]
    pub fn from_references(references: Vec<ReferenceImage>) -> Self {
        Self { references }
    }

    /// References in priority order.
    pub fn references(&self) -> &[ReferenceImage] {
        &self.references
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }
}

/// Decodes one reference file and converts it to grayscale.
fn load_reference(path: &Path) -> Result<ReferenceImage, ClickerError> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unnamed")
        .to_string();

    let img = image::open(path).map_err(|e| ClickerError::Decode {
        name: name.clone(),
        reason: e.to_string(),
    })?;

    let pixels = img.to_luma8();
    let (width, height) = pixels.dimensions();
    if width == 0 || height == 0 {
        return Err(ClickerError::Decode {
            name,
            reason: "image has a zero dimension".to_string(),
        });
    }

    Ok(ReferenceImage {
        name,
        pixels,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma};
    use tempfile::tempdir;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) {
        let img: GrayImage =
            ImageBuffer::from_fn(width, height, |x, y| Luma([(x + y) as u8]));
        img.save(dir.join(name)).unwrap();
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        match Corpus::load(&missing) {
            Err(ClickerError::DirectoryMissing(p)) => assert_eq!(p, missing),
            other => panic!("expected DirectoryMissing, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempdir().unwrap();
        match Corpus::load(dir.path()) {
            Err(ClickerError::EmptyCorpus(p)) => assert_eq!(p, dir.path()),
            other => panic!("expected EmptyCorpus, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_corrupt_file_is_skipped_not_fatal() {
        let dir = tempdir().unwrap();
        write_png(dir.path(), "ok.png", 8, 8);
        std::fs::write(dir.path().join("broken.png"), b"not a png").unwrap();

        let corpus = Corpus::load(dir.path()).unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.references()[0].name, "ok");
    }

    #[test]
    fn test_lexical_load_order() {
        let dir = tempdir().unwrap();
        write_png(dir.path(), "b_second.png", 4, 4);
        write_png(dir.path(), "a_first.png", 4, 4);
        write_png(dir.path(), "c_third.png", 4, 4);

        let corpus = Corpus::load(dir.path()).unwrap();
        let names: Vec<&str> = corpus
            .references()
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["a_first", "b_second", "c_third"]);
    }

    #[test]
    fn test_non_png_files_ignored() {
        let dir = tempdir().unwrap();
        write_png(dir.path(), "ok.png", 4, 4);
        std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

        let corpus = Corpus::load(dir.path()).unwrap();
        assert_eq!(corpus.len(), 1);
    }

    #[test]
    fn test_dimensions_recorded() {
        let dir = tempdir().unwrap();
        write_png(dir.path(), "wide.png", 30, 12);

        let corpus = Corpus::load(dir.path()).unwrap();
        let r = &corpus.references()[0];
        assert_eq!((r.width, r.height), (30, 12));
    }
}
