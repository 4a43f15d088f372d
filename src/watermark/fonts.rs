//! Font loading with a fallback chain.
//!
//! A [`FontLoader`] owns the per-path byte cache and the set of files it has
//! already warned about, so a broken font path is reported once per loader
//! rather than once per request. The [`FontLibrary`] it produces is
//! immutable and can be shared across requests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ab_glyph::FontVec;
use parking_lot::Mutex;
use thiserror::Error;

use super::text_renderer::{FamilyRef, FontFace, FontSpec, GlyphMetrics, TextMeasurer};

/// Failure to load a single font file.
#[derive(Error, Debug)]
pub enum FontLoadError {
    #[error("font file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read font {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid font data in {}: {message}", path.display())]
    Invalid { path: PathBuf, message: String },
}

/// Loads font files and remembers which ones have been warned about.
#[derive(Default)]
pub struct FontLoader {
    cache: Mutex<HashMap<PathBuf, Arc<FontVec>>>,
    warned: Mutex<HashSet<String>>,
}

impl FontLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load one font file, reusing previously parsed bytes for the same path.
    pub fn load_face(&self, path: &Path) -> Result<Arc<FontVec>, FontLoadError> {
        if let Some(font) = self.cache.lock().get(path) {
            return Ok(Arc::clone(font));
        }

        if !path.exists() {
            return Err(FontLoadError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let bytes = std::fs::read(path).map_err(|source| FontLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let font = FontVec::try_from_vec(bytes).map_err(|e| FontLoadError::Invalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let font = Arc::new(font);
        self.cache
            .lock()
            .insert(path.to_path_buf(), Arc::clone(&font));
        tracing::debug!(path = %path.display(), "Font loaded");
        Ok(font)
    }

    /// Resolve a fallback chain to its first loadable face.
    ///
    /// Falls back to the built-in block face when nothing in the chain loads.
    pub fn load_chain(&self, paths: &[PathBuf]) -> FontFace {
        for path in paths {
            match self.load_face(path) {
                Ok(font) => return FontFace::Outline(font),
                Err(e) => {
                    let key = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string());
                    self.warn_once(&key, || {
                        tracing::warn!(font = %key, error = %e, "Font unavailable, trying next in chain");
                    });
                }
            }
        }

        self.warn_once("<builtin>", || {
            tracing::warn!(
                candidates = paths.len(),
                "No usable font file, falling back to built-in block face"
            );
        });
        FontFace::Builtin
    }

    /// Build a library from the display chain and an optional brand chain.
    ///
    /// An empty brand chain reuses the display face.
    pub fn load_library(&self, display: &[PathBuf], brand: &[PathBuf]) -> FontLibrary {
        let display_face = self.load_chain(display);
        let brand_face = if brand.is_empty() {
            display_face.clone()
        } else {
            self.load_chain(brand)
        };
        FontLibrary {
            families: vec![display_face, brand_face],
        }
    }

    /// Number of distinct warnings issued so far.
    pub fn warning_count(&self) -> usize {
        self.warned.lock().len()
    }

    fn warn_once(&self, key: &str, warn: impl FnOnce()) {
        if self.warned.lock().insert(key.to_string()) {
            warn();
        }
    }
}

static BUILTIN_FACE: FontFace = FontFace::Builtin;

/// Resolved font families, indexed by [`FamilyRef`].
#[derive(Debug, Clone)]
pub struct FontLibrary {
    families: Vec<FontFace>,
}

impl FontLibrary {
    /// A library where every family is the built-in block face.
    pub fn builtin() -> Self {
        Self {
            families: vec![FontFace::Builtin, FontFace::Builtin],
        }
    }

    pub fn from_faces(families: Vec<FontFace>) -> Self {
        if families.is_empty() {
            return Self::builtin();
        }
        Self { families }
    }

    /// Face for `family`; unknown references resolve to the display face.
    pub fn face(&self, family: FamilyRef) -> &FontFace {
        self.families
            .get(family.0)
            .or_else(|| self.families.first())
            .unwrap_or(&BUILTIN_FACE)
    }

    pub fn uses_builtin(&self) -> bool {
        self.families.iter().any(FontFace::is_builtin)
    }
}

impl TextMeasurer for FontLibrary {
    fn measure(&self, font: &FontSpec, text: &str) -> GlyphMetrics {
        self.face(font.family).measure(font.size, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watermark::text_renderer::FontRole;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_missing_font_is_not_found() {
        let loader = FontLoader::new();
        let err = loader
            .load_face(Path::new("/nonexistent/font.ttf"))
            .unwrap_err();
        assert!(matches!(err, FontLoadError::NotFound { .. }));
        assert!(err.to_string().contains("font.ttf"));
    }

    #[test]
    fn test_corrupt_font_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"definitely not a font")
            .unwrap();

        let loader = FontLoader::new();
        let err = loader.load_face(&path).unwrap_err();
        assert!(matches!(err, FontLoadError::Invalid { .. }));
    }

    #[test]
    fn test_chain_falls_back_to_builtin() {
        let loader = FontLoader::new();
        let face = loader.load_chain(&[
            PathBuf::from("/nonexistent/a.ttf"),
            PathBuf::from("/nonexistent/b.otf"),
        ]);
        assert!(face.is_builtin());
    }

    #[test]
    fn test_warnings_issued_once_per_file() {
        let loader = FontLoader::new();
        let chain = vec![PathBuf::from("/nonexistent/a.ttf")];

        loader.load_chain(&chain);
        let after_first = loader.warning_count();
        loader.load_chain(&chain);
        loader.load_library(&chain, &chain);

        // One for the file, one for the built-in fallback
        assert_eq!(after_first, 2);
        assert_eq!(loader.warning_count(), 2);
    }

    #[test]
    fn test_library_face_lookup_falls_back_to_display() {
        let library = FontLibrary::from_faces(vec![FontFace::Builtin]);
        assert!(library.face(FamilyRef::BRAND).is_builtin());
        assert!(library.face(FamilyRef(7)).is_builtin());
        assert!(FontLibrary::from_faces(Vec::new()).uses_builtin());
    }

    #[test]
    fn test_library_measures_with_builtin_face() {
        let library = FontLibrary::builtin();
        let spec = FontSpec::new(FamilyRef::DISPLAY, FontRole::Time, 40);
        assert_eq!(library.measure(&spec, "北").advance, 40);
    }

    #[test]
    fn test_library_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FontLibrary>();
        assert_send_sync::<FontLoader>();
    }
}
