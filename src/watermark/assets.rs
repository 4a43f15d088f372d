//! Decorative raster assets (separator glyph, brand logo).
//!
//! Assets are optional. When an asset directory is configured but a file is
//! absent or unreadable, the [`AssetPolicy`] decides between dropping the
//! decoration and failing the request.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;
use parking_lot::Mutex;

use super::config::{AssetPolicy, Theme};
use super::error::WatermarkError;
use super::panel::AssetKind;
use crate::codec::decode_image;

/// Decoded decorations available to one request.
#[derive(Debug, Clone, Default)]
pub struct Decorations {
    pub separator: Option<Arc<RgbaImage>>,
    pub logo: Option<Arc<RgbaImage>>,
}

impl Decorations {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: AssetKind) -> Option<&RgbaImage> {
        match kind {
            AssetKind::Separator => self.separator.as_deref(),
            AssetKind::Logo => self.logo.as_deref(),
        }
    }

    /// Pixel size of an available asset.
    pub fn size(&self, kind: AssetKind) -> Option<(u32, u32)> {
        self.get(kind)
            .map(|img| img.dimensions())
            .filter(|&(w, h)| w > 0 && h > 0)
    }
}

/// Loads and caches assets from a directory.
pub struct AssetLoader {
    dir: Option<PathBuf>,
    policy: AssetPolicy,
    cache: Mutex<HashMap<AssetKind, Arc<RgbaImage>>>,
    warned: Mutex<HashSet<PathBuf>>,
}

impl AssetLoader {
    pub fn new(dir: Option<PathBuf>, policy: AssetPolicy) -> Self {
        Self {
            dir,
            policy,
            cache: Mutex::new(HashMap::new()),
            warned: Mutex::new(HashSet::new()),
        }
    }

    /// A loader with no asset directory; every decoration is omitted.
    pub fn disabled() -> Self {
        Self::new(None, AssetPolicy::Skip)
    }

    /// Load one asset, applying the missing-asset policy.
    pub fn load(&self, kind: AssetKind) -> Result<Option<Arc<RgbaImage>>, WatermarkError> {
        let Some(dir) = &self.dir else {
            return Ok(None);
        };
        if let Some(image) = self.cache.lock().get(&kind) {
            return Ok(Some(Arc::clone(image)));
        }

        let path = dir.join(kind.file_name());
        if !path.is_file() {
            return match self.policy {
                AssetPolicy::Fail => Err(WatermarkError::AssetMissing(path)),
                AssetPolicy::Skip => {
                    self.warn_once(&path, || {
                        tracing::warn!(asset = %path.display(), "Decorative asset missing, skipping");
                    });
                    Ok(None)
                }
            };
        }

        let decoded = std::fs::read(&path)
            .map_err(|e| WatermarkError::IoError(format!("{}: {}", path.display(), e)))
            .and_then(|bytes| decode_image(&bytes).map_err(WatermarkError::from));

        match decoded {
            Ok(image) => {
                let image = Arc::new(image.to_rgba8());
                self.cache.lock().insert(kind, Arc::clone(&image));
                tracing::debug!(
                    asset = %path.display(),
                    width = image.width(),
                    height = image.height(),
                    "Decorative asset loaded"
                );
                Ok(Some(image))
            }
            Err(e) => match self.policy {
                AssetPolicy::Fail => Err(e),
                AssetPolicy::Skip => {
                    self.warn_once(&path, || {
                        tracing::warn!(asset = %path.display(), error = %e, "Decorative asset unreadable, skipping");
                    });
                    Ok(None)
                }
            },
        }
    }

    /// Load the decorations `theme` draws.
    pub fn load_decorations(&self, theme: Theme) -> Result<Decorations, WatermarkError> {
        let separator = match theme {
            Theme::Banner => self.load(AssetKind::Separator)?,
            Theme::Card => None,
        };
        let logo = self.load(AssetKind::Logo)?;
        Ok(Decorations { separator, logo })
    }

    /// Number of asset paths warned about so far.
    pub fn warning_count(&self) -> usize {
        self.warned.lock().len()
    }

    fn warn_once(&self, path: &Path, warn: impl FnOnce()) {
        if self.warned.lock().insert(path.to_path_buf()) {
            warn();
        }
    }
}
