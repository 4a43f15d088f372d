//! End-to-end watermark pipeline.
//!
//! Check the input, decode, resolve fields, load decorations, plan, compose,
//! render the overlay, blend it onto the photo, encode and write.
//!
//! # Example
//!
//! ```ignore
//! use proofstamp::watermark::processor::{WatermarkRequest, Watermarker};
//!
//! let watermarker = Watermarker::from_config(config, &FontLoader::new());
//! let mut request = WatermarkRequest::new("in.jpg", "out.jpg");
//! request.fields.set_location("北京市朝阳区");
//!
//! let report = watermarker.apply(&request)?;
//! println!("{}", report.security_code);
//! ```

use std::path::{Path, PathBuf};
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;

use super::assets::AssetLoader;
use super::compositor::{compose, paste_overlay, OverlayRenderer};
use super::config::Theme;
use super::error::WatermarkError;
use super::fields::{CaptureFields, Clock, SystemClock};
use super::fonts::{FontLibrary, FontLoader};
use super::geometry::Point;
use super::panel::LayoutResult;
use super::planner::LayoutPlanner;
use super::security::{code_source, CodeSource};
use crate::codec::{decode_image, encode_image, EncoderQuality, OutputFormat};
use crate::config::Config;

/// One photo to stamp.
#[derive(Debug, Clone, Default)]
pub struct WatermarkRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub fields: CaptureFields,
    /// Overrides the configured theme
    pub theme: Option<Theme>,
}

impl WatermarkRequest {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            ..Self::default()
        }
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = Some(theme);
        self
    }
}

/// Outcome of a successful request.
#[derive(Debug, Clone, Serialize)]
pub struct WatermarkReport {
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub layout: LayoutResult,
    pub security_code: String,
}

/// Applies the proof-of-capture overlay with one configuration.
pub struct Watermarker {
    config: Config,
    fonts: FontLibrary,
    assets: AssetLoader,
    clock: Box<dyn Clock + Send + Sync>,
    codes: Mutex<Box<dyn CodeSource + Send>>,
}

impl Watermarker {
    /// Build from a validated configuration, loading its font chains.
    pub fn from_config(config: Config, loader: &FontLoader) -> Self {
        let fonts = loader.load_library(&config.fonts, &config.brand_fonts);
        Self::with_fonts(config, fonts)
    }

    pub fn with_fonts(config: Config, fonts: FontLibrary) -> Self {
        let assets = AssetLoader::new(config.assets.dir.clone(), config.assets.on_missing);
        let codes = Mutex::new(code_source(config.security.seed));
        Self {
            config,
            fonts,
            assets,
            clock: Box::new(SystemClock),
            codes,
        }
    }

    /// Replace the wall clock used for blank time fields.
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replace the security code source.
    pub fn with_codes(mut self, codes: impl CodeSource + Send + 'static) -> Self {
        self.codes = Mutex::new(Box::new(codes));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn fonts(&self) -> &FontLibrary {
        &self.fonts
    }

    pub fn apply(&self, request: &WatermarkRequest) -> Result<WatermarkReport, WatermarkError> {
        let started = Instant::now();

        if !request.input.is_file() {
            return Err(WatermarkError::InputNotFound(request.input.clone()));
        }
        let format = OutputFormat::from_path(&request.output)?;

        let bytes = std::fs::read(&request.input).map_err(|e| io_error(&request.input, e))?;
        let mut photo = decode_image(&bytes)?.to_rgba8();
        let (width, height) = photo.dimensions();

        let theme = request.theme.unwrap_or(self.config.theme);
        let fields = {
            let mut codes = self.codes.lock();
            request.fields.resolve(
                self.clock.as_ref(),
                codes.as_mut(),
                &self.config.text,
                self.config.security.length,
            )
        };

        let decorations = self.assets.load_decorations(theme)?;
        let layout = LayoutPlanner::new(
            theme,
            &self.config.style,
            &self.config.palette,
            &self.config.text,
        )
        .plan(&self.fonts, width, height, &fields, &decorations);

        if layout.overflow {
            tracing::warn!(
                input = %request.input.display(),
                width,
                height,
                rounds = layout.rounds,
                "Overlay content does not fit at minimum sizes, rendering anyway"
            );
        }

        let commands = compose(&layout);
        let overlay = OverlayRenderer::new(&self.fonts, &decorations).render(
            layout.overlay.width(),
            layout.overlay.height(),
            &commands,
        )?;
        paste_overlay(
            &mut photo,
            &overlay,
            Point::new(layout.overlay.left, layout.overlay.top),
        );

        let quality = EncoderQuality::with_quality(self.config.output.jpeg_quality);
        let encoded = encode_image(&photo, format, quality)?;
        if let Some(parent) = request.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        std::fs::write(&request.output, &encoded).map_err(|e| io_error(&request.output, e))?;

        tracing::info!(
            input = %request.input.display(),
            output = %request.output.display(),
            theme = theme.as_str(),
            width,
            height,
            commands = commands.len(),
            bytes = encoded.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Watermark applied"
        );

        Ok(WatermarkReport {
            output: request.output.clone(),
            width,
            height,
            layout,
            security_code: fields.security_code,
        })
    }
}

fn io_error(path: &Path, err: std::io::Error) -> WatermarkError {
    WatermarkError::IoError(format!("{}: {}", path.display(), err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watermark::fields::FixedClock;
    use crate::watermark::security::SeededCodes;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn write_photo(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
        let path = dir.join(name);
        let img = RgbaImage::from_pixel(w, h, Rgba([40, 90, 40, 255]));
        let bytes = encode_image(&img, OutputFormat::Png, EncoderQuality::default()).unwrap();
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn watermarker() -> Watermarker {
        Watermarker::with_fonts(Config::default(), FontLibrary::builtin())
            .with_clock(FixedClock::ymd_hm(2024, 5, 1, 14, 5))
            .with_codes(SeededCodes::new(7))
    }

    #[test]
    fn test_missing_input_is_rejected() {
        let dir = TempDir::new().unwrap();
        let request = WatermarkRequest::new(dir.path().join("nope.jpg"), dir.path().join("out.jpg"));
        match watermarker().apply(&request) {
            Err(WatermarkError::InputNotFound(path)) => assert!(path.ends_with("nope.jpg")),
            other => panic!("expected InputNotFound, got {:?}", other.map(|r| r.output)),
        }
    }

    #[test]
    fn test_unsupported_output_extension() {
        let dir = TempDir::new().unwrap();
        let input = write_photo(dir.path(), "in.png", 64, 48);
        let request = WatermarkRequest::new(input, dir.path().join("out.bmp"));
        assert!(matches!(
            watermarker().apply(&request),
            Err(WatermarkError::CodecError(_))
        ));
    }

    #[test]
    fn test_corrupt_input_fails_to_decode() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("broken.jpg");
        std::fs::write(&input, b"definitely not a jpeg").unwrap();
        let request = WatermarkRequest::new(input, dir.path().join("out.png"));
        assert!(matches!(
            watermarker().apply(&request),
            Err(WatermarkError::CodecError(_))
        ));
    }

    #[test]
    fn test_apply_writes_stamped_png() {
        let dir = TempDir::new().unwrap();
        let input = write_photo(dir.path(), "in.png", 1280, 960);
        let output = dir.path().join("nested/out.png");

        let mut request = WatermarkRequest::new(&input, &output);
        request.fields.set_location("北京市朝阳区");
        let report = watermarker().apply(&request).unwrap();

        assert_eq!((report.width, report.height), (1280, 960));
        assert_eq!(report.security_code, SeededCodes::new(7).next_code(12));
        assert!(report.layout.geometry_problems().is_empty());

        let stamped = decode_image(&std::fs::read(&output).unwrap()).unwrap().to_rgba8();
        assert_eq!(stamped.dimensions(), (1280, 960));
        // Above the overlay nothing changes
        assert_eq!(*stamped.get_pixel(5, 5), Rgba([40, 90, 40, 255]));
        // Inside the card the photo is covered
        let card = report.layout.panel(crate::watermark::panel::PanelKind::Card).unwrap();
        let inside = stamped.get_pixel(
            (card.rect.left + card.rect.width() as i32 - 4) as u32,
            (card.rect.top + card.rect.height() as i32 / 2) as u32,
        );
        assert_ne!(*inside, Rgba([40, 90, 40, 255]));
    }

    #[test]
    fn test_theme_override_and_missing_asset_policy() {
        let dir = TempDir::new().unwrap();
        let input = write_photo(dir.path(), "in.png", 320, 240);

        let mut config = Config::default();
        config.assets.dir = Some(dir.path().join("assets"));
        config.assets.on_missing = crate::watermark::config::AssetPolicy::Fail;
        let strict = Watermarker::with_fonts(config, FontLibrary::builtin());

        let request = WatermarkRequest::new(&input, dir.path().join("out.jpg")).with_theme(Theme::Banner);
        assert!(matches!(
            strict.apply(&request),
            Err(WatermarkError::AssetMissing(_))
        ));

        let lenient = watermarker();
        let report = lenient.apply(&request).unwrap();
        assert_eq!(report.layout.theme, Theme::Banner);
        assert!(report.output.exists());
    }
}
