//! Proof-of-capture watermark.
//!
//! Stamps a photo with a semi-transparent overlay anchored to its bottom
//! edge: a themed card with capture time, date and labels, a location line,
//! a brand block and a security code.
//!
//! # Stages
//!
//! - [`fields`] fills blank capture fields from the clock and text defaults
//! - [`planner`] sizes and places every panel for the image dimensions,
//!   shrinking fonts until the overlay fits its height band
//! - [`compositor`] turns the layout into draw commands, rasterises them and
//!   blends the overlay onto the photo
//! - [`processor`] runs the whole pipeline for one file
//!
//! # Configuration Example
//!
//! ```yaml
//! theme: banner
//! fonts:
//!   - assets/fonts/HYQiHei-65W.ttf
//! assets:
//!   dir: assets/watermark
//!   on_missing: skip
//! style:
//!   card_width_landscape: { min: 0.33, target: 0.36, max: 0.40 }
//! ```

pub mod assets;
pub mod compositor;
pub mod config;
pub mod error;
pub mod fields;
pub mod fitter;
pub mod fonts;
pub mod geometry;
pub mod panel;
pub mod planner;
pub mod processor;
pub mod security;
pub mod text_renderer;
pub mod wrap;

// Re-export main types for convenience
pub use assets::{AssetLoader, Decorations};
pub use compositor::{compose, paste_overlay, DrawCommand, OverlayRenderer};
pub use config::{AssetPolicy, LayoutStyle, Palette, RatioBand, TextDefaults, Theme};
pub use error::WatermarkError;
pub use fields::{CaptureFields, Clock, FixedClock, ResolvedFields, SystemClock};
pub use fitter::{fit, FitOutcome, FitRequest, ShrinkPolicy};
pub use fonts::{FontLibrary, FontLoadError, FontLoader};
pub use geometry::{ImageDimensions, Orientation, Point, Rect};
pub use panel::{LayoutResult, Panel, PanelKind, PanelShape, TextRun, TextSegment};
pub use planner::LayoutPlanner;
pub use processor::{WatermarkReport, WatermarkRequest, Watermarker};
pub use security::{code_source, CodeSource, RandomCodes, SeededCodes};
pub use text_renderer::{parse_hex_color, Color, FontFace, FontSpec, GlyphMetrics, TextMeasurer};
pub use wrap::{wrap, WrappedBlock};
