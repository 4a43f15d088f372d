//! Text measurement and rasterization.
//!
//! Measurement mirrors how text is later drawn: the pen origin is the top of
//! the line box (the ascender line) and the baseline sits `ascent` pixels
//! below it. [`GlyphMetrics`] reports the tight ink box relative to that pen
//! origin so callers can place ink exactly where the layout wants it.
//!
//! # Features
//!
//! - Hex color parsing (#RGB, #RRGGBB and #RRGGBBAA formats)
//! - Outline fonts through `ab_glyph`, with kerning
//! - A built-in block face used when no font file can be loaded
//! - Optional stroked outline for contrast over photographs
//!
//! # Example
//!
//! ```ignore
//! use proofstamp::watermark::text_renderer::{FontFace, FontRole, FontSpec};
//!
//! let face = FontFace::Builtin;
//! let metrics = face.measure(32, "14:05");
//! assert!(metrics.width > 0);
//! ```

use std::sync::Arc;

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{GrayImage, Rgba, RgbaImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;
use serde::{Deserialize, Serialize};

use super::compositor::blend_pixels;
use super::config::FontMinimums;
use super::geometry::Point;

/// Parsed RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Build a color from an opacity in `0.0..=1.0` (truncated to a byte).
    pub fn with_alpha(r: u8, g: u8, b: u8, opacity: f32) -> Self {
        Self::rgba(r, g, b, (opacity.clamp(0.0, 1.0) * 255.0) as u8)
    }

    /// White color.
    pub fn white() -> Self {
        Self::new(255, 255, 255)
    }

    /// Black color.
    pub fn black() -> Self {
        Self::new(0, 0, 0)
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, self.a])
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_hex_color(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

/// Parse a hex color string.
///
/// Supports #RGB, #RRGGBB and #RRGGBBAA. Colors without an alpha component
/// are fully opaque.
pub fn parse_hex_color(hex: &str) -> Result<Color, String> {
    let hex = hex
        .strip_prefix('#')
        .ok_or_else(|| "Color must start with '#'".to_string())?;

    if !hex.is_ascii() {
        return Err("Invalid hex digit".to_string());
    }

    let byte = |s: &str| u8::from_str_radix(s, 16).map_err(|_| "Invalid hex digit".to_string());

    match hex.len() {
        3 => {
            // Each digit is doubled: 0xF -> 0xFF, 0xA -> 0xAA
            let r = byte(&hex[0..1])?;
            let g = byte(&hex[1..2])?;
            let b = byte(&hex[2..3])?;
            Ok(Color::new(r * 17, g * 17, b * 17))
        }
        6 => Ok(Color::new(
            byte(&hex[0..2])?,
            byte(&hex[2..4])?,
            byte(&hex[4..6])?,
        )),
        8 => Ok(Color::rgba(
            byte(&hex[0..2])?,
            byte(&hex[2..4])?,
            byte(&hex[4..6])?,
            byte(&hex[6..8])?,
        )),
        n => Err(format!(
            "Color must be #RGB, #RRGGBB or #RRGGBBAA format, got {} characters",
            n
        )),
    }
}

/// Index into a [`FontLibrary`](super::fonts::FontLibrary)'s families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FamilyRef(pub usize);

impl FamilyRef {
    /// Family used for card, location and security text
    pub const DISPLAY: FamilyRef = FamilyRef(0);
    /// Family used for the brand block; falls back to the display family
    pub const BRAND: FamilyRef = FamilyRef(1);
}

/// Role of a text element, selecting its minimum size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FontRole {
    Time,
    Date,
    Location,
    Brand,
    Label,
}

impl FontMinimums {
    pub fn for_role(&self, role: FontRole) -> u32 {
        let min = match role {
            FontRole::Time => self.time,
            FontRole::Date => self.date,
            FontRole::Location => self.location,
            FontRole::Brand => self.brand,
            FontRole::Label => self.label,
        };
        min.max(1)
    }
}

/// A font family at a concrete pixel em size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FontSpec {
    pub family: FamilyRef,
    pub role: FontRole,
    pub size: u32,
}

impl FontSpec {
    pub fn new(family: FamilyRef, role: FontRole, size: u32) -> Self {
        Self { family, role, size }
    }

    pub fn with_size(self, size: u32) -> Self {
        Self { size, ..self }
    }
}

/// Ink box and advance of a measured string.
///
/// `offset_x`/`offset_y` locate the ink box's top-left relative to the pen
/// origin; drawing at `(x - offset_x, y - offset_y)` puts the ink's top-left
/// at `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GlyphMetrics {
    pub offset_x: i32,
    pub offset_y: i32,
    pub width: u32,
    pub height: u32,
    /// Horizontal pen advance for the whole string
    pub advance: u32,
    /// Distance from the pen origin down to the baseline
    pub baseline: i32,
}

impl GlyphMetrics {
    pub fn has_ink(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Measures strings for layout.
///
/// Implementations must be pure functions of `(font, text)` and monotonic in
/// font size.
pub trait TextMeasurer {
    fn measure(&self, font: &FontSpec, text: &str) -> GlyphMetrics;
}

impl<T: TextMeasurer + ?Sized> TextMeasurer for &T {
    fn measure(&self, font: &FontSpec, text: &str) -> GlyphMetrics {
        (**self).measure(font, text)
    }
}

/// Stroke drawn around glyphs before the fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Outline {
    pub width: u32,
    pub color: Color,
}

/// A loaded font face.
#[derive(Clone)]
pub enum FontFace {
    /// TrueType/OpenType outlines
    Outline(Arc<FontVec>),
    /// Block glyphs with fixed proportions, always available
    Builtin,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Outline(font) => f
                .debug_struct("Outline")
                .field("glyphs", &font.glyph_count())
                .finish(),
            Self::Builtin => f.write_str("Builtin"),
        }
    }
}

impl FontFace {
    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin)
    }

    /// Measure `text` at `size` pixels per em.
    pub fn measure(&self, size: u32, text: &str) -> GlyphMetrics {
        match self {
            Self::Outline(font) => measure_outline(font.as_ref(), size, text),
            Self::Builtin => measure_builtin(size, text),
        }
    }

    /// Draw `text` with its pen origin at `pen`, blending onto `image`.
    pub fn draw(
        &self,
        image: &mut RgbaImage,
        pen: Point,
        size: u32,
        text: &str,
        color: Color,
        outline: Option<Outline>,
    ) {
        match outline.filter(|o| o.width > 0 && o.color.a > 0) {
            Some(stroke) => self.draw_stroked(image, pen, size, text, color, stroke),
            None => self.rasterize(pen, size, text, |x, y, coverage| {
                blend_coverage(image, x, y, color, coverage)
            }),
        }
    }

    /// Visit every inked pixel of `text` with its coverage in `0.0..=1.0`.
    fn rasterize(&self, pen: Point, size: u32, text: &str, plot: impl FnMut(i32, i32, f32)) {
        match self {
            Self::Outline(font) => rasterize_outline(font.as_ref(), pen, size, text, plot),
            Self::Builtin => rasterize_builtin(pen, size, text, plot),
        }
    }

    /// Rasterize once into a coverage mask, stroke through the dilated mask,
    /// then fill through the mask itself.
    fn draw_stroked(
        &self,
        image: &mut RgbaImage,
        pen: Point,
        size: u32,
        text: &str,
        color: Color,
        stroke: Outline,
    ) {
        let metrics = self.measure(size, text);
        if !metrics.has_ink() {
            return;
        }

        let radius = stroke.width.min(u8::MAX as u32);
        let origin = Point::new(
            pen.x + metrics.offset_x - radius as i32,
            pen.y + metrics.offset_y - radius as i32,
        );
        let mut mask = GrayImage::new(metrics.width + 2 * radius, metrics.height + 2 * radius);
        let (mask_w, mask_h) = (mask.width() as i32, mask.height() as i32);

        let local_pen = Point::new(pen.x - origin.x, pen.y - origin.y);
        self.rasterize(local_pen, size, text, |x, y, coverage| {
            if x < 0 || y < 0 || x >= mask_w || y >= mask_h {
                return;
            }
            let value = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
            let pixel = mask.get_pixel_mut(x as u32, y as u32);
            pixel[0] = pixel[0].max(value);
        });

        let stroke_mask = dilate(&mask, Norm::L2, radius as u8);
        blend_mask(image, &stroke_mask, origin, stroke.color);
        blend_mask(image, &mask, origin, color);
    }
}

/// Scale so that one em equals `size` pixels.
///
/// `PxScale` is relative to the ascent-to-descent height, so the em size is
/// converted through the font's units per em.
fn px_scale<F: Font>(font: &F, size: u32) -> PxScale {
    match font.units_per_em() {
        Some(units_per_em) if units_per_em > 0.0 => {
            PxScale::from(size as f32 * font.height_unscaled() / units_per_em)
        }
        _ => PxScale::from(size as f32),
    }
}

fn measure_outline<F: Font>(font: &F, size: u32, text: &str) -> GlyphMetrics {
    let scale = px_scale(font, size);
    let scaled_font = font.as_scaled(scale);
    let ascent = scaled_font.ascent();

    let mut cursor_x = 0.0f32;
    let mut prev_glyph: Option<ab_glyph::GlyphId> = None;
    let mut ink: Option<(f32, f32, f32, f32)> = None;

    for c in text.chars().filter(|c| !c.is_control()) {
        let glyph_id = scaled_font.glyph_id(c);
        if let Some(prev) = prev_glyph {
            cursor_x += scaled_font.kern(prev, glyph_id);
        }

        let glyph = glyph_id.with_scale_and_position(scale, ab_glyph::point(cursor_x, ascent));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let b = outlined.px_bounds();
            ink = Some(match ink {
                None => (b.min.x, b.min.y, b.max.x, b.max.y),
                Some((l, t, r, bt)) => (l.min(b.min.x), t.min(b.min.y), r.max(b.max.x), bt.max(b.max.y)),
            });
        }

        cursor_x += scaled_font.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    let advance = cursor_x.ceil().max(0.0) as u32;
    let baseline = ascent.round() as i32;

    match ink {
        Some((l, t, r, b)) => {
            let left = l.floor() as i32;
            let top = t.floor() as i32;
            GlyphMetrics {
                offset_x: left,
                offset_y: top,
                width: (r.ceil() as i32 - left).max(0) as u32,
                height: (b.ceil() as i32 - top).max(0) as u32,
                advance,
                baseline,
            }
        }
        None => GlyphMetrics {
            advance,
            baseline,
            ..GlyphMetrics::default()
        },
    }
}

fn rasterize_outline<F: Font>(
    font: &F,
    pen: Point,
    size: u32,
    text: &str,
    mut plot: impl FnMut(i32, i32, f32),
) {
    let scale = px_scale(font, size);
    let scaled_font = font.as_scaled(scale);
    let baseline_y = pen.y as f32 + scaled_font.ascent();

    let mut cursor_x = pen.x as f32;
    let mut prev_glyph: Option<ab_glyph::GlyphId> = None;

    for c in text.chars().filter(|c| !c.is_control()) {
        let glyph_id = scaled_font.glyph_id(c);
        if let Some(prev) = prev_glyph {
            cursor_x += scaled_font.kern(prev, glyph_id);
        }

        let glyph = glyph_id.with_scale_and_position(scale, ab_glyph::point(cursor_x, baseline_y));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                plot(
                    px as i32 + bounds.min.x as i32,
                    py as i32 + bounds.min.y as i32,
                    coverage,
                );
            });
        }

        cursor_x += scaled_font.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }
}

/// Advance of one built-in glyph: `ceil(0.55 * size)` for ASCII, one em otherwise.
fn builtin_advance(c: char, size: u32) -> u32 {
    if c.is_ascii() {
        (size * 11 + 19) / 20
    } else {
        size
    }
}

/// Ink columns `(left, right)` of each inked built-in glyph, relative to the pen.
fn builtin_glyph_boxes(size: u32, text: &str) -> (Vec<(i32, i32)>, u32) {
    let bearing = (size / 20) as i32;
    let mut boxes = Vec::new();
    let mut cursor = 0i32;

    for c in text.chars().filter(|c| !c.is_control()) {
        let advance = builtin_advance(c, size) as i32;
        if !c.is_whitespace() {
            let left = cursor + bearing;
            let right = (cursor + advance - bearing).max(left + 1);
            boxes.push((left, right));
        }
        cursor += advance;
    }

    (boxes, cursor.max(0) as u32)
}

fn builtin_vertical(size: u32) -> (i32, i32, i32) {
    let top = (size / 10) as i32;
    let bottom = size as i32 - top;
    let baseline = (size * 4 / 5) as i32;
    (top, bottom, baseline)
}

fn measure_builtin(size: u32, text: &str) -> GlyphMetrics {
    let (boxes, advance) = builtin_glyph_boxes(size, text);
    let (top, bottom, baseline) = builtin_vertical(size);

    match (boxes.first(), boxes.last()) {
        (Some(&(left, _)), Some(&(_, right))) => GlyphMetrics {
            offset_x: left,
            offset_y: top,
            width: (right - left) as u32,
            height: (bottom - top).max(1) as u32,
            advance,
            baseline,
        },
        _ => GlyphMetrics {
            advance,
            baseline,
            ..GlyphMetrics::default()
        },
    }
}

fn rasterize_builtin(pen: Point, size: u32, text: &str, mut plot: impl FnMut(i32, i32, f32)) {
    let (boxes, _) = builtin_glyph_boxes(size, text);
    let (top, bottom, _) = builtin_vertical(size);
    let thickness = (size / 16).max(1) as i32;

    for (left, right) in boxes {
        let (x0, x1) = (pen.x + left, pen.x + right);
        let (y0, y1) = (pen.y + top, pen.y + bottom.max(top + 1));
        for y in y0..y1 {
            for x in x0..x1 {
                let edge = x < x0 + thickness
                    || x >= x1 - thickness
                    || y < y0 + thickness
                    || y >= y1 - thickness;
                if edge {
                    plot(x, y, 1.0);
                }
            }
        }
    }
}

fn blend_mask(image: &mut RgbaImage, mask: &GrayImage, origin: Point, color: Color) {
    for (x, y, value) in mask.enumerate_pixels() {
        if value[0] > 0 {
            blend_coverage(
                image,
                origin.x + x as i32,
                origin.y + y as i32,
                color,
                value[0] as f32 / 255.0,
            );
        }
    }
}

/// Blend `color` scaled by `coverage` into the pixel at `(x, y)`, ignoring
/// coordinates outside the image.
fn blend_coverage(image: &mut RgbaImage, x: i32, y: i32, color: Color, coverage: f32) {
    if x < 0 || y < 0 || x >= image.width() as i32 || y >= image.height() as i32 {
        return;
    }
    if coverage <= 0.0 || color.a == 0 {
        return;
    }
    let existing = *image.get_pixel(x as u32, y as u32);
    image.put_pixel(
        x as u32,
        y as u32,
        blend_pixels(existing, color.to_rgba(), coverage),
    );
}
