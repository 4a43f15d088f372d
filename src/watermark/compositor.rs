//! Overlay rasterisation and compositing.
//!
//! A [`LayoutResult`] is flattened into an ordered list of [`DrawCommand`]s in
//! overlay coordinates, rendered into a transparent overlay raster, and the
//! raster is alpha-blended onto the photo.
//!
//! Paint order is fixed: background fills, decoration fills, text, then
//! decorative images.
//!
//! # Example
//!
//! ```ignore
//! use proofstamp::watermark::compositor::{compose, paste_overlay, OverlayRenderer};
//!
//! let commands = compose(&layout);
//! let overlay = OverlayRenderer::new(&fonts, &decorations)
//!     .render(layout.overlay.width(), layout.overlay.height(), &commands)?;
//! paste_overlay(&mut photo, &overlay, Point::new(layout.overlay.left, layout.overlay.top));
//! ```

use image::{GrayImage, Luma, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_polygon_mut};
use serde::Serialize;

use super::assets::Decorations;
use super::error::WatermarkError;
use super::fonts::FontLibrary;
use super::geometry::{Point, Rect};
use super::panel::{AssetKind, FillLayer, LayoutResult, PanelShape, ShapeFill};
use super::text_renderer::{Color, FontSpec, Outline};
use crate::codec::resize_rgba;

/// One primitive of the overlay, in overlay coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum DrawCommand {
    FillRect {
        rect: Rect,
        color: Color,
    },
    FillRoundedRect {
        rect: Rect,
        radius: u32,
        color: Color,
    },
    FillPolygon {
        points: Vec<Point>,
        color: Color,
    },
    Text {
        /// Pen origin (top of the em box, not the ink)
        pen: Point,
        text: String,
        font: FontSpec,
        color: Color,
        outline: Option<Outline>,
    },
    Image {
        asset: AssetKind,
        dest: Rect,
    },
}

impl DrawCommand {
    fn from_fill(fill: &ShapeFill, dx: i32, dy: i32) -> Option<Self> {
        let rect = fill.rect.translate(dx, dy);
        match &fill.shape {
            PanelShape::None => None,
            PanelShape::Rect => Some(Self::FillRect {
                rect,
                color: fill.color,
            }),
            PanelShape::RoundedRect { radius } => Some(Self::FillRoundedRect {
                rect,
                radius: *radius,
                color: fill.color,
            }),
            PanelShape::Polygon { points } => Some(Self::FillPolygon {
                points: points.iter().map(|p| Point::new(p.x + dx, p.y + dy)).collect(),
                color: fill.color,
            }),
        }
    }
}

/// Flatten a layout into paint-ordered commands relative to its overlay.
pub fn compose(layout: &LayoutResult) -> Vec<DrawCommand> {
    let (dx, dy) = (-layout.overlay.left, -layout.overlay.top);

    let fills: Vec<ShapeFill> = layout
        .panels
        .iter()
        .flat_map(|panel| panel.background().into_iter().chain(panel.accents.iter().cloned()))
        .collect();

    let mut commands = Vec::new();
    for layer in [FillLayer::Background, FillLayer::Decoration] {
        commands.extend(
            fills
                .iter()
                .filter(|fill| fill.layer == layer)
                .filter_map(|fill| DrawCommand::from_fill(fill, dx, dy)),
        );
    }

    for panel in &layout.panels {
        for run in &panel.texts {
            for (segment, pen) in run.segments.iter().zip(run.pen_positions()) {
                if segment.text.is_empty() {
                    continue;
                }
                commands.push(DrawCommand::Text {
                    pen: Point::new(pen.x + dx, pen.y + dy),
                    text: segment.text.clone(),
                    font: segment.font,
                    color: segment.color,
                    outline: run.outline,
                });
            }
        }
    }

    for panel in &layout.panels {
        for image in &panel.images {
            commands.push(DrawCommand::Image {
                asset: image.asset,
                dest: image.dest.translate(dx, dy),
            });
        }
    }

    commands
}

/// Rasterises draw commands with the request's fonts and decorations.
pub struct OverlayRenderer<'a> {
    fonts: &'a FontLibrary,
    decorations: &'a Decorations,
}

impl<'a> OverlayRenderer<'a> {
    pub fn new(fonts: &'a FontLibrary, decorations: &'a Decorations) -> Self {
        Self { fonts, decorations }
    }

    /// Render `commands` into a transparent `width` x `height` raster.
    pub fn render(
        &self,
        width: u32,
        height: u32,
        commands: &[DrawCommand],
    ) -> Result<RgbaImage, WatermarkError> {
        if width == 0 || height == 0 {
            return Err(WatermarkError::RenderError(format!(
                "empty overlay {}x{}",
                width, height
            )));
        }
        let mut overlay = RgbaImage::new(width, height);
        for command in commands {
            self.draw(&mut overlay, command)?;
        }
        Ok(overlay)
    }

    fn draw(&self, overlay: &mut RgbaImage, command: &DrawCommand) -> Result<(), WatermarkError> {
        match command {
            DrawCommand::FillRect { rect, color } => fill_rect(overlay, rect, *color),
            DrawCommand::FillRoundedRect {
                rect,
                radius,
                color,
            } => fill_rounded_rect(overlay, rect, *radius, *color),
            DrawCommand::FillPolygon { points, color } => fill_polygon(overlay, points, *color),
            DrawCommand::Text {
                pen,
                text,
                font,
                color,
                outline,
            } => {
                self.fonts
                    .face(font.family)
                    .draw(overlay, *pen, font.size, text, *color, *outline);
            }
            DrawCommand::Image { asset, dest } => {
                let Some(source) = self.decorations.get(*asset) else {
                    return Ok(());
                };
                if dest.is_empty() {
                    return Ok(());
                }
                let scaled = resize_rgba(source, dest.width(), dest.height())?;
                paste_overlay(overlay, &scaled, Point::new(dest.left, dest.top));
            }
        }
        Ok(())
    }
}

/// Rasterise a shape into a coverage mask covering `bounds`, then blend
/// `color` through it.
fn fill_masked(
    target: &mut RgbaImage,
    bounds: &Rect,
    color: Color,
    paint: impl FnOnce(&mut GrayImage),
) {
    if bounds.is_empty() || color.a == 0 {
        return;
    }
    let mut mask = GrayImage::new(bounds.width(), bounds.height());
    paint(&mut mask);

    let fill = color.to_rgba();
    for (mx, my, coverage) in mask.enumerate_pixels() {
        if coverage[0] == 0 {
            continue;
        }
        let x = bounds.left + mx as i32;
        let y = bounds.top + my as i32;
        if x < 0 || y < 0 || x >= target.width() as i32 || y >= target.height() as i32 {
            continue;
        }
        let existing = *target.get_pixel(x as u32, y as u32);
        let blended = blend_pixels(existing, fill, coverage[0] as f32 / 255.0);
        target.put_pixel(x as u32, y as u32, blended);
    }
}

const INSIDE: Luma<u8> = Luma([255]);

fn fill_rect(target: &mut RgbaImage, rect: &Rect, color: Color) {
    fill_masked(target, rect, color, |mask| {
        let (w, h) = mask.dimensions();
        draw_filled_rect_mut(mask, imageproc::rect::Rect::at(0, 0).of_size(w, h), INSIDE);
    });
}

fn fill_rounded_rect(target: &mut RgbaImage, rect: &Rect, radius: u32, color: Color) {
    fill_masked(target, rect, color, |mask| {
        let (w, h) = mask.dimensions();
        let r = radius.min(w / 2).min(h / 2);
        if r == 0 {
            draw_filled_rect_mut(mask, imageproc::rect::Rect::at(0, 0).of_size(w, h), INSIDE);
            return;
        }

        if w > 2 * r {
            let body = imageproc::rect::Rect::at(r as i32, 0).of_size(w - 2 * r, h);
            draw_filled_rect_mut(mask, body, INSIDE);
        }
        if h > 2 * r {
            let body = imageproc::rect::Rect::at(0, r as i32).of_size(w, h - 2 * r);
            draw_filled_rect_mut(mask, body, INSIDE);
        }

        let (ri, right, bottom) = (r as i32, w as i32 - 1 - r as i32, h as i32 - 1 - r as i32);
        for center in [(ri, ri), (right, ri), (ri, bottom), (right, bottom)] {
            draw_filled_circle_mut(mask, center, ri, INSIDE);
        }
    });
}

fn fill_polygon(target: &mut RgbaImage, points: &[Point], color: Color) {
    let mut vertices: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        if vertices.last() != Some(&p) {
            vertices.push(p);
        }
    }
    while vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    if vertices.len() < 3 {
        return;
    }

    let bounds = vertices.iter().skip(1).fold(
        Rect::new(vertices[0].x, vertices[0].y, vertices[0].x + 1, vertices[0].y + 1),
        |acc, p| acc.union(&Rect::new(p.x, p.y, p.x + 1, p.y + 1)),
    );
    let local: Vec<imageproc::point::Point<i32>> = vertices
        .iter()
        .map(|p| imageproc::point::Point::new(p.x - bounds.left, p.y - bounds.top))
        .collect();

    fill_masked(target, &bounds, color, |mask| {
        draw_polygon_mut(mask, &local, INSIDE);
    });
}

/// Blend `overlay` onto `target` with its top-left corner at `at`.
///
/// Pixels falling outside the target are skipped.
pub fn paste_overlay(target: &mut RgbaImage, overlay: &RgbaImage, at: Point) {
    let target_width = target.width() as i32;
    let target_height = target.height() as i32;

    let x_start = at.x.max(0);
    let y_start = at.y.max(0);
    let x_end = (at.x + overlay.width() as i32).min(target_width);
    let y_end = (at.y + overlay.height() as i32).min(target_height);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let source = *overlay.get_pixel((tx - at.x) as u32, (ty - at.y) as u32);
            if source[3] == 0 {
                continue;
            }
            let existing = *target.get_pixel(tx as u32, ty as u32);
            target.put_pixel(tx as u32, ty as u32, blend_pixels(existing, source, 1.0));
        }
    }
}

/// Blend two pixels using alpha compositing with additional opacity.
///
/// Uses the "over" operator: result = foreground + background * (1 - foreground.alpha)
pub(crate) fn blend_pixels(background: Rgba<u8>, foreground: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let fg_alpha = (foreground[3] as f32 / 255.0) * opacity.clamp(0.0, 1.0);
    let bg_alpha = background[3] as f32 / 255.0;

    // Porter-Duff "over" operator
    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let fg_f = fg as f32 / 255.0;
        let bg_f = bg as f32 / 255.0;
        let result = (fg_f * fg_alpha + bg_f * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend_channel(foreground[0], background[0]),
        blend_channel(foreground[1], background[1]),
        blend_channel(foreground[2], background[2]),
        (out_alpha * 255.0).round() as u8,
    ])
}
