//! Pixel-space geometry for overlay layout.
//!
//! All coordinates are integer pixels in the source image's space. A [`Rect`]
//! is half-open: it covers columns `left..right` and rows `top..bottom`.
//!
//! # Example
//!
//! ```ignore
//! use proofstamp::watermark::geometry::{ImageDimensions, Orientation, Rect};
//!
//! let image = ImageDimensions { width: 1080, height: 1920 };
//! assert_eq!(image.orientation(), Orientation::Portrait);
//!
//! let card = Rect::from_xywh(24, 1500, 886, 260);
//! assert!(card.within(&image));
//! ```

use serde::Serialize;

/// Dimensions of the target image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Portrait only when strictly taller than wide; squares lay out as landscape.
    pub fn orientation(&self) -> Orientation {
        if self.height > self.width {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        }
    }

    pub fn short_side(&self) -> u32 {
        self.width.min(self.height)
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width as i32, self.height as i32)
    }
}

/// Image orientation, selecting between ratio tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Axis-aligned half-open pixel box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    /// Build a rect, normalising swapped edges so `left <= right` and `top <= bottom`.
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left: left.min(right),
            top: top.min(bottom),
            right: left.max(right),
            bottom: top.max(bottom),
        }
    }

    pub fn from_xywh(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self::new(x, y, x + width as i32, y + height as i32)
    }

    pub fn width(&self) -> u32 {
        (self.right - self.left) as u32
    }

    pub fn height(&self) -> u32 {
        (self.bottom - self.top) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.left == self.right || self.top == self.bottom
    }

    /// True when `other` lies entirely inside `self`.
    pub fn contains(&self, other: &Rect) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right <= self.right
            && other.bottom <= self.bottom
    }

    /// True when the two boxes share at least one pixel.
    pub fn intersects(&self, other: &Rect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    pub fn within(&self, image: &ImageDimensions) -> bool {
        image.bounds().contains(self)
    }

    /// Shift by `(dx, dy)`.
    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect {
            left: self.left + dx,
            top: self.top + dy,
            right: self.right + dx,
            bottom: self.bottom + dy,
        }
    }

    /// Clip to `bounds`. A rect entirely outside collapses onto the nearest edge.
    pub fn clip_to(&self, bounds: &Rect) -> Rect {
        let left = self.left.clamp(bounds.left, bounds.right);
        let right = self.right.clamp(bounds.left, bounds.right);
        let top = self.top.clamp(bounds.top, bounds.bottom);
        let bottom = self.bottom.clamp(bounds.top, bounds.bottom);
        Rect::new(left, top, right, bottom)
    }

    /// Smallest rect covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect::new(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }
}

/// Integer pixel point used for polygon vertices and text anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Round a ratio of a pixel length to whole pixels.
pub fn scaled(length: u32, ratio: f32) -> u32 {
    (length as f32 * ratio).round().max(0.0) as u32
}

/// Scale `(width, height)` to `target_height`, preserving the aspect ratio.
///
/// Width never collapses below one pixel for a non-empty source.
pub fn fit_to_height(width: u32, height: u32, target_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 || target_height == 0 {
        return (0, 0);
    }
    let w = (width as f64 * target_height as f64 / height as f64).round() as u32;
    (w.max(1), target_height)
}
