//! Typed layout records produced by the planner.
//!
//! Every coordinate here is in source-image pixels. The composer translates
//! them into overlay space; nothing downstream re-measures text.

use serde::Serialize;

use super::config::Theme;
use super::geometry::{ImageDimensions, Orientation, Point, Rect};
use super::text_renderer::{Color, FontSpec, GlyphMetrics, Outline};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PanelKind {
    Card,
    Ribbon,
    Header,
    TimeBlock,
    DateBlock,
    LocationBlock,
    BrandBlock,
    SecurityLine,
}

/// Fill geometry. `Rect` and `RoundedRect` fill the owner's rect; polygon
/// points are absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum PanelShape {
    None,
    Rect,
    RoundedRect { radius: u32 },
    Polygon { points: Vec<Point> },
}

/// Paint order of a filled shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FillLayer {
    /// Card body and markers
    Background,
    /// Ribbons, dividers and other shapes painted over the background
    Decoration,
}

/// A filled shape drawn as part of a panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShapeFill {
    pub rect: Rect,
    pub shape: PanelShape,
    pub color: Color,
    pub layer: FillLayer,
}

/// One piece of a text run sharing the run's baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextSegment {
    pub text: String,
    pub font: FontSpec,
    pub color: Color,
    pub metrics: GlyphMetrics,
}

impl TextSegment {
    pub fn new(text: impl Into<String>, font: FontSpec, color: Color, metrics: GlyphMetrics) -> Self {
        Self {
            text: text.into(),
            font,
            color,
            metrics,
        }
    }
}

/// Ink extent of a sequence of segments on one baseline, measured from the
/// first segment's ink left edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunExtent {
    pub width: u32,
    /// Ink rows above the baseline
    pub above: i32,
    /// Ink rows at and below the baseline
    pub below: i32,
}

impl RunExtent {
    pub fn of(segments: &[TextSegment], tracking: i32) -> Self {
        let Some(first) = segments.first() else {
            return Self::default();
        };

        let mut pen_x = -first.metrics.offset_x;
        let mut bounds: Option<(i32, i32, i32, i32)> = None;

        for segment in segments {
            let m = &segment.metrics;
            if m.has_ink() {
                let left = pen_x + m.offset_x;
                let right = left + m.width as i32;
                let top = m.offset_y - m.baseline;
                let bottom = top + m.height as i32;
                bounds = Some(match bounds {
                    None => (left, top, right, bottom),
                    Some((l, t, r, b)) => (l.min(left), t.min(top), r.max(right), b.max(bottom)),
                });
            }
            pen_x += m.advance as i32 + tracking;
        }

        match bounds {
            Some((_, top, right, bottom)) => Self {
                width: right.max(0) as u32,
                above: -top,
                below: bottom,
            },
            None => Self::default(),
        }
    }

    pub fn height(&self) -> u32 {
        (self.above + self.below).max(0) as u32
    }
}

/// Text placed by its ink box.
///
/// Segments share `baseline`; the first segment's ink starts at `ink.left`
/// and each following segment starts one advance (plus `tracking`) later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextRun {
    pub segments: Vec<TextSegment>,
    pub ink: Rect,
    pub baseline: i32,
    /// Extra pixels between segments
    pub tracking: i32,
    pub outline: Option<Outline>,
}

impl TextRun {
    /// A single segment whose ink top-left lands at `(left, top)`.
    pub fn single(segment: TextSegment, left: i32, top: i32) -> Self {
        let m = segment.metrics;
        Self {
            ink: Rect::from_xywh(left, top, m.width, m.height),
            baseline: top - m.offset_y + m.baseline,
            segments: vec![segment],
            tracking: 0,
            outline: None,
        }
    }

    /// Segments on a shared `baseline`, the first segment's ink starting at `left`.
    pub fn compound(segments: Vec<TextSegment>, left: i32, baseline: i32, tracking: i32) -> Self {
        let extent = RunExtent::of(&segments, tracking);
        Self {
            ink: Rect::new(
                left,
                baseline - extent.above,
                left + extent.width as i32,
                baseline + extent.below,
            ),
            baseline,
            segments,
            tracking,
            outline: None,
        }
    }

    pub fn with_outline(mut self, outline: Outline) -> Self {
        self.outline = Some(outline);
        self
    }

    /// Pen origin of every segment.
    pub fn pen_positions(&self) -> Vec<Point> {
        let Some(first) = self.segments.first() else {
            return Vec::new();
        };
        let mut pen_x = self.ink.left - first.metrics.offset_x;
        self.segments
            .iter()
            .map(|segment| {
                let pen = Point::new(pen_x, self.baseline - segment.metrics.baseline);
                pen_x += segment.metrics.advance as i32 + self.tracking;
                pen
            })
            .collect()
    }

    pub fn translate(&mut self, dx: i32, dy: i32) {
        self.ink = self.ink.translate(dx, dy);
        self.baseline += dy;
    }
}

/// Decorative raster slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Separator,
    Logo,
}

impl AssetKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Separator => "separator.png",
            Self::Logo => "logo.png",
        }
    }
}

/// A decorative image scaled into `dest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImagePlacement {
    pub asset: AssetKind,
    pub dest: Rect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Panel {
    pub kind: PanelKind,
    /// Index of the containing panel in [`LayoutResult::panels`]
    pub parent: Option<usize>,
    pub rect: Rect,
    pub shape: PanelShape,
    pub fill: Option<Color>,
    /// Extra fills owned by this panel (markers, separator bars)
    pub accents: Vec<ShapeFill>,
    pub texts: Vec<TextRun>,
    pub images: Vec<ImagePlacement>,
}

impl Panel {
    pub fn new(kind: PanelKind, parent: Option<usize>, rect: Rect) -> Self {
        Self {
            kind,
            parent,
            rect,
            shape: PanelShape::None,
            fill: None,
            accents: Vec::new(),
            texts: Vec::new(),
            images: Vec::new(),
        }
    }

    pub fn filled(mut self, shape: PanelShape, color: Color) -> Self {
        self.shape = shape;
        self.fill = Some(color);
        self
    }

    /// The panel's own fill as a [`ShapeFill`], if it has one.
    pub fn background(&self) -> Option<ShapeFill> {
        let color = self.fill?;
        let layer = match self.shape {
            PanelShape::None => return None,
            PanelShape::Polygon { .. } => FillLayer::Decoration,
            PanelShape::Rect | PanelShape::RoundedRect { .. } => FillLayer::Background,
        };
        Some(ShapeFill {
            rect: self.rect,
            shape: self.shape.clone(),
            color,
            layer,
        })
    }

    /// Shift everything the panel owns by `(dx, dy)`.
    pub(crate) fn translate(&mut self, dx: i32, dy: i32) {
        self.rect = self.rect.translate(dx, dy);
        translate_shape(&mut self.shape, dx, dy);
        for accent in &mut self.accents {
            accent.rect = accent.rect.translate(dx, dy);
            translate_shape(&mut accent.shape, dx, dy);
        }
        for run in &mut self.texts {
            run.translate(dx, dy);
        }
        for image in &mut self.images {
            image.dest = image.dest.translate(dx, dy);
        }
    }

    fn clip_to(&mut self, bounds: &Rect) {
        self.rect = self.rect.clip_to(bounds);
        clip_shape(&mut self.shape, bounds);
        for accent in &mut self.accents {
            accent.rect = accent.rect.clip_to(bounds);
            clip_shape(&mut accent.shape, bounds);
        }
        for run in &mut self.texts {
            run.ink = run.ink.clip_to(bounds);
        }
        for image in &mut self.images {
            image.dest = image.dest.clip_to(bounds);
        }
    }
}

fn translate_shape(shape: &mut PanelShape, dx: i32, dy: i32) {
    if let PanelShape::Polygon { points } = shape {
        for p in points.iter_mut() {
            p.x += dx;
            p.y += dy;
        }
    }
}

fn clip_shape(shape: &mut PanelShape, bounds: &Rect) {
    if let PanelShape::Polygon { points } = shape {
        for p in points.iter_mut() {
            p.x = p.x.clamp(bounds.left, bounds.right);
            p.y = p.y.clamp(bounds.top, bounds.bottom);
        }
    }
}

/// Complete arrangement of the overlay for one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutResult {
    pub image_width: u32,
    pub image_height: u32,
    pub orientation: Orientation,
    pub theme: Theme,
    /// Region of the image covered by the overlay raster
    pub overlay: Rect,
    pub panels: Vec<Panel>,
    /// Some content could not fit its budget even at minimum sizes
    pub overflow: bool,
    /// Shrink rounds taken by the planner
    pub rounds: u32,
    /// Final card-unit scale factor
    pub scale: f32,
}

impl LayoutResult {
    pub fn dimensions(&self) -> ImageDimensions {
        ImageDimensions::new(self.image_width, self.image_height)
    }

    pub fn panel(&self, kind: PanelKind) -> Option<&Panel> {
        self.panels.iter().find(|p| p.kind == kind)
    }

    pub fn children(&self, parent: usize) -> impl Iterator<Item = &Panel> + '_ {
        self.panels.iter().filter(move |p| p.parent == Some(parent))
    }

    /// Clip every rect and polygon to the image.
    pub(crate) fn clip_to_image(&mut self) {
        let bounds = self.dimensions().bounds();
        self.overlay = self.overlay.clip_to(&bounds);
        for panel in &mut self.panels {
            panel.clip_to(&bounds);
        }
    }

    /// Geometric invariants that do not hold for this layout.
    ///
    /// Checks image containment, parent containment, sibling overlap and
    /// text placement. Text containment is skipped for overflowing layouts.
    pub fn geometry_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let image = self.dimensions();

        if !self.overlay.within(&image) {
            problems.push(format!("overlay {:?} exceeds the image", self.overlay));
        }

        for (i, panel) in self.panels.iter().enumerate() {
            if !panel.rect.within(&image) {
                problems.push(format!("{:?} {:?} exceeds the image", panel.kind, panel.rect));
            }
            if !self.overlay.contains(&panel.rect) {
                problems.push(format!("{:?} lies outside the overlay", panel.kind));
            }
            if let Some(parent) = panel.parent.and_then(|p| self.panels.get(p)) {
                if !parent.rect.contains(&panel.rect) {
                    problems.push(format!("{:?} escapes parent {:?}", panel.kind, parent.kind));
                }
            }
            for other in self.panels.iter().skip(i + 1) {
                if other.parent == panel.parent && panel.rect.intersects(&other.rect) {
                    problems.push(format!("{:?} overlaps {:?}", panel.kind, other.kind));
                }
            }
            for accent in &panel.accents {
                if !panel.rect.contains(&accent.rect) {
                    problems.push(format!("accent escapes {:?}", panel.kind));
                }
            }
            for image in &panel.images {
                if !panel.rect.contains(&image.dest) {
                    problems.push(format!("{:?} image escapes {:?}", image.asset, panel.kind));
                }
            }
            if !self.overflow {
                for run in &panel.texts {
                    if !panel.rect.contains(&run.ink) {
                        let text: String = run.segments.iter().map(|s| s.text.as_str()).collect();
                        problems.push(format!("text '{}' escapes {:?}", text, panel.kind));
                    }
                }
            }
        }

        problems
    }
}
