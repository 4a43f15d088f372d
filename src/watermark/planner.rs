//! Adaptive overlay layout.
//!
//! Sizing and positioning are separate passes. Sizing runs in rounds: every
//! block is measured at the current scale and, while the stacked height
//! exceeds the overlay budget, the scale shrinks by the overshoot ratio.
//! Blocks are built in local coordinates and only moved into place once
//! their sizes are final.
//!
//! Landscape images get two bottom-aligned columns (card and location on the
//! left, brand and security on the right). Portrait images stack the brand
//! group above the card group.

use super::assets::Decorations;
use super::config::{CardRatios, LayoutStyle, Palette, TextDefaults, Theme};
use super::fields::ResolvedFields;
use super::fitter::{fit, line_spacing_for, FitRequest, ShrinkPolicy};
use super::geometry::{fit_to_height, scaled, ImageDimensions, Orientation, Point, Rect};
use super::panel::{
    AssetKind, FillLayer, ImagePlacement, LayoutResult, Panel, PanelKind, PanelShape, RunExtent,
    ShapeFill, TextRun, TextSegment,
};
use super::text_renderer::{Color, FamilyRef, FontRole, FontSpec, Outline, TextMeasurer};

/// Letter spacing of the header divider, as a fraction of its font size
const DIVIDER_TRACKING: f32 = 0.08;
/// Line spacing of the vertical ribbon label
const VERTICAL_SPACING: f32 = 0.02;
/// Brand line spacing, as a fraction of the mean line height
const BRAND_LINE_SPACING: f32 = 0.07;
/// Width of the plain separator bar, in card units
const SEPARATOR_BAR: f32 = 0.03;
/// Share of the card's inner width offered to the date column
const DATE_SHARE_PERCENT: u32 = 45;

/// Width decisions made once per image.
#[derive(Debug, Clone, Copy)]
struct Frame {
    dims: ImageDimensions,
    orientation: Orientation,
    margin: u32,
    card_width: u32,
    brand_width: u32,
    /// Widest the brand column may grow when its text cannot fit at its floor
    brand_room: u32,
    /// Card unit in pixels at scale 1
    unit: f32,
    /// Floors forced the columns wider than the image allows
    squeezed: bool,
}

/// Card paddings at one scale.
#[derive(Debug, Clone, Copy)]
struct CardMetrics {
    pad_x: u32,
    pad_y: u32,
    corner: u32,
    row_gap: u32,
    location_gap: u32,
    marker: u32,
}

impl CardMetrics {
    fn new(ratios: &CardRatios, us: f32) -> Self {
        let pad_y = px(us, ratios.padding_y);
        Self {
            pad_x: px(us, ratios.padding_x),
            pad_y,
            corner: px(us, ratios.corner_radius),
            row_gap: ((pad_y as f32 * 0.4).ceil() as u32).max(1),
            location_gap: ((pad_y as f32 * 0.5).round() as u32).max(1),
            marker: px(us, ratios.marker_size).max(2),
        }
    }
}

fn px(us: f32, ratio: f32) -> u32 {
    (us * ratio).round().max(0.0) as u32
}

/// Collapse a field onto one line.
fn flatten(text: &str) -> String {
    text.replace('\r', "").replace('\n', " ").trim().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

impl Align {
    fn offset(self, container: u32, width: u32) -> i32 {
        match self {
            Self::Left => 0,
            Self::Right => (container as i32 - width as i32).max(0),
        }
    }
}

/// A single-line text fitted to its budget.
struct FittedLine {
    segment: Option<TextSegment>,
    size: u32,
    overflow: bool,
}

impl FittedLine {
    fn width(&self) -> u32 {
        self.segment.as_ref().map_or(0, |s| s.metrics.width)
    }

    fn height(&self) -> u32 {
        self.segment.as_ref().map_or(0, |s| s.metrics.height)
    }

    fn run_at(&self, left: i32, top: i32) -> Option<TextRun> {
        self.segment
            .clone()
            .map(|segment| TextRun::single(segment, left, top))
    }
}

/// A multi-segment run fitted to a width.
struct FittedRun {
    segments: Vec<TextSegment>,
    extent: RunExtent,
    tracking: i32,
    size: u32,
    overflow: bool,
}

/// Panels of one block in local coordinates, plus the sizes chosen for it.
#[derive(Default)]
struct Group {
    height: u32,
    panels: Vec<Panel>,
    sizes: Vec<u32>,
    overflow: bool,
    /// Ink width actually used, for blocks whose column can widen
    width: u32,
}

impl Group {
    fn record(&mut self, size: u32, overflow: bool) {
        self.sizes.push(size);
        self.overflow |= overflow;
    }
}

/// Every block measured at one scale.
struct Content {
    card: Group,
    location: Group,
    brand: Group,
    security: Group,
    location_gap: u32,
    brand_gap: u32,
    /// Width of the brand and security column
    column_width: u32,
}

impl Content {
    fn left_height(&self) -> u32 {
        self.card.height + self.location_gap + self.location.height
    }

    fn right_height(&self) -> u32 {
        self.brand.height + self.brand_gap + self.security.height
    }

    fn height(&self, frame: &Frame) -> u32 {
        match frame.orientation {
            Orientation::Landscape => self.left_height().max(self.right_height()),
            Orientation::Portrait => self.right_height() + frame.margin + self.left_height(),
        }
    }

    fn sizes(&self) -> Vec<u32> {
        [&self.card, &self.location, &self.brand, &self.security]
            .iter()
            .flat_map(|g| g.sizes.iter().copied())
            .collect()
    }

    fn overflow(&self) -> bool {
        self.card.overflow || self.location.overflow || self.brand.overflow || self.security.overflow
    }
}

/// Move a group's panels into place, rebasing parent indices.
fn place(panels: &mut Vec<Panel>, group: Group, dx: i32, dy: i32) {
    let base = panels.len();
    for mut panel in group.panels {
        panel.parent = panel.parent.map(|p| p + base);
        panel.translate(dx, dy);
        panels.push(panel);
    }
}

/// Fit card and brand columns side by side. The card gives way first, then
/// the brand; neither drops below its floor.
fn squeeze_columns(available: u32, gap: u32, card: (u32, u32), brand: (u32, u32)) -> (u32, u32, bool) {
    let (mut card_width, card_min) = card;
    let (mut brand_width, brand_min) = brand;

    let mut excess = (card_width + gap + brand_width).saturating_sub(available);
    let cut = excess.min(card_width.saturating_sub(card_min));
    card_width -= cut;
    excess -= cut;
    let cut = excess.min(brand_width.saturating_sub(brand_min));
    brand_width -= cut;
    excess -= cut;

    (card_width, brand_width, excess > 0)
}

/// Plans overlay layouts for one theme and style.
pub struct LayoutPlanner<'a> {
    theme: Theme,
    style: &'a LayoutStyle,
    palette: &'a Palette,
    text: &'a TextDefaults,
}

impl<'a> LayoutPlanner<'a> {
    pub fn new(
        theme: Theme,
        style: &'a LayoutStyle,
        palette: &'a Palette,
        text: &'a TextDefaults,
    ) -> Self {
        Self {
            theme,
            style,
            palette,
            text,
        }
    }

    /// Compute the overlay layout for an image.
    ///
    /// Pure: the same inputs always produce the same layout.
    pub fn plan<M: TextMeasurer + ?Sized>(
        &self,
        measurer: &M,
        image_width: u32,
        image_height: u32,
        fields: &ResolvedFields,
        decorations: &Decorations,
    ) -> LayoutResult {
        let frame = self.frame(ImageDimensions::new(image_width, image_height));
        let budget = scaled(image_height, self.style.overlay_height.preferred());

        let mut scale = 1.0f32;
        let mut content = self.measure(measurer, &frame, fields, decorations, scale);
        let mut rounds = 1u32;
        let mut overflow = false;

        loop {
            let height = content.height(&frame);
            if height <= budget {
                break;
            }
            if rounds >= self.style.max_rounds {
                overflow = true;
                break;
            }

            let next_scale = scale * budget as f32 / height as f32;
            let next = self.measure(measurer, &frame, fields, decorations, next_scale);
            rounds += 1;
            let stalled = next.sizes() == content.sizes();

            tracing::debug!(
                round = rounds,
                scale = next_scale,
                height = next.height(&frame),
                budget,
                "Layout shrink round"
            );

            scale = next_scale;
            content = next;
            if stalled && content.height(&frame) > budget {
                overflow = true;
                break;
            }
        }

        let max_height = scaled(image_height, self.style.overlay_height.max);
        overflow |= content.overflow() || frame.squeezed || content.height(&frame) > max_height;

        let mut layout = self.position(&frame, content, scale, rounds, overflow);
        layout.clip_to_image();
        layout
    }

    fn frame(&self, dims: ImageDimensions) -> Frame {
        let orientation = dims.orientation();
        let margin = scaled(dims.short_side(), self.style.margin_ratio);
        let available = dims.width.saturating_sub(2 * margin);

        let band = self.style.card_width(orientation);
        let card_target = scaled(dims.width, band.preferred());
        let card_min = scaled(dims.width, band.min);
        let brand_target = scaled(dims.width, self.style.brand_width(orientation));
        let brand_min = scaled(dims.width, self.style.brand_min_width).min(brand_target);

        let (card_width, brand_width, squeezed) = match orientation {
            Orientation::Landscape => squeeze_columns(
                available,
                margin,
                (card_target, card_min),
                (brand_target, brand_min),
            ),
            Orientation::Portrait => {
                let card = card_target.min(available).max(card_min);
                let brand = brand_target.min(available).max(brand_min);
                (card, brand, card > available || brand > available)
            }
        };

        let brand_room = match orientation {
            Orientation::Landscape => available.saturating_sub(card_width + margin),
            Orientation::Portrait => available,
        }
        .max(brand_width);

        Frame {
            dims,
            orientation,
            margin,
            card_width,
            brand_width,
            brand_room,
            unit: card_width as f32 * self.style.card_unit,
            squeezed,
        }
    }

    fn measure<M: TextMeasurer + ?Sized>(
        &self,
        measurer: &M,
        frame: &Frame,
        fields: &ResolvedFields,
        decorations: &Decorations,
        scale: f32,
    ) -> Content {
        let us = frame.unit * scale;
        let metrics = CardMetrics::new(&self.style.card, us);
        let align = match frame.orientation {
            Orientation::Landscape => Align::Left,
            Orientation::Portrait => Align::Right,
        };
        let brand_size = (self.style.fonts.brand * frame.brand_width as f32 * scale).round() as u32;

        let card = match self.theme {
            Theme::Card => self.card_block(measurer, frame.card_width, &metrics, us, fields),
            Theme::Banner => {
                self.banner_block(measurer, frame.card_width, &metrics, us, fields, decorations)
            }
        };
        let location = self.location_block(measurer, frame.card_width, &metrics, us, fields);
        let right_column = |width: u32| {
            let (brand, gap) = self.brand_block(measurer, width, brand_size, align, decorations);
            let security = self.security_line(measurer, width, brand_size, align, fields);
            (brand, gap, security)
        };

        // Text that overflows at the column floor may take the free width
        // beside the card, trimmed back to what the wide build used
        let mut column_width = frame.brand_width;
        let mut column = right_column(column_width);
        if (column.0.overflow || column.2.overflow) && frame.brand_room > column_width {
            let wide = right_column(frame.brand_room);
            let used = wide.0.width.max(wide.2.width);
            column_width = used.clamp(frame.brand_width, frame.brand_room);
            let fitted = right_column(column_width);
            column = if fitted.0.overflow || fitted.2.overflow {
                column_width = frame.brand_room;
                wide
            } else {
                fitted
            };
            tracing::debug!(
                from = frame.brand_width,
                to = column_width,
                "Widened brand column"
            );
        }
        let (brand, brand_gap, security) = column;

        Content {
            card,
            location,
            brand,
            security,
            location_gap: metrics.location_gap,
            brand_gap,
            column_width,
        }
    }

    fn position(
        &self,
        frame: &Frame,
        content: Content,
        scale: f32,
        rounds: u32,
        overflow: bool,
    ) -> LayoutResult {
        let dims = frame.dims;
        let margin = frame.margin as i32;
        let content_height = content.height(frame);

        let min_height = scaled(dims.height, self.style.overlay_height.min);
        let overlay_height = content_height
            .max(min_height)
            .min(dims.height.saturating_sub(frame.margin));
        let overlay_top = (dims.height as i32 - overlay_height as i32 - margin).max(0);
        let overlay = Rect::new(
            0,
            overlay_top,
            dims.width as i32,
            overlay_top + overlay_height as i32,
        );

        let left_top = overlay.bottom - content.left_height() as i32;
        let right_top = match frame.orientation {
            Orientation::Landscape => overlay.bottom - content.right_height() as i32,
            Orientation::Portrait => left_top - margin - content.right_height() as i32,
        };
        let brand_left = dims.width as i32 - margin - content.column_width as i32;
        let location_top = left_top + (content.card.height + content.location_gap) as i32;
        let security_top = right_top + (content.brand.height + content.brand_gap) as i32;

        let mut panels = Vec::new();
        place(&mut panels, content.card, margin, left_top);
        place(&mut panels, content.location, margin, location_top);
        place(&mut panels, content.brand, brand_left, right_top);
        place(&mut panels, content.security, brand_left, security_top);

        LayoutResult {
            image_width: dims.width,
            image_height: dims.height,
            orientation: frame.orientation,
            theme: self.theme,
            overlay,
            panels,
            overflow,
            rounds,
            scale,
        }
    }

    fn min_size(&self, role: FontRole) -> u32 {
        self.style.min_font.for_role(role)
    }

    fn font(&self, family: FamilyRef, role: FontRole, preferred: u32) -> FontSpec {
        FontSpec::new(family, role, preferred.max(self.min_size(role)))
    }

    fn proportional(&self) -> ShrinkPolicy {
        ShrinkPolicy::Proportional {
            max_rounds: self.style.fitter_rounds,
        }
    }

    fn fit_line<M: TextMeasurer + ?Sized>(
        &self,
        measurer: &M,
        text: &str,
        font: FontSpec,
        color: Color,
        max_width: u32,
        max_height: u32,
    ) -> FittedLine {
        let text = flatten(text);
        let request = FitRequest {
            font,
            min_size: self.min_size(font.role),
            max_width,
            max_height,
            wrap: false,
            line_spacing: self.style.line_spacing,
        };
        let outcome = fit(measurer, &text, &request, self.proportional());
        let segment = outcome
            .block
            .lines
            .into_iter()
            .next()
            .map(|line| TextSegment::new(line.text, outcome.font, color, line.metrics));

        FittedLine {
            segment,
            size: outcome.font.size,
            overflow: outcome.overflow,
        }
    }

    /// Shrink a segmented run until its ink fits `max_width`.
    fn fit_run(
        &self,
        start: FontSpec,
        max_width: u32,
        tracking_ratio: f32,
        build: impl Fn(FontSpec) -> Vec<TextSegment>,
    ) -> FittedRun {
        let min_size = self.min_size(start.role);
        let mut size = start.size.max(min_size);

        loop {
            let segments = build(start.with_size(size));
            let tracking = (size as f32 * tracking_ratio).round() as i32;
            let extent = RunExtent::of(&segments, tracking);
            let overflow = extent.width > max_width;

            if !overflow || size <= min_size {
                return FittedRun {
                    segments,
                    extent,
                    tracking,
                    size,
                    overflow,
                };
            }

            let proposed = (size as u64 * max_width as u64 / extent.width as u64) as u32;
            size = proposed.min(size - 1).max(min_size);
        }
    }

    /// Rounded card with a vertical notched ribbon.
    fn card_block<M: TextMeasurer + ?Sized>(
        &self,
        measurer: &M,
        card_w: u32,
        cm: &CardMetrics,
        us: f32,
        fields: &ResolvedFields,
    ) -> Group {
        let ratios = &self.style.card;
        let fonts = &self.style.fonts;
        let palette = self.palette;
        let mut group = Group::default();

        let ribbon_w = px(us, ratios.ribbon_width).max(2).min(card_w);
        let notch_depth = (ribbon_w as f32 * ratios.notch_depth).round() as u32;
        let inner_left = (ribbon_w + cm.pad_x) as i32;
        let inner_w = card_w.saturating_sub(ribbon_w + 2 * cm.pad_x).max(1);
        let gap_x = (cm.pad_x / 2).max(1);

        // Header: group label left, spaced divider right
        let divider_font = self.font(FamilyRef::DISPLAY, FontRole::Label, px(us, fonts.divider));
        let divider = self.fit_run(divider_font, inner_w * 2 / 5, DIVIDER_TRACKING, |font| {
            self.text
                .divider
                .chars()
                .map(|c| {
                    let glyph = c.to_string();
                    let metrics = measurer.measure(&font, &glyph);
                    TextSegment::new(glyph, font, palette.decorative_text, metrics)
                })
                .collect()
        });
        group.record(divider.size, divider.overflow);

        let title_budget = inner_w
            .saturating_sub(divider.extent.width + gap_x)
            .max(1);
        let title = self.fit_line(
            measurer,
            &fields.group_label,
            self.font(FamilyRef::DISPLAY, FontRole::Label, px(us, fonts.title)),
            palette.primary_text,
            title_budget,
            u32::MAX,
        );
        group.record(title.size, title.overflow);

        let header_top = cm.pad_y as i32;
        let header_h = title.height().max(divider.extent.height());
        let mut header = Panel::new(
            PanelKind::Header,
            Some(0),
            Rect::from_xywh(inner_left, header_top, inner_w, header_h),
        );
        header.texts.extend(title.run_at(inner_left, header_top));
        if !divider.segments.is_empty() {
            let left = inner_left + inner_w as i32 - divider.extent.width as i32;
            header.texts.push(TextRun::compound(
                divider.segments,
                left,
                header_top + divider.extent.above,
                divider.tracking,
            ));
        }

        // Time with the date bottom-aligned beside it
        let row_top = header_top + (header_h + cm.row_gap) as i32;
        let date = self.fit_line(
            measurer,
            &fields.date,
            self.font(FamilyRef::DISPLAY, FontRole::Date, px(us, fonts.date)),
            palette.secondary_text,
            inner_w * DATE_SHARE_PERCENT / 100,
            u32::MAX,
        );
        let time = self.fit_line(
            measurer,
            &fields.time,
            self.font(FamilyRef::DISPLAY, FontRole::Time, px(us, fonts.time)),
            palette.primary_text,
            inner_w.saturating_sub(date.width() + gap_x).max(1),
            u32::MAX,
        );
        group.record(date.size, date.overflow);
        group.record(time.size, time.overflow);

        let row_h = time.height().max(date.height());
        let row_bottom = row_top + row_h as i32;
        let mut time_block = Panel::new(
            PanelKind::TimeBlock,
            Some(0),
            Rect::from_xywh(inner_left, row_top, time.width(), row_h),
        );
        time_block
            .texts
            .extend(time.run_at(inner_left, row_bottom - time.height() as i32));

        let date_left = inner_left + (time.width() + gap_x) as i32;
        let mut date_block = Panel::new(
            PanelKind::DateBlock,
            Some(0),
            Rect::from_xywh(date_left, row_top, date.width(), row_h),
        );
        date_block
            .texts
            .extend(date.run_at(date_left, row_bottom - date.height() as i32));

        let card_h = (row_bottom + cm.pad_y as i32) as u32;

        // Ribbon with a notch cut into its right edge
        let (rw, nd, ch) = (ribbon_w as i32, notch_depth as i32, card_h as i32);
        let notch_h = (card_h as f32 * ratios.notch_height).round() as i32;
        let notch_top = (ch - notch_h) / 2;
        let points = vec![
            Point::new(0, 0),
            Point::new(rw, 0),
            Point::new(rw, notch_top),
            Point::new(rw - nd, notch_top + notch_h / 2),
            Point::new(rw, notch_top + notch_h),
            Point::new(rw, ch),
            Point::new(0, ch),
        ];
        let mut ribbon = Panel::new(PanelKind::Ribbon, Some(0), Rect::from_xywh(0, 0, ribbon_w, card_h))
            .filled(PanelShape::Polygon { points }, palette.ribbon);

        // Category label, one glyph per row, centred left of the notch
        let label_w = ribbon_w.saturating_sub(notch_depth);
        let vertical: Vec<String> = flatten(&fields.category_label)
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(String::from)
            .collect();
        let request = FitRequest {
            font: self.font(FamilyRef::DISPLAY, FontRole::Label, px(us, fonts.ribbon)),
            min_size: self.min_size(FontRole::Label),
            max_width: label_w.saturating_sub(2).max(1),
            max_height: card_h.saturating_sub(cm.pad_y).max(1),
            wrap: false,
            line_spacing: VERTICAL_SPACING,
        };
        let outcome = fit(measurer, &vertical.join("\n"), &request, self.proportional());
        group.record(outcome.font.size, outcome.overflow);

        let mut y = (ch - outcome.block.height() as i32) / 2;
        for line in outcome.block.lines {
            let x = (label_w as i32 - line.metrics.width as i32) / 2;
            let height = line.metrics.height as i32;
            let segment = TextSegment::new(line.text, outcome.font, palette.ribbon_text, line.metrics);
            ribbon.texts.push(TextRun::single(segment, x, y));
            y += height + outcome.block.line_spacing as i32;
        }

        let card = Panel::new(PanelKind::Card, None, Rect::from_xywh(0, 0, card_w, card_h)).filled(
            PanelShape::RoundedRect {
                radius: cm.corner.min(card_h / 2),
            },
            palette.card,
        );

        group.height = card_h;
        group.panels = vec![card, ribbon, header, time_block, date_block];
        group
    }

    /// Rounded card with a horizontal arrow-notched header ribbon.
    fn banner_block<M: TextMeasurer + ?Sized>(
        &self,
        measurer: &M,
        card_w: u32,
        cm: &CardMetrics,
        us: f32,
        fields: &ResolvedFields,
        decorations: &Decorations,
    ) -> Group {
        let ratios = &self.style.card;
        let fonts = &self.style.fonts;
        let palette = self.palette;
        let mut group = Group::default();

        // Header ribbon inset from the card edges, arrow pointing right
        let inset = (cm.pad_y / 2).max(1) as i32;
        let hx = (cm.pad_x / 2).max(1);
        let header_h = px(us, ratios.header_height).max(4);
        let header_w = card_w.saturating_sub(2 * hx).max(1);
        let notch = (header_h as f32 * ratios.notch_depth).round() as i32;
        let (hl, ht) = (hx as i32, inset);
        let (hr, hb) = (hl + header_w as i32, inset + header_h as i32);
        let points = vec![
            Point::new(hl, ht),
            Point::new(hr - notch, ht),
            Point::new(hr, ht + header_h as i32 / 2),
            Point::new(hr - notch, hb),
            Point::new(hl, hb),
        ];
        let mut header = Panel::new(PanelKind::Header, Some(0), Rect::new(hl, ht, hr, hb))
            .filled(PanelShape::Polygon { points }, palette.ribbon);

        let v_pad = (header_h / 8).max(1);
        let text_left = hl + hx as i32;
        let text_right = hr - notch - hx as i32;
        let label_budget = ((text_right - text_left - hx as i32).max(2) / 2) as u32;
        let label_h = header_h.saturating_sub(2 * v_pad).max(1);
        let label_font = self.font(FamilyRef::DISPLAY, FontRole::Label, px(us, fonts.title));

        let category = self.fit_line(
            measurer,
            &fields.category_label,
            label_font,
            palette.ribbon_text,
            label_budget,
            label_h,
        );
        let title = self.fit_line(
            measurer,
            &fields.group_label,
            label_font,
            palette.ribbon_text,
            label_budget,
            label_h,
        );
        group.record(category.size, category.overflow);
        group.record(title.size, title.overflow);

        let centred = |h: u32| ht + (header_h as i32 - h as i32) / 2;
        header
            .texts
            .extend(category.run_at(text_left, centred(category.height())));
        header.texts.extend(
            title.run_at(text_right - title.width() as i32, centred(title.height())),
        );

        // Body row: time, separator, date stack
        let inner_left = cm.pad_x as i32;
        let inner_w = card_w.saturating_sub(2 * cm.pad_x).max(1);
        let gap_x = (cm.pad_x / 2).max(1);
        let row_top = hb + cm.row_gap as i32;

        let stack_budget = inner_w * DATE_SHARE_PERCENT / 100;
        let date = self.fit_line(
            measurer,
            &fields.date,
            self.font(FamilyRef::DISPLAY, FontRole::Date, px(us, fonts.date)),
            palette.secondary_text,
            stack_budget,
            u32::MAX,
        );
        let conditions = self.fit_line(
            measurer,
            &fields.conditions_line(),
            self.font(FamilyRef::DISPLAY, FontRole::Date, px(us, fonts.weather)),
            palette.secondary_text,
            stack_budget,
            u32::MAX,
        );
        group.record(date.size, date.overflow);
        group.record(conditions.size, conditions.overflow);

        let stack_gap = if conditions.segment.is_some() {
            line_spacing_for(date.size, self.style.line_spacing)
        } else {
            0
        };
        let stack_w = date.width().max(conditions.width());
        let stack_h = date.height() + stack_gap + conditions.height();

        let separator_asset = decorations.size(AssetKind::Separator);
        let separator_width = |ink_h: u32| -> u32 {
            if ink_h == 0 {
                return 0;
            }
            match separator_asset {
                Some((w, h)) => fit_to_height(w, h, ink_h).0,
                None => px(us, SEPARATOR_BAR).max(2),
            }
        };

        let time_font = self.font(FamilyRef::DISPLAY, FontRole::Time, px(us, fonts.time));
        let estimate = measurer.measure(&time_font, &flatten(&fields.time)).height;
        let time_budget = inner_w
            .saturating_sub(stack_w + 2 * gap_x + separator_width(estimate))
            .max(1);
        let time = self.fit_line(
            measurer,
            &fields.time,
            time_font,
            palette.primary_text,
            time_budget,
            u32::MAX,
        );
        group.record(time.size, time.overflow);

        let time_h = time.height();
        let row_h = time_h.max(stack_h);
        let time_top = row_top + (row_h - time_h) as i32 / 2;
        let separator = Rect::from_xywh(
            inner_left + (time.width() + gap_x) as i32,
            time_top,
            separator_width(time_h),
            time_h,
        );

        let mut time_block = Panel::new(
            PanelKind::TimeBlock,
            Some(0),
            Rect::new(inner_left, row_top, separator.right, row_top + row_h as i32),
        );
        time_block.texts.extend(time.run_at(inner_left, time_top));
        if !separator.is_empty() {
            match separator_asset {
                Some(_) => time_block.images.push(ImagePlacement {
                    asset: AssetKind::Separator,
                    dest: separator,
                }),
                None => time_block.accents.push(ShapeFill {
                    rect: separator,
                    shape: PanelShape::Rect,
                    color: palette.decorative_text,
                    layer: FillLayer::Decoration,
                }),
            }
        }

        let stack_left = separator.right + gap_x as i32;
        let stack_top = row_top + (row_h - stack_h) as i32 / 2;
        let mut date_block = Panel::new(
            PanelKind::DateBlock,
            Some(0),
            Rect::from_xywh(stack_left, row_top, stack_w, row_h),
        );
        date_block.texts.extend(date.run_at(stack_left, stack_top));
        date_block.texts.extend(
            conditions.run_at(stack_left, stack_top + (date.height() + stack_gap) as i32),
        );

        let card_h = (row_top + row_h as i32) as u32 + cm.pad_y;
        let card = Panel::new(PanelKind::Card, None, Rect::from_xywh(0, 0, card_w, card_h)).filled(
            PanelShape::RoundedRect {
                radius: cm.corner.min(card_h / 2),
            },
            palette.card,
        );

        group.height = card_h;
        group.panels = vec![card, header, time_block, date_block];
        group
    }

    /// Red marker plus the wrapped location, below the card.
    fn location_block<M: TextMeasurer + ?Sized>(
        &self,
        measurer: &M,
        card_w: u32,
        cm: &CardMetrics,
        us: f32,
        fields: &ResolvedFields,
    ) -> Group {
        let mut group = Group::default();
        let marker = cm.marker.min(card_w);
        let text_left = marker + (cm.pad_x / 2).max(1);
        let text_w = card_w.saturating_sub(text_left).max(1);

        let base = self.font(
            FamilyRef::DISPLAY,
            FontRole::Location,
            px(us, self.style.fonts.location),
        );
        let text = fields.location.replace('\r', "");
        let lines = self.style.location_max_lines;
        let line_h = measurer.measure(&base, &flatten(&text)).height.max(1);
        let spacing = line_spacing_for(base.size, self.style.line_spacing);
        let allotted = line_h * lines + spacing * lines.saturating_sub(1);

        let request = FitRequest::wrapped(
            base,
            self.min_size(FontRole::Location),
            text_w,
            allotted,
            self.style.line_spacing,
        );
        let outcome = fit(
            measurer,
            &text,
            &request,
            ShrinkPolicy::Linear {
                step: self.style.location_step,
            },
        );
        group.record(outcome.font.size, outcome.overflow);

        let height = marker.max(outcome.block.height());
        let mut panel = Panel::new(
            PanelKind::LocationBlock,
            None,
            Rect::from_xywh(0, 0, card_w, height),
        );
        panel.accents.push(ShapeFill {
            rect: Rect::from_xywh(0, 0, marker, marker),
            shape: PanelShape::Rect,
            color: self.palette.marker,
            layer: FillLayer::Background,
        });

        let line_spacing = outcome.block.line_spacing as i32;
        let mut y = 0;
        for line in outcome.block.lines {
            let height = line.metrics.height as i32;
            let segment = TextSegment::new(
                line.text,
                outcome.font,
                self.palette.location_text,
                line.metrics,
            );
            panel.texts.push(TextRun::single(segment, text_left as i32, y));
            y += height + line_spacing;
        }

        group.height = height;
        group.panels = vec![panel];
        group
    }

    /// Outlined brand name (with optional logo) over the slogan.
    ///
    /// Returns the group and the line spacing to use below it.
    fn brand_block<M: TextMeasurer + ?Sized>(
        &self,
        measurer: &M,
        brand_w: u32,
        brand_size: u32,
        align: Align,
        decorations: &Decorations,
    ) -> (Group, u32) {
        let palette = self.palette;
        let mut group = Group::default();

        let name_font = self.font(FamilyRef::BRAND, FontRole::Brand, brand_size);
        let name_text = flatten(&self.text.brand_name);
        let outline_w = (name_font.size / 16).max(1);
        let logo = decorations.size(AssetKind::Logo);
        let logo_gap = if logo.is_some() {
            (name_font.size / 4).max(1)
        } else {
            0
        };
        let logo_estimate = logo.map_or(0, |(w, h)| {
            fit_to_height(w, h, measurer.measure(&name_font, &name_text).height).0
        });

        let name = self.fit_line(
            measurer,
            &name_text,
            name_font,
            palette.primary_text,
            brand_w
                .saturating_sub(logo_estimate + logo_gap + 2 * outline_w)
                .max(1),
            u32::MAX,
        );
        let slogan = self.fit_line(
            measurer,
            &self.text.slogan,
            self.font(
                FamilyRef::BRAND,
                FontRole::Label,
                (brand_size as f32 * self.style.fonts.slogan).round() as u32,
            ),
            palette.primary_text,
            brand_w,
            u32::MAX,
        );
        group.record(name.size, name.overflow);
        group.record(slogan.size, slogan.overflow);

        let (logo_w, logo_h) = logo.map_or((0, 0), |(w, h)| fit_to_height(w, h, name.height()));
        let logo_gap = if logo_w > 0 { logo_gap } else { 0 };
        let spacing =
            ((((name.height() + slogan.height()) / 2) as f32 * BRAND_LINE_SPACING) as u32).max(1);

        let ow = outline_w as i32;
        let top = ow;
        let row_w = logo_w + logo_gap + name.width() + 2 * outline_w;
        let row_left = align.offset(brand_w, row_w);

        let mut panel = Panel::new(PanelKind::BrandBlock, None, Rect::default());
        if logo_w > 0 {
            panel.images.push(ImagePlacement {
                asset: AssetKind::Logo,
                dest: Rect::from_xywh(row_left, top, logo_w, logo_h),
            });
        }
        let outline = Outline {
            width: outline_w,
            color: palette.outline,
        };
        panel.texts.extend(
            name.run_at(row_left + (logo_w + logo_gap) as i32 + ow, top)
                .map(|run| run.with_outline(outline)),
        );

        let slogan_top = top + name.height() as i32 + ow + spacing as i32;
        panel
            .texts
            .extend(slogan.run_at(align.offset(brand_w, slogan.width()), slogan_top));

        let height = (slogan_top + slogan.height() as i32) as u32;
        panel.rect = Rect::from_xywh(0, 0, brand_w, height);

        group.height = height;
        group.width = row_w.max(slogan.width());
        group.panels = vec![panel];
        (group, spacing)
    }

    /// Security label and code as one two-colour run.
    fn security_line<M: TextMeasurer + ?Sized>(
        &self,
        measurer: &M,
        brand_w: u32,
        brand_size: u32,
        align: Align,
        fields: &ResolvedFields,
    ) -> Group {
        let palette = self.palette;
        let mut group = Group::default();

        let label = self.text.security_label.replace(['\r', '\n'], "");
        let code = flatten(&fields.security_code);
        let font = self.font(
            FamilyRef::DISPLAY,
            FontRole::Label,
            (brand_size as f32 * self.style.fonts.security).round() as u32,
        );

        let run = self.fit_run(font, brand_w, 0.0, |font| {
            let mut segments = Vec::with_capacity(2);
            if !label.is_empty() {
                let metrics = measurer.measure(&font, &label);
                segments.push(TextSegment::new(label.clone(), font, palette.secondary_text, metrics));
            }
            let metrics = measurer.measure(&font, &code);
            segments.push(TextSegment::new(code.clone(), font, palette.security_code, metrics));
            segments
        });
        group.record(run.size, run.overflow);

        let height = run.extent.height();
        group.width = run.extent.width;
        let mut panel = Panel::new(
            PanelKind::SecurityLine,
            None,
            Rect::from_xywh(0, 0, brand_w, height),
        );
        let left = align.offset(brand_w, run.extent.width);
        panel.texts.push(TextRun::compound(
            run.segments,
            left,
            run.extent.above,
            run.tracking,
        ));

        group.height = height;
        group.panels = vec![panel];
        group
    }
}
