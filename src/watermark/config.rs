//! Watermark style configuration.
//!
//! Every proportion used by the layout planner lives here so deployments can
//! override it from YAML. All ratios are fractions of a reference length:
//! image width for panel widths, image height for the overlay band, and the
//! card unit (a third of the card width) for paddings and card font sizes.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::geometry::Orientation;
use super::text_renderer::Color;

// Default values
fn default_margin_ratio() -> f32 {
    0.022
}

fn default_overlay_height() -> RatioBand {
    RatioBand::new(0.08, 0.28, 0.35)
}

fn default_card_width_portrait() -> RatioBand {
    RatioBand::new(0.75, 0.82, 0.90)
}

fn default_card_width_landscape() -> RatioBand {
    RatioBand::new(0.33, 0.36, 0.40)
}

fn default_brand_width_portrait() -> f32 {
    0.40
}

fn default_brand_width_landscape() -> f32 {
    0.165
}

fn default_brand_min_width() -> f32 {
    0.10
}

fn default_card_unit() -> f32 {
    1.0 / 3.0
}

fn default_location_max_lines() -> u32 {
    2
}

fn default_line_spacing() -> f32 {
    0.15
}

fn default_max_rounds() -> u32 {
    8
}

fn default_fitter_rounds() -> u32 {
    40
}

fn default_location_step() -> u32 {
    2
}

/// Closed set of overlay skins sharing one planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Rounded card with a vertical notched ribbon on its left edge
    #[default]
    Card,
    /// Rounded card with a horizontal header ribbon and a time/date separator
    Banner,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Banner => "banner",
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "card" => Ok(Theme::Card),
            "banner" => Ok(Theme::Banner),
            other => Err(format!("unknown theme '{}', expected card or banner", other)),
        }
    }
}

/// What to do when a configured decorative asset cannot be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetPolicy {
    /// Omit the decoration (drawing a plain substitute where one exists)
    #[default]
    Skip,
    /// Abort the request
    Fail,
}

/// A preferred ratio with hard lower and upper limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioBand {
    pub min: f32,
    pub target: f32,
    pub max: f32,
}

impl RatioBand {
    pub fn new(min: f32, target: f32, max: f32) -> Self {
        Self { min, target, max }
    }

    /// The target clamped into `[min, max]`.
    pub fn preferred(&self) -> f32 {
        self.target.clamp(self.min, self.max)
    }

    pub(crate) fn validate(&self, name: &str) -> Result<(), String> {
        let in_unit = |v: f32| v > 0.0 && v <= 1.0;
        if !in_unit(self.min) || !in_unit(self.target) || !in_unit(self.max) {
            return Err(format!("{}: ratios must be within (0, 1]", name));
        }
        if self.min > self.target || self.target > self.max {
            return Err(format!("{}: expected min <= target <= max", name));
        }
        Ok(())
    }
}

/// Font size ratios. Card fonts scale with the card unit, brand fonts with
/// the brand block width (slogan and security scale with the brand size).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontRatios {
    pub ribbon: f32,
    pub title: f32,
    pub divider: f32,
    pub time: f32,
    pub date: f32,
    pub weather: f32,
    pub location: f32,
    pub brand: f32,
    pub slogan: f32,
    pub security: f32,
}

impl Default for FontRatios {
    fn default() -> Self {
        Self {
            ribbon: 0.24,
            title: 0.18,
            divider: 0.15,
            time: 0.46,
            date: 0.20,
            weather: 0.16,
            location: 0.18,
            brand: 0.27,
            slogan: 0.65,
            security: 0.55,
        }
    }
}

/// Minimum font sizes (pixels) per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontMinimums {
    pub time: u32,
    pub date: u32,
    pub location: u32,
    pub brand: u32,
    pub label: u32,
}

impl Default for FontMinimums {
    fn default() -> Self {
        Self {
            time: 16,
            date: 10,
            location: 10,
            brand: 10,
            label: 8,
        }
    }
}

/// Card geometry ratios, in card units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardRatios {
    pub padding_x: f32,
    pub padding_y: f32,
    pub corner_radius: f32,
    pub ribbon_width: f32,
    /// Notch depth as a fraction of the ribbon width (card theme) or height (banner theme)
    pub notch_depth: f32,
    /// Notch height as a fraction of the card height
    pub notch_height: f32,
    /// Banner header height, in card units
    pub header_height: f32,
    pub marker_size: f32,
}

impl Default for CardRatios {
    fn default() -> Self {
        Self {
            padding_x: 0.12,
            padding_y: 0.16,
            corner_radius: 0.09,
            ribbon_width: 0.17,
            notch_depth: 0.22,
            notch_height: 0.36,
            header_height: 0.30,
            marker_size: 0.07,
        }
    }
}

/// Overridable layout proportions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutStyle {
    #[serde(default = "default_margin_ratio")]
    pub margin_ratio: f32,

    /// Overlay band height as a fraction of image height
    #[serde(default = "default_overlay_height")]
    pub overlay_height: RatioBand,

    /// Card width as a fraction of image width, for portrait images
    #[serde(default = "default_card_width_portrait")]
    pub card_width_portrait: RatioBand,

    /// Card width as a fraction of image width, for landscape images
    #[serde(default = "default_card_width_landscape")]
    pub card_width_landscape: RatioBand,

    #[serde(default = "default_brand_width_portrait")]
    pub brand_width_portrait: f32,

    #[serde(default = "default_brand_width_landscape")]
    pub brand_width_landscape: f32,

    /// Brand block floor, as a fraction of image width
    #[serde(default = "default_brand_min_width")]
    pub brand_min_width: f32,

    /// Card unit as a fraction of card width
    #[serde(default = "default_card_unit")]
    pub card_unit: f32,

    #[serde(default)]
    pub card: CardRatios,

    #[serde(default)]
    pub fonts: FontRatios,

    #[serde(default)]
    pub min_font: FontMinimums,

    /// Maximum wrapped location lines at the base size
    #[serde(default = "default_location_max_lines")]
    pub location_max_lines: u32,

    /// Line spacing as a fraction of font size
    #[serde(default = "default_line_spacing")]
    pub line_spacing: f32,

    /// Ceiling on fixed-point shrink rounds
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    /// Ceiling on proportional fitter rounds
    #[serde(default = "default_fitter_rounds")]
    pub fitter_rounds: u32,

    /// Linear step for location shrinking, in pixels
    #[serde(default = "default_location_step")]
    pub location_step: u32,
}

impl Default for LayoutStyle {
    fn default() -> Self {
        Self {
            margin_ratio: default_margin_ratio(),
            overlay_height: default_overlay_height(),
            card_width_portrait: default_card_width_portrait(),
            card_width_landscape: default_card_width_landscape(),
            brand_width_portrait: default_brand_width_portrait(),
            brand_width_landscape: default_brand_width_landscape(),
            brand_min_width: default_brand_min_width(),
            card_unit: default_card_unit(),
            card: CardRatios::default(),
            fonts: FontRatios::default(),
            min_font: FontMinimums::default(),
            location_max_lines: default_location_max_lines(),
            line_spacing: default_line_spacing(),
            max_rounds: default_max_rounds(),
            fitter_rounds: default_fitter_rounds(),
            location_step: default_location_step(),
        }
    }
}

impl LayoutStyle {
    pub fn card_width(&self, orientation: Orientation) -> RatioBand {
        match orientation {
            Orientation::Portrait => self.card_width_portrait,
            Orientation::Landscape => self.card_width_landscape,
        }
    }

    pub fn brand_width(&self, orientation: Orientation) -> f32 {
        match orientation {
            Orientation::Portrait => self.brand_width_portrait,
            Orientation::Landscape => self.brand_width_landscape,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.overlay_height.validate("overlay_height")?;
        self.card_width_portrait.validate("card_width_portrait")?;
        self.card_width_landscape.validate("card_width_landscape")?;

        for (name, value) in [
            ("margin_ratio", self.margin_ratio),
            ("brand_width_portrait", self.brand_width_portrait),
            ("brand_width_landscape", self.brand_width_landscape),
            ("brand_min_width", self.brand_min_width),
            ("card_unit", self.card_unit),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(format!("{}: ratio must be within (0, 1]", name));
            }
        }
        if self.brand_min_width > self.brand_width_landscape.max(self.brand_width_portrait) {
            return Err("brand_min_width exceeds the brand width ratios".to_string());
        }
        if self.location_max_lines == 0 {
            return Err("location_max_lines must be at least 1".to_string());
        }
        if self.max_rounds == 0 || self.fitter_rounds == 0 {
            return Err("round limits must be at least 1".to_string());
        }
        if self.location_step == 0 {
            return Err("location_step must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Overlay colours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub card: Color,
    pub ribbon: Color,
    pub ribbon_text: Color,
    pub marker: Color,
    pub primary_text: Color,
    pub secondary_text: Color,
    pub decorative_text: Color,
    pub location_text: Color,
    pub security_code: Color,
    pub outline: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            card: Color::with_alpha(0x2F, 0x63, 0xFF, 0.92),
            ribbon: Color::rgba(0xFF, 0xC8, 0x3A, 255),
            ribbon_text: Color::with_alpha(0, 0, 0, 0.9),
            marker: Color::rgba(0xF2, 0x49, 0x3A, 255),
            primary_text: Color::with_alpha(255, 255, 255, 0.90),
            secondary_text: Color::with_alpha(255, 255, 255, 0.75),
            decorative_text: Color::with_alpha(255, 255, 255, 0.45),
            location_text: Color::with_alpha(255, 255, 255, 0.96),
            security_code: Color::rgba(0xFF, 0xC8, 0x3A, 255),
            outline: Color::with_alpha(0, 0, 0, 0.55),
        }
    }
}

/// Fixed strings and fallbacks for empty fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextDefaults {
    pub brand_name: String,
    pub slogan: String,
    pub security_label: String,
    pub divider: String,
    pub default_location: String,
    pub default_category: String,
    pub default_group: String,
}

impl Default for TextDefaults {
    fn default() -> Self {
        Self {
            brand_name: "Your Camera".to_string(),
            slogan: "Traceable & Trusted".to_string(),
            security_label: "Anti-fake: ".to_string(),
            divider: ">>>>>>>>".to_string(),
            default_location: "未知地点".to_string(),
            default_category: "执勤巡逻".to_string(),
            default_group: "工作记录".to_string(),
        }
    }
}
