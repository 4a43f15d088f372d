//! Font size search against width and height budgets.
//!
//! The fitter starts from a preferred size and shrinks until the measured
//! block fits, never going below the role's minimum. When even the minimum
//! does not fit it reports overflow instead of failing.

use serde::Serialize;

use super::text_renderer::{FontSpec, TextMeasurer};
use super::wrap::WrappedBlock;

/// How the size shrinks between measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum ShrinkPolicy {
    /// Jump straight to the size the overflow ratio suggests
    Proportional { max_rounds: u32 },
    /// Step down a fixed number of pixels
    Linear { step: u32 },
}

impl Default for ShrinkPolicy {
    fn default() -> Self {
        Self::Proportional { max_rounds: 40 }
    }
}

impl ShrinkPolicy {
    pub fn linear() -> Self {
        Self::Linear { step: 2 }
    }
}

/// Spacing between wrapped lines for a font size.
pub fn line_spacing_for(size: u32, ratio: f32) -> u32 {
    ((size as f32 * ratio) as u32).max(2)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitRequest {
    /// Font at its preferred size
    pub font: FontSpec,
    pub min_size: u32,
    pub max_width: u32,
    pub max_height: u32,
    /// Wrap to `max_width` instead of only splitting on newlines
    pub wrap: bool,
    /// Line spacing as a fraction of the font size
    pub line_spacing: f32,
}

impl FitRequest {
    pub fn single_line(font: FontSpec, min_size: u32, max_width: u32, max_height: u32) -> Self {
        Self {
            font,
            min_size,
            max_width,
            max_height,
            wrap: false,
            line_spacing: 0.15,
        }
    }

    pub fn wrapped(
        font: FontSpec,
        min_size: u32,
        max_width: u32,
        max_height: u32,
        line_spacing: f32,
    ) -> Self {
        Self {
            font,
            min_size,
            max_width,
            max_height,
            wrap: true,
            line_spacing,
        }
    }

    fn block<M: TextMeasurer + ?Sized>(&self, measurer: &M, text: &str, font: &FontSpec) -> WrappedBlock {
        let spacing = line_spacing_for(font.size, self.line_spacing);
        if self.wrap {
            WrappedBlock::wrapped(measurer, text, font, self.max_width, spacing)
        } else {
            WrappedBlock::unwrapped(measurer, text, font, spacing)
        }
    }
}

/// Result of a fit: the chosen font and the block measured at that size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FitOutcome {
    pub font: FontSpec,
    pub block: WrappedBlock,
    /// The block still exceeds a budget at the returned size
    pub overflow: bool,
    /// Number of measurements taken
    pub iterations: u32,
}

/// Find the largest size (searching downward from the preferred size) at
/// which `text` fits the request's budgets.
pub fn fit<M: TextMeasurer + ?Sized>(
    measurer: &M,
    text: &str,
    request: &FitRequest,
    policy: ShrinkPolicy,
) -> FitOutcome {
    let min_size = request.min_size.max(1);
    let mut size = request.font.size.max(min_size);
    let mut iterations = 0u32;

    loop {
        iterations += 1;
        let font = request.font.with_size(size);
        let block = request.block(measurer, text, &font);
        let (width, height) = (block.width(), block.height());
        let over_width = width > request.max_width;
        let over_height = height > request.max_height;

        if !over_width && !over_height {
            return FitOutcome {
                font,
                block,
                overflow: false,
                iterations,
            };
        }

        let next = match policy {
            ShrinkPolicy::Proportional { max_rounds } => {
                if iterations >= max_rounds.max(1) {
                    None
                } else {
                    let mut ratio = 1.0f64;
                    if over_width {
                        ratio = ratio.min(request.max_width as f64 / width as f64);
                    }
                    if over_height {
                        ratio = ratio.min(request.max_height as f64 / height as f64);
                    }
                    let proposed = (size as f64 * ratio).floor() as u32;
                    Some(proposed.min(size.saturating_sub(1)).max(min_size))
                }
            }
            ShrinkPolicy::Linear { step } => {
                Some(size.saturating_sub(step.max(1)).max(min_size))
            }
        };

        match next {
            Some(next) if next < size => size = next,
            _ => {
                tracing::debug!(
                    size,
                    min_size,
                    width,
                    height,
                    max_width = request.max_width,
                    max_height = request.max_height,
                    "Text does not fit at minimum size"
                );
                return FitOutcome {
                    font,
                    block,
                    overflow: true,
                    iterations,
                };
            }
        }
    }
}
