//! Greedy line wrapping under a pixel width budget.

use serde::Serialize;

use super::text_renderer::{FontSpec, GlyphMetrics, TextMeasurer};

/// Split `text` into lines whose ink width fits `max_width`.
///
/// Packing is per code point, so CJK text breaks anywhere. `\n` forces a
/// break and `\r` is dropped. A character wider than the budget on its own
/// still gets a line to itself rather than being truncated.
pub fn wrap<M: TextMeasurer + ?Sized>(
    measurer: &M,
    text: &str,
    font: &FontSpec,
    max_width: u32,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        match ch {
            '\r' => continue,
            '\n' => {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                continue;
            }
            _ => {}
        }

        let mut candidate = current.clone();
        candidate.push(ch);
        if measurer.measure(font, &candidate).width <= max_width {
            current = candidate;
        } else {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            current.push(ch);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// One measured line of a [`WrappedBlock`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrappedLine {
    pub text: String,
    pub metrics: GlyphMetrics,
}

/// Measured lines stacked with fixed spacing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct WrappedBlock {
    pub lines: Vec<WrappedLine>,
    pub line_spacing: u32,
}

impl WrappedBlock {
    /// Measure already-split lines.
    pub fn measure<M: TextMeasurer + ?Sized>(
        measurer: &M,
        font: &FontSpec,
        lines: Vec<String>,
        line_spacing: u32,
    ) -> Self {
        let lines = lines
            .into_iter()
            .map(|text| {
                let metrics = measurer.measure(font, &text);
                WrappedLine { text, metrics }
            })
            .collect();
        Self {
            lines,
            line_spacing,
        }
    }

    /// Wrap `text` to `max_width` and measure the result.
    pub fn wrapped<M: TextMeasurer + ?Sized>(
        measurer: &M,
        text: &str,
        font: &FontSpec,
        max_width: u32,
        line_spacing: u32,
    ) -> Self {
        let lines = wrap(measurer, text, font, max_width);
        Self::measure(measurer, font, lines, line_spacing)
    }

    /// Split on explicit newlines only.
    pub fn unwrapped<M: TextMeasurer + ?Sized>(
        measurer: &M,
        text: &str,
        font: &FontSpec,
        line_spacing: u32,
    ) -> Self {
        let lines = text
            .split('\n')
            .map(|line| line.replace('\r', ""))
            .filter(|line| !line.is_empty())
            .collect();
        Self::measure(measurer, font, lines, line_spacing)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Widest line's ink width.
    pub fn width(&self) -> u32 {
        self.lines
            .iter()
            .map(|l| l.metrics.width)
            .max()
            .unwrap_or(0)
    }

    /// Sum of line ink heights plus spacing between lines.
    pub fn height(&self) -> u32 {
        if self.lines.is_empty() {
            return 0;
        }
        let ink: u32 = self.lines.iter().map(|l| l.metrics.height).sum();
        ink + self.line_spacing * (self.lines.len() as u32 - 1)
    }
}
