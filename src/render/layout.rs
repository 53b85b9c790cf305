//! Pixel geometry shared by the bar shader and the text overlay.

use crate::audio::analysis::Frame;
use crate::audio::features::{Chroma, N_CHROMA};

/// Gap between neighbouring bars as a fraction of one bar slot.
pub const BAR_GAP: f32 = 0.2;
pub const FRAME_THICKNESS: f32 = 2.0;

/// Plot area in pixels, origin top-left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlotRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl PlotRect {
    /// Leaves room above for the readout and below for the pitch labels.
    pub fn for_canvas(width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self {
            left: (w * 0.06).round(),
            top: (h * 0.24).round(),
            right: (w * 0.94).round(),
            bottom: (h * 0.86).round(),
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn slot_width(&self) -> f32 {
        self.width() / N_CHROMA as f32
    }

    pub fn bar_center(&self, class: usize) -> f32 {
        self.left + (class as f32 + 0.5) * self.slot_width()
    }

    pub fn as_array(&self) -> [f32; 4] {
        [self.left, self.top, self.right, self.bottom]
    }
}

/// Top-left corner for a pitch-class label of `text_width` pixels.
pub fn label_origin(plot: &PlotRect, class: usize, text_width: u32) -> (u32, u32) {
    let x = plot.bar_center(class) - text_width as f32 / 2.0;
    (x.max(0.0) as u32, (plot.bottom + 8.0) as u32)
}

/// Top-left corner for readout line `line`.
pub fn readout_origin(width: u32, height: u32, line: usize, line_height: u32) -> (u32, u32) {
    let margin = (width.min(height) as f32 * 0.04) as u32;
    (margin, margin + line as u32 * line_height)
}

pub fn readout_lines(frame: &Frame) -> [String; 3] {
    [
        format!("Time: {:.2}s", frame.time),
        format!("Chord: {}", frame.chord),
        format!("Freq: {:.0} Hz", frame.frequency_hz),
    ]
}

/// Twelve values packed as three vec4s for the uniform buffer.
pub fn pack_chroma(chroma: &Chroma) -> [[f32; 4]; 3] {
    let mut packed = [[0.0; 4]; 3];
    for (i, value) in chroma.iter().enumerate() {
        packed[i / 4][i % 4] = *value;
    }
    packed
}
