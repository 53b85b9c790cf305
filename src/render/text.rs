use anyhow::{Context, Result};
use fontdue::{Font, FontSettings};
use std::path::Path;

/// Fonts tried when neither `--font` nor `--font-url` is usable.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

pub struct TextOverlay {
    font: Font,
    font_size: f32,
}

impl TextOverlay {
    pub fn new(font_bytes: &[u8], font_size: f32) -> Result<Self> {
        let font = Font::from_bytes(font_bytes, FontSettings::default())
            .map_err(|e| anyhow::anyhow!("Failed to parse font: {}", e))?;
        Ok(Self { font, font_size })
    }

    pub fn line_height(&self) -> u32 {
        self.font
            .horizontal_line_metrics(self.font_size)
            .map(|m| m.new_line_size)
            .unwrap_or(self.font_size * 1.2)
            .ceil() as u32
    }

    /// Composite text onto an RGBA pixel buffer at the given position.
    #[allow(clippy::too_many_arguments)]
    pub fn composite(
        &self,
        pixels: &mut [u8],
        width: u32,
        height: u32,
        text: &str,
        x: u32,
        y: u32,
        color: [u8; 4],
    ) {
        let mut cursor_x = x as i32;
        for ch in text.chars() {
            let (metrics, bitmap) = self.font.rasterize(ch, self.font_size);
            let glyph_y = y as i32 + self.font_size as i32 - metrics.height as i32 - metrics.ymin;

            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let alpha = bitmap[gy * metrics.width + gx];
                    if alpha == 0 {
                        continue;
                    }

                    let px = cursor_x + gx as i32;
                    let py = glyph_y + gy as i32;
                    if px < 0 || py < 0 || px >= width as i32 || py >= height as i32 {
                        continue;
                    }

                    let idx = ((py as u32 * width + px as u32) * 4) as usize;
                    if idx + 3 >= pixels.len() {
                        continue;
                    }
                    blend(&mut pixels[idx..idx + 4], color, alpha);
                }
            }

            cursor_x += metrics.advance_width as i32;
        }
    }

    /// Measure the width of rendered text in pixels.
    pub fn measure_width(&self, text: &str) -> u32 {
        text.chars()
            .map(|ch| self.font.metrics(ch, self.font_size).advance_width)
            .sum::<f32>()
            .ceil() as u32
    }
}

fn blend(pixel: &mut [u8], color: [u8; 4], coverage: u8) {
    let a = coverage as f32 / 255.0 * (color[3] as f32 / 255.0);
    let inv_a = 1.0 - a;
    for c in 0..3 {
        pixel[c] = (color[c] as f32 * a + pixel[c] as f32 * inv_a) as u8;
    }
    pixel[3] = 255;
}

pub fn load_font_from_url(url: &str) -> Result<Vec<u8>> {
    log::info!("Downloading font from {}", url);
    let response = reqwest::blocking::get(url)
        .with_context(|| format!("Failed to fetch font from {}", url))?
        .error_for_status()
        .with_context(|| format!("Font server rejected {}", url))?;
    let bytes = response.bytes().context("Failed to read font response")?;
    Ok(bytes.to_vec())
}

/// Font bytes from an explicit path, a URL, or the first system font found.
/// `None` means text is skipped.
pub fn load_font(path: Option<&Path>, url: Option<&str>) -> Option<Vec<u8>> {
    if let Some(path) = path {
        match std::fs::read(path) {
            Ok(bytes) => return Some(bytes),
            Err(err) => log::warn!("Failed to read font {}: {}", path.display(), err),
        }
    }
    if let Some(url) = url {
        match load_font_from_url(url) {
            Ok(bytes) => return Some(bytes),
            Err(err) => log::warn!("Failed to load font from URL: {:#}", err),
        }
    }
    let found = SYSTEM_FONTS
        .iter()
        .map(Path::new)
        .find_map(|p| std::fs::read(p).ok().map(|bytes| (p, bytes)));
    match found {
        Some((path, bytes)) => {
            log::debug!("Using system font {}", path.display());
            Some(bytes)
        }
        None => {
            log::warn!("No usable font found; labels and readout are disabled");
            None
        }
    }
}
