use anyhow::{Context, Result};
use fontdue::{Font, FontSettings};
use std::path::Path;

/// Glyph compositing for the meter labels.
pub struct TextOverlay {
    font: Font,
    font_size: f32,
}

impl TextOverlay {
    pub fn from_bytes(bytes: &[u8], font_size: f32) -> Result<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| anyhow::anyhow!("Failed to parse font: {}", e))?;
        Ok(Self { font, font_size })
    }

    /// Rasterize `text` with its line box starting at (`x`, `y`), calling
    /// `plot(px, py, coverage)` for every covered pixel. Coverage is in (0, 1].
    pub fn draw(&self, text: &str, x: i32, y: i32, mut plot: impl FnMut(i32, i32, f32)) {
        let mut pen_x = x as f32;
        for ch in text.chars() {
            let (metrics, bitmap) = self.font.rasterize(ch, self.font_size);
            let left = pen_x.round() as i32 + metrics.xmin;
            let top = y + self.font_size as i32 - metrics.height as i32 - metrics.ymin;

            for (row, coverage_row) in bitmap.chunks_exact(metrics.width.max(1)).enumerate() {
                for (col, &coverage) in coverage_row.iter().enumerate() {
                    if coverage > 0 {
                        plot(left + col as i32, top + row as i32, coverage as f32 / 255.0);
                    }
                }
            }
            pen_x += metrics.advance_width;
        }
    }

    /// Horizontal advance of `text` in pixels.
    pub fn text_width(&self, text: &str) -> u32 {
        let advance: f32 = text
            .chars()
            .map(|ch| self.font.metrics(ch, self.font_size).advance_width)
            .sum();
        advance.ceil().max(0.0) as u32
    }

    pub fn line_height(&self) -> u32 {
        (self.font_size * 1.3).ceil() as u32
    }
}

pub fn load_font_from_url(url: &str) -> Result<Vec<u8>> {
    log::info!("Downloading font from {}", url);
    let response = reqwest::blocking::get(url)
        .with_context(|| format!("Failed to fetch font: {}", url))?
        .error_for_status()
        .with_context(|| format!("Font request failed: {}", url))?;
    Ok(response.bytes().context("Failed to read font body")?.to_vec())
}

/// Label overlay from a local font file or a font URL. Without either, or
/// when loading fails, meters are drawn without labels.
pub fn load_overlay(path: Option<&Path>, url: Option<&str>, font_size: f32) -> Option<TextOverlay> {
    let bytes = match (path, url) {
        (Some(path), _) => std::fs::read(path)
            .with_context(|| format!("Failed to read font: {}", path.display())),
        (None, Some(url)) => load_font_from_url(url),
        (None, None) => {
            log::info!("No font configured; meter labels disabled");
            return None;
        }
    };

    match bytes.and_then(|b| TextOverlay::from_bytes(&b, font_size)) {
        Ok(overlay) => Some(overlay),
        Err(err) => {
            log::warn!("Meter labels disabled: {:#}", err);
            None
        }
    }
}
