use crate::audio::spectrum::SpectrumCurve;
use crate::audio::vectorscope::PointBuffer;
use crate::readout::Readout;

use super::text::TextOverlay;

/// Half the visible vertical extent in scope units.
const FRUSTUM: f32 = 2.0;
const BACKGROUND: [u8; 3] = [0x05, 0x05, 0x05];
const GRID: [u8; 3] = [0x11, 0x11, 0x11];
const ALERT: [u8; 3] = [0xff, 0x33, 0x33];
const MARKER: [u8; 3] = [0xff, 0xff, 0xff];
const POINT_OPACITY: f32 = 0.6;
const POINT_SIZE: i32 = 2;
const LABEL_OPACITY: f32 = 0.9;
const AXIS_LABEL_OPACITY: f32 = 0.5;
/// Frequency axis labels at the left and right ends of the spectrum strip.
const SPECTRUM_AXIS_LABELS: [&str; 2] = ["20Hz", "20kHz"];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Theme {
    pub fg: [u8; 3],
    pub dim: [u8; 3],
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            fg: [0x00, 0xff, 0x00],
            dim: [0x00, 0x44, 0x00],
        }
    }
}

impl Theme {
    pub fn from_hex(fg: &str, dim: &str) -> Result<Self, String> {
        Ok(Self {
            fg: parse_hex_color(fg)?,
            dim: parse_hex_color(dim)?,
        })
    }
}

/// `#rrggbb` to RGB.
pub fn parse_hex_color(s: &str) -> Result<[u8; 3], String> {
    let hex = s
        .strip_prefix('#')
        .filter(|h| h.len() == 6 && h.is_ascii())
        .ok_or_else(|| format!("expected a #rrggbb color, got '{}'", s))?;
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| format!("invalid hex color '{}'", s))
    };
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

/// Rasterizes the vectorscope, spectrum strip and meters into one RGBA frame.
///
/// The pixel buffer is allocated once and redrawn on every call.
pub struct ScopeRenderer {
    width: u32,
    height: u32,
    theme: Theme,
    pixels: Vec<u8>,
    text: Option<TextOverlay>,
}

impl ScopeRenderer {
    pub fn new(width: u32, height: u32, theme: Theme, text: Option<TextOverlay>) -> Self {
        Self {
            width,
            height,
            theme,
            pixels: vec![0; width as usize * height as usize * 4],
            text,
        }
    }

    pub fn render(&mut self, points: &PointBuffer, curve: &SpectrumCurve, readout: &Readout) -> &[u8] {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&[BACKGROUND[0], BACKGROUND[1], BACKGROUND[2], 255]);
        }

        self.draw_grid();
        self.draw_points(points);
        self.draw_spectrum(curve);
        self.draw_meters(readout);
        self.draw_labels(readout);

        &self.pixels
    }

    /// Pixels per scope unit; the vertical extent spans `2 * FRUSTUM`.
    fn scale(&self) -> f32 {
        self.height as f32 / (2.0 * FRUSTUM)
    }

    fn to_screen(&self, x: f32, y: f32) -> (i32, i32) {
        let s = self.scale();
        let sx = self.width as f32 * 0.5 + x * s;
        let sy = self.height as f32 * 0.5 - y * s;
        (sx.floor() as i32, sy.floor() as i32)
    }

    fn draw_grid(&mut self) {
        for step in -2..=2 {
            let v = step as f32;
            let (x0, y0) = self.to_screen(-FRUSTUM, v);
            let (x1, _) = self.to_screen(FRUSTUM, v);
            self.fill_rect(x0, y0, x1 - x0 + 1, 1, GRID);

            let (vx, vy0) = self.to_screen(v, FRUSTUM);
            let (_, vy1) = self.to_screen(v, -FRUSTUM);
            self.fill_rect(vx, vy0, 1, vy1 - vy0 + 1, GRID);
        }
    }

    fn draw_points(&mut self, points: &PointBuffer) {
        let color = self.theme.fg;
        for [x, y, _] in points.points() {
            if !x.is_finite() || !y.is_finite() {
                continue;
            }
            let (sx, sy) = self.to_screen(x, y);
            for dy in 0..POINT_SIZE {
                for dx in 0..POINT_SIZE {
                    self.add(sx + dx, sy + dy, color, POINT_OPACITY);
                }
            }
        }
    }

    /// Filled spectrum along the bottom fifth of the frame, outlined in the
    /// foreground color.
    fn draw_spectrum(&mut self, curve: &SpectrumCurve) {
        let bins = curve.ordinates();
        if bins.is_empty() {
            return;
        }

        let strip = (self.height / 5).max(1) as i32;
        let bottom = self.height as i32;
        let (fg, dim) = (self.theme.fg, self.theme.dim);
        let mut prev_y: Option<i32> = None;

        for column in 0..self.width as i32 {
            let bin = (column as usize * bins.len()) / self.width as usize;
            let v = bins[bin.min(bins.len() - 1)];
            let y = bottom - (v * strip as f32).round() as i32;

            self.fill_rect(column, y, 1, bottom - y, dim);

            let (top, bot) = match prev_y {
                Some(p) => (p.min(y), p.max(y)),
                None => (y, y),
            };
            self.fill_rect(column, top.min(bottom - 1), 1, (bot - top).max(1), fg);
            prev_y = Some(y);
        }
    }

    fn draw_meters(&mut self, readout: &Readout) {
        let margin = (self.width.min(self.height) / 24) as i32;
        let track = (self.width / 4) as i32;
        let thickness = (self.height / 90).max(2) as i32;
        let (fg, dim) = (self.theme.fg, self.theme.dim);

        for (row, level) in [readout.bar_left, readout.bar_right].into_iter().enumerate() {
            let y = margin + row as i32 * thickness * 2;
            self.fill_rect(margin, y, track, thickness, dim);
            let filled = (track as f32 * level / 100.0).round() as i32;
            self.fill_rect(margin, y, filled, thickness, fg);
        }

        let y = margin + thickness * 5;
        self.fill_rect(margin, y, track, thickness, dim);
        let marker_x = margin + (track as f32 * readout.correlation_marker / 100.0).round() as i32;
        let marker = if readout.phase_alert { ALERT } else { MARKER };
        self.fill_rect(marker_x - 1, y - thickness, 3, thickness * 3, marker);

        if readout.clipping {
            let size = thickness * 2;
            self.fill_rect(self.width as i32 - margin - size, margin, size, size, ALERT);
        }
    }

    fn draw_labels(&mut self, readout: &Readout) {
        let Some(text) = self.text.take() else {
            return;
        };

        let margin = (self.width.min(self.height) / 24) as i32;
        let line = text.line_height() as i32;
        let top = margin + (self.height / 90) as i32 * 8 + line;
        let fg = self.theme.fg;
        let corr_color = if readout.phase_alert { ALERT } else { fg };

        let lines = [
            (readout.loudness_text.as_str(), fg),
            (readout.correlation_text.as_str(), corr_color),
            (readout.width_text.as_str(), fg),
        ];
        for (i, (label, color)) in lines.into_iter().enumerate() {
            self.draw_text(&text, label, margin, top + i as i32 * line, color, LABEL_OPACITY);
        }

        let [low, high] = SPECTRUM_AXIS_LABELS;
        let (left, right) = self.axis_label_origins(text.line_height(), text.text_width(high));
        self.draw_text(&text, low, left.0, left.1, fg, AXIS_LABEL_OPACITY);
        self.draw_text(&text, high, right.0, right.1, fg, AXIS_LABEL_OPACITY);

        self.text = Some(text);
    }

    /// Top-left origins of the low and high frequency labels, inset from the
    /// bottom corners of the spectrum strip.
    fn axis_label_origins(&self, line_height: u32, high_width: u32) -> ((i32, i32), (i32, i32)) {
        let pad = (self.width.min(self.height) / 100).max(2) as i32;
        let y = self.height as i32 - pad - line_height as i32;
        let right_x = self.width as i32 - pad - high_width as i32;
        ((pad, y), (right_x.max(pad), y))
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_text(
        &mut self,
        text: &TextOverlay,
        label: &str,
        x: i32,
        y: i32,
        color: [u8; 3],
        opacity: f32,
    ) {
        text.draw(label, x, y, |px, py, coverage| {
            self.blend(px, py, color, coverage * opacity)
        });
    }

    fn blend(&mut self, x: i32, y: i32, color: [u8; 3], alpha: f32) {
        if let Some(idx) = self.index(x, y) {
            for c in 0..3 {
                let v = color[c] as f32 * alpha + self.pixels[idx + c] as f32 * (1.0 - alpha);
                self.pixels[idx + c] = v.clamp(0.0, 255.0) as u8;
            }
        }
    }

    fn add(&mut self, x: i32, y: i32, color: [u8; 3], alpha: f32) {
        if let Some(idx) = self.index(x, y) {
            for c in 0..3 {
                let v = self.pixels[idx + c] as f32 + color[c] as f32 * alpha;
                self.pixels[idx + c] = v.min(255.0) as u8;
            }
        }
    }

    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: [u8; 3]) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + w).min(self.width as i32);
        let y1 = (y + h).min(self.height as i32);
        for py in y0..y1 {
            for px in x0..x1 {
                if let Some(idx) = self.index(px, py) {
                    self.pixels[idx..idx + 3].copy_from_slice(&color);
                }
            }
        }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * 4)
    }
}
