use serde::Serialize;

use crate::audio::features::MetricsRecord;
use crate::audio::metrics::to_db;

/// Peak level at which the clip indicator lights.
pub const CLIP_THRESHOLD: f32 = 0.99;

/// Lowest level shown on the channel bars.
const BAR_FLOOR_DB: f32 = -60.0;

/// Display values derived from one tick's metrics.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Readout {
    pub metrics: MetricsRecord,
    pub loudness_text: String,
    /// Left channel bar fill, 0..=100
    pub bar_left: f32,
    pub bar_right: f32,
    pub clipping: bool,
    /// Marker position along the correlation scale, 0..=100
    pub correlation_marker: f32,
    pub correlation_text: String,
    /// Correlation below zero, drawn in the alert color
    pub phase_alert: bool,
    pub width_text: String,
}

impl Readout {
    pub fn from_metrics(metrics: &MetricsRecord) -> Self {
        let correlation = metrics.correlation;
        let sign = if correlation > 0.0 { "+" } else { "" };

        Self {
            metrics: *metrics,
            loudness_text: format!("{:.1} dB", metrics.loudness_db),
            bar_left: map_db(metrics.rms_l),
            bar_right: map_db(metrics.rms_r),
            clipping: metrics.peak_l >= CLIP_THRESHOLD || metrics.peak_r >= CLIP_THRESHOLD,
            correlation_marker: (correlation + 1.0) / 2.0 * 100.0,
            correlation_text: format!("{}{:.2}", sign, correlation),
            phase_alert: correlation < 0.0,
            width_text: format!("{:.0}%", metrics.width_percent),
        }
    }
}

/// Level bar fill: -60 dB and below is empty, 0 dB is full.
pub fn map_db(gain: f32) -> f32 {
    ((to_db(gain) - BAR_FLOOR_DB) * (100.0 / -BAR_FLOOR_DB)).clamp(0.0, 100.0)
}
