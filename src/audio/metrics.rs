use super::features::{MetricsRecord, StereoFrame};

/// Gain floor used for dB conversion, i.e. a -100 dB display minimum.
pub const GAIN_FLOOR: f32 = 1e-5;

/// Below this `sqrt(ΣL² · ΣR²)` the correlation is reported as 0.
const CORRELATION_EPSILON: f64 = 1e-5;

/// Linear gain to decibels, floored at [`GAIN_FLOOR`] so silence stays finite.
#[inline]
pub fn to_db(gain: f32) -> f32 {
    (20.0 * (gain.max(GAIN_FLOOR) as f64).log10()) as f32
}

/// Reduce one stereo frame into loudness, peak, correlation and width.
///
/// Single pass over the samples. Silence, perfect (anti-)correlation and
/// clipping are all ordinary outcomes.
pub fn compute_metrics(frame: &StereoFrame<'_>) -> MetricsRecord {
    let mut sum_l2 = 0.0f64;
    let mut sum_r2 = 0.0f64;
    let mut sum_lr = 0.0f64;
    let mut peak_l = 0.0f32;
    let mut peak_r = 0.0f32;

    for (l, r) in frame.pairs() {
        let (lf, rf) = (l as f64, r as f64);
        sum_l2 += lf * lf;
        sum_r2 += rf * rf;
        sum_lr += lf * rf;
        peak_l = peak_l.max(l.abs());
        peak_r = peak_r.max(r.abs());
    }

    let n = frame.len() as f64;
    let rms_l = (sum_l2 / n).sqrt() as f32;
    let rms_r = (sum_r2 / n).sqrt() as f32;
    let rms_total = (rms_l + rms_r) / 2.0;

    let denom = (sum_l2 * sum_r2).sqrt();
    let correlation = if denom > CORRELATION_EPSILON {
        ((sum_lr / denom) as f32).clamp(-1.0, 1.0)
    } else {
        0.0
    };

    MetricsRecord {
        rms_l,
        rms_r,
        rms_total,
        peak_l,
        peak_r,
        correlation,
        loudness_db: to_db(rms_total),
        width_percent: width_from_correlation(correlation),
    }
}

/// 0% for mono (correlation 1), 100% for fully out-of-phase (correlation -1).
#[inline]
pub fn width_from_correlation(correlation: f32) -> f32 {
    ((1.0 - correlation) * 50.0).clamp(0.0, 100.0)
}
