use serde::Serialize;

/// One tick of time-domain stereo samples.
///
/// Both channels always have the same, non-zero length. Samples are nominally
/// in [-1.0, 1.0] but clipping sources may exceed that.
#[derive(Clone, Copy, Debug)]
pub struct StereoFrame<'a> {
    left: &'a [f32],
    right: &'a [f32],
}

impl<'a> StereoFrame<'a> {
    /// Panics if the channels differ in length or are empty.
    pub fn new(left: &'a [f32], right: &'a [f32]) -> Self {
        assert_eq!(
            left.len(),
            right.len(),
            "stereo frame channels must have equal length"
        );
        assert!(!left.is_empty(), "stereo frame must hold at least one sample");
        Self { left, right }
    }

    pub fn left(&self) -> &'a [f32] {
        self.left
    }

    pub fn right(&self) -> &'a [f32] {
        self.right
    }

    /// Samples per channel (N).
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Iterate `(left, right)` sample pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (f32, f32)> + 'a {
        self.left.iter().copied().zip(self.right.iter().copied())
    }
}

/// A magnitude representation with a fixed full scale.
pub trait Magnitude: Copy {
    /// Value mapped onto [0, 1] relative to full scale.
    fn normalized(self) -> f32;
}

impl Magnitude for u8 {
    #[inline]
    fn normalized(self) -> f32 {
        self as f32 / u8::MAX as f32
    }
}

impl Magnitude for f32 {
    #[inline]
    fn normalized(self) -> f32 {
        if self.is_nan() {
            0.0
        } else {
            self.clamp(0.0, 1.0)
        }
    }
}

/// One tick of frequency-domain magnitudes (M = FFT size / 2 bins).
#[derive(Clone, Copy, Debug)]
pub struct FrequencyFrame<'a, T: Magnitude = u8> {
    bins: &'a [T],
}

impl<'a, T: Magnitude> FrequencyFrame<'a, T> {
    pub fn new(bins: &'a [T]) -> Self {
        Self { bins }
    }

    pub fn bins(&self) -> &'a [T] {
        self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}

/// Scalar metrics for a single stereo frame. All values are finite.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct MetricsRecord {
    pub rms_l: f32,
    pub rms_r: f32,
    /// Mean of the two channel RMS values
    pub rms_total: f32,
    /// Largest absolute sample, not clamped to 1.0
    pub peak_l: f32,
    pub peak_r: f32,
    /// Normalized cross-correlation in [-1, 1]
    pub correlation: f32,
    /// Loudness of `rms_total`, floored at -100 dB
    pub loudness_db: f32,
    /// Stereo width in [0, 100]
    pub width_percent: f32,
}
