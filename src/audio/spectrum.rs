use super::features::{FrequencyFrame, Magnitude};

/// Normalized spectrum ordinates, one per frequency bin, each in [0, 1].
///
/// Sized once per attached source; every tick rewrites it completely.
#[derive(Clone, Debug)]
pub struct SpectrumCurve {
    ordinates: Vec<f32>,
}

impl SpectrumCurve {
    pub fn new(bins: usize) -> Self {
        Self {
            ordinates: vec![0.0; bins],
        }
    }

    pub fn len(&self) -> usize {
        self.ordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordinates.is_empty()
    }

    pub fn ordinates(&self) -> &[f32] {
        &self.ordinates
    }
}

/// Divide every magnitude by its full scale. No smoothing or peak hold.
///
/// Panics if `out` was sized for a different bin count.
pub fn build_curve<T: Magnitude>(frame: &FrequencyFrame<'_, T>, out: &mut SpectrumCurve) {
    assert_eq!(
        out.len(),
        frame.len(),
        "spectrum curve sized for {} bins, frame has {}",
        out.len(),
        frame.len()
    );

    for (ordinate, &magnitude) in out.ordinates.iter_mut().zip(frame.bins()) {
        *ordinate = magnitude.normalized();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn zero_frame_yields_zero_curve() {
        let bins = [0u8; 64];
        let mut curve = SpectrumCurve::new(64);
        build_curve(&FrequencyFrame::new(&bins), &mut curve);

        assert!(curve.ordinates().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn full_scale_frame_yields_unit_curve() {
        let bins = [255u8; 32];
        let mut curve = SpectrumCurve::new(32);
        build_curve(&FrequencyFrame::new(&bins), &mut curve);

        assert!(curve.ordinates().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn byte_ordinates_stay_in_unit_range() {
        let bins: Vec<u8> = (0..=255).collect();
        let mut curve = SpectrumCurve::new(bins.len());
        build_curve(&FrequencyFrame::new(&bins), &mut curve);

        assert!(curve.ordinates().iter().all(|v| (0.0..=1.0).contains(v)));
        assert_relative_eq!(curve.ordinates()[51], 0.2);
    }

    #[test]
    fn float_magnitudes_are_clamped() {
        let bins = [0.5f32, 1.5, -0.2, f32::NAN];
        let mut curve = SpectrumCurve::new(4);
        build_curve(&FrequencyFrame::new(&bins), &mut curve);

        assert_eq!(curve.ordinates(), &[0.5, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn rewrites_previous_values() {
        let mut curve = SpectrumCurve::new(2);
        build_curve(&FrequencyFrame::new(&[255u8, 255]), &mut curve);
        build_curve(&FrequencyFrame::new(&[0u8, 0]), &mut curve);

        assert_eq!(curve.ordinates(), &[0.0, 0.0]);
    }

    #[test]
    #[should_panic]
    fn mismatched_bin_count_panics() {
        let mut curve = SpectrumCurve::new(3);
        build_curve(&FrequencyFrame::new(&[0u8; 4]), &mut curve);
    }
}
