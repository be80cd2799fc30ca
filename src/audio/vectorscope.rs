use super::features::StereoFrame;

/// Floats stored per point: x, y, z.
pub const POINT_STRIDE: usize = 3;

/// Persistent `[x, y, z]*` point storage for the vectorscope.
///
/// Allocated once per attached source and rewritten in place every tick.
/// Its length never changes after construction.
#[derive(Clone, Debug)]
pub struct PointBuffer {
    data: Vec<f32>,
}

impl PointBuffer {
    /// Zeroed buffer for `samples` points.
    pub fn new(samples: usize) -> Self {
        Self {
            data: vec![0.0; samples * POINT_STRIDE],
        }
    }

    /// Number of points the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.data.len() / POINT_STRIDE
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Raw native-endian `f32` bytes, laid out for direct upload as a vertex
    /// attribute or for streaming to an external renderer.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// Iterate `[x, y, z]` triples.
    pub fn points(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.data
            .chunks_exact(POINT_STRIDE)
            .map(|p| [p[0], p[1], p[2]])
    }
}

/// Rotate each `(L, R)` pair by 45°: `x = L - R`, `y = L + R`, `z = 0`.
///
/// Mono material lands on the vertical axis and out-of-phase material on the
/// horizontal one. Values pass through unscaled. Panics if `out` holds fewer
/// than `frame.len()` points.
pub fn transform(frame: &StereoFrame<'_>, out: &mut PointBuffer) {
    assert!(
        out.capacity() >= frame.len(),
        "point buffer holds {} points, frame has {}",
        out.capacity(),
        frame.len()
    );

    for ((l, r), point) in frame
        .pairs()
        .zip(out.data.chunks_exact_mut(POINT_STRIDE))
    {
        point[0] = l - r;
        point[1] = l + r;
        point[2] = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_input_lies_on_vertical_axis() {
        let left = [0.5, -0.25, 1.0, 0.0];
        let mut points = PointBuffer::new(left.len());
        transform(&StereoFrame::new(&left, &left), &mut points);

        for (point, &l) in points.points().zip(left.iter()) {
            assert_eq!(point[0], 0.0);
            assert_eq!(point[1], 2.0 * l);
            assert_eq!(point[2], 0.0);
        }
    }

    #[test]
    fn inverted_input_lies_on_horizontal_axis() {
        let left = [0.5, -0.25, 0.75, 0.1];
        let right: Vec<f32> = left.iter().map(|s| -s).collect();
        let mut points = PointBuffer::new(left.len());
        transform(&StereoFrame::new(&left, &right), &mut points);

        for (point, &l) in points.points().zip(left.iter()) {
            assert_eq!(point[0], 2.0 * l);
            assert_eq!(point[1], 0.0);
        }
    }

    #[test]
    fn values_are_not_clamped() {
        let left = [1.5];
        let right = [-1.5];
        let mut points = PointBuffer::new(1);
        transform(&StereoFrame::new(&left, &right), &mut points);

        assert_eq!(points.as_slice(), &[3.0, 0.0, 0.0]);
    }

    #[test]
    fn overwrites_previous_tick_in_place() {
        let mut points = PointBuffer::new(2);
        transform(&StereoFrame::new(&[1.0, 1.0], &[0.0, 0.0]), &mut points);
        let before = points.as_slice().as_ptr();
        transform(&StereoFrame::new(&[0.0, 0.0], &[0.5, 0.5]), &mut points);

        assert_eq!(points.as_slice().as_ptr(), before);
        assert_eq!(points.as_slice(), &[-0.5, 0.5, 0.0, -0.5, 0.5, 0.0]);
    }

    #[test]
    fn larger_buffer_keeps_tail_untouched() {
        let mut points = PointBuffer::new(3);
        transform(&StereoFrame::new(&[0.25], &[0.25]), &mut points);

        assert_eq!(points.capacity(), 3);
        assert_eq!(&points.as_slice()[..3], &[0.0, 0.5, 0.0]);
        assert!(points.as_slice()[3..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn byte_view_matches_points() {
        let mut points = PointBuffer::new(2);
        transform(&StereoFrame::new(&[0.5, 0.25], &[-0.5, 0.25]), &mut points);

        let bytes = points.as_bytes();
        assert_eq!(bytes.len(), 2 * POINT_STRIDE * 4);
        let floats: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        assert_eq!(floats, [1.0, 0.0, 0.0, 0.0, 0.5, 0.0]);
    }

    #[test]
    #[should_panic]
    fn undersized_buffer_panics() {
        let mut points = PointBuffer::new(1);
        transform(&StereoFrame::new(&[0.0, 0.0], &[0.0, 0.0]), &mut points);
    }
}
