//! Per-tick sequencing of the analysis core.
//!
//! The driver owns the buffers that live for one attached source (the
//! vectorscope points and the spectrum curve), asks the source for fresh
//! frames, and runs metrics, vectorscope and spectrum over them. Ticks are
//! skipped outright when nothing is attached, while paused, or when the
//! source has no data.

use crate::audio::features::{FrequencyFrame, MetricsRecord, StereoFrame};
use crate::audio::metrics::compute_metrics;
use crate::audio::spectrum::{build_curve, SpectrumCurve};
use crate::audio::vectorscope::{transform, PointBuffer};

/// Supplies one stereo frame and one frequency frame per tick.
///
/// Both frames must keep a fixed size for as long as the source is attached
/// and stay untouched between `refresh` and the end of the tick.
pub trait FrameSource {
    /// Samples per channel (N).
    fn block_size(&self) -> usize;

    /// Frequency bins (M).
    fn bin_count(&self) -> usize;

    /// Repopulate both frames for the sample position `play_head`.
    /// Returns `false` when there is nothing to analyze.
    fn refresh(&mut self, play_head: usize) -> bool;

    fn stereo_frame(&self) -> StereoFrame<'_>;

    fn frequency_frame(&self) -> FrequencyFrame<'_, u8>;
}

struct Session<S> {
    source: S,
    points: PointBuffer,
    curve: SpectrumCurve,
}

/// Output of one completed tick.
pub struct Tick<'a> {
    pub metrics: MetricsRecord,
    pub points: &'a PointBuffer,
    pub curve: &'a SpectrumCurve,
}

pub struct FrameDriver<S: FrameSource> {
    session: Option<Session<S>>,
    paused: bool,
    ticks_run: u64,
}

impl<S: FrameSource> Default for FrameDriver<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: FrameSource> FrameDriver<S> {
    pub fn new() -> Self {
        Self {
            session: None,
            paused: false,
            ticks_run: 0,
        }
    }

    /// Attach a source, replacing any previous one. Session buffers are
    /// allocated here and nowhere else.
    pub fn attach(&mut self, source: S) {
        if self.session.is_some() {
            log::info!("Replacing attached source");
        }

        let block_size = source.block_size();
        let bins = source.bin_count();
        log::info!("Attached source: {} samples/block, {} spectrum bins", block_size, bins);

        self.session = Some(Session {
            source,
            points: PointBuffer::new(block_size),
            curve: SpectrumCurve::new(bins),
        });
    }

    /// Drop the session buffers and hand the source back.
    pub fn detach(&mut self) -> Option<S> {
        let session = self.session.take()?;
        log::info!("Detached source after {} ticks", self.ticks_run);
        Some(session.source)
    }

    pub fn is_attached(&self) -> bool {
        self.session.is_some()
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn ticks_run(&self) -> u64 {
        self.ticks_run
    }

    /// Run one analysis pass at `play_head`, or skip it.
    pub fn tick(&mut self, play_head: usize) -> Option<Tick<'_>> {
        if self.paused {
            log::debug!("Tick skipped: paused");
            return None;
        }

        let Some(Session {
            source,
            points,
            curve,
        }) = self.session.as_mut()
        else {
            log::debug!("Tick skipped: no source attached");
            return None;
        };

        if !source.refresh(play_head) {
            log::debug!("Tick skipped: source has no data at {}", play_head);
            return None;
        }

        let stereo = source.stereo_frame();
        let metrics = compute_metrics(&stereo);
        transform(&stereo, points);
        build_curve(&source.frequency_frame(), curve);

        self.ticks_run += 1;

        Some(Tick {
            metrics,
            points,
            curve,
        })
    }
}

/// Sample position shown at display tick `tick`.
pub fn play_head_for(tick: u64, sample_rate: u32, fps: u32) -> usize {
    (tick * sample_rate as u64 / fps.max(1) as u64) as usize
}

/// Display ticks needed to cover `samples` at `fps`.
pub fn tick_count(samples: usize, sample_rate: u32, fps: u32) -> u64 {
    (samples as u64 * fps as u64).div_ceil(sample_rate.max(1) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource {
        left: Vec<f32>,
        right: Vec<f32>,
        bins: Vec<u8>,
        refreshes: usize,
        available: bool,
    }

    impl FixedSource {
        fn new(left: Vec<f32>, right: Vec<f32>, bins: Vec<u8>) -> Self {
            Self {
                left,
                right,
                bins,
                refreshes: 0,
                available: true,
            }
        }
    }

    impl FrameSource for FixedSource {
        fn block_size(&self) -> usize {
            self.left.len()
        }

        fn bin_count(&self) -> usize {
            self.bins.len()
        }

        fn refresh(&mut self, _play_head: usize) -> bool {
            self.refreshes += 1;
            self.available
        }

        fn stereo_frame(&self) -> StereoFrame<'_> {
            StereoFrame::new(&self.left, &self.right)
        }

        fn frequency_frame(&self) -> FrequencyFrame<'_, u8> {
            FrequencyFrame::new(&self.bins)
        }
    }

    fn mono_source() -> FixedSource {
        FixedSource::new(
            vec![1.0, -1.0, 0.5, 0.0],
            vec![1.0, -1.0, 0.5, 0.0],
            vec![0, 255, 51],
        )
    }

    #[test]
    fn tick_without_source_is_skipped() {
        let mut driver: FrameDriver<FixedSource> = FrameDriver::new();
        assert!(driver.tick(0).is_none());
        assert_eq!(driver.ticks_run(), 0);
    }

    #[test]
    fn tick_runs_all_three_outputs() {
        let mut driver = FrameDriver::new();
        driver.attach(mono_source());

        let tick = driver.tick(0).unwrap();
        assert!((tick.metrics.rms_total - 0.75).abs() < 1e-6);
        assert!((tick.metrics.correlation - 1.0).abs() < 1e-6);
        assert_eq!(tick.points.capacity(), 4);
        assert!(tick.points.points().all(|p| p[0] == 0.0));
        assert_eq!(tick.curve.ordinates()[0], 0.0);
        assert_eq!(tick.curve.ordinates()[1], 1.0);
        assert_eq!(driver.ticks_run(), 1);
    }

    #[test]
    fn paused_driver_skips_without_refreshing() {
        let mut driver = FrameDriver::new();
        driver.attach(mono_source());
        driver.pause();

        assert!(driver.is_paused());
        assert!(driver.tick(0).is_none());

        let source = driver.detach().unwrap();
        assert_eq!(source.refreshes, 0);
    }

    #[test]
    fn resume_restores_ticks() {
        let mut driver = FrameDriver::new();
        driver.attach(mono_source());
        driver.pause();
        driver.resume();

        assert!(driver.tick(0).is_some());
    }

    #[test]
    fn unavailable_source_skips_tick() {
        let mut source = mono_source();
        source.available = false;
        let mut driver = FrameDriver::new();
        driver.attach(source);

        assert!(driver.tick(10).is_none());
        assert_eq!(driver.ticks_run(), 0);
    }

    #[test]
    fn reattach_resizes_session_buffers() {
        let mut driver = FrameDriver::new();
        driver.attach(mono_source());
        assert_eq!(driver.tick(0).unwrap().points.capacity(), 4);

        driver.attach(FixedSource::new(vec![0.1; 8], vec![0.2; 8], vec![0; 5]));
        let tick = driver.tick(0).unwrap();
        assert_eq!(tick.points.capacity(), 8);
        assert_eq!(tick.points.as_slice().len(), 24);
        assert_eq!(tick.curve.len(), 5);
    }

    #[test]
    fn detach_returns_source() {
        let mut driver = FrameDriver::new();
        driver.attach(mono_source());
        driver.tick(0);

        let source = driver.detach().unwrap();
        assert_eq!(source.refreshes, 1);
        assert!(!driver.is_attached());
        assert!(driver.detach().is_none());
        assert!(driver.tick(0).is_none());
    }

    #[test]
    fn play_head_tracks_display_ticks() {
        assert_eq!(play_head_for(0, 48000, 30), 0);
        assert_eq!(play_head_for(1, 48000, 30), 1600);
        assert_eq!(play_head_for(30, 44100, 30), 44100);
    }

    #[test]
    fn tick_count_rounds_up() {
        assert_eq!(tick_count(48000, 48000, 30), 30);
        assert_eq!(tick_count(48001, 48000, 30), 31);
        assert_eq!(tick_count(0, 48000, 30), 0);
    }
}
