use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use super::decode::StereoAudio;
use super::features::{FrequencyFrame, StereoFrame};
use crate::driver::FrameSource;
use crate::error::AnalyzerError;

/// Time- and frequency-domain analysis parameters, fixed per attached source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnalyzerSettings {
    /// Samples per channel handed to the core each tick (N)
    pub block_size: usize,
    /// Spectrum FFT length; the curve has `fft_size / 2` bins
    pub fft_size: usize,
    /// Temporal smoothing of spectrum magnitudes (0 = none)
    pub smoothing: f32,
    /// Level mapped to byte 0
    pub min_db: f32,
    /// Level mapped to byte 255
    pub max_db: f32,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            block_size: 4096,
            fft_size: 2048,
            smoothing: 0.85,
            min_db: -100.0,
            max_db: -30.0,
        }
    }
}

impl AnalyzerSettings {
    pub fn validate(&self) -> Result<(), AnalyzerError> {
        if !self.block_size.is_power_of_two() || !(16..=16384).contains(&self.block_size) {
            return Err(AnalyzerError::Settings(format!(
                "block size must be a power of two in 16..=16384, got {}",
                self.block_size
            )));
        }
        if !self.fft_size.is_power_of_two() || !(32..=32768).contains(&self.fft_size) {
            return Err(AnalyzerError::Settings(format!(
                "fft size must be a power of two in 32..=32768, got {}",
                self.fft_size
            )));
        }
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(AnalyzerError::Settings(format!(
                "smoothing must be within 0.0..=1.0, got {}",
                self.smoothing
            )));
        }
        if !(self.min_db < self.max_db) {
            return Err(AnalyzerError::Settings(format!(
                "min_db ({}) must be below max_db ({})",
                self.min_db, self.max_db
            )));
        }
        Ok(())
    }

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }
}

/// Frame source over a fully decoded file.
///
/// Every buffer, the FFT plan and its scratch space are allocated in `new`;
/// `refresh` only overwrites them.
pub struct FileAnalyzer {
    audio: StereoAudio,
    settings: AnalyzerSettings,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    fft_buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    left: Vec<f32>,
    right: Vec<f32>,
    bins: Vec<u8>,
}

impl FileAnalyzer {
    pub fn new(audio: StereoAudio, settings: AnalyzerSettings) -> Result<Self, AnalyzerError> {
        settings.validate()?;
        if audio.is_empty() {
            return Err(AnalyzerError::Empty);
        }

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(settings.fft_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Ok(Self {
            window: blackman_window(settings.fft_size),
            fft_buffer: vec![Complex::new(0.0, 0.0); settings.fft_size],
            scratch,
            smoothed: vec![0.0; settings.bin_count()],
            left: vec![0.0; settings.block_size],
            right: vec![0.0; settings.block_size],
            bins: vec![0; settings.bin_count()],
            fft,
            audio,
            settings,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.audio.sample_rate
    }

    fn update_spectrum(&mut self, play_head: usize) {
        let size = self.settings.fft_size;
        let start = play_head as isize - size as isize;
        let (left, right) = (&self.audio.left, &self.audio.right);

        for (i, slot) in self.fft_buffer.iter_mut().enumerate() {
            let mono = sample_at(left, start + i as isize) + sample_at(right, start + i as isize);
            *slot = Complex::new(0.5 * mono * self.window[i], 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.fft_buffer, &mut self.scratch);

        let tau = self.settings.smoothing;
        let scale = 255.0 / (self.settings.max_db - self.settings.min_db);
        for ((smoothed, byte), bin) in self
            .smoothed
            .iter_mut()
            .zip(self.bins.iter_mut())
            .zip(self.fft_buffer.iter())
        {
            let magnitude = bin.norm() / size as f32;
            *smoothed = tau * *smoothed + (1.0 - tau) * magnitude;
            *byte = if *smoothed > 0.0 {
                let db = 20.0 * smoothed.log10();
                (scale * (db - self.settings.min_db)).floor().clamp(0.0, 255.0) as u8
            } else {
                0
            };
        }
    }
}

impl FrameSource for FileAnalyzer {
    fn block_size(&self) -> usize {
        self.settings.block_size
    }

    fn bin_count(&self) -> usize {
        self.settings.bin_count()
    }

    fn refresh(&mut self, play_head: usize) -> bool {
        if play_head > self.audio.len() {
            return false;
        }

        copy_window(&self.audio.left, play_head, &mut self.left);
        copy_window(&self.audio.right, play_head, &mut self.right);
        self.update_spectrum(play_head);
        true
    }

    fn stereo_frame(&self) -> StereoFrame<'_> {
        StereoFrame::new(&self.left, &self.right)
    }

    fn frequency_frame(&self) -> FrequencyFrame<'_, u8> {
        FrequencyFrame::new(&self.bins)
    }
}

#[inline]
fn sample_at(samples: &[f32], index: isize) -> f32 {
    if index < 0 {
        0.0
    } else {
        samples.get(index as usize).copied().unwrap_or(0.0)
    }
}

/// The `dst.len()` samples ending just before `end`, zero outside `src`.
fn copy_window(src: &[f32], end: usize, dst: &mut [f32]) {
    let start = end as isize - dst.len() as isize;
    for (i, slot) in dst.iter_mut().enumerate() {
        *slot = sample_at(src, start + i as isize);
    }
}

fn blackman_window(size: usize) -> Vec<f32> {
    let alpha = 0.16f32;
    let a0 = 0.5 * (1.0 - alpha);
    let a1 = 0.5;
    let a2 = 0.5 * alpha;
    (0..size)
        .map(|i| {
            let x = std::f32::consts::TAU * i as f32 / size as f32;
            a0 - a1 * x.cos() + a2 * (2.0 * x).cos()
        })
        .collect()
}
