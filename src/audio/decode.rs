use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::AnalyzerError;

/// Decoded audio split into left and right channels of equal length.
#[derive(Clone, Debug)]
pub struct StereoAudio {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    pub sample_rate: u32,
}

impl StereoAudio {
    /// Panics if the channels differ in length.
    pub fn new(left: Vec<f32>, right: Vec<f32>, sample_rate: u32) -> Self {
        assert_eq!(left.len(), right.len(), "channel lengths differ");
        Self {
            left,
            right,
            sample_rate,
        }
    }

    /// Samples per channel.
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn duration(&self) -> f32 {
        self.len() as f32 / self.sample_rate as f32
    }
}

pub fn decode_audio(path: &Path) -> Result<StereoAudio, AnalyzerError> {
    let file = std::fs::File::open(path).map_err(|source| AnalyzerError::Open {
        path: path.display().to_string(),
        source,
    })?;

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    decode_source(Box::new(file), hint)
}

/// Decode any media source. Mono is duplicated to both channels; beyond two
/// channels only the first pair is kept.
pub fn decode_source(source: Box<dyn MediaSource>, hint: Hint) -> Result<StereoAudio, AnalyzerError> {
    let mss = MediaSourceStream::new(source, Default::default());

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(AnalyzerError::NoTrack)?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(AnalyzerError::UnknownSampleRate)?;

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut left: Vec<f32> = Vec::new();
    let mut right: Vec<f32> = Vec::new();
    let mut channels = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(msg)) => {
                log::debug!("Skipping undecodable packet: {}", msg);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        channels = spec.channels.count();
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        split_interleaved(sample_buf.samples(), channels, &mut left, &mut right);
    }

    if left.is_empty() {
        return Err(AnalyzerError::Empty);
    }

    log::info!(
        "Decoded audio: {} samples/channel, {} source channel(s), {}Hz, {:.1}s",
        left.len(),
        channels,
        sample_rate,
        left.len() as f32 / sample_rate as f32
    );

    Ok(StereoAudio::new(left, right, sample_rate))
}

fn split_interleaved(samples: &[f32], channels: usize, left: &mut Vec<f32>, right: &mut Vec<f32>) {
    match channels {
        0 => {}
        1 => {
            left.extend_from_slice(samples);
            right.extend_from_slice(samples);
        }
        _ => {
            for frame in samples.chunks_exact(channels) {
                left.push(frame[0]);
                right.push(frame[1]);
            }
        }
    }
}
