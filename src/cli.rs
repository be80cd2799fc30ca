use clap::Parser;
use std::path::PathBuf;

/// Options left unset fall back to the config file, then to built-in defaults.
#[derive(Parser, Debug)]
#[command(name = "constellation", about = "Stereo vectorscope and phase meter video renderer")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG, AAC)
    pub input: PathBuf,

    /// Output video file
    #[arg(short, long, default_value = "constellation.mp4")]
    pub output: PathBuf,

    /// Config file (default: ./constellation.toml, then the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Video width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Video height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Display ticks per second
    #[arg(long)]
    pub fps: Option<u32>,

    /// H.264 CRF quality (0-51, lower = better)
    #[arg(long)]
    pub crf: Option<u32>,

    /// FFmpeg video codec
    #[arg(long)]
    pub codec: Option<String>,

    /// FFmpeg pixel format
    #[arg(long)]
    pub pix_fmt: Option<String>,

    /// Samples per channel analyzed each tick (power of two)
    #[arg(long)]
    pub block_size: Option<usize>,

    /// Spectrum FFT size (power of two)
    #[arg(long)]
    pub fft_size: Option<usize>,

    /// Spectrum smoothing (0.0-1.0)
    #[arg(long)]
    pub smoothing: Option<f32>,

    /// Foreground color (#rrggbb)
    #[arg(long)]
    pub fg: Option<String>,

    /// Spectrum fill color (#rrggbb)
    #[arg(long)]
    pub dim: Option<String>,

    /// TTF/OTF font for meter labels
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Download the label font from this URL
    #[arg(long)]
    pub font_url: Option<String>,

    /// Stream each tick's raw vectorscope points (native-endian f32 x, y, z)
    /// to this file
    #[arg(long)]
    pub points_out: Option<PathBuf>,

    /// Write one JSON readout per tick to stdout
    #[arg(long)]
    pub emit_json: bool,

    /// Analyze only; do not render or encode video
    #[arg(long)]
    pub no_video: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_invocation() {
        let cli = Cli::try_parse_from(["constellation", "song.flac"]).unwrap();

        assert_eq!(cli.input, PathBuf::from("song.flac"));
        assert_eq!(cli.output, PathBuf::from("constellation.mp4"));
        assert!(cli.fps.is_none());
        assert!(!cli.emit_json);
        assert!(cli.points_out.is_none());
    }

    #[test]
    fn points_out_takes_a_path() {
        let cli =
            Cli::try_parse_from(["constellation", "in.wav", "--points-out", "points.f32"]).unwrap();
        assert_eq!(cli.points_out, Some(PathBuf::from("points.f32")));
    }

    #[test]
    fn overrides_parse() {
        let cli = Cli::try_parse_from([
            "constellation",
            "in.wav",
            "-o",
            "out.mp4",
            "--block-size",
            "2048",
            "--smoothing",
            "0.5",
            "--fg",
            "#ff8800",
            "--emit-json",
            "--no-video",
        ])
        .unwrap();

        assert_eq!(cli.block_size, Some(2048));
        assert_eq!(cli.smoothing, Some(0.5));
        assert_eq!(cli.fg.as_deref(), Some("#ff8800"));
        assert!(cli.emit_json);
        assert!(cli.no_video);
    }

    #[test]
    fn input_is_required() {
        assert!(Cli::try_parse_from(["constellation"]).is_err());
    }
}
