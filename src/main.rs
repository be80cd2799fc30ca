mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Write};

use cli::Cli;
use constellation::audio::analyzer::FileAnalyzer;
use constellation::audio::decode::decode_audio;
use constellation::config::{self, Config};
use constellation::driver::{play_head_for, tick_count, FrameDriver};
use constellation::encode::ffmpeg::{EncoderSettings, FfmpegEncoder};
use constellation::readout::Readout;
use constellation::render::scope::ScopeRenderer;
use constellation::render::text::load_overlay;
use constellation::MetricsRecord;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let mut cfg = match config::find_config(cli.config.as_deref()) {
        Some(path) => match config::load_config(&path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            Err(err) if cli.config.is_some() => {
                return Err(err).with_context(|| format!("Failed to load config {}", path.display()));
            }
            Err(err) => {
                log::warn!("Ignoring config {}: {}", path.display(), err);
                Config::default()
            }
        },
        None => Config::default(),
    };
    apply_overrides(&mut cfg, &cli);
    cfg.validate().context("Invalid configuration")?;

    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }

    log::info!("constellation - stereo vectorscope renderer");
    log::info!("Input: {}", cli.input.display());
    if !cli.no_video {
        log::info!("Output: {}", cli.output.display());
        log::info!(
            "Resolution: {}x{} @ {}fps",
            cfg.output.width,
            cfg.output.height,
            cfg.output.fps
        );
    }

    log::info!("Decoding audio...");
    let audio = decode_audio(&cli.input)?;
    log::info!("Duration: {:.2}s", audio.duration());
    let total_samples = audio.len();
    let fps = cfg.output.fps;

    let analyzer = FileAnalyzer::new(audio, cfg.analyzer.settings())?;
    let sample_rate = analyzer.sample_rate();
    let mut driver = FrameDriver::new();
    driver.attach(analyzer);

    let total_ticks = tick_count(total_samples, sample_rate, fps);
    log::info!("Total ticks: {}", total_ticks);

    let mut video = if cli.no_video {
        None
    } else {
        let theme = cfg.theme.theme()?;
        let font_size = (cfg.output.width.min(cfg.output.height) as f32 * 0.03).max(14.0);
        let overlay = load_overlay(
            cfg.output.font.as_deref(),
            cfg.output.font_url.as_deref(),
            font_size,
        );
        let renderer = ScopeRenderer::new(cfg.output.width, cfg.output.height, theme, overlay);
        let settings = EncoderSettings {
            width: cfg.output.width,
            height: cfg.output.height,
            fps,
            codec: cfg.output.codec.clone(),
            pix_fmt: cfg.output.pix_fmt.clone(),
            crf: cfg.output.crf,
        };
        let encoder = FfmpegEncoder::new(&settings, &cli.input, &cli.output)?;
        Some((renderer, encoder))
    };

    let pb = ProgressBar::new(total_ticks);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ticks ({eta} remaining)")?
            .progress_chars("=>-"),
    );

    let mut points_out = match cli.points_out.as_deref() {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            log::info!("Streaming vectorscope points to {}", path.display());
            Some(BufWriter::new(file))
        }
        None => None,
    };

    let stdout = std::io::stdout();
    let mut json_out = stdout.lock();
    let mut summary = Summary::default();

    for tick_idx in 0..total_ticks {
        let play_head = play_head_for(tick_idx, sample_rate, fps);
        let Some(tick) = driver.tick(play_head) else {
            continue;
        };

        let readout = Readout::from_metrics(&tick.metrics);
        summary.record(&tick.metrics);

        if cli.emit_json {
            serde_json::to_writer(&mut json_out, &readout).context("Failed to write readout")?;
            writeln!(json_out).context("Failed to write readout")?;
        }

        if let Some(out) = points_out.as_mut() {
            out.write_all(tick.points.as_bytes())
                .context("Failed to write vectorscope points")?;
        }

        if let Some((renderer, encoder)) = video.as_mut() {
            let frame = renderer.render(tick.points, tick.curve, &readout);
            encoder.write_frame(frame)?;
        }

        pb.set_position(tick_idx + 1);
    }

    pb.finish_with_message("Analysis complete");
    summary.log();
    driver.detach();

    if let Some(mut out) = points_out {
        out.flush().context("Failed to write vectorscope points")?;
    }

    if let Some((_, encoder)) = video {
        log::info!("Finishing encoding...");
        encoder.finish()?;
        log::info!("Done! Output: {}", cli.output.display());
    }

    Ok(())
}

/// CLI values win over the config file.
fn apply_overrides(cfg: &mut Config, cli: &Cli) {
    let out = &mut cfg.output;
    if let Some(v) = cli.width { out.width = v; }
    if let Some(v) = cli.height { out.height = v; }
    if let Some(v) = cli.fps { out.fps = v; }
    if let Some(v) = cli.crf { out.crf = v; }
    if let Some(ref v) = cli.codec { out.codec = v.clone(); }
    if let Some(ref v) = cli.pix_fmt { out.pix_fmt = v.clone(); }
    if cli.font.is_some() { out.font = cli.font.clone(); }
    if cli.font_url.is_some() { out.font_url = cli.font_url.clone(); }

    let an = &mut cfg.analyzer;
    if let Some(v) = cli.block_size { an.block_size = v; }
    if let Some(v) = cli.fft_size { an.fft_size = v; }
    if let Some(v) = cli.smoothing { an.smoothing = v; }

    if let Some(ref v) = cli.fg { cfg.theme.fg = v.clone(); }
    if let Some(ref v) = cli.dim { cfg.theme.dim = v.clone(); }
}

/// Whole-file extremes, logged once the render finishes.
#[derive(Default)]
struct Summary {
    ticks: u64,
    loudest_db: Option<f32>,
    min_correlation: Option<f32>,
    clipped_ticks: u64,
    out_of_phase_ticks: u64,
}

impl Summary {
    fn record(&mut self, m: &MetricsRecord) {
        self.ticks += 1;
        self.loudest_db = Some(self.loudest_db.map_or(m.loudness_db, |v| v.max(m.loudness_db)));
        self.min_correlation = Some(
            self.min_correlation
                .map_or(m.correlation, |v| v.min(m.correlation)),
        );
        if m.peak_l >= constellation::readout::CLIP_THRESHOLD
            || m.peak_r >= constellation::readout::CLIP_THRESHOLD
        {
            self.clipped_ticks += 1;
        }
        if m.correlation < 0.0 {
            self.out_of_phase_ticks += 1;
        }
    }

    fn log(&self) {
        log::info!(
            "Analyzed {} ticks: loudest {:.1} dB, lowest correlation {:+.2}, {} clipped, {} out of phase",
            self.ticks,
            self.loudest_db.unwrap_or(-100.0),
            self.min_correlation.unwrap_or(0.0),
            self.clipped_ticks,
            self.out_of_phase_ticks
        );
    }
}
