use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::audio::analyzer::AnalyzerSettings;
use crate::render::scope::Theme;

/// Largest accepted frame edge in pixels.
pub const MAX_DIMENSION: u32 = 8192;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub theme: ThemeConfig,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_crf")]
    pub crf: u32,
    #[serde(default = "default_codec")]
    pub codec: String,
    #[serde(default = "default_pix_fmt")]
    pub pix_fmt: String,
    #[serde(default)]
    pub font: Option<PathBuf>,
    #[serde(default)]
    pub font_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
    #[serde(default = "default_min_db")]
    pub min_db: f32,
    #[serde(default = "default_max_db")]
    pub max_db: f32,
}

#[derive(Debug, Deserialize)]
pub struct ThemeConfig {
    #[serde(default = "default_fg")]
    pub fg: String,
    #[serde(default = "default_dim")]
    pub dim: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            crf: default_crf(),
            codec: default_codec(),
            pix_fmt: default_pix_fmt(),
            font: None,
            font_url: None,
        }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            block_size: default_block_size(),
            fft_size: default_fft_size(),
            smoothing: default_smoothing(),
            min_db: default_min_db(),
            max_db: default_max_db(),
        }
    }
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            fg: default_fg(),
            dim: default_dim(),
        }
    }
}

fn default_width() -> u32 { 1080 }
fn default_height() -> u32 { 1080 }
fn default_fps() -> u32 { 60 }
fn default_crf() -> u32 { 18 }
fn default_codec() -> String { "libx264".into() }
fn default_pix_fmt() -> String { "yuv420p".into() }
fn default_block_size() -> usize { 4096 }
fn default_fft_size() -> usize { 2048 }
fn default_smoothing() -> f32 { 0.85 }
fn default_min_db() -> f32 { -100.0 }
fn default_max_db() -> f32 { -30.0 }
fn default_fg() -> String { "#00ff00".into() }
fn default_dim() -> String { "#004400".into() }

impl AnalyzerConfig {
    pub fn settings(&self) -> AnalyzerSettings {
        AnalyzerSettings {
            block_size: self.block_size,
            fft_size: self.fft_size,
            smoothing: self.smoothing,
            min_db: self.min_db,
            max_db: self.max_db,
        }
    }
}

impl ThemeConfig {
    pub fn theme(&self) -> Result<Theme, ConfigError> {
        Theme::from_hex(&self.fg, &self.dim).map_err(ConfigError::Validation)
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.analyzer
            .settings()
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        let out = &self.output;
        if out.fps == 0 {
            return Err(ConfigError::Validation("fps must be at least 1".into()));
        }
        let in_range = |v: u32| (16..=MAX_DIMENSION).contains(&v) && v % 2 == 0;
        if !in_range(out.width) || !in_range(out.height) {
            return Err(ConfigError::Validation(format!(
                "output size must be even and between 16x16 and {max}x{max}, got {}x{}",
                out.width,
                out.height,
                max = MAX_DIMENSION
            )));
        }
        if out.crf > 51 {
            return Err(ConfigError::Validation(format!("crf must be 0-51, got {}", out.crf)));
        }

        self.theme.theme()?;
        Ok(())
    }
}

pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Explicit path, then `./constellation.toml`, then the per-user config.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = PathBuf::from("constellation.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("constellation").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("constellation").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
