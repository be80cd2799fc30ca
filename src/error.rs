use thiserror::Error;

/// Failures while preparing a source for analysis.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("failed to open audio file {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("audio decode error: {0}")]
    Decode(#[from] symphonia::core::errors::Error),
    #[error("no decodable audio track found")]
    NoTrack,
    #[error("unknown sample rate")]
    UnknownSampleRate,
    #[error("decoded audio contains no samples")]
    Empty,
    #[error("invalid analyzer settings: {0}")]
    Settings(String),
}
