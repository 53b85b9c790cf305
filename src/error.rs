use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn an input file into a sample buffer.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to open audio file {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unreadable or corrupt audio in {path}")]
    Format {
        path: PathBuf,
        #[source]
        source: symphonia::core::errors::Error,
    },

    #[error("no audio tracks found in {0}")]
    NoTrack(PathBuf),

    #[error("unknown sample rate in {0}")]
    UnknownSampleRate(PathBuf),

    #[error("resampling {from} Hz -> {to} Hz failed: {reason}")]
    Resample { from: u32, to: u32, reason: String },
}

/// Internal consistency faults in the analysis pipeline. These indicate a bug
/// in feature extraction, never bad user input.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(
        "frame count mismatch: chroma={chroma}, chords={chords}, frequencies={frequencies}"
    )]
    FrameCountMismatch {
        chroma: usize,
        chords: usize,
        frequencies: usize,
    },
}

#[derive(Debug, Error)]
pub enum SongbookError {
    #[error("failed to create songbook directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write songbook {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The display could not get a GPU. Playback can continue without it.
#[derive(Debug, Error)]
pub enum GpuError {
    #[error("no suitable GPU adapter (hardware or fallback) is available")]
    NoAdapter,

    #[error("failed to create GPU device on {adapter}")]
    Device {
        adapter: String,
        #[source]
        source: wgpu::RequestDeviceError,
    },
}
