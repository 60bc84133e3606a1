//! Error types for the session engine.
//!
//! Only `TrackError` ever reaches the user. The rest are logged and absorbed
//! where they occur so the tick loop keeps running.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TechniqueError {
    #[error("technique '{0}' has no phases")]
    NoPhases(String),

    #[error("technique '{id}' phase {index} has invalid duration {duration}s")]
    InvalidDuration { id: String, index: usize, duration: f64 },

    #[error("duplicate technique id '{0}'")]
    DuplicateId(String),

    #[error("unknown technique '{0}'")]
    Unknown(String),
}

/// Errors from the platform audio output.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("no audio output device available")]
    NoDevice,

    #[error("failed to get device config: {0}")]
    ConfigError(String),

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to build audio stream: {0}")]
    StreamBuildError(String),

    #[error("failed to start audio stream: {0}")]
    StreamPlayError(String),
}

#[derive(Error, Debug)]
pub enum PhraseError {
    #[error("phrase request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("phrase service returned status {0}")]
    Status(u16),

    #[error("phrase service returned no usable text")]
    Empty,

    #[error("phrase request timed out after {0}ms")]
    Timeout(u64),
}

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("speech output unavailable")]
    Unavailable,

    #[error("failed to start speech program: {0}")]
    Spawn(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackError {
    #[error("guided track could not be opened: {0}")]
    Open(String),

    #[error("guided track could not be decoded: {0}")]
    Decode(String),

    #[error("guided track could not be resampled: {0}")]
    Resample(String),

    #[error("guided track is empty")]
    Empty,

    #[error("audio output unavailable for guided track")]
    NoOutput,
}

pub type AudioResult<T> = Result<T, AudioError>;
