//! Engine error types.
//!
//! Signal processing and control handling never fail; they clamp. Only host
//! bring-up (configuration and audio device setup) returns these errors.

use thiserror::Error;

/// Errors raised while validating or overriding an [`EngineConfig`](crate::engine::config::EngineConfig).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Sample rate outside the supported range.
    #[error("sample rate out of range (expected {min}..={max} Hz, got {got})")]
    SampleRate { min: u32, max: u32, got: u32 },

    /// Block size outside the supported range.
    #[error("block size out of range (expected {min}..={max} frames, got {got})")]
    BlockSize { min: usize, max: usize, got: usize },

    /// Message ring too small to hold a burst of control updates.
    #[error("message capacity too small (expected at least {min}, got {got})")]
    MessageCapacity { min: usize, got: usize },

    /// An override value could not be parsed.
    #[error("invalid value for {key}: {value:?}")]
    InvalidOverride { key: &'static str, value: String },
}

/// Errors that can occur while bringing up the audio host.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The configuration was rejected.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// No default input device is available.
    #[error("no audio input device found")]
    NoInputDevice,

    /// No default output device is available.
    #[error("no audio output device found")]
    NoOutputDevice,

    /// The device refused to report a default configuration.
    #[error("failed to query default stream config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    /// The device does not offer a stereo-capable layout.
    #[error("unsupported channel count: {channels} (the engine needs at least 2)")]
    UnsupportedChannels { channels: u16 },

    /// Building an input or output stream failed.
    #[error("failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    /// Starting a stream failed.
    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    /// `run()` was called while streams were already open.
    #[error("engine already running")]
    AlreadyRunning,

    /// The audio half was already handed to a stream and cannot be reused.
    #[error("audio processor already consumed by a previous run")]
    ProcessorConsumed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_messages() {
        let err = ConfigError::SampleRate {
            min: 8_000,
            max: 192_000,
            got: 12,
        };
        assert_eq!(
            err.to_string(),
            "sample rate out of range (expected 8000..=192000 Hz, got 12)"
        );

        let err = ConfigError::InvalidOverride {
            key: "MFX_BLOCK_SIZE",
            value: "lots".to_string(),
        };
        assert_eq!(err.to_string(), "invalid value for MFX_BLOCK_SIZE: \"lots\"");
    }

    #[test]
    fn test_engine_error_wraps_config_error() {
        let err: EngineError = ConfigError::MessageCapacity { min: 16, got: 2 }.into();
        assert!(matches!(err, EngineError::Config(_)));
        assert!(err.to_string().contains("message capacity too small"));
    }
}
