//! Host configuration.
//!
//! The sample rate is fixed once here and shared read-only by every component
//! that converts time to samples.

use crate::engine::errors::ConfigError;

pub const SAMPLE_RATE_MIN: u32 = 8_000;
pub const SAMPLE_RATE_MAX: u32 = 192_000;
pub const BLOCK_SIZE_MAX: usize = 4096;
pub const MESSAGE_CAPACITY_MIN: usize = 16;

pub const ENV_SAMPLE_RATE: &str = "MFX_SAMPLE_RATE";
pub const ENV_BLOCK_SIZE: &str = "MFX_BLOCK_SIZE";
pub const ENV_MESSAGE_CAPACITY: &str = "MFX_MESSAGE_CAPACITY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Audio sample rate in Hz.
    pub sample_rate: u32,

    /// Frames per audio block requested from the driver.
    pub block_size: usize,

    /// Capacity of each control/audio message ring.
    pub message_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            block_size: 48,
            message_capacity: 1024,
        }
    }
}

impl EngineConfig {
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn sample_rate_hz(&self) -> f32 {
        self.sample_rate as f32
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(SAMPLE_RATE_MIN..=SAMPLE_RATE_MAX).contains(&self.sample_rate) {
            return Err(ConfigError::SampleRate {
                min: SAMPLE_RATE_MIN,
                max: SAMPLE_RATE_MAX,
                got: self.sample_rate,
            });
        }

        if !(1..=BLOCK_SIZE_MAX).contains(&self.block_size) {
            return Err(ConfigError::BlockSize {
                min: 1,
                max: BLOCK_SIZE_MAX,
                got: self.block_size,
            });
        }

        if self.message_capacity < MESSAGE_CAPACITY_MIN {
            return Err(ConfigError::MessageCapacity {
                min: MESSAGE_CAPACITY_MIN,
                got: self.message_capacity,
            });
        }

        Ok(())
    }

    /// Apply overrides from an arbitrary key lookup, then validate.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_SAMPLE_RATE) {
            self.sample_rate = parse_override(ENV_SAMPLE_RATE, &value)?;
            log::info!("{ENV_SAMPLE_RATE} override: {} Hz", self.sample_rate);
        }

        if let Some(value) = lookup(ENV_BLOCK_SIZE) {
            self.block_size = parse_override(ENV_BLOCK_SIZE, &value)?;
            log::info!("{ENV_BLOCK_SIZE} override: {} frames", self.block_size);
        }

        if let Some(value) = lookup(ENV_MESSAGE_CAPACITY) {
            self.message_capacity = parse_override(ENV_MESSAGE_CAPACITY, &value)?;
            log::info!("{ENV_MESSAGE_CAPACITY} override: {}", self.message_capacity);
        }

        self.validate()?;
        Ok(self)
    }

    /// Defaults overridden from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }
}

fn parse_override<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidOverride {
            key,
            value: value.to_string(),
        })
}
