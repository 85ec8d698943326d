//! Fixed acquisition parameters for a sampling session.

use super::SamplerError;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_CHANNELS: u16 = 1;
pub const DEFAULT_BITS_PER_SAMPLE: u16 = 16;
/// Samples read per acquisition call; each chunk becomes one loudness sample.
pub const DEFAULT_CHUNK_SIZE: usize = 3;
/// Loudness samples per frame, one per angular step of the half circle.
pub const DEFAULT_FRAME_SIZE: usize = 180;

pub const MAX_SAMPLE_RATE: u32 = 384_000;
pub const MAX_CHANNELS: u16 = 32;
/// Upper bound on loudness samples per frame (and so on angle table size).
pub const MAX_FRAME_SIZE: usize = 8192;

/// Acquisition configuration handed to an [`super::AudioSampler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    /// Requested device sample rate in Hz.
    pub sample_rate: u32,
    /// Requested device channel count. Streams are always downmixed to mono.
    pub channels: u16,
    /// Only signed 16-bit PCM is supported.
    pub bits_per_sample: u16,
    pub chunk_size: usize,
    pub frame_size: usize,
}

impl SamplerConfig {
    /// Builds a validated configuration.
    ///
    /// # Errors
    /// - [`SamplerError::InvalidConfig`] if any field is out of range
    pub fn new(
        sample_rate: u32,
        channels: u16,
        bits_per_sample: u16,
        chunk_size: usize,
        frame_size: usize,
    ) -> Result<Self, SamplerError> {
        let config = Self {
            sample_rate,
            channels,
            bits_per_sample,
            chunk_size,
            frame_size,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks every field against the supported ranges.
    pub fn validate(&self) -> Result<(), SamplerError> {
        if self.sample_rate == 0 || self.sample_rate > MAX_SAMPLE_RATE {
            return Err(SamplerError::InvalidConfig(format!(
                "sample_rate must be between 1 and {MAX_SAMPLE_RATE}, got {}",
                self.sample_rate
            )));
        }
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(SamplerError::InvalidConfig(format!(
                "channels must be between 1 and {MAX_CHANNELS}, got {}",
                self.channels
            )));
        }
        if self.bits_per_sample != 16 {
            return Err(SamplerError::InvalidConfig(format!(
                "bits_per_sample must be 16, got {}",
                self.bits_per_sample
            )));
        }
        // A chunk never spans more than one second of audio.
        if self.chunk_size == 0 || self.chunk_size > self.sample_rate as usize {
            return Err(SamplerError::InvalidConfig(format!(
                "chunk_size must be between 1 and sample_rate ({}), got {}",
                self.sample_rate, self.chunk_size
            )));
        }
        if self.frame_size == 0 || self.frame_size > MAX_FRAME_SIZE {
            return Err(SamplerError::InvalidConfig(format!(
                "frame_size must be between 1 and {MAX_FRAME_SIZE}, got {}",
                self.frame_size
            )));
        }
        Ok(())
    }

    /// Wall-clock time covered by one frame at the configured rate.
    pub fn frame_duration(&self) -> std::time::Duration {
        let samples = self.chunk_size as f64 * self.frame_size as f64;
        std::time::Duration::try_from_secs_f64(samples / self.sample_rate.max(1) as f64)
            .unwrap_or(std::time::Duration::MAX)
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            bits_per_sample: DEFAULT_BITS_PER_SAMPLE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            frame_size: DEFAULT_FRAME_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SamplerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.frame_size, 180);
        assert_eq!(config.chunk_size, 3);
    }

    #[test]
    fn test_rejects_non_16_bit() {
        let err = SamplerConfig::new(44_100, 1, 24, 3, 180).unwrap_err();
        assert!(matches!(err, SamplerError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_zero_sizes() {
        assert!(SamplerConfig::new(44_100, 1, 16, 0, 180).is_err());
        assert!(SamplerConfig::new(44_100, 1, 16, 3, 0).is_err());
        assert!(SamplerConfig::new(0, 1, 16, 3, 180).is_err());
        assert!(SamplerConfig::new(44_100, 0, 16, 3, 180).is_err());
    }

    #[test]
    fn test_rejects_oversized_values() {
        let err = SamplerConfig::new(44_100, 1, 16, 3, usize::MAX).unwrap_err();
        assert!(matches!(err, SamplerError::InvalidConfig(_)));
        assert!(SamplerConfig::new(44_100, 1, 16, usize::MAX, 180).is_err());
        assert!(SamplerConfig::new(44_100, 1, 16, 44_101, 180).is_err());
        assert!(SamplerConfig::new(44_100, 33, 16, 3, 180).is_err());
        assert!(SamplerConfig::new(u32::MAX, 1, 16, 3, 180).is_err());

        assert!(SamplerConfig::new(44_100, MAX_CHANNELS, 16, 44_100, MAX_FRAME_SIZE).is_ok());
    }

    #[test]
    fn test_frame_duration_of_unvalidated_config_does_not_overflow() {
        let config = SamplerConfig {
            chunk_size: usize::MAX,
            frame_size: usize::MAX,
            ..SamplerConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(config.frame_duration().as_secs() > 0);
    }

    #[test]
    fn test_frame_duration() {
        // 540 samples at 44.1kHz is a little over 12ms
        let ms = SamplerConfig::default().frame_duration().as_secs_f64() * 1000.0;
        assert!((ms - 12.244).abs() < 0.01);
    }
}
