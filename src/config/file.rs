//! Configuration file management for sound-displayer.
//!
//! Loads and saves the application configuration from
//! `~/.config/sound-displayer/sound-displayer.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::sampler::config::{
    DEFAULT_BITS_PER_SAMPLE, DEFAULT_CHANNELS, DEFAULT_CHUNK_SIZE, DEFAULT_FRAME_SIZE,
    DEFAULT_SAMPLE_RATE,
};
use crate::sampler::{SamplerConfig, SamplerError};

/// Audio capture and framing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Audio device to use. Options:
    /// - "default" for system default device
    /// - numeric index (0, 1, 2, etc.) from `sound-displayer list-devices`
    /// - device name from `sound-displayer list-devices`
    #[serde(default = "default_device")]
    pub device: String,
    /// Capture sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Capture channel count (audio is always downmixed to mono)
    #[serde(default = "default_channels")]
    pub channels: u16,
    /// Sample width; only 16 is supported
    #[serde(default = "default_bits_per_sample")]
    pub bits_per_sample: u16,
    /// Samples per acquisition; each chunk becomes one loudness value
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Loudness values per frame (angular resolution of the half circle)
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,
}

fn default_device() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

fn default_channels() -> u16 {
    DEFAULT_CHANNELS
}

fn default_bits_per_sample() -> u16 {
    DEFAULT_BITS_PER_SAMPLE
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_frame_size() -> usize {
    DEFAULT_FRAME_SIZE
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            bits_per_sample: default_bits_per_sample(),
            chunk_size: default_chunk_size(),
            frame_size: default_frame_size(),
        }
    }
}

impl AudioConfig {
    /// Validates the audio section into a sampler configuration.
    ///
    /// # Errors
    /// - [`SamplerError::InvalidConfig`] if any value is out of range
    pub fn sampler_config(&self) -> Result<SamplerConfig, SamplerError> {
        SamplerConfig::new(
            self.sample_rate,
            self.channels,
            self.bits_per_sample,
            self.chunk_size,
            self.frame_size,
        )
    }
}

/// Rendering configuration for the waveform display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Display tick in milliseconds
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    /// Waveform color as "#RRGGBB"
    #[serde(default = "default_line_color")]
    pub line_color: String,
    /// Radius shown at the edge of the canvas (silence is 1.0)
    #[serde(default = "default_max_radius")]
    pub max_radius: f64,
    /// Draw the dotted unit half circle behind the waveform
    #[serde(default = "default_true")]
    pub reference_arc: bool,
}

fn default_refresh_interval_ms() -> u64 {
    50
}

fn default_line_color() -> String {
    "#B3DCFD".to_string()
}

fn default_max_radius() -> f64 {
    2.2
}

fn default_true() -> bool {
    true
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
            line_color: default_line_color(),
            max_radius: default_max_radius(),
            reference_arc: true,
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayerConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

impl DisplayerConfig {
    /// Loads configuration from the user's config directory, writing a
    /// default file first if none exists.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the config file cannot be read or written
    /// - If the TOML is malformed
    pub fn load() -> anyhow::Result<Self> {
        let config_path = config_path()?;

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            tracing::info!("Created default configuration at {}", config_path.display());
            return Ok(config);
        }

        let config_content = fs::read_to_string(&config_path)?;
        Self::parse(&config_content)
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: DisplayerConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Saves configuration to the user's config directory.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the file cannot be written
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = config_path()?;
        let config_content = toml::to_string_pretty(self)?;
        fs::write(&config_path, config_content)?;
        tracing::info!("Configuration saved");
        Ok(())
    }
}

/// Retrieves the path to the config file, creating its directory.
///
/// # Errors
/// - If the home directory cannot be determined
/// - If the config directory cannot be created
pub fn config_path() -> anyhow::Result<PathBuf> {
    let config_dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?
        .join(".config")
        .join("sound-displayer");

    fs::create_dir_all(&config_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create config directory: {e}"))?;

    Ok(config_dir.join("sound-displayer.toml"))
}
