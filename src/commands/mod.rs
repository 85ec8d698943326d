//! Command handlers for sound-displayer.
//!
//! # Commands
//! - `show`: live half-circle waveform display (default)
//! - `probe`: headless per-frame loudness summaries
//! - `config`: open the configuration file in the user's editor
//! - `list_devices`: list available audio input devices
//! - `logs`: display recent log entries

pub mod config;
pub mod list_devices;
pub mod logs;
pub mod probe;
pub mod show;

pub use config::handle_config;
pub use list_devices::handle_list_devices;
pub use logs::handle_logs;
pub use probe::handle_probe;
pub use show::handle_show;

use std::path::Path;

use crate::config::DisplayerConfig;
use crate::sampler::{AudioSampler, CpalSource, SamplerConfig, SamplerError, WavSource};

/// Loads the configuration file and validates its audio section.
fn load_config() -> anyhow::Result<(DisplayerConfig, SamplerConfig)> {
    let config = DisplayerConfig::load()?;
    let sampler_config = config.audio.sampler_config()?;
    Ok((config, sampler_config))
}

/// Starts `sampler` on a WAV file if one was given, else on the configured
/// microphone.
fn start_input(
    sampler: &mut AudioSampler,
    device: &str,
    input: Option<&Path>,
    looping: bool,
) -> Result<(), SamplerError> {
    match input {
        Some(path) => sampler.start(WavSource::new(path).looping(looping)),
        None => sampler.start(CpalSource::new(device)),
    }
}
