//! List available audio input devices.

use anyhow::anyhow;
use cpal::traits::{DeviceTrait, HostTrait};

use crate::config::DisplayerConfig;
use crate::sampler::cpal_source::suppress_alsa_warnings;
use crate::sampler::SamplerConfig;

/// Lists every input device with its default configuration and whether it
/// can capture with the configured rate and channel count.
///
/// # Errors
/// - If the audio host cannot enumerate devices
pub fn handle_list_devices() -> Result<(), anyhow::Error> {
    let wanted = DisplayerConfig::load()
        .ok()
        .and_then(|c| c.audio.sampler_config().ok())
        .unwrap_or_default();

    let (host, devices) = suppress_alsa_warnings(|| {
        let host = cpal::default_host();
        let devices: Vec<cpal::Device> = host
            .input_devices()
            .map_err(|e| anyhow!("Failed to enumerate audio devices: {e}"))?
            .filter(|d| d.name().is_ok())
            .collect();
        Ok((host, devices))
    })?;

    if devices.is_empty() {
        println!("No audio input devices found on this system.");
        return Ok(());
    }

    println!();
    println!("Available audio input devices:");
    println!();

    let default_device = host.default_input_device().and_then(|d| d.name().ok());

    for (index, device) in devices.iter().enumerate() {
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let default_indicator = if default_device.as_ref() == Some(&device_name) {
            " [DEFAULT]"
        } else {
            ""
        };

        let config_info = match device.default_input_config() {
            Ok(config) => format!(
                " ({}Hz, {} channels, {:?})",
                config.sample_rate().0,
                config.channels(),
                config.sample_format()
            ),
            Err(_) => " (configuration unavailable)".to_string(),
        };

        println!("  ID: {}", index);
        println!("    Name: {}{}", device_name, default_indicator);
        println!("    Config:{}", config_info);
        println!(
            "    {}Hz/{}ch capture: {}",
            wanted.sample_rate,
            wanted.channels,
            if supports(device, &wanted) { "supported" } else { "not supported" }
        );
        println!();
    }

    Ok(())
}

/// Whether any supported input range covers the requested rate and channels.
fn supports(device: &cpal::Device, wanted: &SamplerConfig) -> bool {
    device
        .supported_input_configs()
        .map(|mut ranges| {
            ranges.any(|range| {
                range.channels() == wanted.channels
                    && range.min_sample_rate().0 <= wanted.sample_rate
                    && wanted.sample_rate <= range.max_sample_rate().0
            })
        })
        .unwrap_or(false)
}
