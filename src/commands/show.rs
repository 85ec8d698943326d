//! Live waveform display.
//!
//! Starts the sampler, then runs the display loop: poll input for one
//! refresh tick, take the newest loudness frame if one arrived, map it onto
//! the half circle, and redraw. SIGTERM or SIGUSR1 shut the display down
//! gracefully.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::display::{report_error, DisplayCommand, WaveformTui};
use crate::sampler::{AudioSampler, LoudnessFrame, VolumeChannel};
use crate::waveform::{self, AngleTable};

use super::{load_config, start_input};

/// Runs the waveform display until the user quits or the input fails.
///
/// # Errors
/// - If the configuration cannot be loaded or is invalid
/// - If the input cannot be opened or is lost mid-session
/// - If the terminal cannot be driven
pub fn handle_show(input: Option<PathBuf>, looping: bool) -> Result<(), anyhow::Error> {
    tracing::info!("=== sound-displayer started ===");

    let (config, sampler_config) = match load_config() {
        Ok(loaded) => loaded,
        Err(err) => {
            tracing::error!("Failed to load configuration: {err}");
            report_error(&format!(
                "Configuration Error:\n\n{err}\n\nPlease check ~/.config/sound-displayer/sound-displayer.toml and try again."
            ))?;
            return Err(anyhow::anyhow!("Configuration error: {err}"));
        }
    };

    tracing::info!(
        "Configuration loaded: device={}, {}Hz, chunk={}, frame={} ({:.1}ms), refresh={}ms",
        config.audio.device,
        sampler_config.sample_rate,
        sampler_config.chunk_size,
        sampler_config.frame_size,
        sampler_config.frame_duration().as_secs_f64() * 1000.0,
        config.display.refresh_interval_ms
    );

    let angles = AngleTable::half_circle(sampler_config.frame_size);
    let reference = waveform::map(
        &LoudnessFrame::silence(angles.len()),
        &angles,
    )?;

    let channel = Arc::new(VolumeChannel::new());
    let mut sampler = AudioSampler::new(sampler_config, Arc::clone(&channel));

    if let Err(e) = start_input(&mut sampler, &config.audio.device, input.as_deref(), looping) {
        tracing::error!("Failed to start sampling: {}", e);
        report_error(&format!(
            "Audio Input Error:\n\n{e}\n\nPlease check your audio configuration and try again."
        ))?;
        return Err(e.into());
    }

    // Registered before the TUI takes over the terminal.
    let term = register_shutdown_signals()?;
    let mut tui = WaveformTui::new(&config.display, &reference)?;

    let tick = Duration::from_millis(config.display.refresh_interval_ms.max(1));
    let outcome = run_display_loop(&mut tui, &mut sampler, &channel, &angles, &term, tick);

    let stopped = sampler.stop();
    tui.cleanup()?;

    if let Err(e) = outcome {
        tracing::error!("Display loop failed: {}", e);
        report_error(&format!("Error:\n\n{e}"))?;
        return Err(e);
    }
    if let Err(e) = stopped {
        tracing::error!("Sampling ended with error: {}", e);
        report_error(&format!("Audio Input Error:\n\n{e}"))?;
        return Err(e.into());
    }

    tracing::info!("=== sound-displayer exited successfully ===");
    Ok(())
}

/// Returns a flag raised by SIGTERM or SIGUSR1.
fn register_shutdown_signals() -> Result<Arc<AtomicBool>, anyhow::Error> {
    let term = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGTERM, signal_hook::consts::SIGUSR1] {
        signal_hook::flag::register(signal, Arc::clone(&term))
            .map_err(|e| anyhow::anyhow!("Failed to register signal handler: {e}"))?;
    }
    Ok(term)
}

fn run_display_loop(
    tui: &mut WaveformTui,
    sampler: &mut AudioSampler,
    channel: &VolumeChannel,
    angles: &AngleTable,
    term: &AtomicBool,
    tick: Duration,
) -> Result<(), anyhow::Error> {
    loop {
        if term.load(Ordering::Relaxed) {
            tracing::info!("Received termination signal");
            return Ok(());
        }

        sampler.check()?;

        match tui.handle_input(tick)? {
            DisplayCommand::Quit => return Ok(()),
            DisplayCommand::ToggleHold | DisplayCommand::Continue => {}
        }

        if let Some(frame) = channel.take() {
            let points = waveform::map(&frame, angles)?;
            tui.update(points, frame.peak());
        }

        tui.render(channel.stats())?;
    }
}
