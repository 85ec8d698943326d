//! Headless frame probe.
//!
//! Runs the sampler without the terminal display and prints one summary
//! line per received frame. Handy for checking that a microphone (or a WAV
//! file) produces sensible loudness values.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::sampler::{AudioSampler, VolumeChannel};
use crate::waveform::{self, AngleTable, WaveformPoint};

use super::{load_config, start_input};

/// Prints summaries for `frames` frames (0 = until Ctrl+C).
///
/// # Errors
/// - If the configuration cannot be loaded or is invalid
/// - If the input cannot be opened or fails mid-session
pub async fn handle_probe(
    frames: usize,
    input: Option<PathBuf>,
    looping: bool,
) -> Result<(), anyhow::Error> {
    let (config, sampler_config) = load_config()?;

    let channel = Arc::new(VolumeChannel::new());
    let mut sampler = AudioSampler::new(sampler_config, Arc::clone(&channel));
    start_input(&mut sampler, &config.audio.device, input.as_deref(), looping)?;

    let angles = AngleTable::half_circle(sampler_config.frame_size);

    let mut interval = tokio::time::interval(Duration::from_millis(
        config.display.refresh_interval_ms.max(1),
    ));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut received = 0usize;
    let outcome: Result<(), anyhow::Error> = loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("Probe interrupted");
                break Ok(());
            }
            _ = interval.tick() => {
                if let Err(e) = sampler.check() {
                    break Err(e.into());
                }
                let Some(frame) = channel.take() else {
                    continue;
                };

                received += 1;
                let points = match waveform::map(&frame, &angles) {
                    Ok(points) => points,
                    Err(e) => break Err(e.into()),
                };
                println!(
                    "frame {:>5}  peak {:.3}  mean {:.3}  span {:.3}",
                    received,
                    frame.peak(),
                    frame.mean(),
                    horizontal_span(&points)
                );

                if frames != 0 && received >= frames {
                    break Ok(());
                }
            }
        }
    };

    let stopped = sampler.stop();
    outcome?;
    let session = stopped?;

    let delivery = channel.stats();
    println!(
        "{} frames published, {} shown, {} dropped",
        session.frames_published, received, delivery.dropped
    );
    Ok(())
}

/// Width of the waveform along the x axis.
fn horizontal_span(points: &[WaveformPoint]) -> f64 {
    let (min, max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.x), hi.max(p.x))
        });
    if points.is_empty() {
        0.0
    } else {
        max - min
    }
}
