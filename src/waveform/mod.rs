//! Polar mapping of loudness frames onto the display half circle.
//!
//! Each loudness value is used as a radius at a fixed angle. The angle table
//! is built once and shared read-only; mapping is pure and can run at the
//! renderer's own cadence.

use std::f64::consts::PI;
use std::sync::Arc;

use thiserror::Error;

use crate::sampler::LoudnessFrame;

/// Mapping contract violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaveformError {
    /// Frame and angle table disagree on length. Indicates a wiring bug.
    #[error("loudness frame has {frame} values but the angle table has {angles}")]
    LengthMismatch { frame: usize, angles: usize },
}

/// Immutable, evenly spaced angles covering `[0, π]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AngleTable {
    angles: Arc<[f64]>,
}

impl AngleTable {
    /// Builds `steps` angles from 0 to π inclusive. A single step is `[0]`.
    pub fn half_circle(steps: usize) -> Self {
        let angles: Vec<f64> = match steps {
            0 => Vec::new(),
            1 => vec![0.0],
            _ => {
                let last = (steps - 1) as f64;
                (0..steps)
                    .map(|i| if i == steps - 1 { PI } else { PI * i as f64 / last })
                    .collect()
            }
        };
        Self {
            angles: angles.into(),
        }
    }

    pub fn angles(&self) -> &[f64] {
        &self.angles
    }

    pub fn len(&self) -> usize {
        self.angles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }
}

impl From<Vec<f64>> for AngleTable {
    fn from(angles: Vec<f64>) -> Self {
        Self {
            angles: angles.into(),
        }
    }
}

/// A display-space point for one angular step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformPoint {
    pub x: f64,
    pub y: f64,
}

/// Maps each loudness value to `(r·cos θ, r·sin θ)` at its angle.
///
/// # Errors
/// - [`WaveformError::LengthMismatch`] if the frame and table lengths differ
pub fn map(frame: &LoudnessFrame, angles: &AngleTable) -> Result<Vec<WaveformPoint>, WaveformError> {
    if frame.len() != angles.len() {
        return Err(WaveformError::LengthMismatch {
            frame: frame.len(),
            angles: angles.len(),
        });
    }

    Ok(frame
        .values()
        .iter()
        .zip(angles.angles())
        .map(|(&radius, &theta)| WaveformPoint {
            x: radius * theta.cos(),
            y: radius * theta.sin(),
        })
        .collect())
}
