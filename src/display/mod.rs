//! Terminal rendering for the waveform display.

pub mod error;
pub mod ui;

pub use error::report_error;
pub use ui::{DisplayCommand, WaveformTui};
