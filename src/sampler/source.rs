//! Input source abstraction used by the sampler thread.
//!
//! An [`AudioSource`] is moved onto the sampler thread and opened there, so
//! the resulting stream never has to cross threads (cpal streams are not
//! `Send` on every platform).

use super::{SamplerConfig, SamplerError};

/// Something that can be opened into a blocking mono sample stream.
pub trait AudioSource: Send + 'static {
    type Stream: SampleStream;

    /// Acquires the underlying device for the given configuration.
    ///
    /// # Errors
    /// - [`SamplerError::DeviceUnavailable`] if the input cannot be opened
    fn open(self, config: &SamplerConfig) -> Result<Self::Stream, SamplerError>;
}

/// An open input stream. Dropping the stream releases the device.
pub trait SampleStream {
    /// Fills `buf` completely with the next mono samples, blocking until
    /// they are available.
    ///
    /// # Errors
    /// - [`SamplerError::ReadError`] if the stream failed or ran dry
    fn read(&mut self, buf: &mut [i16]) -> Result<(), SamplerError>;
}

/// Converts interleaved multi-channel audio to mono by averaging channels.
pub fn downmix_to_mono(data: &[i16], num_channels: usize) -> Vec<i16> {
    match num_channels {
        0 | 1 => data.to_vec(),
        2 => data
            .chunks_exact(2)
            .map(|pair| ((pair[0] as i32 + pair[1] as i32) / 2) as i16)
            .collect(),
        _ => data
            .chunks_exact(num_channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / num_channels as i32) as i16
            })
            .collect(),
    }
}
