//! Live microphone input through cpal.
//!
//! cpal delivers audio through a callback on its own thread. The callback
//! converts each buffer to mono i16 and forwards it over a bounded
//! crossbeam channel; [`CpalStream::read`] turns that push model back into
//! the blocking, fixed-size reads the sampler loop expects.
//!
//! Device loss travels on its own single-slot channel so it can never be
//! displaced by a full audio queue.

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::collections::VecDeque;

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

use super::source::downmix_to_mono;
use super::{AudioSource, SampleStream, SamplerConfig, SamplerError};

/// Callback buffers allowed to queue up before the reader catches up.
const CAPTURE_QUEUE_DEPTH: usize = 256;

/// Microphone source selected by `"default"`, a numeric index, or a device name.
pub struct CpalSource {
    device_name: String,
}

impl CpalSource {
    pub fn new(device_name: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
        }
    }
}

impl AudioSource for CpalSource {
    type Stream = CpalStream;

    fn open(self, config: &SamplerConfig) -> Result<CpalStream, SamplerError> {
        let device = suppress_alsa_warnings(|| {
            let host = cpal::default_host();

            if self.device_name == "default" {
                host.default_input_device()
                    .ok_or_else(|| anyhow!("No audio input device available"))
            } else {
                find_device_by_name(&host, &self.device_name)
            }
        })
        .map_err(|e| SamplerError::DeviceUnavailable(e.to_string()))?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        tracing::info!("Input device: {}", device_name);

        let default_config = device
            .default_input_config()
            .map_err(|e| SamplerError::DeviceUnavailable(format!("{device_name}: {e}")))?;
        let sample_format = default_config.sample_format();

        if default_config.sample_rate().0 != config.sample_rate {
            tracing::debug!(
                "Device prefers {}Hz; requesting {}Hz",
                default_config.sample_rate().0,
                config.sample_rate
            );
        }

        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        tracing::debug!(
            "Opening input stream: {}Hz, {} channel(s), native format {:?}",
            config.sample_rate,
            config.channels,
            sample_format
        );

        let (tx, rx) = bounded(CAPTURE_QUEUE_DEPTH);
        let (fail_tx, fail_rx) = bounded(1);
        let channels = config.channels as usize;

        let stream = match sample_format {
            cpal::SampleFormat::I16 => {
                build_stream::<i16>(&device, &stream_config, channels, tx, fail_tx)
            }
            cpal::SampleFormat::U16 => {
                build_stream::<u16>(&device, &stream_config, channels, tx, fail_tx)
            }
            cpal::SampleFormat::F32 => {
                build_stream::<f32>(&device, &stream_config, channels, tx, fail_tx)
            }
            other => {
                return Err(SamplerError::DeviceUnavailable(format!(
                    "{device_name}: unsupported sample format {other:?}"
                )))
            }
        }
        .map_err(|e| SamplerError::DeviceUnavailable(format!("{device_name}: {e}")))?;

        stream
            .play()
            .map_err(|e| SamplerError::DeviceUnavailable(format!("{device_name}: {e}")))?;

        tracing::debug!("Audio stream started");
        Ok(CpalStream {
            _stream: stream,
            reader: ChunkReader::new(rx, fail_rx),
        })
    }
}

/// An open microphone stream. Dropping it stops capture and frees the device.
pub struct CpalStream {
    _stream: cpal::Stream,
    reader: ChunkReader,
}

impl SampleStream for CpalStream {
    fn read(&mut self, buf: &mut [i16]) -> Result<(), SamplerError> {
        self.reader.read(buf)
    }
}

/// Reassembles callback-sized buffers into reads of arbitrary length.
struct ChunkReader {
    samples: Receiver<Vec<i16>>,
    failures: Receiver<String>,
    pending: VecDeque<i16>,
}

impl ChunkReader {
    fn new(samples: Receiver<Vec<i16>>, failures: Receiver<String>) -> Self {
        Self {
            samples,
            failures,
            pending: VecDeque::new(),
        }
    }

    /// Fills `buf` completely, or fails as soon as the device is reported lost.
    fn read(&mut self, buf: &mut [i16]) -> Result<(), SamplerError> {
        while self.pending.len() < buf.len() {
            // A reported failure wins over queued audio.
            if let Ok(reason) = self.failures.try_recv() {
                return Err(SamplerError::ReadError(reason));
            }

            select! {
                recv(self.failures) -> failure => {
                    return Err(SamplerError::ReadError(
                        failure.unwrap_or_else(|_| "audio stream closed".to_string()),
                    ));
                }
                recv(self.samples) -> samples => match samples {
                    Ok(samples) => self.pending.extend(samples),
                    Err(_) => return Err(SamplerError::ReadError("audio stream closed".into())),
                },
            }
        }

        let len = buf.len();
        for (slot, sample) in buf.iter_mut().zip(self.pending.drain(..len)) {
            *slot = sample;
        }
        Ok(())
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    tx: Sender<Vec<i16>>,
    fail_tx: Sender<String>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let converted: Vec<i16> = data.iter().map(|&s| i16::from_sample(s)).collect();
            let mono = downmix_to_mono(&converted, channels);
            if tx.try_send(mono).is_err() {
                tracing::trace!("Capture queue full; dropping audio buffer");
            }
        },
        move |err| match err {
            cpal::StreamError::DeviceNotAvailable => {
                tracing::error!("Audio input device lost");
                // Only the first loss matters; later ones find the slot taken.
                let _ = fail_tx.try_send(err.to_string());
            }
            other => {
                tracing::warn!("Audio stream error: {}", other);
            }
        },
        None,
    )
}

/// Finds an audio input device by name or numeric index.
///
/// # Arguments
/// * `host` - The cpal audio host
/// * `device_spec` - A device name or a numeric index (0, 1, 2, etc.)
///
/// # Errors
/// - If no device with the specified name/index is found
fn find_device_by_name(host: &cpal::Host, device_spec: &str) -> Result<cpal::Device> {
    let devices: Vec<_> = host
        .input_devices()
        .map_err(|e| anyhow!("Failed to enumerate devices: {e}"))?
        .collect();

    if let Ok(index) = device_spec.parse::<usize>() {
        let count = devices.len();
        return devices.into_iter().nth(index).ok_or_else(|| {
            anyhow!(
                "Device index {} is out of range (0-{})",
                index,
                count.saturating_sub(1)
            )
        });
    }

    devices
        .into_iter()
        .find(|device| device.name().map(|n| n == device_spec).unwrap_or(false))
        .ok_or_else(|| {
            anyhow!(
                "Audio input device '{device_spec}' not found. Use 'sound-displayer list-devices' to see available devices."
            )
        })
}

/// Runs `f` with stderr pointed at /dev/null to hide ALSA's probing noise.
#[cfg(target_os = "linux")]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let dev_null = OpenOptions::new()
        .write(true)
        .open("/dev/null")
        .map_err(|e| anyhow!("Failed to open /dev/null: {e}"))?;

    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        return Err(anyhow!("Failed to duplicate stderr"));
    }

    if unsafe { libc::dup2(dev_null.as_raw_fd(), libc::STDERR_FILENO) } == -1 {
        unsafe { libc::close(old_stderr) };
        return Err(anyhow!("Failed to redirect stderr"));
    }

    let result = f();

    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }

    result
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_reader_reassembles_across_buffers() {
        let (tx, rx) = bounded(8);
        let (_fail_tx, fail_rx) = bounded::<String>(1);
        let mut reader = ChunkReader::new(rx, fail_rx);

        tx.send(vec![1, 2]).unwrap();
        tx.send(vec![3, 4, 5, 6, 7]).unwrap();

        let mut buf = [0i16; 3];
        reader.read(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
        reader.read(&mut buf).unwrap();
        assert_eq!(buf, [4, 5, 6]);
        assert_eq!(reader.pending.len(), 1);
    }

    #[test]
    fn test_reader_reports_device_failure() {
        let (tx, rx) = bounded(8);
        let (fail_tx, fail_rx) = bounded(1);
        let mut reader = ChunkReader::new(rx, fail_rx);

        tx.send(vec![1]).unwrap();
        fail_tx.send("device unplugged".to_string()).unwrap();

        let mut buf = [0i16; 3];
        assert_eq!(
            reader.read(&mut buf),
            Err(SamplerError::ReadError("device unplugged".into()))
        );
    }

    #[test]
    fn test_failure_is_not_lost_behind_a_full_queue() {
        let (tx, rx) = bounded(2);
        let (fail_tx, fail_rx) = bounded(1);
        let mut reader = ChunkReader::new(rx, fail_rx);

        tx.send(vec![1, 2]).unwrap();
        tx.send(vec![3, 4]).unwrap();
        assert!(tx.try_send(vec![5, 6]).is_err());
        fail_tx.try_send("device unplugged".to_string()).unwrap();

        // Both senders stay alive, as they do inside a running cpal stream.
        let mut buf = [0i16; 8];
        assert_eq!(
            reader.read(&mut buf),
            Err(SamplerError::ReadError("device unplugged".into()))
        );
        drop(tx);
        drop(fail_tx);
    }

    #[test]
    fn test_failure_wakes_a_blocked_read() {
        let (tx, rx) = bounded::<Vec<i16>>(8);
        let (fail_tx, fail_rx) = bounded(1);
        let mut reader = ChunkReader::new(rx, fail_rx);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            fail_tx.send("device unplugged".to_string()).unwrap();
            fail_tx
        });

        let mut buf = [0i16; 3];
        assert_eq!(
            reader.read(&mut buf),
            Err(SamplerError::ReadError("device unplugged".into()))
        );
        let _fail_tx = handle.join().unwrap();
        drop(tx);
    }

    #[test]
    fn test_reader_reports_closed_stream() {
        let (tx, rx) = bounded::<Vec<i16>>(8);
        let (_fail_tx, fail_rx) = bounded::<String>(1);
        let mut reader = ChunkReader::new(rx, fail_rx);
        drop(tx);

        let mut buf = [0i16; 3];
        assert!(matches!(reader.read(&mut buf), Err(SamplerError::ReadError(_))));
    }
}
