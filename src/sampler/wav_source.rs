//! WAV file playback as a stand-in microphone.
//!
//! Useful for demos and for checking the display against a known recording.
//! The whole file is decoded up front; reads then walk the mono buffer,
//! optionally sleeping so the sampler sees audio at its natural rate.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::source::downmix_to_mono;
use super::{AudioSource, SampleStream, SamplerConfig, SamplerError};

/// How far playback may run ahead of the wall clock before it sleeps.
const PACING_SLACK: Duration = Duration::from_millis(5);

/// Replays a WAV file through the sampler.
#[derive(Debug, Clone)]
pub struct WavSource {
    path: PathBuf,
    looping: bool,
    realtime: bool,
}

impl WavSource {
    /// Creates a real-time, non-looping source for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            looping: false,
            realtime: true,
        }
    }

    /// Restart from the beginning instead of failing at end of file.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Pace reads to the file's sample rate. Disable to read as fast as possible.
    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }
}

impl AudioSource for WavSource {
    type Stream = WavStream;

    fn open(self, config: &SamplerConfig) -> Result<WavStream, SamplerError> {
        let (samples, sample_rate) = decode_mono(&self.path).map_err(|e| {
            SamplerError::DeviceUnavailable(format!("{}: {e}", self.path.display()))
        })?;

        if samples.is_empty() {
            return Err(SamplerError::DeviceUnavailable(format!(
                "{}: file contains no audio",
                self.path.display()
            )));
        }

        if sample_rate != config.sample_rate {
            tracing::warn!(
                "{} is {}Hz but the sampler expects {}Hz. Playing at file rate.",
                self.path.display(),
                sample_rate,
                config.sample_rate
            );
        }

        tracing::info!(
            "Input file: {} ({} samples at {}Hz, loop={})",
            self.path.display(),
            samples.len(),
            sample_rate,
            self.looping
        );

        Ok(WavStream {
            samples,
            position: 0,
            looping: self.looping,
            pacing: self.realtime.then(|| Pacing::new(sample_rate)),
        })
    }
}

/// An open WAV playback stream.
pub struct WavStream {
    samples: Vec<i16>,
    position: usize,
    looping: bool,
    pacing: Option<Pacing>,
}

impl SampleStream for WavStream {
    fn read(&mut self, buf: &mut [i16]) -> Result<(), SamplerError> {
        for slot in buf.iter_mut() {
            if self.position == self.samples.len() {
                if !self.looping {
                    return Err(SamplerError::ReadError("end of input file".into()));
                }
                tracing::debug!("Input file finished; looping");
                self.position = 0;
            }
            *slot = self.samples[self.position];
            self.position += 1;
        }

        if let Some(pacing) = &mut self.pacing {
            pacing.advance(buf.len());
        }
        Ok(())
    }
}

/// Keeps playback from outrunning the wall clock.
struct Pacing {
    started: Instant,
    sample_rate: u32,
    consumed: u64,
}

impl Pacing {
    fn new(sample_rate: u32) -> Self {
        Self {
            started: Instant::now(),
            sample_rate,
            consumed: 0,
        }
    }

    fn advance(&mut self, samples: usize) {
        self.consumed += samples as u64;
        let due = Duration::from_secs_f64(self.consumed as f64 / self.sample_rate as f64);
        let elapsed = self.started.elapsed();
        if due > elapsed + PACING_SLACK {
            std::thread::sleep(due - elapsed);
        }
    }
}

/// Reads a WAV file and returns its mono i16 samples and sample rate.
fn decode_mono(path: &Path) -> Result<(Vec<i16>, u32), hound::Error> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let interleaved: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, bits) if bits <= 16 => {
            let shift = 16 - bits;
            reader
                .samples::<i16>()
                .map(|s| s.map(|v| v << shift))
                .collect::<Result<_, _>>()?
        }
        (hound::SampleFormat::Int, bits) => {
            let shift = bits - 16;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| (v >> shift) as i16))
                .collect::<Result<_, _>>()?
        }
        (hound::SampleFormat::Float, _) => reader
            .samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
            .collect::<Result<_, _>>()?,
    };

    Ok((
        downmix_to_mono(&interleaved, spec.channels as usize),
        spec.sample_rate,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_fixture(name: &str, channels: u16, samples: &[i16]) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "sound_displayer_{}_{}.wav",
            name,
            std::process::id()
        ));
        let spec = hound::WavSpec {
            channels,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    #[test]
    fn test_reads_mono_file_in_chunks() {
        let path = write_fixture("mono", 1, &[1, 2, 3, 4, 5, 6]);
        let mut stream = WavSource::new(&path)
            .realtime(false)
            .open(&SamplerConfig::default())
            .unwrap();

        let mut buf = [0i16; 3];
        stream.read(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
        stream.read(&mut buf).unwrap();
        assert_eq!(buf, [4, 5, 6]);
        assert!(matches!(stream.read(&mut buf), Err(SamplerError::ReadError(_))));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_stereo_file_is_downmixed() {
        let path = write_fixture("stereo", 2, &[10, 20, -10, -30, 0, 100]);
        let mut stream = WavSource::new(&path)
            .realtime(false)
            .open(&SamplerConfig::default())
            .unwrap();

        let mut buf = [0i16; 3];
        stream.read(&mut buf).unwrap();
        assert_eq!(buf, [15, -20, 50]);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_looping_wraps_around() {
        let path = write_fixture("loop", 1, &[7, 8]);
        let mut stream = WavSource::new(&path)
            .looping(true)
            .realtime(false)
            .open(&SamplerConfig::default())
            .unwrap();

        let mut buf = [0i16; 5];
        stream.read(&mut buf).unwrap();
        assert_eq!(buf, [7, 8, 7, 8, 7]);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_file_is_device_unavailable() {
        let result = WavSource::new("/nonexistent/sound_displayer.wav").open(&SamplerConfig::default());
        assert!(matches!(result, Err(SamplerError::DeviceUnavailable(_))));
    }
}
