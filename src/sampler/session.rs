//! The background sampling loop and its owner handle.
//!
//! [`AudioSampler::start`] spawns a dedicated thread which opens the input,
//! reports the outcome back before `start` returns, and then loops:
//! read one chunk, convert it to a loudness sample, and publish a frame to
//! the [`VolumeChannel`] each time the batch is full.
//!
//! Cancellation is cooperative. The stop flag is checked before and after
//! every read, so `stop()` returns once the in-flight read completes. A read
//! that never returns (a hung driver) will hang `stop()` with it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use super::frame::FrameBuilder;
use super::loudness::loudness;
use super::{AudioSource, SampleStream, SamplerConfig, SamplerError, VolumeChannel};

/// Counters describing a finished sampling session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Loudness samples produced (one per chunk read).
    pub samples: u64,
    /// Complete frames handed to the volume channel.
    pub frames_published: u64,
    /// Samples left in the unsealed buffer when the session ended.
    pub discarded_partial: usize,
}

type Worker = JoinHandle<Result<SessionStats, SamplerError>>;

/// Owns the sampler thread and its stop flag.
pub struct AudioSampler {
    config: SamplerConfig,
    channel: Arc<VolumeChannel>,
    stop: Arc<AtomicBool>,
    worker: Option<Worker>,
}

impl AudioSampler {
    pub fn new(config: SamplerConfig, channel: Arc<VolumeChannel>) -> Self {
        Self {
            config,
            channel,
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Opens `source` on a new sampler thread and begins sampling.
    ///
    /// Returns only after the device has been opened (or failed to open).
    ///
    /// # Errors
    /// - [`SamplerError::AlreadyRunning`] if a session is active
    /// - [`SamplerError::InvalidConfig`] if the configuration is rejected
    /// - [`SamplerError::DeviceUnavailable`] if the input cannot be opened
    pub fn start<S: AudioSource>(&mut self, source: S) -> Result<(), SamplerError> {
        if self.worker.is_some() {
            return Err(SamplerError::AlreadyRunning);
        }
        self.config.validate()?;

        self.stop.store(false, Ordering::Release);

        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), SamplerError>>(1);
        let config = self.config;
        let channel = Arc::clone(&self.channel);
        let stop = Arc::clone(&self.stop);

        let worker = std::thread::Builder::new()
            .name("audio-sampler".into())
            .spawn(move || {
                let stream = match source.open(&config) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.clone()));
                        return Err(e);
                    }
                };
                run_session(stream, &config, &channel, &stop)
            })
            .map_err(|e| SamplerError::DeviceUnavailable(format!("failed to spawn sampler thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                tracing::info!(
                    "Sampling started: {}Hz, {} channel(s), chunk={} frame={}",
                    config.sample_rate,
                    config.channels,
                    config.chunk_size,
                    config.frame_size
                );
                self.worker = Some(worker);
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::error!("Failed to open audio input: {}", e);
                let _ = worker.join();
                Err(e)
            }
            Err(_) => {
                tracing::error!("Sampler thread exited before reporting readiness");
                let _ = worker.join();
                Err(SamplerError::WorkerPanicked)
            }
        }
    }

    /// Asks the sampling loop to exit without waiting for it.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Stops sampling and waits for the thread to release the device.
    ///
    /// Any partially filled frame is discarded. Returns the session counters,
    /// or the error that had already ended the session. Calling `stop` with
    /// no active session returns empty stats.
    pub fn stop(&mut self) -> Result<SessionStats, SamplerError> {
        self.request_stop();

        let Some(worker) = self.worker.take() else {
            return Ok(SessionStats::default());
        };

        let result = worker.join().unwrap_or(Err(SamplerError::WorkerPanicked));
        match &result {
            Ok(stats) => tracing::info!(
                "Sampling stopped: {} frames published, {} samples discarded",
                stats.frames_published,
                stats.discarded_partial
            ),
            Err(e) => tracing::warn!("Sampling session ended with error: {}", e),
        }
        result
    }

    /// Whether a session is active and its thread is still sampling.
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Surfaces a session that ended on its own (e.g. the device vanished).
    ///
    /// Never blocks on a live session. Returns `Ok(())` while sampling is
    /// healthy or after a session that ended cleanly.
    pub fn check(&mut self) -> Result<(), SamplerError> {
        if self.worker.as_ref().is_some_and(|w| w.is_finished()) {
            self.stop().map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Drop for AudioSampler {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.stop();
        }
    }
}

/// The acquisition loop. Runs on the sampler thread until stopped or failed.
fn run_session<T: SampleStream>(
    mut stream: T,
    config: &SamplerConfig,
    channel: &VolumeChannel,
    stop: &AtomicBool,
) -> Result<SessionStats, SamplerError> {
    let mut chunk = vec![0i16; config.chunk_size];
    let mut builder = FrameBuilder::new(config.frame_size);
    let mut stats = SessionStats::default();

    while !stop.load(Ordering::Acquire) {
        if let Err(e) = stream.read(&mut chunk) {
            tracing::error!("Audio read failed after {} samples: {}", stats.samples, e);
            drop(stream);
            return Err(SamplerError::DeviceUnavailable(e.to_string()));
        }

        // Stop requested while the read was in flight: abandon the chunk.
        if stop.load(Ordering::Acquire) {
            break;
        }

        stats.samples += 1;
        if let Some(frame) = builder.push(loudness(&chunk)) {
            channel.publish(frame);
            stats.frames_published += 1;
            if stats.frames_published % 500 == 0 {
                tracing::debug!("Sampler: {} frames published", stats.frames_published);
            }
        }
    }

    stats.discarded_partial = builder.discard();
    drop(stream);
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{Receiver, Sender};
    use std::time::Duration;

    /// Produces a fixed number of chunks with a constant amplitude, then fails.
    struct ScriptedSource {
        amplitude: i16,
        reads: usize,
    }

    struct ScriptedStream {
        amplitude: i16,
        remaining: usize,
    }

    impl AudioSource for ScriptedSource {
        type Stream = ScriptedStream;

        fn open(self, _config: &SamplerConfig) -> Result<ScriptedStream, SamplerError> {
            Ok(ScriptedStream {
                amplitude: self.amplitude,
                remaining: self.reads,
            })
        }
    }

    impl SampleStream for ScriptedStream {
        fn read(&mut self, buf: &mut [i16]) -> Result<(), SamplerError> {
            if self.remaining == 0 {
                return Err(SamplerError::ReadError("script exhausted".into()));
            }
            self.remaining -= 1;
            buf.fill(self.amplitude);
            Ok(())
        }
    }

    /// Fails to open.
    struct UnpluggedSource;

    impl AudioSource for UnpluggedSource {
        type Stream = ScriptedStream;

        fn open(self, _config: &SamplerConfig) -> Result<ScriptedStream, SamplerError> {
            Err(SamplerError::DeviceUnavailable("no microphone".into()))
        }
    }

    /// Serves `before_gate` reads immediately, then blocks until the test
    /// opens the gate. Reports when it reaches the gate and when dropped.
    struct GatedSource {
        before_gate: usize,
        reached: Sender<()>,
        gate: Receiver<()>,
        released: Sender<()>,
    }

    struct GatedStream {
        served: usize,
        before_gate: usize,
        reached: Sender<()>,
        gate: Receiver<()>,
        released: Sender<()>,
    }

    impl AudioSource for GatedSource {
        type Stream = GatedStream;

        fn open(self, _config: &SamplerConfig) -> Result<GatedStream, SamplerError> {
            Ok(GatedStream {
                served: 0,
                before_gate: self.before_gate,
                reached: self.reached,
                gate: self.gate,
                released: self.released,
            })
        }
    }

    impl SampleStream for GatedStream {
        fn read(&mut self, buf: &mut [i16]) -> Result<(), SamplerError> {
            if self.served == self.before_gate {
                let _ = self.reached.send(());
                let _ = self.gate.recv();
            }
            self.served += 1;
            buf.fill(1000);
            Ok(())
        }
    }

    impl Drop for GatedStream {
        fn drop(&mut self) {
            let _ = self.released.send(());
        }
    }

    fn wait_until_finished(sampler: &AudioSampler) {
        for _ in 0..500 {
            if !sampler.is_running() {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("sampler thread did not finish");
    }

    #[test]
    fn test_start_fails_synchronously_when_device_missing() {
        let channel = Arc::new(VolumeChannel::new());
        let mut sampler = AudioSampler::new(SamplerConfig::default(), Arc::clone(&channel));

        let result = sampler.start(UnpluggedSource);
        assert_eq!(result, Err(SamplerError::DeviceUnavailable("no microphone".into())));
        assert!(!sampler.is_running());
        assert_eq!(channel.take(), None);
    }

    #[test]
    fn test_publishes_only_full_frames_and_reports_read_failure() {
        let channel = Arc::new(VolumeChannel::new());
        let mut sampler = AudioSampler::new(SamplerConfig::default(), Arc::clone(&channel));

        // Two full frames plus a 50-sample tail, then the script runs dry.
        sampler
            .start(ScriptedSource {
                amplitude: 0,
                reads: 2 * 180 + 50,
            })
            .unwrap();
        wait_until_finished(&sampler);

        let frame = channel.take().expect("latest frame is pending");
        assert_eq!(frame.len(), 180);
        assert!(frame.values().iter().all(|&v| v == 1.0));
        assert_eq!(channel.take(), None);

        let stats = channel.stats();
        assert_eq!(stats.published, 2);
        assert_eq!(stats.dropped, 1);

        assert!(matches!(sampler.check(), Err(SamplerError::DeviceUnavailable(_))));
        assert!(!sampler.is_running());
    }

    #[test]
    fn test_frame_values_follow_loudness_formula() {
        let channel = Arc::new(VolumeChannel::new());
        let config = SamplerConfig::new(44_100, 1, 16, 3, 4).unwrap();
        let mut sampler = AudioSampler::new(config, Arc::clone(&channel));

        sampler
            .start(ScriptedSource {
                amplitude: 1000,
                reads: 4,
            })
            .unwrap();
        wait_until_finished(&sampler);

        let expected = 1000f64.powf(0.8) / 4000.0 + 1.0;
        assert_eq!(channel.take().unwrap().values(), &[expected; 4]);
    }

    #[test]
    fn test_stop_mid_buffer_discards_partial_frame() {
        let channel = Arc::new(VolumeChannel::new());
        let mut sampler = AudioSampler::new(SamplerConfig::default(), Arc::clone(&channel));

        let (reached_tx, reached_rx) = crossbeam_channel::bounded(1);
        let (gate_tx, gate_rx) = crossbeam_channel::bounded(1);
        let (released_tx, released_rx) = crossbeam_channel::bounded(1);

        sampler
            .start(GatedSource {
                before_gate: 90,
                reached: reached_tx,
                gate: gate_rx,
                released: released_tx,
            })
            .unwrap();

        reached_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        sampler.request_stop();
        gate_tx.send(()).unwrap();

        let stats = sampler.stop().unwrap();
        assert_eq!(stats.samples, 90);
        assert_eq!(stats.frames_published, 0);
        assert_eq!(stats.discarded_partial, 90);

        // The stream was dropped before stop() returned.
        assert!(released_rx.try_recv().is_ok());
        assert_eq!(channel.take(), None);
        assert_eq!(channel.stats().published, 0);
    }

    #[test]
    fn test_start_while_running_is_rejected() {
        let channel = Arc::new(VolumeChannel::new());
        let mut sampler = AudioSampler::new(SamplerConfig::default(), Arc::clone(&channel));

        let (reached_tx, reached_rx) = crossbeam_channel::bounded(1);
        let (gate_tx, gate_rx) = crossbeam_channel::bounded(1);
        let (released_tx, _released_rx) = crossbeam_channel::bounded(1);

        sampler
            .start(GatedSource {
                before_gate: 0,
                reached: reached_tx,
                gate: gate_rx,
                released: released_tx,
            })
            .unwrap();
        reached_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        assert_eq!(sampler.start(UnpluggedSource), Err(SamplerError::AlreadyRunning));
        assert!(sampler.is_running());
        assert!(sampler.check().is_ok());

        sampler.request_stop();
        gate_tx.send(()).unwrap();
        assert_eq!(sampler.stop().unwrap().samples, 0);
    }

    #[test]
    fn test_restart_after_stop() {
        let channel = Arc::new(VolumeChannel::new());
        let config = SamplerConfig::new(44_100, 1, 16, 3, 2).unwrap();
        let mut sampler = AudioSampler::new(config, Arc::clone(&channel));

        sampler.start(ScriptedSource { amplitude: 0, reads: 2 }).unwrap();
        wait_until_finished(&sampler);
        assert!(sampler.stop().is_err());
        assert!(channel.take().is_some());

        sampler.start(ScriptedSource { amplitude: 0, reads: 2 }).unwrap();
        wait_until_finished(&sampler);
        assert!(channel.take().is_some());
    }

    #[test]
    fn test_stop_without_session() {
        let mut sampler = AudioSampler::new(SamplerConfig::default(), Arc::new(VolumeChannel::new()));
        assert_eq!(sampler.stop(), Ok(SessionStats::default()));
    }
}
