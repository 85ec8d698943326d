//! Single-slot, latest-wins handoff between the sampler thread and a consumer.
//!
//! The slot is a `crossbeam-channel` bounded to one message. The channel
//! keeps both ends so `publish` can evict a stale frame when the slot is
//! full; the sampler never waits on the consumer.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::LoudnessFrame;

/// Delivery counters for a [`VolumeChannel`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Frames handed to `publish`.
    pub published: u64,
    /// Frames evicted before a consumer took them.
    pub dropped: u64,
}

/// Mailbox holding at most one undelivered [`LoudnessFrame`].
///
/// Producer side: [`VolumeChannel::publish`]. Consumer side:
/// [`VolumeChannel::take`] or [`VolumeChannel::wait`]. Every frame is
/// delivered at most once, and a newer frame always replaces an older
/// undelivered one.
pub struct VolumeChannel {
    tx: Sender<LoudnessFrame>,
    rx: Receiver<LoudnessFrame>,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl VolumeChannel {
    pub fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self {
            tx,
            rx,
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Stores `frame` as the pending frame, evicting any undelivered one.
    ///
    /// Never blocks.
    pub fn publish(&self, frame: LoudnessFrame) {
        self.published.fetch_add(1, Ordering::Relaxed);

        let mut frame = frame;
        loop {
            match self.tx.try_send(frame) {
                Ok(()) => return,
                Err(TrySendError::Full(rejected)) => {
                    // The consumer may win the race for the stale frame; only
                    // count it as dropped if we evicted it ourselves.
                    if self.rx.try_recv().is_ok() {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                        tracing::trace!("Evicted undelivered loudness frame");
                    }
                    frame = rejected;
                }
                Err(TrySendError::Disconnected(_)) => {
                    // Both ends live in `self`, so this cannot happen while we exist.
                    tracing::debug!("Volume channel disconnected; frame discarded");
                    return;
                }
            }
        }
    }

    /// Returns the pending frame, or `None` if nothing new was published
    /// since the last take. Never blocks.
    pub fn take(&self) -> Option<LoudnessFrame> {
        match self.rx.try_recv() {
            Ok(frame) => Some(frame),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Waits up to `timeout` for a frame to be published.
    pub fn wait(&self, timeout: Duration) -> Option<LoudnessFrame> {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => Some(frame),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            published: self.published.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for VolumeChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn frame(value: f64) -> LoudnessFrame {
        LoudnessFrame::from(vec![value; 4])
    }

    #[test]
    fn test_take_returns_published_frame_once() {
        let channel = VolumeChannel::new();
        channel.publish(frame(1.5));

        assert_eq!(channel.take(), Some(frame(1.5)));
        assert_eq!(channel.take(), None);
    }

    #[test]
    fn test_take_on_empty_channel() {
        let channel = VolumeChannel::new();
        assert_eq!(channel.take(), None);
        assert_eq!(channel.stats(), ChannelStats::default());
    }

    #[test]
    fn test_latest_wins() {
        let channel = VolumeChannel::new();
        channel.publish(frame(1.0));
        channel.publish(frame(2.0));

        assert_eq!(channel.take(), Some(frame(2.0)));
        assert_eq!(channel.take(), None);

        let stats = channel.stats();
        assert_eq!(stats.published, 2);
        assert_eq!(stats.dropped, 1);
    }

    #[test]
    fn test_publish_after_take_is_delivered() {
        let channel = VolumeChannel::new();
        channel.publish(frame(1.0));
        assert_eq!(channel.take(), Some(frame(1.0)));

        channel.publish(frame(3.0));
        assert_eq!(channel.take(), Some(frame(3.0)));
        assert_eq!(channel.stats().dropped, 0);
    }

    #[test]
    fn test_wait_times_out_without_publish() {
        let channel = VolumeChannel::new();
        assert_eq!(channel.wait(Duration::from_millis(10)), None);
    }

    #[test]
    fn test_wait_wakes_on_publish_from_other_thread() {
        let channel = Arc::new(VolumeChannel::new());
        let producer = Arc::clone(&channel);

        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            producer.publish(frame(4.0));
        });

        assert_eq!(channel.wait(Duration::from_secs(5)), Some(frame(4.0)));
        handle.join().unwrap();
    }

    #[test]
    fn test_concurrent_publish_never_duplicates() {
        let channel = Arc::new(VolumeChannel::new());
        let producer = Arc::clone(&channel);

        let handle = std::thread::spawn(move || {
            for i in 0..2000 {
                producer.publish(frame(i as f64));
            }
        });

        let mut seen = Vec::new();
        while !handle.is_finished() {
            if let Some(f) = channel.take() {
                seen.push(f.values()[0]);
            }
        }
        handle.join().unwrap();
        if let Some(f) = channel.take() {
            seen.push(f.values()[0]);
        }

        // Delivered frames are strictly increasing: no repeats, no reordering.
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(seen.last().copied(), Some(1999.0));

        let stats = channel.stats();
        assert_eq!(stats.published, 2000);
        assert!(stats.dropped as usize + seen.len() <= 2000);
    }
}
