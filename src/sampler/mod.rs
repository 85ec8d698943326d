//! Real-time microphone sampling and loudness framing.
//!
//! Data flows one way: an input source is read in tiny chunks on a
//! dedicated thread, each chunk becomes one loudness sample, and every
//! `frame_size` samples are sealed into a [`LoudnessFrame`] and handed to a
//! [`VolumeChannel`] for whichever context renders them.

pub mod channel;
pub mod config;
pub mod cpal_source;
pub mod error;
pub mod frame;
pub mod loudness;
pub mod session;
pub mod source;
pub mod wav_source;

pub use channel::{ChannelStats, VolumeChannel};
pub use config::SamplerConfig;
pub use cpal_source::CpalSource;
pub use error::SamplerError;
pub use frame::LoudnessFrame;
pub use session::{AudioSampler, SessionStats};
pub use source::{AudioSource, SampleStream};
pub use wav_source::WavSource;
