//! # wavplay-core
//!
//! Streaming playback engine for uncompressed PCM audio: feeds a
//! real-time pull-based render callback from file-backed sample data and
//! negotiates the stream format the output device uses to interpret the
//! bytes.
//!
//! ## Quick start
//!
//! ```no_run
//! use wavplay_core::{CpalOutputDevice, OutputDevice, PlaybackEngine, WavFileSource};
//!
//! let mut device = CpalOutputDevice::new(None)?;
//! device.initialize()?;
//!
//! let mut engine = PlaybackEngine::new(device);
//! let source = WavFileSource::open("audio.wav")?;
//! let stats = engine.play(Box::new(source))?;
//! println!("played {} frames", stats.frames_rendered);
//!
//! engine.device_mut().teardown()?;
//! # Ok::<(), wavplay_core::WavplayError>(())
//! ```
//!
//! ## Architecture
//!
//! Two execution contexts: the device's real-time render thread pulls
//! fixed-size byte buffers through a [`PullHandler`], while the
//! orchestrating thread blocks in
//! [`PlaybackEngine::run_until_complete`] until the source drains. The
//! pull handler owns the source cursor for the duration of a callback;
//! completion is handed over through a one-shot latch so the wake cannot
//! be missed. One [`PlaybackSession`] plays exactly one source.

pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod format;
pub mod source;

pub use config::PlayConfig;
pub use device::{CpalOutputDevice, OutputDevice, Pull, PullHandler};
pub use engine::{PlaybackEngine, PlaybackSession, PlaybackStats, SessionStage};
pub use error::{Result, WavplayError};
pub use format::{FormatId, StreamFormat, format_flags};
pub use source::{RawPcmSource, SampleSource, WavFileSource};
