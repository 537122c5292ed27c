//! Streaming playback engine.
//!
//! Bridges two execution contexts: the device's real-time render thread,
//! which pulls fixed-size buffers through a [`PullHandler`], and the
//! orchestrating thread, which starts playback and blocks until the
//! source drains. Shared cursor/stage state lives under one mutex; the
//! handler only ever holds it for a bounded source read, and completion
//! is signaled through a one-shot latch so the orchestrator cannot miss
//! the wake even if it has not blocked yet.

use crate::device::{OutputDevice, Pull, PullHandler};
use crate::error::{Result, WavplayError};
use crate::format::StreamFormat;
use crate::source::SampleSource;
use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::{Arc, Mutex};

/// Lifecycle of one playback session. Transitions are one-way; a session
/// plays exactly one source and is then spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStage {
    /// Created, not yet started.
    Idle,
    /// Device render clock running, handler answering pulls.
    Running,
    /// End-of-stream (or a fault) observed inside the pull handler; the
    /// orchestrator has been signaled but has not yet stopped the device.
    Draining,
    /// Device stopped, handler unregistered, source closed.
    Stopped,
}

/// Counters accumulated over one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    /// Render pulls answered while the session was live, including the
    /// final exhausted one.
    pub pulls: u64,
    /// Frames of real sample data delivered (padding excluded).
    pub frames_rendered: u64,
}

struct SessionState {
    source: Box<dyn SampleSource + Send>,
    stage: SessionStage,
    error: Option<WavplayError>,
    stats: PlaybackStats,
}

struct SessionShared {
    state: Mutex<SessionState>,
    done_tx: Sender<()>,
    done_rx: Receiver<()>,
}

/// Mutable state owned by the engine for the lifetime of one file's
/// playback: the sample source with its monotonically advancing read
/// cursor, the stage flag, and the completion latch coordinating the
/// render thread with the orchestrator.
pub struct PlaybackSession {
    shared: Arc<SessionShared>,
    bytes_per_frame: usize,
}

impl PlaybackSession {
    /// Wrap a source for playback.
    ///
    /// # Errors
    ///
    /// Returns [`WavplayError::InvalidFormat`] if the source reports
    /// zero-sized frames.
    pub fn new(source: Box<dyn SampleSource + Send>) -> Result<Self> {
        let bytes_per_frame = source.bytes_per_frame();
        if bytes_per_frame == 0 {
            return Err(WavplayError::InvalidFormat(
                "source reports zero-sized frames".to_string(),
            ));
        }

        let (done_tx, done_rx) = bounded(1);
        Ok(Self {
            shared: Arc::new(SessionShared {
                state: Mutex::new(SessionState {
                    source,
                    stage: SessionStage::Idle,
                    error: None,
                    stats: PlaybackStats::default(),
                }),
                done_tx,
                done_rx,
            }),
            bytes_per_frame,
        })
    }

    /// Current stage of the session.
    pub fn stage(&self) -> SessionStage {
        match self.shared.state.lock() {
            Ok(state) => state.stage,
            Err(_) => SessionStage::Stopped,
        }
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> PlaybackStats {
        match self.shared.state.lock() {
            Ok(state) => state.stats,
            Err(_) => PlaybackStats::default(),
        }
    }

    fn handler(&self) -> SessionHandler {
        SessionHandler {
            shared: self.shared.clone(),
            bytes_per_frame: self.bytes_per_frame,
        }
    }
}

/// The engine's answer to the device's render pulls.
///
/// Runs on the render thread. Holds the session lock only around the
/// source read and stage bookkeeping; zero-padding happens after release
/// since it touches no shared state.
struct SessionHandler {
    shared: Arc<SessionShared>,
    bytes_per_frame: usize,
}

impl SessionHandler {
    /// Flip `Running -> Draining` and wake the orchestrator. Must be
    /// called with the state lock held so the signal and the stage change
    /// are one atomic step.
    fn drain(state: &mut SessionState, done_tx: &Sender<()>, error: Option<WavplayError>) {
        state.stage = SessionStage::Draining;
        if state.error.is_none() {
            state.error = error;
        }
        let _ = done_tx.try_send(());
    }
}

impl PullHandler for SessionHandler {
    fn pull(&mut self, frames: usize) -> Pull {
        let Ok(mut state) = self.shared.state.lock() else {
            return Pull::Complete;
        };
        if state.stage != SessionStage::Running {
            // End-of-stream already signaled; stay silent with no
            // further side effects.
            return Pull::Complete;
        }
        if frames == 0 {
            // A zero-frame pull must not be mistaken for exhaustion.
            return Pull::Data(Vec::new());
        }

        state.stats.pulls += 1;

        let mut buf = match state.source.read_frames(frames) {
            Ok(buf) => buf,
            Err(err) => {
                log::debug!("Source read failed, draining: {}", err);
                Self::drain(&mut state, &self.shared.done_tx, Some(err));
                return Pull::Complete;
            }
        };

        if buf.is_empty() {
            log::debug!(
                "Source exhausted after {} frames",
                state.stats.frames_rendered
            );
            Self::drain(&mut state, &self.shared.done_tx, None);
            return Pull::Complete;
        }

        state.stats.frames_rendered += buf.len().div_ceil(self.bytes_per_frame) as u64;
        drop(state);

        // Silence-pad the final partial buffer up to the requested size.
        buf.resize(frames * self.bytes_per_frame, 0);
        Pull::Data(buf)
    }

    fn device_error(&mut self, message: &str) {
        if let Ok(mut state) = self.shared.state.lock() {
            if state.stage == SessionStage::Running {
                Self::drain(
                    &mut state,
                    &self.shared.done_tx,
                    Some(WavplayError::DeviceRuntime(message.to_string())),
                );
            }
        }
    }
}

/// Drives a session to completion on an output device.
///
/// The engine exclusively owns the device handle between `start` and the
/// return of `run_until_complete`.
pub struct PlaybackEngine<D> {
    device: D,
}

impl<D: OutputDevice> PlaybackEngine<D> {
    pub fn new(device: D) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Play a source to completion: negotiate the stream format, start a
    /// fresh session and block until it drains.
    pub fn play(&mut self, source: Box<dyn SampleSource + Send>) -> Result<PlaybackStats> {
        let format = StreamFormat::for_source(source.as_ref())?;
        self.device.set_stream_format(&format)?;

        let session = PlaybackSession::new(source)?;
        self.start(&session)?;
        self.run_until_complete(&session)
    }

    /// Register the session's pull handler and start the device render
    /// clock. Returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`WavplayError::DeviceStart`] if the session was already
    /// started or the device cannot begin rendering; a failed start
    /// leaves no handler registered.
    pub fn start(&mut self, session: &PlaybackSession) -> Result<()> {
        {
            let mut state = lock_state(&session.shared)?;
            if state.stage != SessionStage::Idle {
                return Err(WavplayError::DeviceStart(
                    "session is single-use and was already started".to_string(),
                ));
            }
            state.stage = SessionStage::Running;
        }

        self.device
            .set_pull_handler(Some(Box::new(session.handler())))?;

        if let Err(err) = self.device.start() {
            let _ = self.device.set_pull_handler(None);
            if let Ok(mut state) = session.shared.state.lock() {
                state.stage = SessionStage::Stopped;
            }
            return Err(err);
        }

        Ok(())
    }

    /// Block the calling thread until the handler observes end-of-stream,
    /// then unregister the handler and stop the device.
    ///
    /// Safe to call from exactly one thread, distinct from the render
    /// thread. Returns the session counters, or the recorded
    /// `SourceRead`/`DeviceRuntime` cause when playback ended on a fault.
    pub fn run_until_complete(&mut self, session: &PlaybackSession) -> Result<PlaybackStats> {
        match lock_state(&session.shared)?.stage {
            SessionStage::Idle => {
                return Err(WavplayError::DeviceStart(
                    "session was never started".to_string(),
                ));
            }
            SessionStage::Stopped => {
                return Err(WavplayError::DeviceStart(
                    "session already ran to completion".to_string(),
                ));
            }
            SessionStage::Running | SessionStage::Draining => {}
        }

        // The latch holds one buffered signal, so a drain that happened
        // before this point is not missed.
        session.shared.done_rx.recv().map_err(|_| {
            WavplayError::DeviceRuntime("render context vanished before end-of-stream".to_string())
        })?;

        // Tear down even if the device misbehaves on stop; the session
        // must not be left half-finished.
        let stop_result = self.device.stop();
        let _ = self.device.set_pull_handler(None);

        let mut state = lock_state(&session.shared)?;
        state.stage = SessionStage::Stopped;
        if let Err(err) = state.source.close() {
            log::warn!("Failed to close sample source: {}", err);
        }

        match state.error.take() {
            Some(err) => Err(err),
            None => stop_result.map(|_| state.stats),
        }
    }
}

fn lock_state<'a>(
    shared: &'a SessionShared,
) -> Result<std::sync::MutexGuard<'a, SessionState>> {
    shared.state.lock().map_err(|_| {
        WavplayError::DeviceRuntime("playback session state poisoned".to_string())
    })
}
