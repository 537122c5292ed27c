//! Output-device abstraction and the cpal-backed implementation.
//!
//! The device owns the real-time render context. Each time the backend
//! needs more samples it invokes the registered [`PullHandler`]; the
//! handler answers with raw bytes in the negotiated stream format or
//! signals that the stream is over. Handler invocations are strictly
//! sequential; the device never calls `pull` re-entrantly.

use crate::error::{Result, WavplayError};
use crate::format::{FormatId, StreamFormat};
use cpal::SizedSample;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

/// One render-callback answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pull {
    /// Exactly `requested_frames * bytes_per_frame` bytes of sample data.
    Data(Vec<u8>),
    /// No content; the stream is over and the device should stop asking.
    Complete,
}

/// Capability injected into an output device to answer render pulls.
///
/// `pull` runs on the device's latency-sensitive render thread: it must
/// stay within a bounded time budget and must never panic or block on
/// slow I/O held elsewhere.
pub trait PullHandler: Send {
    /// Produce the next `frames` frames' worth of bytes.
    fn pull(&mut self, frames: usize) -> Pull;

    /// Invoked from the device's error path when the backend fails
    /// mid-stream. Default: ignore.
    fn device_error(&mut self, _message: &str) {}
}

/// Host audio output device.
///
/// Lifecycle: `initialize` once, then per stream `set_stream_format`,
/// `set_pull_handler`, `start` .. `stop`, and `teardown` when done with
/// the device entirely.
pub trait OutputDevice {
    /// Resolve and prepare the backend output device.
    fn initialize(&mut self) -> Result<()>;

    /// Tell the device how to interpret the bytes the handler supplies.
    fn set_stream_format(&mut self, format: &StreamFormat) -> Result<()>;

    /// Register (or clear) the pull handler for the render callback.
    fn set_pull_handler(&mut self, handler: Option<Box<dyn PullHandler>>) -> Result<()>;

    /// Start the render clock. Non-blocking.
    fn start(&mut self) -> Result<()>;

    /// Stop the render clock. Idempotent.
    fn stop(&mut self) -> Result<()>;

    /// Release the backend device.
    fn teardown(&mut self) -> Result<()>;
}

type SharedHandler = Arc<Mutex<Box<dyn PullHandler>>>;

/// Integer PCM sample that can be reconstructed from native-endian bytes.
trait PcmSample: SizedSample + Send + 'static {
    const WIDTH: usize;
    fn from_ne_chunk(chunk: &[u8]) -> Self;
}

impl PcmSample for i8 {
    const WIDTH: usize = 1;
    fn from_ne_chunk(chunk: &[u8]) -> Self {
        chunk[0] as i8
    }
}

impl PcmSample for i16 {
    const WIDTH: usize = 2;
    fn from_ne_chunk(chunk: &[u8]) -> Self {
        let mut bytes = [0u8; 2];
        bytes.copy_from_slice(chunk);
        i16::from_ne_bytes(bytes)
    }
}

impl PcmSample for i32 {
    const WIDTH: usize = 4;
    fn from_ne_chunk(chunk: &[u8]) -> Self {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(chunk);
        i32::from_ne_bytes(bytes)
    }
}

/// cpal-backed output device.
///
/// The host is chosen by name (`-m` on the CLI) or falls back to the
/// platform default. A typed output stream matching the negotiated sample
/// width is built at `start`; dropping the stream stops it.
pub struct CpalOutputDevice {
    host: cpal::Host,
    device: Option<cpal::Device>,
    format: Option<StreamFormat>,
    handler: Option<SharedHandler>,
    stream: Option<cpal::Stream>,
}

impl std::fmt::Debug for CpalOutputDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpalOutputDevice")
            .field("host", &self.host.id().name())
            .field("has_device", &self.device.is_some())
            .field("format", &self.format)
            .field("has_handler", &self.handler.is_some())
            .field("has_stream", &self.stream.is_some())
            .finish()
    }
}

impl CpalOutputDevice {
    /// Open the named audio host, or the platform default when `None`.
    pub fn new(host_name: Option<&str>) -> Result<Self> {
        let host = match host_name {
            None => cpal::default_host(),
            Some(name) => {
                let id = cpal::available_hosts()
                    .into_iter()
                    .find(|id| id.name().eq_ignore_ascii_case(name))
                    .ok_or_else(|| {
                        WavplayError::DeviceStart(format!(
                            "unknown audio host '{}' (available: {})",
                            name,
                            cpal::available_hosts()
                                .iter()
                                .map(|id| id.name())
                                .collect::<Vec<_>>()
                                .join(", ")
                        ))
                    })?;
                cpal::host_from_id(id).map_err(|e| {
                    WavplayError::DeviceStart(format!("failed to open audio host '{}': {}", name, e))
                })?
            }
        };

        Ok(Self {
            host,
            device: None,
            format: None,
            handler: None,
            stream: None,
        })
    }

    /// Name of the backend output device, once initialized.
    pub fn device_name(&self) -> Option<String> {
        self.device.as_ref().and_then(|d| d.name().ok())
    }

    fn build_stream<T: PcmSample>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        handler: SharedHandler,
    ) -> Result<cpal::Stream> {
        let channels = config.channels as usize;
        let error_handler = handler.clone();

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let pulled = match handler.lock() {
                        Ok(mut h) => h.pull(data.len() / channels),
                        Err(_) => Pull::Complete,
                    };
                    match pulled {
                        Pull::Data(bytes) => {
                            let mut samples = bytes.chunks_exact(T::WIDTH);
                            for slot in data.iter_mut() {
                                *slot = match samples.next() {
                                    Some(chunk) => T::from_ne_chunk(chunk),
                                    None => T::EQUILIBRIUM,
                                };
                            }
                        }
                        Pull::Complete => {
                            for slot in data.iter_mut() {
                                *slot = T::EQUILIBRIUM;
                            }
                        }
                    }
                },
                move |err| {
                    log::error!("Audio stream error: {}", err);
                    if let Ok(mut h) = error_handler.lock() {
                        h.device_error(&err.to_string());
                    }
                },
                None,
            )
            .map_err(|e| WavplayError::DeviceStart(format!("failed to build stream: {}", e)))?;

        Ok(stream)
    }
}

impl OutputDevice for CpalOutputDevice {
    fn initialize(&mut self) -> Result<()> {
        let device = self.host.default_output_device().ok_or_else(|| {
            WavplayError::DeviceStart("no default output device available".to_string())
        })?;
        log::debug!(
            "Using output device: {}",
            device.name().unwrap_or_else(|_| "<unnamed>".to_string())
        );
        self.device = Some(device);
        Ok(())
    }

    fn set_stream_format(&mut self, format: &StreamFormat) -> Result<()> {
        if self.stream.is_some() {
            return Err(WavplayError::DeviceStart(
                "cannot change stream format while rendering".to_string(),
            ));
        }
        match format.format {
            FormatId::LinearPcm => {}
        }
        if !matches!(format.bits_per_channel, 8 | 16 | 32) {
            return Err(WavplayError::DeviceStart(format!(
                "unsupported sample width: {} bits",
                format.bits_per_channel
            )));
        }
        self.format = Some(format.clone());
        Ok(())
    }

    fn set_pull_handler(&mut self, handler: Option<Box<dyn PullHandler>>) -> Result<()> {
        self.handler = handler.map(|h| Arc::new(Mutex::new(h)));
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Err(WavplayError::DeviceStart(
                "device is already rendering".to_string(),
            ));
        }
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| WavplayError::DeviceStart("device not initialized".to_string()))?;
        let format = self
            .format
            .clone()
            .ok_or_else(|| WavplayError::DeviceStart("no stream format set".to_string()))?;
        let handler = self
            .handler
            .clone()
            .ok_or_else(|| WavplayError::DeviceStart("no pull handler registered".to_string()))?;

        let config = cpal::StreamConfig {
            channels: format.channels_per_frame,
            sample_rate: cpal::SampleRate(format.sample_rate as u32),
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = match format.bits_per_channel {
            8 => Self::build_stream::<i8>(device, &config, handler),
            16 => Self::build_stream::<i16>(device, &config, handler),
            32 => Self::build_stream::<i32>(device, &config, handler),
            bits => Err(WavplayError::DeviceStart(format!(
                "unsupported sample width: {} bits",
                bits
            ))),
        }?;

        stream
            .play()
            .map_err(|e| WavplayError::DeviceStart(format!("failed to start stream: {}", e)))?;

        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            // Dropping the cpal stream stops the render callback.
            drop(stream);
        }
        Ok(())
    }

    fn teardown(&mut self) -> Result<()> {
        self.stop()?;
        self.handler = None;
        self.format = None;
        self.device = None;
        Ok(())
    }
}
