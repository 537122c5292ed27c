//! Stream-format descriptor handed to the output device.
//!
//! Translates a decoded file's sample parameters (rate, channel count,
//! bytes per sample) into the canonical description the device layer
//! consumes. This engine only speaks integer linear PCM in native byte
//! order with a non-interleaved channel layout, so those flags are fixed
//! at construction.

use crate::error::{Result, WavplayError};
use crate::source::SampleSource;

/// Format-flag bits carried by [`StreamFormat`].
pub mod format_flags {
    /// Samples are signed integers.
    pub const SIGNED_INTEGER: u32 = 1 << 0;
    /// Samples are stored in the host's byte order.
    pub const NATIVE_ENDIAN: u32 = 1 << 1;
    /// Channels are delivered in separate buffers rather than alternating
    /// within one buffer.
    pub const NON_INTERLEAVED: u32 = 1 << 2;

    /// The fixed flag set for every stream this engine produces.
    pub const LINEAR_PCM: u32 = SIGNED_INTEGER | NATIVE_ENDIAN | NON_INTERLEAVED;
}

/// Format family of a stream. Only uncompressed linear PCM is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatId {
    LinearPcm,
}

/// Immutable description of how raw bytes map to audio samples.
///
/// Constructed once per source and never mutated. Bytes-per-packet uses
/// interleaved-equivalent accounting (`bits_per_channel / 8 ×
/// channels_per_frame`) even though the flags advertise a non-interleaved
/// layout; the device layer owns the layout interpretation.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamFormat {
    /// Sampling rate in Hz.
    pub sample_rate: f64,
    /// Format family (always linear PCM).
    pub format: FormatId,
    /// Bit set from [`format_flags`].
    pub flags: u32,
    /// Bytes per packet; for linear PCM a packet is exactly one frame.
    pub bytes_per_packet: u32,
    /// Frames per packet; fixed at 1 for linear PCM.
    pub frames_per_packet: u32,
    /// Number of channels in one frame.
    pub channels_per_frame: u16,
    /// Bits in one channel's sample.
    pub bits_per_channel: u32,
}

impl StreamFormat {
    /// Build a linear-PCM descriptor from a source's sample parameters.
    ///
    /// # Errors
    ///
    /// Returns [`WavplayError::InvalidFormat`] if the rate is not a
    /// positive number, the channel count is zero, or the sample width is
    /// zero.
    pub fn linear_pcm(sample_rate: f64, channels: u16, sample_width_bytes: u16) -> Result<Self> {
        if !(sample_rate > 0.0) {
            return Err(WavplayError::InvalidFormat(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }
        if channels < 1 {
            return Err(WavplayError::InvalidFormat(
                "channel count must be at least 1".to_string(),
            ));
        }
        if sample_width_bytes < 1 {
            return Err(WavplayError::InvalidFormat(
                "sample width must be at least 1 byte".to_string(),
            ));
        }

        Ok(Self {
            sample_rate,
            format: FormatId::LinearPcm,
            flags: format_flags::LINEAR_PCM,
            bytes_per_packet: sample_width_bytes as u32 * channels as u32,
            frames_per_packet: 1,
            channels_per_frame: channels,
            bits_per_channel: sample_width_bytes as u32 * 8,
        })
    }

    /// Build the descriptor for an opened sample source.
    pub fn for_source(source: &dyn SampleSource) -> Result<Self> {
        Self::linear_pcm(
            source.sample_rate() as f64,
            source.channels(),
            source.sample_width_bytes(),
        )
    }

    /// Bytes occupied by one frame (one sample per channel).
    pub fn bytes_per_frame(&self) -> usize {
        (self.bits_per_channel as usize / 8) * self.channels_per_frame as usize
    }

    /// Sample width of one channel in bytes.
    pub fn sample_width_bytes(&self) -> u16 {
        (self.bits_per_channel / 8) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_cd_quality_descriptor() {
        let format = StreamFormat::linear_pcm(44100.0, 2, 2).unwrap();

        assert_eq!(format.sample_rate, 44100.0);
        assert_eq!(format.format, FormatId::LinearPcm);
        assert_eq!(format.bytes_per_packet, 4);
        assert_eq!(format.frames_per_packet, 1);
        assert_eq!(format.channels_per_frame, 2);
        assert_eq!(format.bits_per_channel, 16);
        assert_eq!(format.bytes_per_frame(), 4);
    }

    #[test]
    fn flags_are_fixed() {
        let format = StreamFormat::linear_pcm(8000.0, 1, 1).unwrap();

        assert_ne!(format.flags & format_flags::SIGNED_INTEGER, 0);
        assert_ne!(format.flags & format_flags::NATIVE_ENDIAN, 0);
        assert_ne!(format.flags & format_flags::NON_INTERLEAVED, 0);
    }

    #[test]
    fn rejects_zero_sample_rate() {
        let err = StreamFormat::linear_pcm(0.0, 2, 2).unwrap_err();
        assert!(matches!(err, WavplayError::InvalidFormat(_)));
    }

    #[test]
    fn rejects_negative_and_nan_sample_rate() {
        assert!(matches!(
            StreamFormat::linear_pcm(-44100.0, 2, 2),
            Err(WavplayError::InvalidFormat(_))
        ));
        assert!(matches!(
            StreamFormat::linear_pcm(f64::NAN, 2, 2),
            Err(WavplayError::InvalidFormat(_))
        ));
    }

    #[test]
    fn rejects_zero_channels() {
        let err = StreamFormat::linear_pcm(44100.0, 0, 2).unwrap_err();
        assert!(matches!(err, WavplayError::InvalidFormat(_)));
    }

    #[test]
    fn rejects_zero_sample_width() {
        let err = StreamFormat::linear_pcm(44100.0, 2, 0).unwrap_err();
        assert!(matches!(err, WavplayError::InvalidFormat(_)));
    }

    #[test]
    fn packet_accounting_matches_width_times_channels() {
        for (channels, width) in [(1u16, 1u16), (2, 2), (6, 4)] {
            let format = StreamFormat::linear_pcm(48000.0, channels, width).unwrap();
            assert_eq!(format.bytes_per_packet, width as u32 * channels as u32);
            assert_eq!(
                format.bytes_per_packet,
                (format.bits_per_channel / 8) * format.channels_per_frame as u32
            );
        }
    }
}
