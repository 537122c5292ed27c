//! Sample sources feeding the playback engine.
//!
//! A source hands out raw native-endian sample bytes in file order. Reads
//! are cumulative and stateful: each read consumes from where the previous
//! one left off, and already-consumed bytes are never re-read. A read that
//! returns fewer bytes than requested means the source is at its end; an
//! empty read signals exhaustion.

use crate::error::{Result, WavplayError};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// A stream of raw PCM sample bytes with known format parameters.
pub trait SampleSource: Send {
    /// Read up to `frames` frames, advancing the read cursor.
    ///
    /// Returns fewer bytes than `frames * bytes_per_frame` only at
    /// end-of-stream; an empty buffer means the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`WavplayError::SourceRead`] on an I/O fault that is not
    /// ordinary exhaustion.
    fn read_frames(&mut self, frames: usize) -> Result<Vec<u8>>;

    /// Number of channels per frame.
    fn channels(&self) -> u16;

    /// Sampling rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Width of one channel's sample in bytes.
    fn sample_width_bytes(&self) -> u16;

    /// Bytes occupied by one frame.
    fn bytes_per_frame(&self) -> usize {
        self.channels() as usize * self.sample_width_bytes() as usize
    }

    /// Release any underlying resources. Reads after `close` are invalid.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Integer-PCM WAV file source backed by hound.
///
/// Supports 8-, 16- and 32-bit integer samples. Float and 24-bit files
/// are rejected at open: float contradicts the signed-integer stream
/// contract, and 3-byte samples have no native-endian representation the
/// device layer can consume.
pub struct WavFileSource {
    reader: hound::WavReader<BufReader<File>>,
    channels: u16,
    sample_rate: u32,
    width: u16,
}

impl WavFileSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = hound::WavReader::open(path.as_ref()).map_err(|e| match e {
            hound::Error::IoError(io) => WavplayError::Io(io),
            other => WavplayError::InvalidFormat(format!(
                "{}: not a readable WAV file: {}",
                path.as_ref().display(),
                other
            )),
        })?;

        let spec = reader.spec();
        if spec.sample_format != hound::SampleFormat::Int {
            return Err(WavplayError::InvalidFormat(
                "floating-point WAV files are not supported".to_string(),
            ));
        }
        if !matches!(spec.bits_per_sample, 8 | 16 | 32) {
            return Err(WavplayError::InvalidFormat(format!(
                "unsupported sample width: {} bits",
                spec.bits_per_sample
            )));
        }

        Ok(Self {
            reader,
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            width: spec.bits_per_sample / 8,
        })
    }

    /// Total frame count of the file, independent of the read cursor.
    pub fn total_frames(&self) -> u64 {
        self.reader.duration() as u64
    }
}

impl SampleSource for WavFileSource {
    fn read_frames(&mut self, frames: usize) -> Result<Vec<u8>> {
        let want_samples = frames * self.channels as usize;
        let mut buf = Vec::with_capacity(want_samples * self.width as usize);

        fn read_error(e: hound::Error) -> WavplayError {
            WavplayError::SourceRead(e.to_string())
        }

        match self.width {
            1 => {
                for sample in self.reader.samples::<i8>().take(want_samples) {
                    buf.extend_from_slice(&sample.map_err(read_error)?.to_ne_bytes());
                }
            }
            2 => {
                for sample in self.reader.samples::<i16>().take(want_samples) {
                    buf.extend_from_slice(&sample.map_err(read_error)?.to_ne_bytes());
                }
            }
            4 => {
                for sample in self.reader.samples::<i32>().take(want_samples) {
                    buf.extend_from_slice(&sample.map_err(read_error)?.to_ne_bytes());
                }
            }
            // Unreachable widths are rejected in open().
            other => {
                return Err(WavplayError::SourceRead(format!(
                    "unsupported sample width: {} bytes",
                    other
                )));
            }
        }

        Ok(buf)
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn sample_width_bytes(&self) -> u16 {
        self.width
    }
}

/// Headerless PCM source wrapping any reader.
///
/// The format parameters are supplied by the caller since raw streams
/// carry no header. Useful for piped input and headerless sample dumps.
pub struct RawPcmSource<R> {
    inner: R,
    channels: u16,
    sample_rate: u32,
    width: u16,
}

impl<R: Read + Send> RawPcmSource<R> {
    pub fn new(inner: R, sample_rate: u32, channels: u16, sample_width_bytes: u16) -> Result<Self> {
        if sample_rate == 0 || channels == 0 || sample_width_bytes == 0 {
            return Err(WavplayError::InvalidFormat(format!(
                "raw PCM parameters must be non-zero (rate {}, channels {}, width {})",
                sample_rate, channels, sample_width_bytes
            )));
        }
        Ok(Self {
            inner,
            channels,
            sample_rate,
            width: sample_width_bytes,
        })
    }
}

impl<R: Read + Send> SampleSource for RawPcmSource<R> {
    fn read_frames(&mut self, frames: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; frames * self.bytes_per_frame()];
        let mut filled = 0;

        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(WavplayError::SourceRead(e.to_string())),
            }
        }

        buf.truncate(filled);
        Ok(buf)
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn sample_width_bytes(&self) -> u16 {
        self.width
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn write_wav(path: &Path, channels: u16, frames: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames * channels as usize {
            writer.write_sample((i % 100) as i16 + 1).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn wav_source_reports_header_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 2, 10);

        let source = WavFileSource::open(&path).unwrap();
        assert_eq!(source.channels(), 2);
        assert_eq!(source.sample_rate(), 44100);
        assert_eq!(source.sample_width_bytes(), 2);
        assert_eq!(source.bytes_per_frame(), 4);
        assert_eq!(source.total_frames(), 10);
    }

    #[test]
    fn wav_source_reads_are_cumulative() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_wav(&path, 1, 8);

        let mut source = WavFileSource::open(&path).unwrap();
        let first = source.read_frames(3).unwrap();
        let second = source.read_frames(3).unwrap();
        assert_eq!(first.len(), 6);
        assert_eq!(second.len(), 6);
        assert_eq!(first, [1i16, 2, 3].map(i16::to_ne_bytes).concat());
        assert_eq!(second, [4i16, 5, 6].map(i16::to_ne_bytes).concat());
    }

    #[test]
    fn wav_source_short_read_then_exhaustion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.wav");
        write_wav(&path, 2, 5);

        let mut source = WavFileSource::open(&path).unwrap();
        // 5 frames available, 8 requested: one short read, then empty.
        assert_eq!(source.read_frames(8).unwrap().len(), 5 * 4);
        assert!(source.read_frames(8).unwrap().is_empty());
        assert!(source.read_frames(8).unwrap().is_empty());
    }

    #[test]
    fn wav_source_rejects_float_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("float.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0.25f32).unwrap();
        writer.finalize().unwrap();

        assert!(matches!(
            WavFileSource::open(&path),
            Err(WavplayError::InvalidFormat(_))
        ));
    }

    #[test]
    fn wav_source_missing_file_is_io_error() {
        assert!(matches!(
            WavFileSource::open("/nonexistent/file.wav"),
            Err(WavplayError::Io(_))
        ));
    }

    #[test]
    fn raw_source_reads_exact_frames() {
        let data: Vec<u8> = (0..40).collect();
        let mut source = RawPcmSource::new(Cursor::new(data.clone()), 8000, 1, 2).unwrap();

        assert_eq!(source.read_frames(10).unwrap(), &data[..20]);
        assert_eq!(source.read_frames(10).unwrap(), &data[20..]);
        assert!(source.read_frames(10).unwrap().is_empty());
    }

    #[test]
    fn raw_source_short_final_read() {
        let data = vec![7u8; 10];
        let mut source = RawPcmSource::new(Cursor::new(data), 8000, 1, 1).unwrap();

        assert_eq!(source.read_frames(8).unwrap().len(), 8);
        assert_eq!(source.read_frames(8).unwrap().len(), 2);
        assert!(source.read_frames(8).unwrap().is_empty());
    }

    #[test]
    fn raw_source_rejects_zero_parameters() {
        assert!(RawPcmSource::new(Cursor::new(vec![]), 0, 1, 1).is_err());
        assert!(RawPcmSource::new(Cursor::new(vec![]), 8000, 0, 1).is_err());
        assert!(RawPcmSource::new(Cursor::new(vec![]), 8000, 1, 0).is_err());
    }
}
