//! WAV files for decoded audio.
//!
//! Layout written by [`WavSink`]:
//! ```text
//! +0   "RIFF" + chunk size (LE32) + "WAVE"
//! +12  "fmt " + 16 + format 1 (PCM), channels, rate, byte rate, align, bits
//! +36  "data" + data size (LE32)
//! +44  samples, 8-bit unsigned or 16-bit signed LE
//! ```
//!
//! Sizes are written as placeholders and patched by [`WavSink::finish`].

use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::core::constants::SAMPLE_RATE_HZ;

use super::pcm::{encode_pcm8, encode_pcm16_le};

/// Bytes before the first sample.
pub const WAV_HEADER_LEN: u64 = 44;

const FORMAT_PCM: u16 = 1;
const FMT_CHUNK_LEN: u32 = 16;

/// Format of a PCM WAV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    /// Frames per second.
    pub sample_rate: u32,
    /// Interleaved channels.
    pub channels: u16,
    /// 8 or 16.
    pub bits_per_sample: u16,
}

impl WavSpec {
    /// 8 kHz mono 8-bit, for DPCM amplitudes.
    pub const fn dpcm() -> Self {
        Self {
            sample_rate: SAMPLE_RATE_HZ,
            channels: 1,
            bits_per_sample: 8,
        }
    }

    /// 8 kHz mono 16-bit, for AQ-DPCM amplitudes.
    pub const fn aqdpcm() -> Self {
        Self {
            sample_rate: SAMPLE_RATE_HZ,
            channels: 1,
            bits_per_sample: 16,
        }
    }

    /// Bytes per frame.
    pub const fn block_align(&self) -> u16 {
        self.channels * (self.bits_per_sample / 8)
    }

    /// Bytes per second.
    pub const fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }
}

/// Write a 44-byte PCM header announcing `data_len` bytes of samples.
pub fn write_header<W: Write>(writer: &mut W, spec: WavSpec, data_len: u32) -> io::Result<()> {
    writer.write_all(b"RIFF")?;
    writer.write_all(&riff_len(data_len).to_le_bytes())?;
    writer.write_all(b"WAVE")?;

    writer.write_all(b"fmt ")?;
    writer.write_all(&FMT_CHUNK_LEN.to_le_bytes())?;
    writer.write_all(&FORMAT_PCM.to_le_bytes())?;
    writer.write_all(&spec.channels.to_le_bytes())?;
    writer.write_all(&spec.sample_rate.to_le_bytes())?;
    writer.write_all(&spec.byte_rate().to_le_bytes())?;
    writer.write_all(&spec.block_align().to_le_bytes())?;
    writer.write_all(&spec.bits_per_sample.to_le_bytes())?;

    writer.write_all(b"data")?;
    writer.write_all(&data_len.to_le_bytes())
}

/// Read a PCM header, returning the format and the data chunk size.
///
/// Unknown chunks before `data` are skipped. The reader is left at the
/// first sample.
pub fn read_header<R: Read>(reader: &mut R) -> io::Result<(WavSpec, u32)> {
    let mut buf4 = [0u8; 4];

    reader.read_exact(&mut buf4)?;
    if &buf4 != b"RIFF" {
        return Err(invalid_data("not a RIFF file"));
    }
    reader.read_exact(&mut buf4)?;
    reader.read_exact(&mut buf4)?;
    if &buf4 != b"WAVE" {
        return Err(invalid_data("not a WAVE file"));
    }

    let mut spec = None;
    loop {
        let mut id = [0u8; 4];
        if reader.read_exact(&mut id).is_err() {
            return Err(invalid_data("no data chunk found"));
        }
        reader.read_exact(&mut buf4)?;
        let chunk_len = u32::from_le_bytes(buf4);

        match &id {
            b"fmt " => {
                if chunk_len < FMT_CHUNK_LEN {
                    return Err(invalid_data("fmt chunk too short"));
                }
                let mut fmt = [0u8; FMT_CHUNK_LEN as usize];
                reader.read_exact(&mut fmt)?;
                if u16::from_le_bytes([fmt[0], fmt[1]]) != FORMAT_PCM {
                    return Err(invalid_data("not a PCM file"));
                }
                spec = Some(WavSpec {
                    channels: u16::from_le_bytes([fmt[2], fmt[3]]),
                    sample_rate: u32::from_le_bytes([fmt[4], fmt[5], fmt[6], fmt[7]]),
                    bits_per_sample: u16::from_le_bytes([fmt[14], fmt[15]]),
                });
                skip(reader, u64::from(chunk_len - FMT_CHUNK_LEN) + u64::from(chunk_len % 2))?;
            }
            b"data" => {
                let spec = spec.ok_or_else(|| invalid_data("data chunk before fmt chunk"))?;
                return Ok((spec, chunk_len));
            }
            _ => skip(reader, u64::from(chunk_len) + u64::from(chunk_len % 2))?,
        }
    }
}

/// Streaming WAV writer.
///
/// Samples are appended as they are written; [`finish`](Self::finish)
/// patches the chunk sizes. Dropping the sink without finishing leaves a
/// file that announces zero samples.
#[derive(Debug)]
pub struct WavSink<W: Write + Seek> {
    writer: W,
    spec: WavSpec,
    data_len: u64,
}

impl WavSink<BufWriter<File>> {
    /// Create (or truncate) a WAV file at `path`.
    pub fn create(path: impl AsRef<Path>, spec: WavSpec) -> io::Result<Self> {
        Self::new(BufWriter::new(File::create(path)?), spec)
    }
}

impl<W: Write + Seek> WavSink<W> {
    /// Write the header to `writer` and start the data chunk.
    pub fn new(mut writer: W, spec: WavSpec) -> io::Result<Self> {
        write_header(&mut writer, spec, 0)?;
        Ok(Self {
            writer,
            spec,
            data_len: 0,
        })
    }

    /// File format.
    pub fn spec(&self) -> WavSpec {
        self.spec
    }

    /// Sample bytes written so far.
    pub fn data_len(&self) -> u64 {
        self.data_len
    }

    /// Append DPCM amplitudes. WAV stores 8-bit samples unsigned, offset by 128.
    pub fn write_pcm8(&mut self, samples: &[i8]) -> io::Result<()> {
        self.expect_bits(8)?;
        let mut bytes = encode_pcm8(samples);
        for byte in &mut bytes {
            *byte ^= 0x80;
        }
        self.write_data(&bytes)
    }

    /// Append AQ-DPCM amplitudes, saturating to `i16`.
    pub fn write_pcm16(&mut self, samples: &[i32]) -> io::Result<()> {
        self.expect_bits(16)?;
        self.write_data(&encode_pcm16_le(samples))
    }

    /// Patch the chunk sizes and return the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        let data_len = u32::try_from(self.data_len)
            .map_err(|_| invalid_data("data chunk exceeds 4 GiB"))?;

        // Chunks are word aligned; the pad byte is not part of the data size.
        if data_len % 2 == 1 {
            self.writer.write_all(&[0])?;
        }

        self.writer.seek(SeekFrom::Start(4))?;
        self.writer.write_all(&riff_len(data_len).to_le_bytes())?;
        self.writer.seek(SeekFrom::Start(WAV_HEADER_LEN - 4))?;
        self.writer.write_all(&data_len.to_le_bytes())?;
        self.writer.seek(SeekFrom::End(0))?;
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn expect_bits(&self, bits: u16) -> io::Result<()> {
        if self.spec.bits_per_sample == bits {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "{bits}-bit samples written to a {}-bit file",
                    self.spec.bits_per_sample
                ),
            ))
        }
    }

    fn write_data(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)?;
        self.data_len += bytes.len() as u64;
        Ok(())
    }
}

/// RIFF chunk size for `data_len` sample bytes, pad byte included.
fn riff_len(data_len: u32) -> u32 {
    let padded = data_len.saturating_add(data_len % 2);
    padded.saturating_add((WAV_HEADER_LEN - 8) as u32)
}

fn skip<R: Read>(reader: &mut R, len: u64) -> io::Result<()> {
    let skipped = io::copy(&mut reader.by_ref().take(len), &mut io::sink())?;
    if skipped < len {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
    }
    Ok(())
}

fn invalid_data(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_dpcm_header_round_trip() {
        let mut sink = WavSink::new(Cursor::new(Vec::new()), WavSpec::dpcm()).unwrap();
        sink.write_pcm8(&[-128, 0, 127]).unwrap();
        let bytes = sink.finish().unwrap().into_inner();

        // 44 header bytes, 3 samples, 1 pad byte
        assert_eq!(bytes.len(), 48);
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), 40);

        let (spec, data_len) = read_header(&mut bytes.as_slice()).unwrap();
        assert_eq!(spec, WavSpec::dpcm());
        assert_eq!(spec.sample_rate, 8000);
        assert_eq!(data_len, 3);
        assert_eq!(&bytes[44..47], &[0x00, 0x80, 0xFF]);
    }

    #[test]
    fn test_aqdpcm_header_round_trip() {
        let mut sink = WavSink::new(Cursor::new(Vec::new()), WavSpec::aqdpcm()).unwrap();
        sink.write_pcm16(&[1, -2]).unwrap();
        sink.write_pcm16(&[40000]).unwrap();
        assert_eq!(sink.data_len(), 6);
        let bytes = sink.finish().unwrap().into_inner();

        assert_eq!(bytes.len(), 50);
        let (spec, data_len) = read_header(&mut bytes.as_slice()).unwrap();
        assert_eq!(spec, WavSpec::aqdpcm());
        assert_eq!(spec.byte_rate(), 16000);
        assert_eq!(spec.block_align(), 2);
        assert_eq!(data_len, 6);
        assert_eq!(&bytes[44..], &[0x01, 0x00, 0xFE, 0xFF, 0xFF, 0x7F]);
    }

    #[test]
    fn test_header_only_file() {
        let mut bytes = Vec::new();
        write_header(&mut bytes, WavSpec::dpcm(), 0).unwrap();
        assert_eq!(bytes.len() as u64, WAV_HEADER_LEN);
        assert_eq!(read_header(&mut bytes.as_slice()).unwrap(), (WavSpec::dpcm(), 0));
    }

    #[test]
    fn test_unknown_chunk_skipped() {
        let mut bytes = Vec::new();
        write_header(&mut bytes, WavSpec::aqdpcm(), 0).unwrap();
        // Splice a 3-byte LIST chunk (plus pad) in front of the data chunk.
        let data = bytes.split_off(36);
        bytes.extend_from_slice(b"LIST");
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&[1, 2, 3, 0]);
        bytes.extend_from_slice(&data);

        assert_eq!(read_header(&mut bytes.as_slice()).unwrap(), (WavSpec::aqdpcm(), 0));
    }

    #[test]
    fn test_bit_depth_mismatch_rejected() {
        let mut sink = WavSink::new(Cursor::new(Vec::new()), WavSpec::aqdpcm()).unwrap();
        let err = sink.write_pcm8(&[0]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(sink.data_len(), 0);
    }

    #[test]
    fn test_invalid_file() {
        let err = read_header(&mut b"not a wav file".as_slice()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_create_file() {
        let path = std::env::temp_dir().join("ithaki_test_dpcm.wav");
        let mut sink = WavSink::create(&path, WavSpec::dpcm()).unwrap();
        sink.write_pcm8(&[0; 256]).unwrap();
        sink.finish().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 44 + 256);
        assert_eq!(read_header(&mut bytes.as_slice()).unwrap(), (WavSpec::dpcm(), 256));
        assert!(bytes[44..].iter().all(|&b| b == 0x80));

        std::fs::remove_file(&path).ok();
    }
}
