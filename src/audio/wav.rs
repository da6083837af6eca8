//! Minimal RIFF/WAVE container glue: just enough chunk parsing to hand the
//! codec core a channel count, sample rate and interleaved `i16` buffer.
//!
//! A small chunk-tag dispatch loop over `fmt `/`data`, trimmed to the one
//! format this codec's predictor operates on: 16-bit PCM.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::errors;
use crate::io::{ReadBuffer, WriteBuffer};
use crate::Result;

const RIFF_MARKER: &[u8; 4] = b"RIFF";
const WAVE_MARKER: &[u8; 4] = b"WAVE";
const FMT_MARKER: &[u8; 4] = b"fmt ";
const DATA_MARKER: &[u8; 4] = b"data";

/// Channel count and sample rate of a 16-bit PCM WAV file.
pub struct WavInfo {
    pub channels: u8,
    pub sample_rate: u32,
}

/// Reads a 16-bit PCM WAV file in full, returning its format and interleaved samples.
///
/// Chunks other than `fmt ` and `data` are skipped, tolerating e.g. a `LIST`
/// chunk preceding the sample data.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<(WavInfo, Vec<i16>)> {
    let mut reader = File::open(path)?;

    if reader.read_bytes(4)?[..] != RIFF_MARKER[..] {
        return errors::container_error("no RIFF tag found");
    }
    let _riff_len = reader.read_le_u32()?;
    if reader.read_bytes(4)?[..] != WAVE_MARKER[..] {
        return errors::container_error("no WAVE tag found");
    }

    let mut info: Option<WavInfo> = None;

    loop {
        let mut tag = [0u8; 4];
        if reader.read_into(&mut tag).is_err() {
            return errors::container_error("reached end of file before a data chunk was found");
        }
        let len = reader.read_le_u32()?;

        if &tag == FMT_MARKER {
            if len < 16 {
                return errors::container_error("fmt chunk shorter than 16 bytes");
            }
            let format_tag = reader.read_le_u16()?;
            let channels = reader.read_le_u16()?;
            let sample_rate = reader.read_le_u32()?;
            let _bytes_per_sec = reader.read_le_u32()?;
            let _block_align = reader.read_le_u16()?;
            let bits_per_sample = reader.read_le_u16()?;
            if len > 16 {
                reader.skip_bytes((len - 16) as usize)?;
            }

            if format_tag != 1 {
                return errors::unsupported_error("only uncompressed PCM WAV files are supported");
            }
            if bits_per_sample != 16 {
                return errors::unsupported_error("only 16-bit PCM WAV files are supported");
            }
            if channels == 0 || channels > 15 {
                return errors::container_error("channel count must be in 1..=15");
            }

            info = Some(WavInfo {
                channels: channels as u8,
                sample_rate,
            });
        } else if &tag == DATA_MARKER {
            let info = match info {
                Some(info) => info,
                None => return errors::container_error("data chunk appeared before fmt chunk"),
            };
            let raw = reader.read_bytes(len as usize)?;
            let mut samples = Vec::with_capacity(raw.len() / 2);
            for chunk in raw.chunks_exact(2) {
                samples.push(i16::from_le_bytes([chunk[0], chunk[1]]));
            }
            return Ok((info, samples));
        } else {
            reader.skip_bytes(len as usize)?;
        }
    }
}

/// Writes a canonical 16-bit PCM WAV file.
pub fn write_wav<P: AsRef<Path>>(
    path: P,
    channels: u8,
    sample_rate: u32,
    samples: &[i16],
) -> Result<()> {
    let mut w = File::create(path)?;

    let data_len = (samples.len() * 2) as u32;
    let bits_per_sample: u16 = 16;
    let block_align = channels as u16 * bits_per_sample / 8;
    let byte_rate = sample_rate * block_align as u32;
    let riff_len = 36 + data_len;

    w.write_all(RIFF_MARKER)?;
    w.write_le_u32(riff_len)?;
    w.write_all(WAVE_MARKER)?;

    w.write_all(FMT_MARKER)?;
    w.write_le_u32(16)?;
    w.write_le_u16(1)?; // WAVE_FORMAT_PCM
    w.write_le_u16(channels as u16)?;
    w.write_le_u32(sample_rate)?;
    w.write_le_u32(byte_rate)?;
    w.write_le_u16(block_align)?;
    w.write_le_u16(bits_per_sample)?;

    w.write_all(DATA_MARKER)?;
    w.write_le_u32(data_len)?;
    for &s in samples {
        w.write_all(&s.to_le_bytes())?;
    }

    Ok(())
}

#[test]
fn test_wav_round_trip() {
    use std::env::temp_dir;

    let path = temp_dir().join("g7codec_test_wav_round_trip.wav");
    let samples: Vec<i16> = (0..1000).map(|x| ((x * 37) % 2000 - 1000) as i16).collect();

    write_wav(&path, 2, 44_100, &samples).unwrap();
    let (info, read_back) = read_wav(&path).unwrap();

    assert_eq!(info.channels, 2);
    assert_eq!(info.sample_rate, 44_100);
    assert_eq!(read_back, samples);

    let _ = std::fs::remove_file(&path);
}
