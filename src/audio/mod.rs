//! Frame-based lossless/near-lossless PCM audio codec.
//!
//! A file is split into frames of up to [`DEFAULT_FRAME_SIZE`] interleaved
//! samples. Each frame is predicted per-channel with the Taylor-difference
//! predictor in [`predictor`], residualised, optionally quantized, and
//! Golomb-Rice coded with a divisor chosen from the frame's own residual
//! statistics. Lossy mode closes the loop: achieved bitrate after each frame
//! nudges the quantization shift for the next one.

pub mod predictor;
pub mod wav;

use std::path::Path;

use crate::bitstream::{BitReader, BitWriter};
use crate::golomb::{self, GolombCoder, SignMode};
use crate::utils;
use crate::Result;

/// Samples per frame when the caller does not override it.
pub const DEFAULT_FRAME_SIZE: u16 = 32_000;

/// Highest quantization shift the rate controller will reach for.
pub const Q_BITS_MAX: u8 = 12;

/// Allowed slack either side of the target bitrate before `q_bits` is nudged.
pub const BITRATE_MARGIN_KBPS: f64 = 5.0;

/// How the predictor degree for a frame is chosen.
#[derive(Clone, Copy, Debug)]
pub enum DegreeChoice {
    /// Always use this fixed degree (`0..=7`).
    Fixed(u8),
    /// Search all degrees in `0..=7` and keep the one with lowest residual entropy.
    Auto,
}

/// Encode-time configuration.
#[derive(Clone, Debug)]
pub struct EncodeConfig {
    pub frame_size: u16,
    pub degree: DegreeChoice,
    pub sign_mode: SignMode,
    /// `None` for lossless (q_bits stays 0); `Some(target_kbps)` for lossy.
    pub target_kbps: Option<f64>,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        EncodeConfig {
            frame_size: DEFAULT_FRAME_SIZE,
            degree: DegreeChoice::Fixed(2),
            sign_mode: SignMode::SignMagnitude,
            target_kbps: None,
        }
    }
}

/// Summary returned after a successful encode, used for the compression
/// summary log line (see the `logResults`-style reporting in the design notes).
#[derive(Clone, Copy, Debug)]
pub struct EncodeStats {
    pub input_samples: usize,
    pub input_bytes: u64,
    pub output_bytes: u64,
}

/// Summary returned after a successful decode.
#[derive(Clone, Copy, Debug)]
pub struct DecodeStats {
    pub samples: usize,
}

/// Bounded history of a single channel's reconstructed samples, just deep
/// enough for the highest supported predictor degree.
#[derive(Clone)]
struct ChannelHistory {
    samples: Vec<i32>,
}

impl ChannelHistory {
    fn new() -> Self {
        ChannelHistory {
            samples: Vec::with_capacity(predictor::MAX_DEGREE as usize + 1),
        }
    }

    fn push(&mut self, value: i32) {
        if self.samples.len() == predictor::MAX_DEGREE as usize + 1 {
            self.samples.remove(0);
        }
        self.samples.push(value);
    }
}

/// Runs one frame of the predict/residualise/quantize loop, mutating
/// `histories` with the reconstructed samples it produces.
///
/// `base_index` is the absolute index (from the start of the whole stream)
/// of `frame[0]`, used to keep channel assignment (`index % channels`)
/// correct across frame boundaries even when `frame_size` is not a multiple
/// of the channel count.
fn run_frame(
    frame: &[i16],
    channels: u8,
    degree: u8,
    q_bits: u8,
    base_index: usize,
    histories: &mut [ChannelHistory],
) -> Vec<i32> {
    let mut residuals = Vec::with_capacity(frame.len());

    for (i, &sample) in frame.iter().enumerate() {
        let channel = (base_index + i) % channels as usize;
        let predicted = predictor::predict(degree, &histories[channel].samples);

        let raw_residual = sample as i32 - predicted;
        let residual = raw_residual >> q_bits;
        let reconstructed_raw = predicted + (residual << q_bits);
        let reconstructed = utils::clamp_to_i16(reconstructed_raw) as i32;

        histories[channel].push(reconstructed);
        residuals.push(residual);
    }

    residuals
}

/// Shannon entropy, in bits, of the empirical residual distribution, used to
/// compare candidate predictor degrees during an auto-degree search.
fn residual_entropy_bits(residuals: &[i32]) -> f64 {
    use std::collections::HashMap;

    if residuals.is_empty() {
        return 0.0;
    }

    let mut counts: HashMap<i32, u32> = HashMap::new();
    for &r in residuals {
        *counts.entry(r).or_insert(0) += 1;
    }

    let n = residuals.len() as f64;
    counts
        .values()
        .map(|&c| {
            let p = c as f64 / n;
            -p.log2() * c as f64
        })
        .sum()
}

fn choose_best_degree(
    frame: &[i16],
    channels: u8,
    q_bits: u8,
    base_index: usize,
    histories: &[ChannelHistory],
) -> u8 {
    let mut best_degree = 0;
    let mut best_entropy = f64::INFINITY;

    for degree in 0..=predictor::MAX_DEGREE {
        let mut scratch: Vec<ChannelHistory> = histories.to_vec();
        let residuals = run_frame(frame, channels, degree, q_bits, base_index, &mut scratch);
        let entropy = residual_entropy_bits(&residuals);
        tracing::debug!(degree, entropy, "auto predictor degree candidate");

        if entropy < best_entropy {
            best_entropy = entropy;
            best_degree = degree;
        }
    }

    best_degree
}

/// Encodes interleaved 16-bit PCM `samples` to the `.g7a` container at `out_path`.
pub fn encode<P: AsRef<Path>>(
    samples: &[i16],
    channels: u8,
    sample_rate: u32,
    out_path: P,
    config: &EncodeConfig,
) -> Result<EncodeStats> {
    if channels == 0 || channels > 15 {
        return crate::errors::invalid_parameter("channel count must be in 1..=15");
    }

    let mut writer = BitWriter::create(out_path)?;

    writer.write_bits(channels as u64, 4)?;
    writer.write_bits(sample_rate as u64, 16)?;
    writer.write_bits(config.frame_size as u64, 16)?;
    writer.write_bits(samples.len() as u64, 32)?;
    writer.write_bits((config.sign_mode == SignMode::Interleave) as u64, 1)?;

    let mut histories: Vec<ChannelHistory> = (0..channels).map(|_| ChannelHistory::new()).collect();
    let mut q_bits: u8 = 0;

    let mut pos = 0usize;
    while pos < samples.len() {
        let end = (pos + config.frame_size as usize).min(samples.len());
        let frame = &samples[pos..end];

        let degree = match config.degree {
            DegreeChoice::Fixed(d) => d.min(predictor::MAX_DEGREE),
            DegreeChoice::Auto => choose_best_degree(frame, channels, q_bits, pos, &histories),
        };

        let residuals = run_frame(frame, channels, degree, q_bits, pos, &mut histories);

        let mean_abs =
            residuals.iter().map(|&r| r.unsigned_abs() as f64).sum::<f64>() / residuals.len() as f64;
        let m = golomb::choose_m(mean_abs, config.sign_mode, 2, 65_535);
        let coder = GolombCoder::new(m, config.sign_mode)?;

        writer.write_bits(m as u64, 16)?;
        writer.write_bits(q_bits as u64, 4)?;
        writer.write_bits(degree as u64, 3)?;

        let mut frame_bits: u64 = 16 + 4 + 3;
        for &r in &residuals {
            frame_bits += coder.encode(&mut writer, r)? as u64;
        }

        tracing::debug!(frame_start = pos, m, q_bits, degree, frame_bits, "encoded audio frame");

        if let Some(target_kbps) = config.target_kbps {
            let frame_seconds = (frame.len() as f64 / channels as f64) / sample_rate as f64;
            if frame_seconds > 0.0 {
                let achieved_kbps = (frame_bits as f64 / 1000.0) / frame_seconds;
                if achieved_kbps > target_kbps + BITRATE_MARGIN_KBPS && q_bits < Q_BITS_MAX {
                    q_bits += 1;
                } else if achieved_kbps < target_kbps - BITRATE_MARGIN_KBPS && q_bits > 0 {
                    q_bits -= 1;
                }
            }
        }

        pos = end;
    }

    let input_bytes = samples.len() as u64 * 2;
    let file = writer.finish()?;
    let output_bytes = file.metadata()?.len();

    Ok(EncodeStats {
        input_samples: samples.len(),
        input_bytes,
        output_bytes,
    })
}

/// Decodes a `.g7a` file at `in_path`, writing the reconstructed audio as a
/// 16-bit PCM WAV file at `out_path`.
pub fn decode<P: AsRef<Path>, Q: AsRef<Path>>(in_path: P, out_path: Q) -> Result<DecodeStats> {
    let mut reader = BitReader::open(in_path)?;

    let channels = reader.read_bits_u32(4)? as u8;
    let sample_rate = reader.read_bits_u32(16)?;
    let frame_size = reader.read_bits_u32(16)? as u16;
    let total_samples = reader.read_bits_u32(32)? as usize;
    let use_interleave = reader.read_bit()?;

    if channels == 0 {
        return crate::errors::container_error("audio header declares zero channels");
    }

    let sign_mode = if use_interleave {
        SignMode::Interleave
    } else {
        SignMode::SignMagnitude
    };

    let mut histories: Vec<ChannelHistory> = (0..channels).map(|_| ChannelHistory::new()).collect();
    let mut samples = Vec::with_capacity(total_samples);

    let mut remaining = total_samples;
    let mut base_index = 0usize;
    while remaining > 0 {
        let this_frame_len = remaining.min(frame_size as usize);

        let m = reader.read_bits_u32(16)?;
        let q_bits = reader.read_bits_u32(4)? as u8;
        let degree = reader.read_bits_u32(3)? as u8;
        let coder = GolombCoder::new(m, sign_mode)?;

        tracing::debug!(frame_start = base_index, m, q_bits, degree, "decoding audio frame");

        for i in 0..this_frame_len {
            let channel = (base_index + i) % channels as usize;
            let predicted = predictor::predict(degree, &histories[channel].samples);
            let residual = coder.decode(&mut reader)?;
            let reconstructed_raw = predicted + (residual << q_bits);
            let reconstructed = utils::clamp_to_i16(reconstructed_raw);

            histories[channel].push(reconstructed as i32);
            samples.push(reconstructed);
        }

        base_index += this_frame_len;
        remaining -= this_frame_len;
    }

    wav::write_wav(out_path, channels, sample_rate, &samples)?;

    Ok(DecodeStats {
        samples: samples.len(),
    })
}

#[test]
fn test_lossless_round_trip_constant_signal() {
    use std::env::temp_dir;

    let samples = vec![1000i16; 4096];
    let path = temp_dir().join("g7codec_test_audio_constant.g7a");

    let config = EncodeConfig {
        degree: DegreeChoice::Fixed(0),
        ..EncodeConfig::default()
    };
    encode(&samples, 1, 44_100, &path, &config).unwrap();

    let out_wav = temp_dir().join("g7codec_test_audio_constant.wav");
    decode(&path, &out_wav).unwrap();
    let (_info, decoded) = wav::read_wav(&out_wav).unwrap();

    assert_eq!(decoded, samples);

    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_file(&out_wav);
}

#[test]
fn test_lossless_round_trip_quadratic_signal() {
    use std::env::temp_dir;

    let samples: Vec<i16> = (0..500i32).map(|x| ((x * x) % 4000 - 2000) as i16).collect();
    let path = temp_dir().join("g7codec_test_audio_quadratic.g7a");

    let config = EncodeConfig {
        degree: DegreeChoice::Auto,
        frame_size: 128,
        ..EncodeConfig::default()
    };
    encode(&samples, 2, 48_000, &path, &config).unwrap();

    let out_wav = temp_dir().join("g7codec_test_audio_quadratic.wav");
    decode(&path, &out_wav).unwrap();
    let (info, decoded) = wav::read_wav(&out_wav).unwrap();

    assert_eq!(info.channels, 2);
    assert_eq!(decoded, samples);

    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_file(&out_wav);
}

#[test]
fn test_lossy_quantization_error_bound() {
    use std::env::temp_dir;

    let samples: Vec<i16> = (0..2000i32).map(|x| ((x * 31) % 6000 - 3000) as i16).collect();
    let path = temp_dir().join("g7codec_test_audio_lossy.g7a");

    let config = EncodeConfig {
        degree: DegreeChoice::Fixed(1),
        target_kbps: Some(64.0),
        ..EncodeConfig::default()
    };
    encode(&samples, 1, 44_100, &path, &config).unwrap();

    let out_wav = temp_dir().join("g7codec_test_audio_lossy.wav");
    decode(&path, &out_wav).unwrap();
    let (_info, decoded) = wav::read_wav(&out_wav).unwrap();

    assert_eq!(decoded.len(), samples.len());
    for (&orig, &rec) in samples.iter().zip(decoded.iter()) {
        let diff = (orig as i32 - rec as i32).abs();
        assert!(diff < 1 << (Q_BITS_MAX + 1), "reconstruction drifted too far: {} vs {}", orig, rec);
    }

    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_file(&out_wav);
}
