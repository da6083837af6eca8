//! JPEG-LS-style spatial (LOCO-I) and block-motion-compensated temporal
//! video codec over planar YUV frames read from / written to a Y4M
//! container.
//!
//! An intra frame LOCO-I-predicts every plane in full, pixel by pixel,
//! raster order (see [`loco`]). An inter frame instead splits each plane
//! into `block_size x block_size` blocks (see [`motion`]) and, per block,
//! picks whichever of motion-compensated or LOCO-I prediction leaves a
//! smaller mean absolute residual — a greedy, SAD-surrogate mode decision,
//! not rate-distortion optimal. Both paths Golomb-Rice code their residuals
//! with the same coder the audio pipeline uses ([`crate::golomb`]).

pub mod loco;
pub mod motion;
pub mod y4m;

use std::path::Path;

use crate::bitstream::{BitReader, BitWriter};
use crate::golomb::{self, GolombCoder, SignMode};
use crate::utils;
use crate::Result;
use motion::MotionVector;
use y4m::{Frame, Y4mReader, Y4mWriter};

/// Block edge length when the caller does not override it. Matches the
/// reference encoder's `BlockMatchingParams` default.
pub const DEFAULT_BLOCK_SIZE: u8 = 16;

/// Motion search radius, in pixels, when the caller does not override it.
pub const DEFAULT_SEARCH_RANGE: u8 = 16;

/// Frames between forced intra frames when the caller does not override it.
pub const DEFAULT_GOP_PERIOD: i32 = 10;

/// The `.g7v` container has no header bit for Golomb sign mode (unlike
/// `.g7a`'s `use_interleave` flag): every block and plane always codes its
/// residuals sign-and-magnitude, matching the reference encoder's default
/// `Golomb(m, useInterleaving=false)`.
const SIGN_MODE: SignMode = SignMode::SignMagnitude;

/// Encode-time configuration.
#[derive(Clone, Copy, Debug)]
pub struct EncodeConfig {
    pub block_size: u8,
    pub search_range: u8,
    /// `0` forces every frame intra; `-1` makes every frame after the first
    /// inter; otherwise frame `k` is intra iff `k % gop_period == 0`.
    pub gop_period: i32,
    /// Right-shift applied to every residual; `0` is lossless.
    pub q_shift: u32,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        EncodeConfig {
            block_size: DEFAULT_BLOCK_SIZE,
            search_range: DEFAULT_SEARCH_RANGE,
            gop_period: DEFAULT_GOP_PERIOD,
            q_shift: 0,
        }
    }
}

/// Summary returned after a successful encode.
#[derive(Clone, Copy, Debug)]
pub struct EncodeStats {
    pub frame_count: usize,
    pub input_bytes: u64,
    pub output_bytes: u64,
}

/// Summary returned after a successful decode.
#[derive(Clone, Copy, Debug)]
pub struct DecodeStats {
    pub frame_count: usize,
}

/// Whether frame `k` (0-indexed) should be coded intra under `gop_period`.
fn is_intra_frame(k: usize, gop_period: i32) -> bool {
    if gop_period == 0 {
        return true;
    }
    if k == 0 {
        return true;
    }
    if gop_period < 0 {
        return false;
    }
    k % gop_period as usize == 0
}

#[test]
fn test_is_intra_frame_gop_rules() {
    assert!(is_intra_frame(0, 10));
    assert!(is_intra_frame(0, 0));
    assert!(is_intra_frame(0, -1));
    assert!(!is_intra_frame(1, -1));
    assert!(!is_intra_frame(100, -1));
    assert!(is_intra_frame(1, 0));
    assert!(is_intra_frame(10, 10));
    assert!(!is_intra_frame(5, 10));
}

fn mean_abs(residuals: &[i32]) -> f64 {
    if residuals.is_empty() {
        return 0.0;
    }
    residuals.iter().map(|&r| r.unsigned_abs() as f64).sum::<f64>() / residuals.len() as f64
}

/// `(x, y, width, height)` of every block in raster order, clipped at the
/// right/bottom edges of a `width x height` plane.
fn iter_blocks(width: usize, height: usize, block_size: usize) -> Vec<(usize, usize, usize, usize)> {
    let mut blocks = Vec::new();
    let mut y = 0;
    while y < height {
        let h = block_size.min(height - y);
        let mut x = 0;
        while x < width {
            let w = block_size.min(width - x);
            blocks.push((x, y, w, h));
            x += block_size;
        }
        y += block_size;
    }
    blocks
}

#[test]
fn test_iter_blocks_clips_at_borders() {
    let blocks = iter_blocks(10, 7, 4);
    assert_eq!(
        blocks,
        vec![
            (0, 0, 4, 4),
            (4, 0, 4, 4),
            (8, 0, 2, 4),
            (0, 4, 4, 3),
            (4, 4, 4, 3),
            (8, 4, 2, 3),
        ]
    );
}

// --- Intra (whole-plane LOCO-I) encode/decode -----------------------------

fn encode_intra_plane<W: std::io::Write>(
    writer: &mut BitWriter<W>,
    plane: &[u8],
    width: usize,
    height: usize,
    q_shift: u32,
    sign_mode: SignMode,
) -> Result<Vec<u8>> {
    let mut recon = vec![0u8; plane.len()];
    let mut residuals = Vec::with_capacity(plane.len());

    for y in 0..height {
        for x in 0..width {
            let predicted = loco::predict(&recon, width, x, y);
            let idx = y * width + x;
            let raw = plane[idx] as i32 - predicted;
            let residual = raw >> q_shift;
            let reconstructed = predicted + (residual << q_shift);
            recon[idx] = utils::clamp_to_u8(reconstructed);
            residuals.push(residual);
        }
    }

    let m = golomb::choose_m(mean_abs(&residuals), sign_mode, 2, 64);
    writer.write_bits(m as u64, 8)?;
    let coder = GolombCoder::new(m, sign_mode)?;
    for &r in &residuals {
        coder.encode(writer, r)?;
    }

    tracing::debug!(width, height, m, q_shift, "encoded intra plane");
    Ok(recon)
}

fn decode_intra_plane<R: std::io::Read>(
    reader: &mut BitReader<R>,
    width: usize,
    height: usize,
    q_shift: u32,
    sign_mode: SignMode,
) -> Result<Vec<u8>> {
    let m = reader.read_bits_u32(8)?;
    let coder = GolombCoder::new(m, sign_mode)?;
    let mut recon = vec![0u8; width * height];

    for y in 0..height {
        for x in 0..width {
            let predicted = loco::predict(&recon, width, x, y);
            let residual = coder.decode(reader)?;
            let reconstructed = predicted + (residual << q_shift);
            recon[y * width + x] = utils::clamp_to_u8(reconstructed);
        }
    }

    Ok(recon)
}

// --- Inter (block mode-decision) encode/decode ----------------------------

/// Residuals a trial intra candidate would produce within one block,
/// predicting with [`loco::predict_in_block`] against the plane's already
/// finalised neighbours (`recon`) and an in-block buffer that, since no
/// quantization has been applied yet, equals the original pixels exactly.
fn trial_intra_residuals(
    original: &[u8],
    recon: &[u8],
    width: usize,
    block_x: usize,
    block_y: usize,
    block_w: usize,
    block_h: usize,
) -> Vec<i32> {
    let mut local = vec![0u8; block_w * block_h];
    let mut residuals = Vec::with_capacity(block_w * block_h);

    for ly in 0..block_h {
        for lx in 0..block_w {
            let predicted = loco::predict_in_block(recon, width, &local, block_x, block_y, block_w, lx, ly);
            let idx = (block_y + ly) * width + (block_x + lx);
            let orig = original[idx] as i32;
            residuals.push(orig - predicted);
            local[ly * block_w + lx] = original[idx];
        }
    }

    residuals
}

/// Re-runs the intra candidate with quantization applied, writing the
/// reconstructed pixels into `recon` and returning the transmitted residuals.
#[allow(clippy::too_many_arguments)]
fn finalize_intra_block(
    original: &[u8],
    recon: &mut [u8],
    width: usize,
    block_x: usize,
    block_y: usize,
    block_w: usize,
    block_h: usize,
    q_shift: u32,
) -> Vec<i32> {
    let mut local = vec![0u8; block_w * block_h];
    let mut residuals = Vec::with_capacity(block_w * block_h);

    for ly in 0..block_h {
        for lx in 0..block_w {
            let predicted = loco::predict_in_block(recon, width, &local, block_x, block_y, block_w, lx, ly);
            let idx = (block_y + ly) * width + (block_x + lx);
            let raw = original[idx] as i32 - predicted;
            let residual = raw >> q_shift;
            let reconstructed = predicted + (residual << q_shift);
            let rb = utils::clamp_to_u8(reconstructed);
            local[ly * block_w + lx] = rb;
            recon[idx] = rb;
            residuals.push(residual);
        }
    }

    residuals
}

#[allow(clippy::too_many_arguments)]
fn finalize_inter_block(
    current: &[u8],
    predicted_block: &[u8],
    recon: &mut [u8],
    width: usize,
    block_x: usize,
    block_y: usize,
    block_w: usize,
    block_h: usize,
    q_shift: u32,
) -> Vec<i32> {
    let mut residuals = Vec::with_capacity(block_w * block_h);

    for ly in 0..block_h {
        for lx in 0..block_w {
            let idx = (block_y + ly) * width + (block_x + lx);
            let predicted = predicted_block[ly * block_w + lx] as i32;
            let raw = current[idx] as i32 - predicted;
            let residual = raw >> q_shift;
            let reconstructed = predicted + (residual << q_shift);
            recon[idx] = utils::clamp_to_u8(reconstructed);
            residuals.push(residual);
        }
    }

    residuals
}

#[allow(clippy::too_many_arguments)]
fn encode_inter_plane<W: std::io::Write>(
    writer: &mut BitWriter<W>,
    current: &[u8],
    reference: &[u8],
    width: usize,
    height: usize,
    q_shift: u32,
    sign_mode: SignMode,
    block_size: usize,
    search_range: u8,
) -> Result<Vec<u8>> {
    let mut recon = vec![0u8; width * height];

    for (bx, by, bw, bh) in iter_blocks(width, height, block_size) {
        let (mv, _sad) = motion::find_best_motion_vector(
            current,
            reference,
            width,
            height,
            bx,
            by,
            bw,
            bh,
            search_range as i32,
        );
        let predicted_block = motion::get_predicted_block(reference, width, bx, by, bw, bh, mv);

        let trial_inter: Vec<i32> = (0..bh)
            .flat_map(|ly| (0..bw).map(move |lx| (ly, lx)))
            .map(|(ly, lx)| {
                let idx = (by + ly) * width + (bx + lx);
                current[idx] as i32 - predicted_block[ly * bw + lx] as i32
            })
            .collect();
        let trial_intra = trial_intra_residuals(current, &recon, width, bx, by, bw, bh);

        let use_inter = mean_abs(&trial_inter) <= mean_abs(&trial_intra);

        let residuals = if use_inter {
            finalize_inter_block(current, &predicted_block, &mut recon, width, bx, by, bw, bh, q_shift)
        } else {
            finalize_intra_block(current, &mut recon, width, bx, by, bw, bh, q_shift)
        };

        let m = golomb::choose_m(mean_abs(&residuals), sign_mode, 2, 64);
        let coder = GolombCoder::new(m, sign_mode)?;

        writer.write_bit(use_inter)?;
        writer.write_bits(m as u64, 8)?;
        if use_inter {
            coder.encode(writer, mv.dx)?;
            coder.encode(writer, mv.dy)?;
        }
        for &r in &residuals {
            coder.encode(writer, r)?;
        }

        tracing::debug!(bx, by, bw, bh, use_inter, m, dx = mv.dx, dy = mv.dy, "encoded inter block");
    }

    Ok(recon)
}

#[allow(clippy::too_many_arguments)]
fn decode_inter_plane<R: std::io::Read>(
    reader: &mut BitReader<R>,
    reference: &[u8],
    width: usize,
    height: usize,
    q_shift: u32,
    sign_mode: SignMode,
    block_size: usize,
) -> Result<Vec<u8>> {
    let mut recon = vec![0u8; width * height];

    for (bx, by, bw, bh) in iter_blocks(width, height, block_size) {
        let use_inter = reader.read_bit()?;
        let m = reader.read_bits_u32(8)?;
        let coder = GolombCoder::new(m, sign_mode)?;

        if use_inter {
            let dx = coder.decode(reader)?;
            let dy = coder.decode(reader)?;
            let mv = MotionVector { dx, dy };
            let predicted_block = motion::get_predicted_block(reference, width, bx, by, bw, bh, mv);

            for ly in 0..bh {
                for lx in 0..bw {
                    let idx = (by + ly) * width + (bx + lx);
                    let predicted = predicted_block[ly * bw + lx] as i32;
                    let residual = coder.decode(reader)?;
                    let reconstructed = predicted + (residual << q_shift);
                    recon[idx] = utils::clamp_to_u8(reconstructed);
                }
            }
        } else {
            let mut local = vec![0u8; bw * bh];
            for ly in 0..bh {
                for lx in 0..bw {
                    let predicted = loco::predict_in_block(&recon, width, &local, bx, by, bw, lx, ly);
                    let idx = (by + ly) * width + (bx + lx);
                    let residual = coder.decode(reader)?;
                    let reconstructed = predicted + (residual << q_shift);
                    let rb = utils::clamp_to_u8(reconstructed);
                    local[ly * bw + lx] = rb;
                    recon[idx] = rb;
                }
            }
        }
    }

    Ok(recon)
}

// --- Whole-file encode/decode ---------------------------------------------

fn encode_plane_set<W: std::io::Write>(
    writer: &mut BitWriter<W>,
    frame: &Frame,
    reference: Option<&Frame>,
    width: usize,
    height: usize,
    uv_width: usize,
    uv_height: usize,
    config: &EncodeConfig,
) -> Result<Frame> {
    let is_inter = reference.is_some();
    writer.write_bit(is_inter)?;

    let block_size = config.block_size as usize;

    let (y, u, v) = if let Some(reference) = reference {
        let y = encode_inter_plane(
            writer,
            &frame.y,
            &reference.y,
            width,
            height,
            config.q_shift,
            SIGN_MODE,
            block_size,
            config.search_range,
        )?;
        let (u, v) = if uv_width > 0 {
            let u = encode_inter_plane(
                writer,
                &frame.u,
                &reference.u,
                uv_width,
                uv_height,
                config.q_shift,
                SIGN_MODE,
                block_size,
                config.search_range,
            )?;
            let v = encode_inter_plane(
                writer,
                &frame.v,
                &reference.v,
                uv_width,
                uv_height,
                config.q_shift,
                SIGN_MODE,
                block_size,
                config.search_range,
            )?;
            (u, v)
        } else {
            (Vec::new(), Vec::new())
        };
        (y, u, v)
    } else {
        let y = encode_intra_plane(writer, &frame.y, width, height, config.q_shift, SIGN_MODE)?;
        let (u, v) = if uv_width > 0 {
            let u = encode_intra_plane(writer, &frame.u, uv_width, uv_height, config.q_shift, SIGN_MODE)?;
            let v = encode_intra_plane(writer, &frame.v, uv_width, uv_height, config.q_shift, SIGN_MODE)?;
            (u, v)
        } else {
            (Vec::new(), Vec::new())
        };
        (y, u, v)
    };

    Ok(Frame { y, u, v })
}

/// Encodes a Y4M file at `in_path` to the `.g7v` container at `out_path`.
///
/// The whole input is read into memory first (the container header carries
/// a fixed `frame_count`, so the total is needed before any frame is
/// written), then encoded frame by frame against the previous
/// *reconstructed* frame.
pub fn encode<P: AsRef<Path>, Q: AsRef<Path>>(in_path: P, out_path: Q, config: &EncodeConfig) -> Result<EncodeStats> {
    let mut y4m_reader = Y4mReader::open(in_path)?;
    let info = y4m_reader.info.clone();
    let frames = y4m_reader.read_all_frames()?;

    let mut writer = BitWriter::create(out_path)?;

    writer.write_bits((info.header_bytes.len() * 8) as u64, 32)?;
    for &b in &info.header_bytes {
        writer.write_bits(b as u64, 8)?;
    }
    writer.write_bits(info.width as u64, 16)?;
    writer.write_bits(info.height as u64, 16)?;
    writer.write_bits(info.uv_width as u64, 16)?;
    writer.write_bits(info.uv_height as u64, 16)?;
    writer.write_bits(config.q_shift as u64, 16)?;
    writer.write_bits(frames.len() as u64, 32)?;
    writer.write_bits(config.block_size as u64, 8)?;
    writer.write_bits(config.search_range as u64, 8)?;

    let plane_bytes_per_frame = info.width * info.height + 2 * info.uv_width * info.uv_height;
    let mut reference: Option<Frame> = None;

    for (k, frame) in frames.iter().enumerate() {
        let coded_inter = !is_intra_frame(k, config.gop_period) && reference.is_some();
        let recon = encode_plane_set(
            &mut writer,
            frame,
            if coded_inter { reference.as_ref() } else { None },
            info.width,
            info.height,
            info.uv_width,
            info.uv_height,
            config,
        )?;
        tracing::debug!(frame = k, is_inter = coded_inter, "encoded video frame");
        reference = Some(recon);
    }

    let input_bytes = info.header_bytes.len() as u64
        + frames.len() as u64 * (6 + plane_bytes_per_frame as u64);
    let file = writer.finish()?;
    let output_bytes = file.metadata()?.len();

    tracing::info!(
        frames = frames.len(),
        input_bytes,
        output_bytes,
        ratio = output_bytes as f64 / input_bytes.max(1) as f64,
        "video encode complete"
    );

    Ok(EncodeStats {
        frame_count: frames.len(),
        input_bytes,
        output_bytes,
    })
}

/// Decodes a `.g7v` file at `in_path`, writing a Y4M file at `out_path`.
pub fn decode<P: AsRef<Path>, Q: AsRef<Path>>(in_path: P, out_path: Q) -> Result<DecodeStats> {
    let mut reader = BitReader::open(in_path)?;

    let header_bits = reader.read_bits_u32(32)? as usize;
    if header_bits % 8 != 0 {
        return crate::errors::container_error("Y4M header bit length is not byte-aligned");
    }
    let mut header_bytes = Vec::with_capacity(header_bits / 8);
    for _ in 0..header_bits / 8 {
        header_bytes.push(reader.read_bits_u32(8)? as u8);
    }

    let width = reader.read_bits_u32(16)? as usize;
    let height = reader.read_bits_u32(16)? as usize;
    let uv_width = reader.read_bits_u32(16)? as usize;
    let uv_height = reader.read_bits_u32(16)? as usize;
    let q_shift = reader.read_bits_u32(16)?;
    let frame_count = reader.read_bits_u32(32)? as usize;
    let block_size = reader.read_bits_u32(8)? as usize;
    let _search_range = reader.read_bits_u32(8)?;

    let mut y4m_writer = Y4mWriter::create(out_path, &header_bytes)?;

    let sign_mode = SIGN_MODE;

    let mut reference: Option<Frame> = None;

    for k in 0..frame_count {
        let is_inter = reader.read_bit()?;
        if is_inter && reference.is_none() {
            return crate::errors::container_error("inter frame with no prior reference frame");
        }

        let (y, u, v) = if is_inter {
            let reference = reference.as_ref().expect("checked above");
            let y = decode_inter_plane(&mut reader, &reference.y, width, height, q_shift, sign_mode, block_size)?;
            let (u, v) = if uv_width > 0 {
                let u =
                    decode_inter_plane(&mut reader, &reference.u, uv_width, uv_height, q_shift, sign_mode, block_size)?;
                let v =
                    decode_inter_plane(&mut reader, &reference.v, uv_width, uv_height, q_shift, sign_mode, block_size)?;
                (u, v)
            } else {
                (Vec::new(), Vec::new())
            };
            (y, u, v)
        } else {
            let y = decode_intra_plane(&mut reader, width, height, q_shift, sign_mode)?;
            let (u, v) = if uv_width > 0 {
                let u = decode_intra_plane(&mut reader, uv_width, uv_height, q_shift, sign_mode)?;
                let v = decode_intra_plane(&mut reader, uv_width, uv_height, q_shift, sign_mode)?;
                (u, v)
            } else {
                (Vec::new(), Vec::new())
            };
            (y, u, v)
        };

        tracing::debug!(frame = k, is_inter, "decoding video frame");

        let frame = Frame { y, u, v };
        y4m_writer.write_frame(&frame)?;
        reference = Some(frame);
    }

    tracing::info!(frames = frame_count, "video decode complete");

    Ok(DecodeStats { frame_count })
}

#[test]
fn test_lossless_intra_single_frame_round_trip() {
    use std::env::temp_dir;

    let path = temp_dir().join("g7codec_test_video_intra.y4m");
    let mut raw = Vec::new();
    raw.extend_from_slice(b"YUV4MPEG2 W16 H16 F30:1 C420\n");
    raw.extend_from_slice(b"FRAME\n");
    raw.extend_from_slice(&[128u8; 256]);
    raw.extend_from_slice(&[128u8; 64]);
    raw.extend_from_slice(&[128u8; 64]);
    std::fs::write(&path, &raw).unwrap();

    let out_path = temp_dir().join("g7codec_test_video_intra.g7v");
    let config = EncodeConfig::default();
    encode(&path, &out_path, &config).unwrap();

    let decoded_path = temp_dir().join("g7codec_test_video_intra_out.y4m");
    decode(&out_path, &decoded_path).unwrap();

    let mut reader = Y4mReader::open(&decoded_path).unwrap();
    let frame = reader.next_frame().unwrap().unwrap();
    assert_eq!(frame.y, vec![128u8; 256]);
    assert_eq!(frame.u, vec![128u8; 64]);
    assert_eq!(frame.v, vec![128u8; 64]);

    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_file(&out_path);
    let _ = std::fs::remove_file(&decoded_path);
}

#[test]
fn test_lossless_inter_frame_finds_translation() {
    use std::env::temp_dir;

    let width = 20usize;
    let height = 20usize;
    let mut frame0 = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            frame0[y * width + x] = ((x * 7 + y * 13) % 251) as u8;
        }
    }
    let mut frame1 = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            let sx = x as i32 - 3;
            let sy = y as i32;
            if sx >= 0 && (sx as usize) < width {
                frame1[y * width + x] = frame0[sy as usize * width + sx as usize];
            } else {
                frame1[y * width + x] = 0;
            }
        }
    }

    let path = temp_dir().join("g7codec_test_video_inter.y4m");
    let mut raw = Vec::new();
    raw.extend_from_slice(format!("YUV4MPEG2 W{} H{} F30:1 Cmono\n", width, height).as_bytes());
    raw.extend_from_slice(b"FRAME\n");
    raw.extend_from_slice(&frame0);
    raw.extend_from_slice(b"FRAME\n");
    raw.extend_from_slice(&frame1);
    std::fs::write(&path, &raw).unwrap();

    let out_path = temp_dir().join("g7codec_test_video_inter.g7v");
    let config = EncodeConfig {
        gop_period: -1,
        search_range: 4,
        block_size: 8,
        ..EncodeConfig::default()
    };
    encode(&path, &out_path, &config).unwrap();

    let decoded_path = temp_dir().join("g7codec_test_video_inter_out.y4m");
    decode(&out_path, &decoded_path).unwrap();

    let mut reader = Y4mReader::open(&decoded_path).unwrap();
    let first = reader.next_frame().unwrap().unwrap();
    assert_eq!(first.y, frame0);
    let second = reader.next_frame().unwrap().unwrap();
    assert_eq!(second.y, frame1);

    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_file(&out_path);
    let _ = std::fs::remove_file(&decoded_path);
}
