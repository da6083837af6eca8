//! Golomb-Rice entropy coding of signed residuals over a [`BitReader`]/[`BitWriter`].
//!
//! The coder maps a signed value to a non-negative one (either by zig-zag
//! interleaving or by a sign bit tacked on to the magnitude), then splits the
//! result into a unary-coded quotient and a truncated-binary-coded remainder,
//! exactly as Golomb-Rice coding is used for FLAC residuals, but generalised
//! from a power-of-two-only Rice parameter to an arbitrary divisor `m`.

use super::bitstream::{BitReader, BitWriter};
use super::errors;
use super::Result;
use std::io::{Read, Write};

/// How a signed value is mapped onto the non-negative domain the unary/binary
/// split operates on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignMode {
    /// Zig-zag interleaving: `0, -1, 1, -2, 2, ...` map to `0, 1, 2, 3, 4, ...`.
    /// Doubles the unsigned range, but needs no extra sign bit.
    Interleave,
    /// Magnitude followed by an explicit sign bit, always emitted (even for
    /// zero), matching how the reference encoder historically laid this out.
    SignMagnitude,
}

/// A Golomb-Rice coder for one divisor `m`.
///
/// `m` need not be a power of two: the remainder is coded with truncated
/// binary, so non-power-of-two divisors only cost a fractional bit over the
/// ideal, rather than rounding up to the next power of two as plain Rice
/// coding would.
#[derive(Clone, Copy, Debug)]
pub struct GolombCoder {
    m: u32,
    /// `ceil(log2(m))`.
    b: u32,
    /// `2^b - m`, the truncated-binary cutoff.
    c: u32,
    sign_mode: SignMode,
}

impl GolombCoder {
    /// Creates a coder for divisor `m` (must be `>= 2`) and the given sign mode.
    pub fn new(m: u32, sign_mode: SignMode) -> Result<Self> {
        if m < 2 {
            return errors::invalid_parameter("golomb divisor m must be at least 2");
        }
        let b = ceil_log2(m);
        let c = (1u32 << b) - m;
        Ok(GolombCoder { m, b, c, sign_mode })
    }

    /// The divisor this coder was constructed with.
    #[inline(always)]
    pub fn m(&self) -> u32 {
        self.m
    }

    fn to_unsigned(&self, value: i32) -> (u32, bool) {
        match self.sign_mode {
            SignMode::Interleave => {
                let u = if value >= 0 {
                    2u32.wrapping_mul(value as u32)
                } else {
                    2u32.wrapping_mul((-(value + 1)) as u32) + 1
                };
                (u, false)
            }
            SignMode::SignMagnitude => (value.unsigned_abs(), value < 0),
        }
    }

    fn from_unsigned(&self, u: u32, negative: bool) -> i32 {
        match self.sign_mode {
            SignMode::Interleave => {
                if u % 2 == 0 {
                    (u / 2) as i32
                } else {
                    -((u / 2) as i32) - 1
                }
            }
            SignMode::SignMagnitude => {
                let mag = u as i32;
                if negative {
                    -mag
                } else {
                    mag
                }
            }
        }
    }

    /// Encodes `value`, writing it to `writer`. Returns the number of bits written.
    pub fn encode<W: Write>(&self, writer: &mut BitWriter<W>, value: i32) -> Result<u32> {
        let (u, negative) = self.to_unsigned(value);
        let q = u / self.m;
        let r = u % self.m;

        let mut bits = q + 1;
        for _ in 0..q {
            writer.write_bit(true)?;
        }
        writer.write_bit(false)?;

        if self.b > 0 {
            if r < self.c {
                if self.b > 1 {
                    writer.write_bits(r as u64, self.b - 1)?;
                    bits += self.b - 1;
                }
            } else {
                writer.write_bits((r + self.c) as u64, self.b)?;
                bits += self.b;
            }
        }

        if self.sign_mode == SignMode::SignMagnitude {
            writer.write_bit(negative)?;
            bits += 1;
        }

        Ok(bits)
    }

    /// Decodes the next value from `reader`.
    pub fn decode<R: Read>(&self, reader: &mut BitReader<R>) -> Result<i32> {
        let q = reader.read_unary()?;

        let r = if self.b == 0 {
            0
        } else if self.b == 1 {
            reader.read_bits_u32(1)?
        } else {
            let prefix = reader.read_bits_u32(self.b - 1)?;
            if prefix < self.c {
                prefix
            } else {
                let extra = reader.read_bits_u32(1)?;
                (prefix << 1 | extra) - self.c
            }
        };

        let u = q * self.m + r;

        let negative = if self.sign_mode == SignMode::SignMagnitude {
            reader.read_bit()?
        } else {
            false
        };

        Ok(self.from_unsigned(u, negative))
    }
}

/// `ceil(log2(m))` for `m >= 1`.
fn ceil_log2(m: u32) -> u32 {
    if m <= 1 {
        return 0;
    }
    32 - (m - 1).leading_zeros()
}

#[test]
fn test_ceil_log2() {
    assert_eq!(ceil_log2(1), 0);
    assert_eq!(ceil_log2(2), 1);
    assert_eq!(ceil_log2(3), 2);
    assert_eq!(ceil_log2(4), 2);
    assert_eq!(ceil_log2(5), 3);
    assert_eq!(ceil_log2(64), 6);
}

#[test]
fn test_golomb_round_trip_interleave() {
    let coder = GolombCoder::new(5, SignMode::Interleave).unwrap();
    let values = [0, 1, -1, 2, -2, 5, -5, 100, -100, 32767, -32768];

    let mut buf: Vec<u8> = Vec::new();
    {
        let mut w = BitWriter::new(&mut buf);
        for &v in &values {
            coder.encode(&mut w, v).unwrap();
        }
        w.finish().unwrap();
    }

    let mut r = BitReader::new(&buf[..]);
    for &v in &values {
        assert_eq!(coder.decode(&mut r).unwrap(), v);
    }
}

#[test]
fn test_golomb_round_trip_sign_magnitude() {
    let coder = GolombCoder::new(7, SignMode::SignMagnitude).unwrap();
    let values = [0, 1, -1, 2, -2, 5, -5, 42, -42];

    let mut buf: Vec<u8> = Vec::new();
    {
        let mut w = BitWriter::new(&mut buf);
        for &v in &values {
            coder.encode(&mut w, v).unwrap();
        }
        w.finish().unwrap();
    }

    let mut r = BitReader::new(&buf[..]);
    for &v in &values {
        assert_eq!(coder.decode(&mut r).unwrap(), v);
    }
}

#[test]
fn test_golomb_round_trip_many_m() {
    for m in 2..64u32 {
        let coder = GolombCoder::new(m, SignMode::Interleave).unwrap();
        let mut buf: Vec<u8> = Vec::new();
        let values: Vec<i32> = (-50..50).collect();
        {
            let mut w = BitWriter::new(&mut buf);
            for &v in &values {
                coder.encode(&mut w, v).unwrap();
            }
            w.finish().unwrap();
        }
        let mut r = BitReader::new(&buf[..]);
        for &v in &values {
            assert_eq!(coder.decode(&mut r).unwrap(), v);
        }
    }
}

#[test]
fn test_golomb_rejects_small_m() {
    assert!(GolombCoder::new(0, SignMode::Interleave).is_err());
    assert!(GolombCoder::new(1, SignMode::Interleave).is_err());
    assert!(GolombCoder::new(2, SignMode::Interleave).is_ok());
}

/// Chooses a Golomb divisor from the mean absolute residual of a frame or
/// block, approximating the residual distribution as geometric. Doubling
/// `mean_abs` for `Interleave` mode accounts for zig-zag roughly doubling the
/// unsigned magnitude relative to `SignMagnitude` mode.
pub fn choose_m(mean_abs: f64, sign_mode: SignMode, min_m: u32, max_m: u32) -> u32 {
    let e = match sign_mode {
        SignMode::Interleave => mean_abs * 2.0,
        SignMode::SignMagnitude => mean_abs,
    };
    if e <= 0.0 {
        return min_m;
    }
    let p = 1.0 / (e + 1.0);
    let m = (-1.0 / (1.0 - p).log2()).ceil() as i64;
    (m.max(min_m as i64).min(max_m as i64)) as u32
}

#[test]
fn test_choose_m_monotone_in_residual_magnitude() {
    let small = choose_m(0.5, SignMode::Interleave, 2, 4096);
    let big = choose_m(500.0, SignMode::Interleave, 2, 4096);
    assert!(small <= big);
    assert!(small >= 2);
}

#[test]
fn test_choose_m_floor_and_ceiling() {
    assert_eq!(choose_m(0.0, SignMode::Interleave, 2, 64), 2);
    assert_eq!(choose_m(1_000_000.0, SignMode::Interleave, 2, 64), 64);
}
