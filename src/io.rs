//! Small byte-level read/write helpers used by the container glue modules
//! ([`crate::audio::wav`], [`crate::video::y4m`]): `ReadBuffer`/`WriteBuffer`
//! extension traits covering the integer widths this codec's containers
//! actually use (8/16/32-bit little-endian). No float conversions, since
//! every sample this codec handles is an integer.

use std::cmp;
use std::io;

/// Extends `io::Read` with little-endian integer and raw-byte helpers.
pub trait ReadBuffer {
    /// Reads as many bytes as `buf` is long, issuing multiple `read` calls if needed.
    fn read_into(&mut self, buf: &mut [u8]) -> io::Result<()>;

    /// Reads `n` bytes and returns them in a vector.
    fn read_bytes(&mut self, n: usize) -> io::Result<Vec<u8>>;

    /// Skips over `n` bytes.
    fn skip_bytes(&mut self, n: usize) -> io::Result<()>;

    /// Reads a single byte.
    fn read_u8(&mut self) -> io::Result<u8>;

    /// Reads two bytes as a little-endian unsigned integer.
    fn read_le_u16(&mut self) -> io::Result<u16>;

    /// Reads four bytes as a little-endian unsigned integer.
    fn read_le_u32(&mut self) -> io::Result<u32>;
}

impl<R: io::Read> ReadBuffer for R {
    #[inline(always)]
    fn read_into(&mut self, buf: &mut [u8]) -> io::Result<()> {
        let mut n = 0;
        while n < buf.len() {
            let progress = self.read(&mut buf[n..])?;
            if progress > 0 {
                n += progress;
            } else {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to read enough bytes",
                ));
            }
        }
        Ok(())
    }

    #[inline(always)]
    fn read_bytes(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.read_into(&mut buf)?;
        Ok(buf)
    }

    #[inline(always)]
    fn skip_bytes(&mut self, n: usize) -> io::Result<()> {
        let mut n_read = 0;
        let mut buf = [0u8; 1024];
        while n_read < n {
            let end = cmp::min(n - n_read, 1024);
            let progress = self.read(&mut buf[0..end])?;
            if progress > 0 {
                n_read += progress;
            } else {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to read enough bytes",
                ));
            }
        }
        Ok(())
    }

    #[inline(always)]
    fn read_u8(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.read_into(&mut buf)?;
        Ok(buf[0])
    }

    #[inline(always)]
    fn read_le_u16(&mut self) -> io::Result<u16> {
        let mut buf = [0u8; 2];
        self.read_into(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    #[inline(always)]
    fn read_le_u32(&mut self) -> io::Result<u32> {
        let mut buf = [0u8; 4];
        self.read_into(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }
}

/// Extends `io::Write` with little-endian integer helpers.
pub trait WriteBuffer: io::Write {
    fn write_u8(&mut self, x: u8) -> io::Result<()>;
    fn write_le_u16(&mut self, x: u16) -> io::Result<()>;
    fn write_le_u32(&mut self, x: u32) -> io::Result<()>;
}

impl<W: io::Write> WriteBuffer for W {
    #[inline(always)]
    fn write_u8(&mut self, x: u8) -> io::Result<()> {
        self.write_all(&[x])
    }

    #[inline(always)]
    fn write_le_u16(&mut self, x: u16) -> io::Result<()> {
        self.write_all(&x.to_le_bytes())
    }

    #[inline(always)]
    fn write_le_u32(&mut self, x: u32) -> io::Result<()> {
        self.write_all(&x.to_le_bytes())
    }
}
