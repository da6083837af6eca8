//! Minimal YUV4MPEG2 (Y4M) container glue.
//!
//! Reads just enough of a Y4M stream to hand the codec core per-plane
//! dimensions and raw frame buffers, and keeps the stream header around
//! verbatim so the decoder can reconstruct a playable container without
//! reparsing anything. A small reader struct plus free helper functions,
//! with errors routed through [`crate::errors::container_error`].

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use crate::errors;
use crate::Result;

const FRAME_MARKER: &[u8] = b"FRAME";

/// Header fields relevant to plane layout, plus the raw header line bytes
/// (including the trailing newline) so the decoder can replay it verbatim.
#[derive(Clone, Debug)]
pub struct Y4mInfo {
    pub header_bytes: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub uv_width: usize,
    pub uv_height: usize,
}

/// One decoded planar YUV frame. `u` and `v` are empty for monochrome streams.
#[derive(Clone, Debug)]
pub struct Frame {
    pub y: Vec<u8>,
    pub u: Vec<u8>,
    pub v: Vec<u8>,
}

/// Streaming reader over a Y4M file.
pub struct Y4mReader<R> {
    reader: R,
    pub info: Y4mInfo,
    y_size: usize,
    uv_size: usize,
}

impl Y4mReader<BufReader<File>> {
    /// Opens `path` and parses its Y4M header line.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Y4mReader::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read> Y4mReader<R> {
    /// Wraps an already-open reader, consuming and parsing its header line.
    pub fn new(mut reader: R) -> Result<Self> {
        let header_bytes = match read_line_bytes(&mut reader)? {
            Some(line) => line,
            None => return errors::container_error("Y4M stream is empty, no header line found"),
        };

        let (width, height, chroma) = parse_header(&header_bytes)?;
        let (uv_width, uv_height) = chroma_plane_dims(chroma.as_deref(), width, height);

        Ok(Y4mReader {
            reader,
            info: Y4mInfo {
                header_bytes,
                width,
                height,
                uv_width,
                uv_height,
            },
            y_size: width * height,
            uv_size: uv_width * uv_height,
        })
    }

    /// Reads the next `FRAME` marker and its plane payloads, or `None` at
    /// a clean end of stream (no partial frame pending).
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        let marker = match read_line_bytes(&mut self.reader)? {
            Some(line) => line,
            None => return Ok(None),
        };
        if !marker.starts_with(FRAME_MARKER) {
            return errors::container_error("expected a FRAME marker in Y4M stream");
        }

        let mut y = vec![0u8; self.y_size];
        self.reader.read_exact(&mut y)?;

        let (u, v) = if self.uv_size > 0 {
            let mut u = vec![0u8; self.uv_size];
            self.reader.read_exact(&mut u)?;
            let mut v = vec![0u8; self.uv_size];
            self.reader.read_exact(&mut v)?;
            (u, v)
        } else {
            (Vec::new(), Vec::new())
        };

        Ok(Some(Frame { y, u, v }))
    }

    /// Reads every remaining frame into memory. The codec core needs the
    /// total frame count before it writes the container header, so the
    /// encoder drains the whole input up front rather than streaming it.
    pub fn read_all_frames(&mut self) -> Result<Vec<Frame>> {
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }
}

/// Writes a Y4M file: the stored header bytes verbatim, then one
/// `FRAME\n` + plane payload per decoded frame.
pub struct Y4mWriter<W: Write> {
    writer: W,
}

impl Y4mWriter<File> {
    /// Creates `path`, writing `header_bytes` (as captured by [`Y4mReader`]) immediately.
    pub fn create<P: AsRef<Path>>(path: P, header_bytes: &[u8]) -> Result<Self> {
        let mut writer = File::create(path)?;
        writer.write_all(header_bytes)?;
        Ok(Y4mWriter { writer })
    }
}

impl<W: Write> Y4mWriter<W> {
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.writer.write_all(b"FRAME\n")?;
        self.writer.write_all(&frame.y)?;
        if !frame.u.is_empty() {
            self.writer.write_all(&frame.u)?;
            self.writer.write_all(&frame.v)?;
        }
        Ok(())
    }
}

/// Reads bytes up to and including the next `\n`. Returns `None` only when
/// the stream ends with no bytes read at all (a clean end-of-stream);
/// anything read and then truncated before a newline is a container error.
fn read_line_bytes<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = reader.read(&mut byte)?;
        if n == 0 {
            if buf.is_empty() {
                return Ok(None);
            }
            return errors::container_error("Y4M stream truncated mid-line");
        }
        buf.push(byte[0]);
        if byte[0] == b'\n' {
            return Ok(Some(buf));
        }
    }
}

/// Parses the `YUV4MPEG2 W<width> H<height> ... C<chroma> ...` header line,
/// returning width, height and the raw chroma tag (if present).
fn parse_header(header_bytes: &[u8]) -> Result<(usize, usize, Option<String>)> {
    let text = match std::str::from_utf8(header_bytes) {
        Ok(t) => t,
        Err(_) => return errors::container_error("Y4M header line is not valid UTF-8"),
    };
    let trimmed = text.trim_end_matches(['\n', '\r']);

    let mut tokens = trimmed.split_whitespace();
    match tokens.next() {
        Some("YUV4MPEG2") => {}
        _ => return errors::container_error("Y4M header missing YUV4MPEG2 magic"),
    }

    let mut width = None;
    let mut height = None;
    let mut chroma = None;

    for tok in tokens {
        if tok.is_empty() {
            continue;
        }
        let (tag, rest) = tok.split_at(1);
        match tag {
            "W" => width = rest.parse::<usize>().ok(),
            "H" => height = rest.parse::<usize>().ok(),
            "C" => chroma = Some(rest.to_string()),
            _ => {}
        }
    }

    let width = match width {
        Some(w) if w > 0 => w,
        _ => return errors::container_error("Y4M header missing or invalid W tag"),
    };
    let height = match height {
        Some(h) if h > 0 => h,
        _ => return errors::container_error("Y4M header missing or invalid H tag"),
    };

    Ok((width, height, chroma))
}

/// Computes chroma plane dimensions for a recognised subsampling tag,
/// defaulting unrecognised tags (and an absent tag) to 4:2:0.
fn chroma_plane_dims(chroma: Option<&str>, width: usize, height: usize) -> (usize, usize) {
    match chroma {
        None | Some("420") | Some("420jpeg") | Some("420mpeg2") | Some("420paldv") => {
            ((width + 1) / 2, (height + 1) / 2)
        }
        Some("422") => ((width + 1) / 2, height),
        Some("444") => (width, height),
        Some("440") => (width, (height + 1) / 2),
        Some("411") => ((width + 3) / 4, height),
        Some("mono") => (0, 0),
        Some(other) => {
            tracing::warn!(chroma = %other, "unrecognised Y4M chroma tag, defaulting to 4:2:0");
            ((width + 1) / 2, (height + 1) / 2)
        }
    }
}

#[test]
fn test_parse_header_basic_420() {
    let (w, h, c) = parse_header(b"YUV4MPEG2 W16 H16 F30:1 Ip A0:0 C420\n").unwrap();
    assert_eq!(w, 16);
    assert_eq!(h, 16);
    assert_eq!(c.as_deref(), Some("420"));
    assert_eq!(chroma_plane_dims(c.as_deref(), w, h), (8, 8));
}

#[test]
fn test_parse_header_no_chroma_tag_defaults_420() {
    let (w, h, c) = parse_header(b"YUV4MPEG2 W8 H4 F25:1\n").unwrap();
    assert_eq!(chroma_plane_dims(c.as_deref(), w, h), (4, 2));
}

#[test]
fn test_chroma_dims_444_and_mono() {
    assert_eq!(chroma_plane_dims(Some("444"), 10, 6), (10, 6));
    assert_eq!(chroma_plane_dims(Some("mono"), 10, 6), (0, 0));
}

#[test]
fn test_chroma_dims_unknown_defaults_420() {
    assert_eq!(chroma_plane_dims(Some("bogus"), 8, 8), (4, 4));
}

#[test]
fn test_missing_magic_is_container_error() {
    assert!(parse_header(b"NOT4MPEG2 W8 H8\n").is_err());
}

#[test]
fn test_reader_round_trip_single_frame() {
    let mut raw = Vec::new();
    raw.extend_from_slice(b"YUV4MPEG2 W4 H2 F30:1 C420\n");
    raw.extend_from_slice(b"FRAME\n");
    let y = vec![10u8, 20, 30, 40, 50, 60, 70, 80];
    let u = vec![1u8, 2];
    let v = vec![3u8, 4];
    raw.extend_from_slice(&y);
    raw.extend_from_slice(&u);
    raw.extend_from_slice(&v);

    let mut reader = Y4mReader::new(&raw[..]).unwrap();
    assert_eq!(reader.info.width, 4);
    assert_eq!(reader.info.height, 2);
    assert_eq!(reader.info.uv_width, 2);
    assert_eq!(reader.info.uv_height, 1);

    let frame = reader.next_frame().unwrap().unwrap();
    assert_eq!(frame.y, y);
    assert_eq!(frame.u, u);
    assert_eq!(frame.v, v);

    assert!(reader.next_frame().unwrap().is_none());
}

#[test]
fn test_writer_round_trip() {
    use std::env::temp_dir;

    let header = b"YUV4MPEG2 W2 H2 F30:1 C420\n".to_vec();
    let path = temp_dir().join("g7codec_test_y4m_writer.y4m");

    {
        let mut w = Y4mWriter::create(&path, &header).unwrap();
        let frame = Frame {
            y: vec![1, 2, 3, 4],
            u: vec![5],
            v: vec![6],
        };
        w.write_frame(&frame).unwrap();
    }

    let mut reader = Y4mReader::open(&path).unwrap();
    assert_eq!(reader.info.width, 2);
    let frame = reader.next_frame().unwrap().unwrap();
    assert_eq!(frame.y, vec![1, 2, 3, 4]);
    assert_eq!(frame.u, vec![5]);
    assert_eq!(frame.v, vec![6]);

    let _ = std::fs::remove_file(&path);
}
