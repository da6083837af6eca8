//! `g7codec` is a lossless and near-lossless codec for 16-bit PCM audio and
//! planar YUV video, built on spatial/temporal prediction and Golomb-Rice
//! entropy coding.
//!
//! The audio path predicts each sample from its own channel's history using a
//! Taylor expansion of backward finite differences (see [`audio::predictor`]).
//! The video path predicts intra frames with the LOCO-I/JPEG-LS edge
//! predictor and inter frames with full-search block motion compensation (see
//! [`video::loco`] and [`video::motion`]). Both paths entropy-code their
//! residuals with the same parameterised Golomb-Rice coder ([`golomb`]) over
//! a shared bit-level I/O layer ([`bitstream`]).

pub mod audio;
pub mod bitstream;
pub mod errors;
pub mod golomb;
pub mod io;
pub mod utils;
pub mod video;

pub use errors::Error;

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
