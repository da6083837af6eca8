//! `audio` CLI: encode a 16-bit PCM WAV file to `.g7a`, or decode a `.g7a`
//! file back to WAV.
//!
//! ```text
//! audio <path> encode lossless <degree>
//! audio <path> encode lossy <target_kbps> <degree>
//! audio <path> decode
//! ```
//!
//! `degree` may be `-1` to request automatic per-frame degree selection.

use std::env;
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use g7codec::audio::{self, DegreeChoice, EncodeConfig};
use g7codec::golomb::SignMode;
use g7codec::Result;

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  audio <path> encode lossless <degree>");
    eprintln!("  audio <path> encode lossy <target_kbps> <degree>");
    eprintln!("  audio <path> decode");
    std::process::exit(1);
}

fn parse_degree(raw: &str) -> Result<DegreeChoice> {
    match raw.parse::<i32>() {
        Ok(-1) => Ok(DegreeChoice::Auto),
        Ok(d) if (0..=audio::predictor::MAX_DEGREE as i32).contains(&d) => Ok(DegreeChoice::Fixed(d as u8)),
        _ => g7codec::errors::usage_error("degree must be -1 (auto) or in 0..=7"),
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        usage();
    }

    let path = Path::new(&args[1]);

    match args[2].as_str() {
        "decode" => {
            let out_path = path.with_extension("wav");
            let start = Instant::now();
            let stats = audio::decode(path, &out_path)?;
            let elapsed = start.elapsed().as_secs_f64();
            tracing::info!(
                samples = stats.samples,
                output = %out_path.display(),
                elapsed_seconds = elapsed,
                "audio decode complete"
            );
        }
        "encode" if args.len() >= 4 => {
            let (info, samples) = audio::wav::read_wav(path)?;

            let (degree, target_kbps) = match args[3].as_str() {
                "lossless" if args.len() == 5 => (parse_degree(&args[4])?, None),
                "lossy" if args.len() == 6 => {
                    let target_kbps: f64 = match args[4].parse() {
                        Ok(v) => v,
                        Err(_) => usage(),
                    };
                    (parse_degree(&args[5])?, Some(target_kbps))
                }
                _ => usage(),
            };

            let config = EncodeConfig {
                degree,
                sign_mode: SignMode::SignMagnitude,
                target_kbps,
                ..EncodeConfig::default()
            };

            let out_path = path.with_extension("g7a");
            let start = Instant::now();
            let stats = audio::encode(&samples, info.channels, info.sample_rate, &out_path, &config)?;
            let elapsed = start.elapsed().as_secs_f64();

            tracing::info!(
                input_bytes = stats.input_bytes,
                output_bytes = stats.output_bytes,
                ratio = stats.output_bytes as f64 / stats.input_bytes.max(1) as f64,
                output = %out_path.display(),
                elapsed_seconds = elapsed,
                "audio encode complete"
            );
        }
        _ => usage(),
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "audio command failed");
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
