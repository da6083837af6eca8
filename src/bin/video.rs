//! `video` CLI: encode a Y4M file to `.g7v`, or decode a `.g7v` file back to Y4M.
//!
//! ```text
//! video -encode <in.y4m> <out.g7v> [-s search] [-b block] [-f gop_period] [-l q_shift]
//! video -decode <in.g7v> <out.y4m>
//! ```

use std::env;
use std::process::ExitCode;
use std::time::Instant;

use g7codec::video::{self, EncodeConfig};
use g7codec::Result;

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  video -encode <in.y4m> <out.g7v> [-s search] [-b block] [-f gop_period] [-l q_shift]");
    eprintln!("  video -decode <in.g7v> <out.y4m>");
    std::process::exit(1);
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 3 {
        usage();
    }

    match args[0].as_str() {
        "-encode" => {
            let in_path = &args[1];
            let out_path = &args[2];

            let config = EncodeConfig {
                search_range: parse_flag(&args, "-s").unwrap_or(video::DEFAULT_SEARCH_RANGE),
                block_size: parse_flag(&args, "-b").unwrap_or(video::DEFAULT_BLOCK_SIZE),
                gop_period: parse_flag(&args, "-f").unwrap_or(video::DEFAULT_GOP_PERIOD),
                q_shift: parse_flag(&args, "-l").unwrap_or(0),
            };

            let start = Instant::now();
            let stats = video::encode(in_path, out_path, &config)?;
            let elapsed = start.elapsed().as_secs_f64();

            tracing::info!(
                frames = stats.frame_count,
                input_bytes = stats.input_bytes,
                output_bytes = stats.output_bytes,
                ratio = stats.output_bytes as f64 / stats.input_bytes.max(1) as f64,
                elapsed_seconds = elapsed,
                "video encode complete"
            );
        }
        "-decode" => {
            let in_path = &args[1];
            let out_path = &args[2];

            let start = Instant::now();
            let stats = video::decode(in_path, out_path)?;
            let elapsed = start.elapsed().as_secs_f64();

            tracing::info!(frames = stats.frame_count, elapsed_seconds = elapsed, "video decode complete");
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
            tracing::error!(error = %err, "video command failed");
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
