//! In-memory compression benchmark driver.
//!
//! Reads each FILE in chunks, compresses and immediately decompresses
//! every chunk, verifies the round trip, and reports ratio and
//! throughput. No output files are written.

use std::ffi::OsString;
use std::fs::File;
use std::io::Read;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use xpack::{Compressor, Decompressor};
use xpack_cli::cli::LevelFlags;
use xpack_cli::container::{read_full, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
use xpack_core::{CompressionLevel, CompressionStats};

fn parse_chunk_size(s: &str) -> Result<u32, String> {
    let value: u32 = s.parse().map_err(|_| format!("invalid chunk size: {s}"))?;
    if (MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&value) {
        Ok(value)
    } else {
        Err(format!(
            "chunk size must be in [{MIN_CHUNK_SIZE}, {MAX_CHUNK_SIZE}]"
        ))
    }
}

/// Benchmark XPACK compression and decompression on the specified FILEs.
#[derive(Debug, Parser)]
#[command(name = "xpack-bench", version)]
struct Args {
    #[command(flatten)]
    level_flags: LevelFlags,

    /// Compression level [1-9] (default 6)
    #[arg(short = 'L', value_name = "LVL")]
    level: Option<u8>,

    /// Chunk size (default 524288)
    #[arg(short = 's', value_name = "SIZE", value_parser = parse_chunk_size)]
    chunk_size: Option<u32>,

    /// Files to benchmark; `-` or none means standard input
    files: Vec<OsString>,
}

fn benchmark_stream(
    input: &mut dyn Read,
    chunk_size: usize,
    compressor: &mut Compressor,
    decompressor: &mut Decompressor,
) -> std::io::Result<()> {
    let mut original = vec![0u8; chunk_size];
    let mut compressed = vec![0u8; chunk_size - 1];
    let mut decompressed = vec![0u8; chunk_size];

    let mut compress_stats = CompressionStats::new();
    let mut decompress_time_us: u64 = 0;

    loop {
        let n = read_full(input, &mut original)?;
        if n == 0 {
            break;
        }
        let chunk = &original[..n];
        compress_stats.original_size += n;
        compress_stats.chunks_processed += 1;

        let start = Instant::now();
        let written = compressor.compress(chunk, &mut compressed[..n - 1]);
        compress_stats.time_us += start.elapsed().as_micros() as u64;

        if written == 0 {
            // Chunk did not shrink; it would be stored raw.
            compress_stats.compressed_size += n;
            continue;
        }
        compress_stats.compressed_size += written;

        let start = Instant::now();
        let result = decompressor.decompress(&compressed[..written], &mut decompressed[..n]);
        decompress_time_us += start.elapsed().as_micros() as u64;

        match result {
            Ok(_) if decompressed[..n] == original[..n] => {}
            Ok(_) => {
                eprintln!("xpack-bench: data did not decompress to original");
                return Err(std::io::Error::other("verification failed"));
            }
            Err(err) => {
                eprintln!("xpack-bench: failed to decompress data: {err}");
                return Err(std::io::Error::other("decompression failed"));
            }
        }
    }

    if compress_stats.original_size == 0 {
        println!("\tFile was empty.");
        return Ok(());
    }

    let ratio = compress_stats.ratio();
    println!(
        "\tCompressed {} => {} bytes ({:.3}%)",
        compress_stats.original_size,
        compress_stats.compressed_size,
        100.0 - ratio.savings_percent()
    );
    println!(
        "\tCompression time: {} ms ({:.0} MB/s)",
        compress_stats.time_us / 1000,
        compress_stats.throughput_mbs()
    );
    if decompress_time_us > 0 {
        println!(
            "\tDecompression time: {} ms ({:.0} MB/s)",
            decompress_time_us / 1000,
            compress_stats.original_size as f64 / decompress_time_us.max(1) as f64
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = args.level_flags.resolve(args.level, 6);
    if !(1..=9).contains(&level) {
        eprintln!("xpack-bench: compression level must be in [1, 9]");
        return ExitCode::FAILURE;
    }
    let chunk_size = args.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE) as usize;

    let mut compressor =
        match Compressor::new(chunk_size, CompressionLevel::from_level(level)) {
            Ok(c) => c,
            Err(err) => {
                eprintln!("xpack-bench: {err}");
                return ExitCode::FAILURE;
            }
        };
    let mut decompressor = Decompressor::new();

    println!("Benchmarking XPACK compression:");
    println!("\tChunk size: {chunk_size}");
    println!("\tCompression level: {level}");

    let files = if args.files.is_empty() {
        vec![OsString::from("-")]
    } else {
        args.files
    };

    for name in &files {
        let result = if name == "-" {
            println!("Processing (stdin)...");
            benchmark_stream(
                &mut std::io::stdin().lock(),
                chunk_size,
                &mut compressor,
                &mut decompressor,
            )
        } else {
            match File::open(name) {
                Ok(mut file) => {
                    println!("Processing {}...", name.to_string_lossy());
                    benchmark_stream(&mut file, chunk_size, &mut compressor, &mut decompressor)
                }
                Err(err) => {
                    eprintln!("xpack-bench: {}: {err}", name.to_string_lossy());
                    return ExitCode::FAILURE;
                }
            }
        };
        if result.is_err() {
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}
