//! The `xpack` / `xunpack` command-line front end.
//!
//! Behavior mirrors the classic gzip-style contract: each FILE is
//! processed independently, skips are warnings, failures are errors, and
//! the exit status is 0 for a clean run, 2 when there were only warnings,
//! and 1 when anything failed. Invocation under the name `xunpack`
//! implies `-d`.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use xpack::{Compressor, Decompressor};
use xpack_core::CompressionLevel;

use crate::container::{
    compress_chunks, decompress_chunks, ContainerError, FileHeader, DEFAULT_CHUNK_SIZE,
    MAX_CHUNK_SIZE, MIN_CHUNK_SIZE,
};

/// Default suffix appended to compressed files.
pub const DEFAULT_SUFFIX: &str = "xpack";

/// Numeric shorthand flags `-1` .. `-9`.
#[derive(Debug, Default, clap::Args)]
pub struct LevelFlags {
    #[arg(short = '1', hide = true, action = clap::ArgAction::SetTrue)]
    l1: bool,
    #[arg(short = '2', hide = true, action = clap::ArgAction::SetTrue)]
    l2: bool,
    #[arg(short = '3', hide = true, action = clap::ArgAction::SetTrue)]
    l3: bool,
    #[arg(short = '4', hide = true, action = clap::ArgAction::SetTrue)]
    l4: bool,
    #[arg(short = '5', hide = true, action = clap::ArgAction::SetTrue)]
    l5: bool,
    #[arg(short = '6', hide = true, action = clap::ArgAction::SetTrue)]
    l6: bool,
    #[arg(short = '7', hide = true, action = clap::ArgAction::SetTrue)]
    l7: bool,
    #[arg(short = '8', hide = true, action = clap::ArgAction::SetTrue)]
    l8: bool,
    #[arg(short = '9', hide = true, action = clap::ArgAction::SetTrue)]
    l9: bool,
}

impl LevelFlags {
    /// Resolve the digit flags plus an explicit `-L` into a level.
    pub fn resolve(&self, explicit: Option<u8>, default: u8) -> u8 {
        if let Some(level) = explicit {
            return level;
        }
        let flags = [
            self.l1, self.l2, self.l3, self.l4, self.l5, self.l6, self.l7, self.l8, self.l9,
        ];
        flags
            .iter()
            .rposition(|&set| set)
            .map(|i| i as u8 + 1)
            .unwrap_or(default)
    }
}

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

fn parse_level(s: &str) -> Result<u8, String> {
    let value: u8 = s.parse().map_err(|_| format!("invalid level: {s}"))?;
    if (1..=9).contains(&value) {
        Ok(value)
    } else {
        Err("compression level must be in [1, 9]".to_string())
    }
}

/// Compress or decompress the specified FILEs.
#[derive(Debug, Parser)]
#[command(
    name = "xpack",
    version,
    about = "Compress or decompress the specified FILEs.",
    after_help = "NOTICE: this program is currently experimental, and the on-disk format\n\
                  is not yet stable!"
)]
pub struct Args {
    #[command(flatten)]
    level_flags: LevelFlags,

    /// Write to standard output
    #[arg(short = 'c')]
    pub to_stdout: bool,

    /// Decompress
    #[arg(short = 'd')]
    pub decompress: bool,

    /// Overwrite existing output files
    #[arg(short = 'f')]
    pub force: bool,

    /// Don't delete input files
    #[arg(short = 'k')]
    pub keep: bool,

    /// Compression level [1-9] (default 6)
    #[arg(short = 'L', value_name = "LVL", value_parser = parse_level)]
    pub level: Option<u8>,

    /// Chunk size (default 524288)
    #[arg(short = 's', value_name = "SIZE", value_parser = parse_chunk_size)]
    pub chunk_size: Option<u32>,

    /// Use suffix .SUF instead of .xpack
    #[arg(short = 'S', value_name = "SUF", default_value = DEFAULT_SUFFIX)]
    pub suffix: String,

    /// Files to process; `-` or none means standard input
    pub files: Vec<OsString>,
}

/// Per-file outcome, ranked so `max` picks the final exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Outcome {
    Ok = 0,
    Warning = 2,
    Error = 3,
}

fn warn(context: &str, message: impl std::fmt::Display) {
    eprintln!("xpack: {context}: {message}");
}

/// Entry point shared by the `xpack` and `xunpack` binaries.
pub fn main_entry(argv0_decompress: bool) -> i32 {
    let args = Args::parse();
    run(args, argv0_decompress)
}

/// Run with parsed arguments; returns the process exit status.
pub fn run(mut args: Args, argv0_decompress: bool) -> i32 {
    args.decompress |= argv0_decompress || invoked_as_xunpack();
    let level = args.level_flags.resolve(args.level, 6);
    let chunk_size = args.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);

    let files: Vec<Option<PathBuf>> = if args.files.is_empty() {
        vec![None]
    } else {
        args.files
            .iter()
            .map(|f| {
                if f == "-" {
                    None
                } else {
                    Some(PathBuf::from(f))
                }
            })
            .collect()
    };

    let mut outcome = Outcome::Ok;
    if args.decompress {
        let mut decompressor = Decompressor::new();
        for file in &files {
            let result = decompress_file(&mut decompressor, file.as_deref(), &args);
            outcome = outcome.max(result);
        }
    } else {
        let mut compressor =
            match Compressor::new(chunk_size as usize, CompressionLevel::from_level(level)) {
                Ok(c) => c,
                Err(err) => {
                    warn("setup", err);
                    return 1;
                }
            };
        for file in &files {
            let result = compress_file(&mut compressor, file.as_deref(), &args, chunk_size, level);
            outcome = outcome.max(result);
        }
    }

    match outcome {
        Outcome::Ok => 0,
        Outcome::Warning => 2,
        Outcome::Error => 1,
    }
}

fn invoked_as_xunpack() -> bool {
    std::env::args_os()
        .next()
        .map(PathBuf::from)
        .and_then(|p| p.file_stem().map(|s| s.to_os_string()))
        .is_some_and(|stem| stem == "xunpack")
}

fn display(path: Option<&Path>) -> String {
    match path {
        Some(p) => p.display().to_string(),
        None => "(stdin)".to_string(),
    }
}

/// `path.suffix` appended (compression output name).
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Strip `.suffix` (decompression output name); `None` when absent.
fn without_suffix(path: &Path, suffix: &str) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(&format!(".{suffix}"))?;
    if stem.is_empty() {
        return None;
    }
    Some(path.with_file_name(stem))
}

/// Pre-flight checks on an input file: regular, and not multiply linked
/// unless forced.
fn check_input(path: &Path, metadata: &fs::Metadata, force: bool, in_place: bool) -> Outcome {
    if !metadata.is_file() {
        let kind = if metadata.is_dir() {
            "a directory"
        } else {
            "not a regular file"
        };
        warn(&path.display().to_string(), format!("is {kind} -- skipping"));
        return Outcome::Warning;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        if in_place && !force && metadata.nlink() > 1 {
            warn(
                &path.display().to_string(),
                "has multiple hard links -- skipping (use -f to process anyway)",
            );
            return Outcome::Warning;
        }
    }
    Outcome::Ok
}

/// Copy permissions and timestamps from the input onto the output.
fn restore_metadata(out: &File, metadata: &fs::Metadata, context: &str) {
    if let Err(err) = out.set_permissions(metadata.permissions()) {
        warn(context, format!("unable to preserve mode: {err}"));
    }
    if let Ok(mtime) = metadata.modified() {
        if let Err(err) = out.set_modified(mtime) {
            warn(context, format!("unable to preserve timestamps: {err}"));
        }
    }
}

fn open_output(path: &Path, force: bool) -> io::Result<File> {
    if force {
        File::create(path)
    } else {
        File::options().write(true).create_new(true).open(path)
    }
}

fn compress_file(
    compressor: &mut Compressor,
    path: Option<&Path>,
    args: &Args,
    chunk_size: u32,
    level: u8,
) -> Outcome {
    let context = display(path);

    let out_path = match path {
        Some(p) if !args.to_stdout => {
            if !args.force
                && p.extension()
                    .is_some_and(|e| e.to_str() == Some(args.suffix.as_str()))
            {
                warn(
                    &context,
                    format!("already has .{} suffix -- skipping", args.suffix),
                );
                return Outcome::Warning;
            }
            Some(with_suffix(p, &args.suffix))
        }
        _ => None,
    };

    let mut metadata = None;
    let mut input: Box<dyn Read> = match path {
        Some(p) => {
            let file = match File::open(p) {
                Ok(f) => f,
                Err(err) => {
                    warn(&context, err);
                    return Outcome::Error;
                }
            };
            match file.metadata() {
                Ok(m) => {
                    let check = check_input(p, &m, args.force, out_path.is_some());
                    if check != Outcome::Ok {
                        return check;
                    }
                    metadata = Some(m);
                }
                Err(err) => {
                    warn(&context, err);
                    return Outcome::Error;
                }
            }
            Box::new(file)
        }
        None => Box::new(io::stdin().lock()),
    };

    if out_path.is_none() && !args.force && io::stdout().is_terminal() {
        warn(
            &context,
            "refusing to write compressed data to a terminal; use -f to override (or -h for help)",
        );
        return Outcome::Error;
    }

    let result = match &out_path {
        Some(out) => {
            let mut file = match open_output(out, args.force) {
                Ok(f) => f,
                Err(err) => {
                    warn(&out.display().to_string(), err);
                    return Outcome::Error;
                }
            };
            let r = write_compressed(compressor, &mut input, &mut file, chunk_size, level);
            if r.is_ok() {
                if let Some(m) = &metadata {
                    restore_metadata(&file, m, &out.display().to_string());
                }
            } else {
                let _ = fs::remove_file(out);
            }
            r
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            write_compressed(compressor, &mut input, &mut lock, chunk_size, level)
        }
    };

    match result {
        Ok(()) => {
            if let (Some(p), Some(_)) = (path, &out_path) {
                if !args.keep {
                    if let Err(err) = fs::remove_file(p) {
                        warn(&context, err);
                        return Outcome::Error;
                    }
                }
            }
            Outcome::Ok
        }
        Err(err) => {
            warn(&context, err);
            Outcome::Error
        }
    }
}

fn write_compressed(
    compressor: &mut Compressor,
    input: &mut dyn Read,
    output: &mut dyn Write,
    chunk_size: u32,
    level: u8,
) -> Result<(), ContainerError> {
    FileHeader::new(chunk_size, level).write_to(output)?;
    compress_chunks(compressor, input, output, chunk_size)?;
    output.flush()?;
    Ok(())
}

fn decompress_file(
    decompressor: &mut Decompressor,
    path: Option<&Path>,
    args: &Args,
) -> Outcome {
    let context = display(path);

    let out_path = match path {
        Some(p) if !args.to_stdout => match without_suffix(p, &args.suffix) {
            Some(out) => Some(out),
            None => {
                warn(
                    &context,
                    format!("does not end with the .{} suffix -- skipping", args.suffix),
                );
                return Outcome::Warning;
            }
        },
        _ => None,
    };

    let mut metadata = None;
    let mut input: Box<dyn Read> = match path {
        Some(p) => {
            let file = match File::open(p) {
                Ok(f) => f,
                Err(err) => {
                    warn(&context, err);
                    return Outcome::Error;
                }
            };
            match file.metadata() {
                Ok(m) => {
                    let check = check_input(p, &m, args.force, out_path.is_some());
                    if check != Outcome::Ok {
                        return check;
                    }
                    metadata = Some(m);
                }
                Err(err) => {
                    warn(&context, err);
                    return Outcome::Error;
                }
            }
            Box::new(file)
        }
        None => {
            if !args.force && io::stdin().is_terminal() {
                warn(
                    &context,
                    "refusing to read compressed data from a terminal; use -f to override",
                );
                return Outcome::Error;
            }
            Box::new(io::stdin().lock())
        }
    };

    let result = match &out_path {
        Some(out) => {
            let mut file = match open_output(out, args.force) {
                Ok(f) => f,
                Err(err) => {
                    warn(&out.display().to_string(), err);
                    return Outcome::Error;
                }
            };
            let r = read_compressed(decompressor, &mut input, &mut file);
            if r.is_ok() {
                if let Some(m) = &metadata {
                    restore_metadata(&file, m, &out.display().to_string());
                }
            } else {
                let _ = fs::remove_file(out);
            }
            r
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            read_compressed(decompressor, &mut input, &mut lock)
        }
    };

    match result {
        Ok(()) => {
            if let (Some(p), Some(_)) = (path, &out_path) {
                if !args.keep {
                    if let Err(err) = fs::remove_file(p) {
                        warn(&context, err);
                        return Outcome::Error;
                    }
                }
            }
            Outcome::Ok
        }
        Err(err) => {
            warn(&context, err);
            Outcome::Error
        }
    }
}

fn read_compressed(
    decompressor: &mut Decompressor,
    input: &mut dyn Read,
    output: &mut dyn Write,
) -> Result<(), ContainerError> {
    let header = FileHeader::read_from(input)?;
    decompress_chunks(decompressor, input, output, header.chunk_size)?;
    output.flush()?;
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_flag_resolution() {
        let mut flags = LevelFlags::default();
        assert_eq!(flags.resolve(None, 6), 6);
        flags.l3 = true;
        assert_eq!(flags.resolve(None, 6), 3);
        flags.l9 = true;
        assert_eq!(flags.resolve(None, 6), 9);
        assert_eq!(flags.resolve(Some(2), 6), 2);
    }

    #[test]
    fn test_suffix_handling() {
        let p = Path::new("dir/data.tar");
        assert_eq!(
            with_suffix(p, "xpack"),
            PathBuf::from("dir/data.tar.xpack")
        );
        assert_eq!(
            without_suffix(Path::new("dir/data.tar.xpack"), "xpack"),
            Some(PathBuf::from("dir/data.tar"))
        );
        assert_eq!(without_suffix(Path::new("dir/data.tar"), "xpack"), None);
        assert_eq!(without_suffix(Path::new(".xpack"), "xpack"), None);
    }

    #[test]
    fn test_chunk_size_parser_bounds() {
        assert!(parse_chunk_size("1024").is_ok());
        assert!(parse_chunk_size("524288").is_ok());
        assert!(parse_chunk_size("1023").is_err());
        assert!(parse_chunk_size("67108865").is_err());
        assert!(parse_chunk_size("bogus").is_err());
    }

    #[test]
    fn test_level_parser_bounds() {
        assert!(parse_level("1").is_ok());
        assert!(parse_level("9").is_ok());
        assert!(parse_level("0").is_err());
        assert!(parse_level("10").is_err());
    }

    #[test]
    fn test_args_parse_combined_flags() {
        let args = Args::try_parse_from(["xpack", "-9", "-k", "-c", "file.bin"]).unwrap();
        assert!(args.keep);
        assert!(args.to_stdout);
        assert_eq!(args.level_flags.resolve(args.level, 6), 9);
        assert_eq!(args.files, vec![OsString::from("file.bin")]);
    }
}
