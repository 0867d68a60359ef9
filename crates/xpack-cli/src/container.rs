//! The XPACK file container.
//!
//! A container file is a 16-byte header followed by independently
//! compressed chunks. Each chunk carries its stored and original sizes;
//! equal sizes mean the chunk bytes are raw (the codec declined to shrink
//! them). All integer fields are little-endian.
//!
//! ```text
//! file   := header chunk*
//! header := magic[8] chunk_size:u32 header_size:u16 version:u8 level:u8
//! chunk  := stored_size:u32 original_size:u32 byte[stored_size]
//! ```

use std::io::{Read, Write};

use thiserror::Error;
use xpack::{Compressor, Decompressor};

/// Magic bytes opening every container file.
pub const XPACK_MAGIC: [u8; 8] = *b"XPACK\0\0\0";

/// Size of the fixed file header.
pub const FILE_HEADER_SIZE: usize = 16;

/// Size of a chunk header.
pub const CHUNK_HEADER_SIZE: usize = 8;

/// Supported container format version.
pub const FORMAT_VERSION: u8 = 1;

/// Bounds on the per-file chunk size.
pub const MIN_CHUNK_SIZE: u32 = 1024;
pub const MAX_CHUNK_SIZE: u32 = 67_108_864;

/// Default chunk size used by the tools.
pub const DEFAULT_CHUNK_SIZE: u32 = 524_288;

/// Container-level errors, kept separate from the codec's so the tools
/// can report them with file-name context.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("not in XPACK format")]
    NotXpack,

    #[error("unsupported version ({0})")]
    UnsupportedVersion(u8),

    #[error("incorrect header size ({0})")]
    BadHeaderSize(u16),

    #[error("unsupported chunk size ({0})")]
    BadChunkSize(u32),

    #[error("file corrupt")]
    CorruptChunkHeader,

    #[error("data corrupt")]
    CorruptData(#[source] xpack_core::Error),

    #[error("unexpected end-of-file")]
    UnexpectedEof,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias for container operations.
pub type Result<T> = std::result::Result<T, ContainerError>;

/// The fixed file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub chunk_size: u32,
    pub header_size: u16,
    pub version: u8,
    pub compression_level: u8,
}

impl FileHeader {
    /// Header for a new file.
    pub fn new(chunk_size: u32, compression_level: u8) -> Self {
        Self {
            chunk_size,
            header_size: FILE_HEADER_SIZE as u16,
            version: FORMAT_VERSION,
            compression_level,
        }
    }

    /// Serialize to a writer.
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        let mut buf = [0u8; FILE_HEADER_SIZE];
        buf[..8].copy_from_slice(&XPACK_MAGIC);
        buf[8..12].copy_from_slice(&self.chunk_size.to_le_bytes());
        buf[12..14].copy_from_slice(&self.header_size.to_le_bytes());
        buf[14] = self.version;
        buf[15] = self.compression_level;
        out.write_all(&buf)?;
        Ok(())
    }

    /// Parse and validate from a reader, skipping any extra header bytes
    /// a newer writer may have added.
    pub fn read_from<R: Read + ?Sized>(input: &mut R) -> Result<Self> {
        let mut buf = [0u8; FILE_HEADER_SIZE];
        if read_full(input, &mut buf)? != FILE_HEADER_SIZE {
            return Err(ContainerError::NotXpack);
        }
        if buf[..8] != XPACK_MAGIC {
            return Err(ContainerError::NotXpack);
        }
        let header = Self {
            chunk_size: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
            header_size: u16::from_le_bytes(buf[12..14].try_into().unwrap()),
            version: buf[14],
            compression_level: buf[15],
        };
        if header.version != FORMAT_VERSION {
            return Err(ContainerError::UnsupportedVersion(header.version));
        }
        if usize::from(header.header_size) < FILE_HEADER_SIZE {
            return Err(ContainerError::BadHeaderSize(header.header_size));
        }
        if header.chunk_size < MIN_CHUNK_SIZE || header.chunk_size > MAX_CHUNK_SIZE {
            return Err(ContainerError::BadChunkSize(header.chunk_size));
        }

        // Skip extension bytes.
        let mut extra = usize::from(header.header_size) - FILE_HEADER_SIZE;
        let mut sink = [0u8; 64];
        while extra > 0 {
            let step = extra.min(sink.len());
            if read_full(input, &mut sink[..step])? != step {
                return Err(ContainerError::UnexpectedEof);
            }
            extra -= step;
        }
        Ok(header)
    }
}

/// Read until `buf` is full or the stream ends; returns the bytes read.
pub fn read_full<R: Read + ?Sized>(input: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// Compress `input` into `output` as a sequence of chunks. The file
/// header must already have been written.
pub fn compress_chunks<R: Read + ?Sized, W: Write + ?Sized>(
    compressor: &mut Compressor,
    input: &mut R,
    output: &mut W,
    chunk_size: u32,
) -> Result<()> {
    let chunk_size = chunk_size as usize;
    let mut original = vec![0u8; chunk_size];
    let mut compressed = vec![0u8; chunk_size - 1];

    loop {
        let n = read_full(input, &mut original)?;
        if n == 0 {
            return Ok(());
        }
        let chunk = &original[..n];
        let written = compressor.compress(chunk, &mut compressed[..n - 1]);
        let (stored, stored_size) = if written == 0 {
            (chunk, n)
        } else {
            (&compressed[..written], written)
        };

        let mut header = [0u8; CHUNK_HEADER_SIZE];
        header[..4].copy_from_slice(&(stored_size as u32).to_le_bytes());
        header[4..].copy_from_slice(&(n as u32).to_le_bytes());
        output.write_all(&header)?;
        output.write_all(stored)?;
    }
}

/// Decompress a sequence of chunks from `input` into `output`.
pub fn decompress_chunks<R: Read + ?Sized, W: Write + ?Sized>(
    decompressor: &mut Decompressor,
    input: &mut R,
    output: &mut W,
    chunk_size: u32,
) -> Result<()> {
    let chunk_size = chunk_size as usize;
    let mut stored_buf = vec![0u8; chunk_size];
    let mut original_buf = vec![0u8; chunk_size];

    loop {
        let mut header = [0u8; CHUNK_HEADER_SIZE];
        match read_full(input, &mut header)? {
            0 => return Ok(()),
            CHUNK_HEADER_SIZE => {}
            _ => return Err(ContainerError::UnexpectedEof),
        }
        let stored_size = u32::from_le_bytes(header[..4].try_into().unwrap()) as usize;
        let original_size = u32::from_le_bytes(header[4..].try_into().unwrap()) as usize;

        if original_size < 1
            || original_size > chunk_size
            || stored_size < 1
            || stored_size > original_size
        {
            return Err(ContainerError::CorruptChunkHeader);
        }

        if read_full(input, &mut stored_buf[..stored_size])? != stored_size {
            return Err(ContainerError::UnexpectedEof);
        }

        if stored_size == original_size {
            output.write_all(&stored_buf[..stored_size])?;
        } else {
            decompressor
                .decompress(&stored_buf[..stored_size], &mut original_buf[..original_size])
                .map_err(ContainerError::CorruptData)?;
            output.write_all(&original_buf[..original_size])?;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
