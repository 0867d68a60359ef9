//! Container framing and command-line front ends for XPACK.
//!
//! The codec itself (the `xpack` crate) knows nothing about files: it
//! compresses whole buffers. This crate adds the on-disk container (file
//! header plus independently compressed chunks) and the `xpack`,
//! `xunpack`, and `xpack-bench` binaries around it.

pub mod cli;
pub mod container;
