//! # dfskit
//!
//! Round-trip tool for BBC Micro Acorn DFS disc images (`.ssd` single-sided
//! sector dumps).  Unpacking walks an SSD byte stream through
//! [`catalogue`] -> [`model`] -> [`unpack`] to produce a directory of
//! payload files plus sidecar metadata; packing walks the reverse path
//! through [`dirimage`] -> [`pack`] -> [`writer`].
//!
//! The crate is organised the way the format is laid out on disc: a codec
//! for the two catalogue sectors, a thin reader over the raw sector stream,
//! a passive in-memory model, and the allocation engine that reconciles a
//! modified directory tree back onto sectors.

pub mod error;
pub mod catalogue;
pub mod image;
pub mod model;
pub mod sidecar;
pub mod dirimage;
pub mod pack;
pub mod writer;
pub mod unpack;
pub mod commands;
pub mod cli;

/// Bytes in one DFS sector. Fixed by the format; never configurable.
pub const SECTOR_LEN: usize = 256;

pub type DYNERR = Box<dyn std::error::Error>;
pub type STDRESULT = Result<(),DYNERR>;
