//! Error types shared across the whole crate.
//!
//! Every fallible operation in this crate returns `Result<T,Error>`, or at the
//! command-line boundary `Result<T,Box<dyn std::error::Error>>` (aliased as
//! [`crate::STDRESULT`]).  Nothing in the library panics on a malformed but
//! otherwise well-formed input; panics are reserved for violations of this
//! crate's own internal invariants.

/// Enumerates the ways a DFS round trip can fail.  The `Display` impl gives the
/// long-form message shown to the user; `log::warn!` is used instead of this
/// type for conditions that are recoverable (see [`Error::FormatDefect`]).
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("input path does not exist")]
    InputMissing,
    #[error("output path exists and is not an empty directory")]
    OutputConflict,
    #[error("format defect: {0}")]
    FormatDefect(String),
    #[error("file `{0}` could not be placed on the disc even after compaction and expansion")]
    PackUnfit(String),
    #[error("relocation of `{0}` ran into occupied or absent sectors")]
    MoveToOccupied(String),
    #[error("catalogue would require more than 31 entries")]
    TooManyEntries,
    #[error("sector {0} is out of range for a disc of {1} sectors")]
    SectorRange(usize,usize),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
