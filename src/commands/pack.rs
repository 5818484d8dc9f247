//! `dfskit <unpacked-dir> <ssd-file>`: pack a previously-unpacked directory
//! back into an SSD image.
//!
//! This is also where the "ask the operator" policy choice gets resolved
//! into a concrete [`Policy`], since the core allocation engine
//! ([`crate::pack::Packer`]) never touches standard input.

use std::io::Write as _;
use std::path::Path;
use log::warn;
use crate::dirimage::DirImage;
use crate::pack::{Packer,Policy};
use crate::writer::SsdWriter;
use crate::STDRESULT;

/// Decide whether to compact or expand when sectors run out, prompting the
/// operator if stdin is a terminal and defaulting to expansion otherwise.
pub fn resolve_policy() -> Policy {
    if atty::is(atty::Stream::Stdin) {
        print!("disc is full: (c)ompact existing files, or (e)xpand capacity? [e] ");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line).is_ok() && line.trim().eq_ignore_ascii_case("c") {
            return Policy::AlwaysCompact;
        }
        Policy::AlwaysExpand
    } else {
        warn!("no controlling terminal, defaulting to expand-capacity policy");
        Policy::AlwaysExpand
    }
}

pub fn run(input: &Path, output: &Path) -> STDRESULT {
    let loaded = DirImage::load(input)?;
    let policy = resolve_policy();
    let packed = Packer::pack(loaded.model,&loaded.recorded_lengths,policy)?;
    let bytes = SsdWriter::write(&packed)?;
    std::fs::write(output,&bytes)?;
    log::info!("packed {} files into {} ({} bytes)",packed.entries.len(),output.display(),bytes.len());
    Ok(())
}
