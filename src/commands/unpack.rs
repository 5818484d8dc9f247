//! `dfskit <ssd-file> <output-dir>`: unpack an SSD image into a directory.

use std::path::Path;
use crate::model::DiscModel;
use crate::unpack::Unpacker;
use crate::STDRESULT;

pub fn run(input: &Path, output: &Path) -> STDRESULT {
    let bytes = std::fs::read(input)?;
    let model = DiscModel::from_ssd_bytes(bytes)?;
    Unpacker::unpack(&model,output)?;
    log::info!("unpacked {} files to {}",model.entries.len(),output.display());
    Ok(())
}
