//! Writes a [`DiscModel`] out to a directory of payload files and sidecars.

use std::path::Path;
use std::fs;
use log::info;
use crate::error::Error;
use crate::model::DiscModel;
use crate::sidecar;

/// Writes the disc contents into `dir`, which must not already exist or must
/// be empty.
pub struct Unpacker;

impl Unpacker {
    pub fn unpack(model: &DiscModel, dir: &Path) -> Result<(),Error> {
        if dir.exists() {
            let occupied = fs::read_dir(dir)?.next().is_some();
            if occupied {
                return Err(Error::OutputConflict);
            }
        } else {
            fs::create_dir_all(dir)?;
        }

        fs::write(dir.join("..THIS_DISK.inf"),sidecar::disc_inf(model.boot_option,&model.title,model.serial))?;
        let ssd_file_size = model.declared_sectors as usize * crate::SECTOR_LEN + model.trailing.len();
        fs::write(dir.join("..THIS_DISK.inf2"),sidecar::disc_inf2(model.declared_sectors,ssd_file_size,model.entries.len()*8))?;

        let mut empty_inf = String::new();
        empty_inf.push_str(&sidecar::empty_inf_line("After sector 000",&model.catalogue_tail0));
        empty_inf.push_str(&sidecar::empty_inf_line("After sector 001",&model.catalogue_tail1));
        for (sector,content) in model.free_sectors.iter() {
            match content {
                crate::model::FreeSector::Known(bytes) => {
                    empty_inf.push_str(&sidecar::empty_inf_line(&format!("Sector {:03x}",sector),bytes));
                },
                crate::model::FreeSector::Absent => {
                    empty_inf.push_str(&sidecar::empty_inf_absent_line(*sector));
                },
            }
        }
        empty_inf.push_str(&sidecar::empty_inf_line("After disc image",&model.trailing));
        fs::write(dir.join("..Empty.inf"),empty_inf)?;

        for (entry,file) in model.entries.iter().zip(model.files.iter()) {
            let payload_name = format!("{}.{}",entry.dir as char,entry.name);
            fs::write(dir.join(&payload_name),&file.payload)?;
            fs::write(dir.join(format!(".{payload_name}.inf")),sidecar::file_inf(entry))?;
            fs::write(dir.join(format!(".{payload_name}.inf2")),sidecar::file_inf2(entry,&file.slack))?;
            info!("unpacked {payload_name} ({} bytes)",entry.length);
        }
        Ok(())
    }
}
