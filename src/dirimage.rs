//! Reconstructs a [`DiscModel`] from a directory previously produced by
//! [`crate::unpack::Unpacker`], reading the current bytes of each payload
//! file off disk (which may have changed size since the disc was unpacked).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use log::warn;
use crate::catalogue::Entry;
use crate::error::Error;
use crate::model::{DiscModel,FileData,FreeSector};
use crate::sidecar;

/// The length each entry had when the sidecar tree was produced, indexed the
/// same as [`DiscModel::entries`]. The [`crate::pack::Packer`] compares this
/// against the entry's freshly-measured `length` to classify unchanged,
/// shrunk, or grown files.
pub struct Loaded {
    pub model: DiscModel,
    pub recorded_lengths: Vec<u32>,
}

pub struct DirImage;

impl DirImage {
    pub fn load(dir: &Path) -> Result<Loaded,Error> {
        if !dir.exists() {
            return Err(Error::InputMissing);
        }

        let disc_inf = fs::read_to_string(dir.join("..THIS_DISK.inf"))?;
        let mut boot_option = 0u8;
        let mut title = String::new();
        let mut serial = 0u8;
        for line in disc_inf.lines() {
            if let Some(rest) = line.strip_prefix("*OPT4,") {
                boot_option = rest.trim().parse().unwrap_or(0);
            } else {
                for (k,v) in sidecar::parse_kv_line(line) {
                    match k.as_str() {
                        "T" => title = v,
                        "S" => serial = v.parse().unwrap_or(0),
                        _ => warn!("unrecognised key `{k}` in ..THIS_DISK.inf"),
                    }
                }
            }
        }

        let disc_inf2 = fs::read_to_string(dir.join("..THIS_DISK.inf2"))?;
        let mut declared_sectors = 400u32;
        for (k,v) in sidecar::parse_kv_line(&disc_inf2) {
            if k == "Sectors" {
                declared_sectors = u32::from_str_radix(&v,16).unwrap_or(400);
            }
        }

        let mut catalogue_tail0 = Vec::new();
        let mut catalogue_tail1 = Vec::new();
        let mut free_sectors = BTreeMap::new();
        let mut trailing = Vec::new();
        let empty_inf = fs::read_to_string(dir.join("..Empty.inf")).unwrap_or_default();
        for line in empty_inf.lines() {
            let Some((label,hex)) = line.split_once(':') else { continue };
            let bytes = sidecar::parse_hex_field(hex,"..Empty.inf");
            match label {
                "After sector 000" => catalogue_tail0 = bytes,
                "After sector 001" => catalogue_tail1 = bytes,
                "After disc image" => trailing = bytes,
                _ if label.starts_with("Absent sector ") => {
                    if let Ok(idx) = usize::from_str_radix(label.trim_start_matches("Absent sector "),16) {
                        free_sectors.insert(idx,FreeSector::Absent);
                    }
                },
                _ if label.starts_with("Sector ") => {
                    if let Ok(idx) = usize::from_str_radix(label.trim_start_matches("Sector "),16) {
                        let mut buf = [0u8;crate::SECTOR_LEN];
                        let n = bytes.len().min(crate::SECTOR_LEN);
                        buf[0..n].copy_from_slice(&bytes[0..n]);
                        free_sectors.insert(idx,FreeSector::Known(buf));
                    }
                },
                _ => warn!("unrecognised region `{label}` in ..Empty.inf"),
            }
        }

        let mut loaded: Vec<(Entry,FileData,u32)> = Vec::new();
        for dirent in fs::read_dir(dir)? {
            let dirent = dirent?;
            let name = dirent.file_name().to_string_lossy().to_string();
            if name.starts_with('.') || name == "..THIS_DISK.inf" || name == "..THIS_DISK.inf2" || name == "..Empty.inf" {
                continue;
            }
            let Some((dir_char,file_name)) = name.split_once('.') else {
                warn!("skipping file `{name}` that does not follow `<dir>.<name>` layout");
                continue;
            };
            let payload = fs::read(dir.join(&name))?;
            let inf_path = dir.join(format!(".{name}.inf"));
            let inf2_path = dir.join(format!(".{name}.inf2"));
            let inf = sidecar::parse_file_inf(&fs::read_to_string(&inf_path)?,&name);
            let inf2 = sidecar::parse_file_inf2(&fs::read_to_string(&inf2_path)?,&name);
            let entry = Entry {
                name: file_name.to_string(),
                dir: dir_char.as_bytes().first().copied().unwrap_or(b'$'),
                locked: inf.locked,
                load_address: inf.load_address,
                exec_address: inf.exec_address,
                length: payload.len() as u32,
                start_sector: inf2.start_sector,
                cat_index: inf2.cat_index,
            };
            let file_data = FileData { payload, slack: inf2.after };
            loaded.push((entry,file_data,inf2.length));
        }
        loaded.sort_by_key(|(e,_,_)| e.cat_index);
        if loaded.len() > 31 {
            return Err(Error::TooManyEntries);
        }

        let mut entries = Vec::with_capacity(loaded.len());
        let mut files = Vec::with_capacity(loaded.len());
        let mut recorded_lengths = Vec::with_capacity(loaded.len());
        for (e,f,recorded) in loaded {
            entries.push(e);
            files.push(f);
            recorded_lengths.push(recorded);
        }

        let model = DiscModel {
            title,
            serial,
            boot_option,
            declared_sectors,
            entries,
            files,
            free_sectors,
            catalogue_tail0,
            catalogue_tail1,
            trailing,
        };
        Ok(Loaded { model, recorded_lengths })
    }
}
