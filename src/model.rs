//! The in-memory disc volume: a passive container built by either
//! [`crate::unpack`]'s reader half or [`crate::dirimage`], and consumed by
//! [`crate::pack::Packer`], [`crate::writer::SsdWriter`], and
//! [`crate::unpack::Unpacker`].

use std::collections::BTreeMap;
use crate::catalogue::{Catalogue,Entry};
use crate::image::{SsdImage,SectorData,slack_in_sector};
use crate::error::Error;
use crate::SECTOR_LEN;

/// Content of a sector not currently owned by any file.
#[derive(Debug,Clone,PartialEq,Eq)]
pub enum FreeSector {
    /// Present in the source and preserved verbatim.
    Known([u8;SECTOR_LEN]),
    /// Beyond the physical extent of the source; synthesised as zeros when
    /// the disc is later written or expanded.
    Absent,
}

impl FreeSector {
    pub fn bytes(&self) -> [u8;SECTOR_LEN] {
        match self {
            FreeSector::Known(b) => *b,
            FreeSector::Absent => [0u8;SECTOR_LEN],
        }
    }
}

/// A file's content plus the bytes that trail it within its last sector.
#[derive(Debug,Clone,Default)]
pub struct FileData {
    pub payload: Vec<u8>,
    pub slack: Vec<u8>,
}

/// The full decoded (or reconstructed) state of a DFS volume.
#[derive(Debug,Clone)]
pub struct DiscModel {
    pub title: String,
    pub serial: u8,
    pub boot_option: u8,
    pub declared_sectors: u32,
    /// Catalogue entries in on-disc order; parallel to `files`.
    pub entries: Vec<Entry>,
    /// File content, one per entry, same index as `entries`.
    pub files: Vec<FileData>,
    /// Sectors `>= 2` not owned by any entry.
    pub free_sectors: BTreeMap<usize,FreeSector>,
    /// Bytes after the last entry's slot in sector 0.
    pub catalogue_tail0: Vec<u8>,
    /// Bytes after the last entry's slot in sector 1.
    pub catalogue_tail1: Vec<u8>,
    /// Bytes beyond `declared_sectors * 256`.
    pub trailing: Vec<u8>,
}

impl DiscModel {
    /// Ascending indices of sectors `>= 2` that are free and known
    /// (backed by real bytes, not merely assumed absent).
    pub fn unused_known_sectors(&self) -> Vec<usize> {
        self.free_sectors.iter()
            .filter(|(_,v)| matches!(v,FreeSector::Known(_)))
            .map(|(k,_)| *k)
            .collect()
    }

    /// True if every declared sector is accounted for by either a file or
    /// the free-sector map (no gaps).
    pub fn is_fully_mapped(&self) -> bool {
        let mut owned = vec![false; self.declared_sectors as usize];
        for entry in &self.entries {
            for s in entry.sector_range() {
                if s < owned.len() { owned[s] = true; }
            }
        }
        for s in 2..owned.len() {
            if !owned[s] && !self.free_sectors.contains_key(&s) {
                return false;
            }
        }
        true
    }

    /// Decode a raw SSD byte stream into a volume model.
    pub fn from_ssd_bytes(data: Vec<u8>) -> Result<DiscModel,Error> {
        let image = SsdImage::from_bytes(data);
        let sector0 = match image.sector(0) {
            SectorData::Full(b) => b,
            _ => return Err(Error::FormatDefect("disc is shorter than one sector".into())),
        };
        let sector1 = match image.sector(1) {
            SectorData::Full(b) => b,
            _ => return Err(Error::FormatDefect("disc is shorter than two sectors".into())),
        };
        let cat = Catalogue::decode(&sector0,&sector1)?;
        let tail_start = 8 + cat.entries.len()*8;
        let catalogue_tail0 = sector0[tail_start..].to_vec();
        let catalogue_tail1 = sector1[tail_start..].to_vec();

        let mut files = Vec::with_capacity(cat.entries.len());
        for entry in &cat.entries {
            let span = entry.sector_range();
            let mut payload = Vec::with_capacity(entry.length as usize);
            let mut slack = Vec::new();
            for (i,sector_idx) in span.clone().enumerate() {
                match image.sector(sector_idx) {
                    SectorData::Full(buf) => {
                        let is_last = i + 1 == span.len();
                        if is_last {
                            let used_in_last = entry.length as usize - i*SECTOR_LEN;
                            payload.extend_from_slice(&buf[0..used_in_last]);
                            slack = slack_in_sector(&buf,entry.length as usize);
                        } else {
                            payload.extend_from_slice(&buf);
                        }
                    },
                    SectorData::Partial(bytes) => payload.extend_from_slice(&bytes),
                    SectorData::Absent => {},
                }
            }
            files.push(FileData { payload, slack });
        }

        let mut owned = vec![false; cat.declared_sectors as usize];
        for entry in &cat.entries {
            for s in entry.sector_range() {
                if s < owned.len() { owned[s] = true; }
            }
        }
        let mut free_sectors = BTreeMap::new();
        for s in 2..cat.declared_sectors as usize {
            if owned[s] { continue; }
            let content = match image.sector(s) {
                SectorData::Full(buf) => FreeSector::Known(buf),
                SectorData::Partial(bytes) => {
                    let mut buf = [0u8;SECTOR_LEN];
                    buf[0..bytes.len()].copy_from_slice(&bytes);
                    FreeSector::Known(buf)
                },
                SectorData::Absent => FreeSector::Absent,
            };
            free_sectors.insert(s,content);
        }

        let trailing = image.trailing_bytes(cat.declared_sectors).to_vec();

        Ok(DiscModel {
            title: cat.title,
            serial: cat.serial,
            boot_option: cat.boot_option,
            declared_sectors: cat.declared_sectors,
            entries: cat.entries,
            files,
            free_sectors,
            catalogue_tail0,
            catalogue_tail1,
            trailing,
        })
    }
}
