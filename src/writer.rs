//! Renders a [`DiscModel`] to the flat byte stream of an `.ssd` file.

use crate::catalogue::Catalogue;
use crate::error::Error;
use crate::model::DiscModel;
use crate::SECTOR_LEN;

pub struct SsdWriter;

impl SsdWriter {
    /// Produce exactly `declared_sectors * 256 + trailing.len()` bytes.
    /// Every sector is determined by the model; none are left uninitialised.
    pub fn write(model: &DiscModel) -> Result<Vec<u8>,Error> {
        let cat = Catalogue {
            title: model.title.clone(),
            serial: model.serial,
            boot_option: model.boot_option,
            declared_sectors: model.declared_sectors,
            entries: model.entries.clone(),
        };
        let (sector0,sector1) = cat.encode(&model.catalogue_tail0,&model.catalogue_tail1)?;

        let mut out = vec![0u8; model.declared_sectors as usize * SECTOR_LEN];
        out[0..SECTOR_LEN].copy_from_slice(&sector0);
        out[SECTOR_LEN..2*SECTOR_LEN].copy_from_slice(&sector1);

        for (entry,file) in model.entries.iter().zip(model.files.iter()) {
            let start = entry.start_sector as usize * SECTOR_LEN;
            out[start .. start+file.payload.len()].copy_from_slice(&file.payload);
            let slack_start = start + file.payload.len();
            out[slack_start .. slack_start+file.slack.len()].copy_from_slice(&file.slack);
        }

        for (sector,content) in model.free_sectors.iter() {
            let offset = sector * SECTOR_LEN;
            if offset + SECTOR_LEN <= out.len() {
                out[offset..offset+SECTOR_LEN].copy_from_slice(&content.bytes());
            } else {
                return Err(Error::SectorRange(*sector,model.declared_sectors as usize));
            }
        }

        out.extend_from_slice(&model.trailing);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::Entry;
    use crate::model::FileData;
    use std::collections::BTreeMap;

    #[test]
    fn writes_exact_declared_length_plus_trailing() {
        let entry = Entry { name: "hi".into(), dir: b'$', locked: false, load_address: 0, exec_address: 0, length: 4, start_sector: 2, cat_index: 0 };
        let file = FileData { payload: vec![1,2,3,4], slack: vec![0u8;252] };
        let mut free_sectors = BTreeMap::new();
        for s in 3..10 { free_sectors.insert(s,crate::model::FreeSector::Known([0u8;SECTOR_LEN])); }
        let model = DiscModel {
            title: "TEST".into(), serial: 0x11, boot_option: 3, declared_sectors: 10,
            entries: vec![entry], files: vec![file], free_sectors,
            catalogue_tail0: vec![0u8;208], catalogue_tail1: vec![0u8;208],
            trailing: vec![0xAA],
        };
        let bytes = SsdWriter::write(&model).unwrap();
        assert_eq!(bytes.len(),10*SECTOR_LEN + 1);
        assert_eq!(bytes[bytes.len()-1],0xAA);
    }
}
