//! Encoding and decoding of the two DFS catalogue sectors.
//!
//! Sector 0 holds the first 8 bytes of the title followed by one 8-byte name
//! block per entry; sector 1 holds the remaining title bytes, the serial
//! number, the packed lengths, the disc-level boot option / sector count, and
//! one 8-byte attribute block per entry.  See `SPEC_FULL.md` section 4.1 for
//! the bit layout; this module is a literal transcription of it.

use crate::error::Error;
use crate::SECTOR_LEN;

/// One catalogued file.
#[derive(Debug,Clone,PartialEq,Eq)]
pub struct Entry {
    pub name: String,
    pub dir: u8,
    pub locked: bool,
    pub load_address: u32,
    pub exec_address: u32,
    pub length: u32,
    pub start_sector: u32,
    pub cat_index: usize,
}

/// Sign-extend a 2-bit high field per the BBC DFS convention: `0b11` means
/// the true high byte is `0xFF`, any other value is the high byte itself.
fn high2_to_byte(high2: u8) -> u8 {
    if high2 == 0b11 { 0xFF } else { high2 }
}

/// Inverse of [`high2_to_byte`].
fn byte_to_high2(high_byte: u8) -> u8 {
    if high_byte == 0xFF { 0b11 } else { high_byte & 0x3 }
}

impl Entry {
    fn decode(name_block: &[u8;8], attr_block: &[u8;8], cat_index: usize) -> Entry {
        let name = String::from_utf8_lossy(&name_block[0..7]).trim_end().to_string();
        let dir = name_block[7] & 0x7f;
        let locked = name_block[7] & 0x80 != 0;
        let pack = attr_block[6];
        let load_hi2 = (pack >> 2) & 0x3;
        let exec_hi2 = (pack >> 6) & 0x3;
        let len_hi2 = (pack >> 4) & 0x3;
        let start_hi2 = pack & 0x3;
        let load_address = ((high2_to_byte(load_hi2) as u32) << 16)
            | ((attr_block[1] as u32) << 8) | (attr_block[0] as u32);
        let exec_address = ((high2_to_byte(exec_hi2) as u32) << 16)
            | ((attr_block[3] as u32) << 8) | (attr_block[2] as u32);
        let length = ((len_hi2 as u32) << 16) | ((attr_block[5] as u32) << 8) | (attr_block[4] as u32);
        let start_sector = ((start_hi2 as u32) << 8) | (attr_block[7] as u32);
        Entry { name, dir, locked, load_address, exec_address, length, start_sector, cat_index }
    }

    fn encode_name_block(&self) -> [u8;8] {
        let mut block = [b' ';8];
        let bytes = self.name.as_bytes();
        let n = bytes.len().min(7);
        block[0..n].copy_from_slice(&bytes[0..n]);
        block[7] = (self.dir & 0x7f) | if self.locked { 0x80 } else { 0 };
        block
    }

    fn encode_attr_block(&self) -> [u8;8] {
        let load_hi2 = byte_to_high2(((self.load_address >> 16) & 0xFF) as u8);
        let exec_hi2 = byte_to_high2(((self.exec_address >> 16) & 0xFF) as u8);
        let len_hi2 = ((self.length >> 16) & 0x3) as u8;
        let start_hi2 = ((self.start_sector >> 8) & 0x3) as u8;
        let pack = (exec_hi2 << 6) | (len_hi2 << 4) | (load_hi2 << 2) | start_hi2;
        [
            (self.load_address & 0xFF) as u8,
            ((self.load_address >> 8) & 0xFF) as u8,
            (self.exec_address & 0xFF) as u8,
            ((self.exec_address >> 8) & 0xFF) as u8,
            (self.length & 0xFF) as u8,
            ((self.length >> 8) & 0xFF) as u8,
            pack,
            (self.start_sector & 0xFF) as u8,
        ]
    }

    /// Number of 256-byte sectors this entry's content occupies, 0 for an
    /// empty file.
    pub fn sector_span(&self) -> usize {
        if self.length == 0 { 0 } else { ((self.length as usize) + SECTOR_LEN - 1) / SECTOR_LEN }
    }

    /// Ascending sector indices owned by this entry's content.
    pub fn sector_range(&self) -> std::ops::Range<usize> {
        let start = self.start_sector as usize;
        start..start + self.sector_span()
    }
}

/// The decoded contents of sectors 0 and 1.
#[derive(Debug,Clone)]
pub struct Catalogue {
    pub title: String,
    pub serial: u8,
    pub boot_option: u8,
    pub declared_sectors: u32,
    pub entries: Vec<Entry>,
}

impl Catalogue {
    /// Decode sectors 0 and 1 (each must be exactly [`SECTOR_LEN`] bytes).
    pub fn decode(sector0: &[u8], sector1: &[u8]) -> Result<Catalogue,Error> {
        if sector0.len() != SECTOR_LEN || sector1.len() != SECTOR_LEN {
            return Err(Error::FormatDefect("catalogue sector is not 256 bytes".into()));
        }
        let mut title = String::new();
        title.push_str(&String::from_utf8_lossy(&sector0[0..8]));
        title.push_str(&String::from_utf8_lossy(&sector1[0..4]));
        let title = title.trim_end().to_string();
        let serial = sector1[4];
        let cat_bytes = (sector1[5] & 0xFC) as usize;
        let n_entries = cat_bytes / 8;
        if n_entries > 31 {
            return Err(Error::TooManyEntries);
        }
        let byte6 = sector1[6];
        let boot_option = (byte6 & 0xF0) >> 4;
        let sectors_hi = (byte6 & 0x07) as u32;
        let declared_sectors = (sectors_hi << 8) | (sector1[7] as u32);
        let mut entries = Vec::with_capacity(n_entries);
        for i in 0..n_entries {
            let mut name_block = [0u8;8];
            name_block.copy_from_slice(&sector0[8 + i*8 .. 16 + i*8]);
            let mut attr_block = [0u8;8];
            attr_block.copy_from_slice(&sector1[8 + i*8 .. 16 + i*8]);
            entries.push(Entry::decode(&name_block,&attr_block,i));
        }
        Ok(Catalogue { title, serial, boot_option, declared_sectors, entries })
    }

    /// Encode into a pair of 256-byte sectors.  `tail0`/`tail1` are the bytes
    /// that should fill the unused region after the last entry's slot,
    /// preserved verbatim by the caller across a round trip.
    pub fn encode(&self, tail0: &[u8], tail1: &[u8]) -> Result<([u8;SECTOR_LEN],[u8;SECTOR_LEN]),Error> {
        if self.entries.len() > 31 {
            return Err(Error::TooManyEntries);
        }
        let mut sector0 = [0u8;SECTOR_LEN];
        let mut sector1 = [0u8;SECTOR_LEN];
        let title_bytes: Vec<u8> = self.title.bytes().chain(std::iter::repeat(b' ')).take(12).collect();
        sector0[0..8].copy_from_slice(&title_bytes[0..8]);
        sector1[0..4].copy_from_slice(&title_bytes[8..12]);
        sector1[4] = self.serial;
        let cat_bytes = (self.entries.len() * 8) as u8;
        sector1[5] = cat_bytes & 0xFC;
        let sectors_hi = ((self.declared_sectors >> 8) & 0x07) as u8;
        sector1[6] = (self.boot_option << 4) | sectors_hi;
        sector1[7] = (self.declared_sectors & 0xFF) as u8;
        for (i,entry) in self.entries.iter().enumerate() {
            let name_block = entry.encode_name_block();
            let attr_block = entry.encode_attr_block();
            sector0[8+i*8 .. 16+i*8].copy_from_slice(&name_block);
            sector1[8+i*8 .. 16+i*8].copy_from_slice(&attr_block);
        }
        let tail_start = 8 + self.entries.len()*8;
        let n0 = tail0.len().min(SECTOR_LEN - tail_start);
        sector0[tail_start..tail_start+n0].copy_from_slice(&tail0[0..n0]);
        let n1 = tail1.len().min(SECTOR_LEN - tail_start);
        sector1[tail_start..tail_start+n1].copy_from_slice(&tail1[0..n1]);
        Ok((sector0,sector1))
    }

    /// Byte length of the unused tail in each catalogue sector, i.e. the
    /// region after the last entry's slot.
    pub fn tail_len(&self) -> usize {
        SECTOR_LEN - (8 + self.entries.len()*8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> Entry {
        Entry {
            name: "estfile".to_string(),
            dir: b'T',
            locked: true,
            load_address: 0x1000,
            exec_address: 0x1100,
            length: 0x1D0,
            start_sector: 0x040,
            cat_index: 2,
        }
    }

    #[test]
    fn high_bit_round_trip() {
        let mut e = sample_entry();
        e.load_address = 0xFF1900;
        let attr = e.encode_attr_block();
        let decoded = Entry::decode(&e.encode_name_block(),&attr,e.cat_index);
        assert_eq!(decoded.load_address,0xFF1900);
    }

    #[test]
    fn attribute_byte_encode_decode_round_trip() {
        let e = sample_entry();
        let name_block = e.encode_name_block();
        let attr_block = e.encode_attr_block();
        let decoded = Entry::decode(&name_block,&attr_block,e.cat_index);
        assert_eq!(decoded.name,e.name);
        assert_eq!(decoded.dir,e.dir);
        assert_eq!(decoded.locked,e.locked);
        assert_eq!(decoded.load_address,e.load_address);
        assert_eq!(decoded.exec_address,e.exec_address);
        assert_eq!(decoded.length,e.length);
        assert_eq!(decoded.start_sector,e.start_sector);
    }

    #[test]
    fn boot_option_extraction_uses_corrected_precedence() {
        // byte6 = 0b0011_0101 -> boot option should be 0b0011 = 3, not 0b0001
        let byte6: u8 = 0b0011_0101;
        let boot_option = (byte6 & 0xF0) >> 4;
        assert_eq!(boot_option,3);
    }

    #[test]
    fn too_many_entries_is_rejected() {
        let mut cat = Catalogue {
            title: "TEST".into(), serial: 0x11, boot_option: 3, declared_sectors: 800,
            entries: Vec::new(),
        };
        for i in 0..32 {
            let mut e = sample_entry();
            e.cat_index = i;
            cat.entries.push(e);
        }
        assert!(cat.encode(&[],&[]).is_err());
    }
}
