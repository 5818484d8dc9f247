//! A random-access view over a raw SSD byte stream.
//!
//! Mirrors the flat, sequential-sector layout of a BBC Micro single-sided
//! disc image: sector `i` occupies bytes `[i*256, i*256+256)` of the
//! underlying buffer, with no tracks, skew, or interleave to account for.

use crate::SECTOR_LEN;

/// What is present at a given sector index of the physical input file.
#[derive(Debug,Clone,PartialEq,Eq)]
pub enum SectorData {
    /// The full 256 bytes are present.
    Full([u8;SECTOR_LEN]),
    /// The file ends partway through this sector; only these bytes exist.
    Partial(Vec<u8>),
    /// The file ends before this sector begins.
    Absent,
}

/// Wraps the raw bytes of an `.ssd` file for sector-oriented access.
pub struct SsdImage {
    data: Vec<u8>,
}

impl SsdImage {
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Read sector `i`, reporting whether it is fully, partially, or not
    /// present in the underlying file.
    pub fn sector(&self, i: usize) -> SectorData {
        let start = i * SECTOR_LEN;
        let end = start + SECTOR_LEN;
        if start >= self.data.len() {
            SectorData::Absent
        } else if end <= self.data.len() {
            let mut buf = [0u8;SECTOR_LEN];
            buf.copy_from_slice(&self.data[start..end]);
            SectorData::Full(buf)
        } else {
            SectorData::Partial(self.data[start..].to_vec())
        }
    }

    /// Bytes of the file beyond `declared_sectors * 256`, empty if none.
    pub fn trailing_bytes(&self, declared_sectors: u32) -> &[u8] {
        let end = declared_sectors as usize * SECTOR_LEN;
        if self.data.len() > end { &self.data[end..] } else { &[] }
    }
}

/// Compute the bytes of `sector` that follow the final content byte of a file
/// of length `content_len` ending in that sector. Empty when `content_len` is
/// an exact multiple of [`SECTOR_LEN`].
pub fn slack_in_sector(sector: &[u8;SECTOR_LEN], content_len: usize) -> Vec<u8> {
    let used = content_len % SECTOR_LEN;
    if used == 0 { Vec::new() } else { sector[used..].to_vec() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_absent_beyond_file_end() {
        let img = SsdImage::from_bytes(vec![0u8;300]);
        assert_eq!(img.sector(0),SectorData::Full([0u8;SECTOR_LEN]));
        match img.sector(1) {
            SectorData::Partial(bytes) => assert_eq!(bytes.len(),44),
            other => panic!("expected partial, got {:?}",other),
        }
        assert_eq!(img.sector(2),SectorData::Absent);
    }

    #[test]
    fn trailing_bytes_empty_when_file_matches_declared_size() {
        let img = SsdImage::from_bytes(vec![0u8;512]);
        assert!(img.trailing_bytes(2).is_empty());
    }
}
