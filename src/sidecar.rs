//! Reading and writing the small text sidecar files that carry DFS metadata
//! alongside the extracted content of an unpacked disc.
//!
//! The format is deliberately tolerant: each line is a comma-separated list
//! of `key: value` pairs (sometimes space- rather than comma-separated, as
//! seen in the wild), unknown keys are logged and ignored, and hex strings of
//! odd length are zero-padded with a warning rather than rejected.

use log::warn;
use crate::catalogue::Entry;

/// Decode a lowercase hex string. An odd-length string is zero-padded on the
/// right and a [`Error::FormatDefect`](crate::error::Error::FormatDefect)-class
/// warning is logged, per the tolerant-parsing contract.
pub fn parse_hex_field(field: &str, context: &str) -> Vec<u8> {
    let mut s = field.trim().to_string();
    if s.len() % 2 != 0 {
        warn!("odd-length hex field in {context}, zero-padding last byte");
        s.push('0');
    }
    match hex::decode(&s) {
        Ok(bytes) => bytes,
        Err(_) => {
            warn!("unparsable hex field in {context}: `{field}`");
            Vec::new()
        }
    }
}

/// Split a sidecar line into `key: value` pairs. Tolerates commas or bare
/// whitespace as the separator between pairs.
pub fn parse_kv_line(line: &str) -> Vec<(String,String)> {
    let mut pairs = Vec::new();
    for chunk in line.split(',') {
        let chunk = chunk.trim();
        if chunk.is_empty() { continue; }
        if let Some((k,v)) = chunk.split_once(':') {
            pairs.push((k.trim().to_string(),v.trim().to_string()));
        } else {
            for piece in chunk.split_whitespace() {
                if let Some((k,v)) = piece.split_once(':') {
                    pairs.push((k.trim().to_string(),v.trim().to_string()));
                } else {
                    warn!("unrecognised sidecar token `{piece}`, ignoring");
                }
            }
        }
    }
    pairs
}

/// `..THIS_DISK.inf`
pub fn disc_inf(boot_option: u8, title: &str, serial: u8) -> String {
    format!("*OPT4,{boot_option}\nT: {title}, S: {serial}\n")
}

/// `..THIS_DISK.inf2`
pub fn disc_inf2(declared_sectors: u32, ssd_file_size: usize, catalogue_len: usize) -> String {
    format!("Sectors:{:03x}, SSD file size:{}, Catalogue len:{}\n",declared_sectors,ssd_file_size,catalogue_len)
}

/// One line of `..Empty.inf` for a named preserved region.
pub fn empty_inf_line(label: &str, bytes: &[u8]) -> String {
    format!("{label}:{}\n",hex::encode(bytes))
}

/// One line of `..Empty.inf` marking a sector that is free but absent from
/// the physical source file (a cropped disc).
pub fn empty_inf_absent_line(sector: usize) -> String {
    format!("Absent sector {:03x}:\n",sector)
}

/// `.<dir>.<name>.inf`
pub fn file_inf(entry: &Entry) -> String {
    let flag = if entry.locked { " F:L" } else { "" };
    format!("{}.{}, L:{:06X}, E:{:06X}{}\n",entry.dir as char,entry.name,entry.load_address,entry.exec_address,flag)
}

/// `.<dir>.<name>.inf2`
pub fn file_inf2(entry: &Entry, after: &[u8]) -> String {
    format!(
        "Start sector:{:03x}\nLength:{}\nCatalogue index:{}\nAfter:{}\n",
        entry.start_sector,entry.length,entry.cat_index,hex::encode(after)
    )
}

/// Parsed contents of a `.inf` sidecar: load/exec addresses and lock flag.
#[derive(Debug,Clone,Default)]
pub struct FileInf {
    pub load_address: u32,
    pub exec_address: u32,
    pub locked: bool,
}

pub fn parse_file_inf(text: &str, context: &str) -> FileInf {
    let mut inf = FileInf::default();
    for line in text.lines() {
        for (k,v) in parse_kv_line(line) {
            match k.as_str() {
                "L" => inf.load_address = u32::from_str_radix(v.trim_start_matches("0x"),16).unwrap_or(0),
                "E" => inf.exec_address = u32::from_str_radix(v.trim_start_matches("0x"),16).unwrap_or(0),
                "F" => inf.locked = v.contains('L'),
                _ => warn!("unrecognised key `{k}` in {context}"),
            }
        }
    }
    inf
}

/// Parsed contents of a `.inf2` sidecar: disc placement metadata.
#[derive(Debug,Clone,Default)]
pub struct FileInf2 {
    pub start_sector: u32,
    pub length: u32,
    pub cat_index: usize,
    pub after: Vec<u8>,
}

pub fn parse_file_inf2(text: &str, context: &str) -> FileInf2 {
    let mut inf = FileInf2::default();
    for line in text.lines() {
        for (k,v) in parse_kv_line(line) {
            match k.as_str() {
                "Start sector" => inf.start_sector = u32::from_str_radix(&v,16).unwrap_or(0),
                "Length" => inf.length = v.parse().unwrap_or(0),
                "Catalogue index" => inf.cat_index = v.parse().unwrap_or(0),
                "After" => inf.after = parse_hex_field(&v,context),
                _ => warn!("unrecognised key `{k}` in {context}"),
            }
        }
    }
    inf
}
