//! The sector-allocation engine: fits catalogue entries whose current byte
//! length may differ from what was recorded when their sidecar was written,
//! relocating and, if necessary, compacting or expanding the disc to make
//! everything fit.

use std::collections::BTreeMap;
use log::{debug,info,warn};
use crate::error::Error;
use crate::model::{DiscModel,FreeSector};
use crate::SECTOR_LEN;

/// What the caller wants the [`Packer`] to try when entries cannot all be
/// placed by relocation alone. Resolving an interactive "ask the operator"
/// choice into one of these two is the CLI front end's job, not the core's
/// (see `resolve_policy` in `cli.rs`) -- the core never touches stdin.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum Policy {
    AlwaysCompact,
    AlwaysExpand,
}

pub struct Packer;

fn span(len: u32) -> usize {
    if len == 0 { 0 } else { (len as usize + SECTOR_LEN - 1) / SECTOR_LEN }
}

impl Packer {
    /// Run the full fit -> relocate -> (compact | expand) pipeline and
    /// return a model whose entries are guaranteed non-overlapping and whose
    /// free-sector map accounts for every remaining sector.
    pub fn pack(mut model: DiscModel, recorded_lengths: &[u32], policy: Policy) -> Result<DiscModel,Error> {
        let mut conflicting = Self::fit(&mut model,recorded_lengths)?;
        if !conflicting.is_empty() {
            conflicting = Self::relocate(&mut model,conflicting);
        }
        if !conflicting.is_empty() {
            // compact() re-lays out every entry from scratch, so its verdict
            // on what still doesn't fit supersedes the stale `conflicting`
            // list -- re-running relocate() against that list afterwards
            // would fight over sectors compact() already assigned.
            conflicting = match policy {
                Policy::AlwaysCompact => {
                    let mut still = Self::compact(&mut model);
                    if !still.is_empty() {
                        Self::expand(&mut model)?;
                        still = Self::compact(&mut model);
                    }
                    still
                },
                Policy::AlwaysExpand => {
                    Self::expand(&mut model)?;
                    let mut still = Self::relocate(&mut model,conflicting);
                    if !still.is_empty() {
                        still = Self::compact(&mut model);
                        if !still.is_empty() {
                            Self::expand(&mut model)?;
                            still = Self::compact(&mut model);
                        }
                    }
                    still
                },
            };
        }
        if !conflicting.is_empty() {
            let names: Vec<String> = conflicting.iter()
                .map(|i| format!("{}.{}",model.entries[*i].dir as char,model.entries[*i].name))
                .collect();
            return Err(Error::PackUnfit(names.join(", ")));
        }
        Ok(model)
    }

    /// Phase 1: per entry, try to keep its previous placement.  Returns the
    /// indices of entries that could not be kept in place and must be
    /// relocated.
    fn fit(model: &mut DiscModel, recorded_lengths: &[u32]) -> Result<Vec<usize>,Error> {
        let mut conflicting = Vec::new();
        for i in 0..model.entries.len() {
            let recorded = recorded_lengths.get(i).copied().unwrap_or(model.entries[i].length);
            let current = model.entries[i].length;
            let old_span = span(recorded);
            let new_span = span(current);
            let start = model.entries[i].start_sector as usize;

            if new_span <= old_span {
                // unchanged, shrunk in place, or shrunk into fewer sectors
                for s in start+new_span .. start+old_span {
                    Self::free_sector(model,s);
                }
                Self::claim(model,i,start,new_span);
                if current != recorded && new_span > 0 {
                    // only a genuine size change needs fresh slack; an untouched
                    // file keeps the exact bytes loaded from its sidecar. The
                    // target sector is still owned by this entry (never freed),
                    // so the new slack must be derived from the entry's own
                    // previous slack, not looked up in free_sectors.
                    Self::recompute_same_span_slack(model,i);
                }
                debug!("{}.{} kept at sector {:03x}",model.entries[i].dir as char,model.entries[i].name,start);
            } else {
                let extra: Vec<usize> = (start+old_span .. start+new_span).collect();
                let all_free = extra.iter().all(|s| Self::is_free(model,*s));
                if all_free {
                    let last_sector = start+new_span-1;
                    Self::recompute_slack(model,i,last_sector);
                    Self::claim(model,i,start,new_span);
                    debug!("{}.{} grew in place to sector {:03x}",model.entries[i].dir as char,model.entries[i].name,start);
                } else {
                    // restore the sectors this entry held before growing; the
                    // last of them keeps the entry's original slack in its
                    // trailing region rather than being zeroed outright
                    let original_slack = model.files[i].slack.clone();
                    for s in start .. start+old_span {
                        if old_span > 0 && s == start+old_span-1 {
                            Self::free_sector_with_slack(model,s,&original_slack);
                        } else {
                            Self::free_sector(model,s);
                        }
                    }
                    conflicting.push(i);
                }
            }
        }
        Ok(conflicting)
    }

    /// Phase 2: relocate conflicting entries, largest first, to the first
    /// contiguous run of free sectors that will hold them.
    fn relocate(model: &mut DiscModel, mut conflicting: Vec<usize>) -> Vec<usize> {
        conflicting.sort_by(|a,b| model.entries[*b].length.cmp(&model.entries[*a].length).then(a.cmp(b)));
        let mut still_conflicting = Vec::new();
        for i in conflicting {
            let needed = span(model.entries[i].length);
            match Self::find_free_run(model,needed) {
                Some(s) => {
                    if needed > 0 {
                        Self::recompute_slack(model,i,s+needed-1);
                    }
                    Self::claim(model,i,s,needed);
                    model.entries[i].start_sector = s as u32;
                    info!("relocated {}.{} to sector {:03x}",model.entries[i].dir as char,model.entries[i].name,s);
                },
                None => still_conflicting.push(i),
            }
        }
        still_conflicting
    }

    /// Scan sectors from 2 upward for a contiguous run of `needed` free
    /// sectors, stopping the scan at the first absent (beyond-physical-image)
    /// sector since allocation cannot cross into unknown territory.
    fn find_free_run(model: &DiscModel, needed: usize) -> Option<usize> {
        if needed == 0 { return Some(2); }
        let mut run_start = 2usize;
        let mut run_len = 0usize;
        for s in 2..model.declared_sectors as usize {
            match model.free_sectors.get(&s) {
                Some(FreeSector::Known(_)) => {
                    if run_len == 0 { run_start = s; }
                    run_len += 1;
                    if run_len == needed { return Some(run_start); }
                },
                _ => { run_len = 0; }
            }
        }
        None
    }

    /// Phase 3a: throw away all placements and re-lay entries back to back
    /// from sector 2, in catalogue order. Returns the indices of entries that
    /// do not fit within `declared_sectors` even after compaction; those
    /// entries are left unplaced (their `start_sector` is stale) rather than
    /// overlapping whatever was placed before them.
    fn compact(model: &mut DiscModel) -> Vec<usize> {
        warn!("compacting disc to close gaps");
        let mut freed: BTreeMap<usize,FreeSector> = std::mem::take(&mut model.free_sectors);
        for entry in &model.entries {
            for s in entry.sector_range() {
                freed.entry(s).or_insert(FreeSector::Known([0u8;SECTOR_LEN]));
            }
        }
        model.free_sectors = freed;

        let mut cursor = 2usize;
        let mut overflow = Vec::new();
        for i in 0..model.entries.len() {
            let needed = span(model.entries[i].length);
            if cursor + needed > model.declared_sectors as usize {
                overflow.push(i);
                continue;
            }
            Self::claim(model,i,cursor,needed);
            cursor += needed;
        }
        overflow
    }

    /// Phase 3b: grow the declared capacity 400 -> 800 sectors, filling the
    /// new region with known zero sectors (and promoting any previously
    /// absent sectors to known zero, since expanding past a cropped image's
    /// physical end means we are now synthesising that region outright).
    fn expand(model: &mut DiscModel) -> Result<(),Error> {
        let new_size = if model.declared_sectors < 400 { 400 }
            else if model.declared_sectors < 800 { 800 }
            else { return Err(Error::PackUnfit("disc already at maximum capacity".into())); };
        info!("expanding disc from {} to {} sectors",model.declared_sectors,new_size);
        for s in 2..model.declared_sectors as usize {
            if let Some(FreeSector::Absent) = model.free_sectors.get(&s) {
                model.free_sectors.insert(s,FreeSector::Known([0u8;SECTOR_LEN]));
            }
        }
        for s in model.declared_sectors as usize .. new_size as usize {
            model.free_sectors.insert(s,FreeSector::Known([0u8;SECTOR_LEN]));
        }
        model.declared_sectors = new_size;
        Ok(())
    }

    fn is_free(model: &DiscModel, sector: usize) -> bool {
        matches!(model.free_sectors.get(&sector),Some(FreeSector::Known(_)))
    }

    fn free_sector(model: &mut DiscModel, sector: usize) {
        model.free_sectors.insert(sector,FreeSector::Known([0u8;SECTOR_LEN]));
    }

    /// Free a sector, but keep `slack` in its trailing bytes instead of
    /// zeroing the whole sector -- used when an entry's last sector is
    /// vacated and the spec requires its original slack to survive.
    fn free_sector_with_slack(model: &mut DiscModel, sector: usize, slack: &[u8]) {
        let mut buf = [0u8;SECTOR_LEN];
        if !slack.is_empty() {
            buf[SECTOR_LEN-slack.len()..].copy_from_slice(slack);
        }
        model.free_sectors.insert(sector,FreeSector::Known(buf));
    }

    fn claim(model: &mut DiscModel, entry_idx: usize, start: usize, needed: usize) {
        model.entries[entry_idx].start_sector = start as u32;
        for s in start .. start+needed {
            model.free_sectors.remove(&s);
        }
    }

    /// Recompute an entry's trailing slack from whatever is currently known
    /// about its *new* last sector -- one it did not own before this move,
    /// so whatever bytes were already sitting there (or zeros, if none are
    /// known) become the slack. Used when an entry moves to a sector it
    /// didn't previously occupy: relocation, and growth into fresh sectors.
    fn recompute_slack(model: &mut DiscModel, entry_idx: usize, last_sector: usize) {
        let len = model.entries[entry_idx].length as usize;
        let used = len % SECTOR_LEN;
        if used == 0 {
            model.files[entry_idx].slack = Vec::new();
            return;
        }
        let slack = match model.free_sectors.get(&last_sector) {
            Some(FreeSector::Known(bytes)) => bytes[used..].to_vec(),
            _ => vec![0u8; SECTOR_LEN - used],
        };
        model.files[entry_idx].slack = slack;
    }

    /// Recompute an entry's trailing slack when its last sector hasn't
    /// changed (same-span resize, or shrunk into fewer sectors). The sector
    /// is still owned by the entry, so there is nothing to look up in
    /// `free_sectors` -- the new slack is derived from the entry's own
    /// previous slack instead.
    fn recompute_same_span_slack(model: &mut DiscModel, entry_idx: usize) {
        let len = model.entries[entry_idx].length as usize;
        let used = len % SECTOR_LEN;
        let required_len = if used == 0 { 0 } else { SECTOR_LEN - used };
        let old_slack = std::mem::take(&mut model.files[entry_idx].slack);
        model.files[entry_idx].slack = Self::build_slack(required_len,&old_slack);
    }

    /// Fit `old_slack` to a trailing region of `required_len` bytes: if the
    /// old slack is shorter (content shrank), pad zeros at the front; if
    /// longer (content grew within the same sector), trim from the front,
    /// keeping the tail closest to the end of the sector.
    fn build_slack(required_len: usize, old_slack: &[u8]) -> Vec<u8> {
        if required_len == 0 {
            return Vec::new();
        }
        if old_slack.len() >= required_len {
            old_slack[old_slack.len()-required_len..].to_vec()
        } else {
            let mut v = vec![0u8; required_len-old_slack.len()];
            v.extend_from_slice(old_slack);
            v
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::Entry;
    use crate::model::FileData;

    fn entry(name: &str, start: u32, length: u32, cat_index: usize) -> Entry {
        Entry { name: name.into(), dir: b'$', locked: false, load_address: 0, exec_address: 0, length, start_sector: start, cat_index }
    }

    fn bare_model(entries: Vec<Entry>, declared_sectors: u32) -> DiscModel {
        let files = entries.iter().map(|e| FileData { payload: vec![0u8; e.length as usize], slack: Vec::new() }).collect();
        let mut free_sectors = BTreeMap::new();
        let mut used = vec![false; declared_sectors as usize];
        for e in &entries {
            for s in e.sector_range() { if s < used.len() { used[s] = true; } }
        }
        for s in 2..declared_sectors as usize {
            if !used[s] { free_sectors.insert(s,FreeSector::Known([0u8;SECTOR_LEN])); }
        }
        DiscModel {
            title: "TEST".into(), serial: 0, boot_option: 0, declared_sectors,
            entries, files, free_sectors, catalogue_tail0: Vec::new(), catalogue_tail1: Vec::new(), trailing: Vec::new(),
        }
    }

    #[test]
    fn unchanged_file_keeps_its_sector() {
        let model = bare_model(vec![entry("a",2,256,0)],10);
        let recorded = vec![256];
        let packed = Packer::pack(model,&recorded,Policy::AlwaysExpand).unwrap();
        assert_eq!(packed.entries[0].start_sector,2);
    }

    #[test]
    fn grown_file_that_fits_keeps_start_and_claims_next_sector() {
        let mut model = bare_model(vec![entry("a",2,256,0)],10);
        model.entries[0].length = 300; // now spans 2 sectors
        model.files[0].payload = vec![0u8;300];
        let recorded = vec![256];
        let packed = Packer::pack(model,&recorded,Policy::AlwaysExpand).unwrap();
        assert_eq!(packed.entries[0].start_sector,2);
        assert_eq!(packed.entries[0].sector_range(),2..4);
    }

    #[test]
    fn conflicting_growth_relocates_to_free_run() {
        // a at sector 2 (1 sector), b at sector 3 (1 sector); a grows to need 2 sectors
        let mut model = bare_model(vec![entry("a",2,256,0),entry("b",3,256,1)],20);
        model.entries[0].length = 300;
        model.files[0].payload = vec![0u8;300];
        let recorded = vec![256,256];
        let packed = Packer::pack(model,&recorded,Policy::AlwaysExpand).unwrap();
        assert_eq!(packed.entries[1].start_sector,3); // b untouched
        assert_eq!(packed.entries[0].start_sector,4); // a relocated past the b/a gap at sector 3
        assert_eq!(packed.entries[0].sector_range().len(),2);
    }

    #[test]
    fn unfittable_disc_expands_capacity() {
        // One huge file that cannot fit on a tiny declared disc triggers expansion.
        let mut model = bare_model(vec![entry("a",2,256,0)],4);
        model.entries[0].length = 256*3; // needs 3 sectors, disc only has 2 usable (2,3)
        model.files[0].payload = vec![0u8;256*3];
        let recorded = vec![256];
        let packed = Packer::pack(model,&recorded,Policy::AlwaysExpand).unwrap();
        assert!(packed.declared_sectors >= 400);
        assert_eq!(packed.entries[0].sector_range().len(),3);
    }

    #[test]
    fn shrunk_within_same_sector_pads_original_slack_with_zeros_at_front() {
        let mut model = bare_model(vec![entry("a",2,200,0)],10);
        model.files[0].slack = vec![0xAA;56]; // original slack for a 200-byte file
        model.entries[0].length = 120; // still one sector, but shorter
        model.files[0].payload = vec![0u8;120];
        let recorded = vec![200];
        let packed = Packer::pack(model,&recorded,Policy::AlwaysExpand).unwrap();
        assert_eq!(packed.entries[0].start_sector,2);
        let slack = &packed.files[0].slack;
        assert_eq!(slack.len(),256-120);
        assert_eq!(&slack[slack.len()-56..],&[0xAA;56][..]);
        assert!(slack[..slack.len()-56].iter().all(|b| *b == 0));
    }

    #[test]
    fn grown_within_same_sector_trims_original_slack_from_front() {
        let mut model = bare_model(vec![entry("a",2,120,0)],10);
        model.files[0].slack = (0..(256-120) as u8).collect(); // distinct bytes, easy to check the tail survives
        model.entries[0].length = 200;
        model.files[0].payload = vec![0u8;200];
        let recorded = vec![120];
        let packed = Packer::pack(model,&recorded,Policy::AlwaysExpand).unwrap();
        assert_eq!(packed.entries[0].start_sector,2);
        let slack = &packed.files[0].slack;
        assert_eq!(slack.len(),256-200);
        let expected_old: Vec<u8> = (0..(256-120) as u8).collect();
        assert_eq!(slack.as_slice(),&expected_old[expected_old.len()-slack.len()..]);
    }

    #[test]
    fn shrunk_into_fewer_sectors_carries_slack_into_new_last_sector() {
        let mut model = bare_model(vec![entry("a",2,300,0)],10); // 2 sectors
        model.files[0].slack = vec![0x55;256-44];
        model.entries[0].length = 200; // now 1 sector
        model.files[0].payload = vec![0u8;200];
        let recorded = vec![300];
        let packed = Packer::pack(model,&recorded,Policy::AlwaysExpand).unwrap();
        assert_eq!(packed.entries[0].sector_range(),2..3);
        let slack = &packed.files[0].slack;
        assert_eq!(slack.len(),256-200);
        // the vacated second sector is zero-filled, not carrying any slack
        assert!(matches!(packed.free_sectors.get(&3),Some(FreeSector::Known(b)) if b.iter().all(|x| *x==0)));
    }

    #[test]
    fn growth_conflict_restore_preserves_slack_in_last_restored_sector() {
        // a at sector 2 (1 sector) with known slack; b at sector 3 blocks a's growth.
        let mut model = bare_model(vec![entry("a",2,256,0),entry("b",3,256,1)],20);
        model.files[0].slack = Vec::new(); // a's length is an exact sector multiple, so no slack before growth
        model.entries[0].length = 300; // grows to 2 sectors, collides with b
        model.files[0].payload = vec![0u8;300];
        let recorded = vec![256,256];
        let packed = Packer::pack(model,&recorded,Policy::AlwaysExpand).unwrap();
        assert_eq!(packed.entries[0].start_sector,4); // relocated past b
        assert_eq!(packed.entries[1].start_sector,3); // b untouched
    }

    #[test]
    fn compact_does_not_reconflict_already_placed_entries() {
        // a (1), d (1), b (grows to 3, originally conflicting), e (1): a tight
        // compacted layout exactly fills the declared sectors (6 usable: 2..8),
        // so a stale relocate() pass after compact() must not be allowed to
        // reshuffle it into an unnecessary expansion or an overlap.
        let mut model = bare_model(vec![entry("a",2,256,0),entry("d",3,256,1),entry("b",4,256,2),entry("e",5,256,3)],8);
        model.entries[2].length = 256*3; // b grows, collides with e
        model.files[2].payload = vec![0u8;256*3];
        let recorded = vec![256,256,256,256];
        let packed = Packer::pack(model,&recorded,Policy::AlwaysCompact).unwrap();
        assert_eq!(packed.declared_sectors,8,"compaction alone should have sufficed, no expansion needed");
        let mut ranges: Vec<_> = packed.entries.iter().map(|e| e.sector_range()).collect();
        ranges.sort_by_key(|r| r.start);
        for w in ranges.windows(2) {
            assert!(w[0].end <= w[1].start,"overlapping ranges: {:?} vs {:?}",w[0],w[1]);
        }
    }
}
