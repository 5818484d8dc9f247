//! `dfskit <input> --cat` (or a bare `<input>` with no other arguments):
//! prints the catalogue listing without writing anything.

use std::path::Path;
use crate::model::DiscModel;
use crate::STDRESULT;

fn render_entry(entry: &crate::catalogue::Entry) -> String {
    format!(
        "{}.{} {} {:06X} {:06X} {:06X} {:03X}",
        entry.dir as char,
        entry.name,
        if entry.locked { "L" } else { " " },
        entry.load_address,
        entry.exec_address,
        entry.length,
        entry.start_sector,
    )
}

pub fn run(model: &DiscModel, verbosity: u8) -> STDRESULT {
    println!("title: {} serial: {} boot: {}",model.title,model.serial,model.boot_option);
    println!("declared sectors: {}",model.declared_sectors);
    for entry in &model.entries {
        println!("{}",render_entry(entry));
    }
    if verbosity >= 2 {
        let unused = model.unused_known_sectors();
        if !unused.is_empty() {
            let hex: Vec<String> = unused.iter().map(|s| format!("{:03x}",s)).collect();
            println!("unused sectors: {}",hex.join(" "));
        }
        let absent: Vec<String> = model.free_sectors.iter()
            .filter(|(_,v)| matches!(v,crate::model::FreeSector::Absent))
            .map(|(s,_)| format!("{:03x}",s))
            .collect();
        if !absent.is_empty() {
            println!("cropped (absent) sectors: {}",absent.join(" "));
        }
    }
    if verbosity >= 3 {
        for (entry,file) in model.entries.iter().zip(model.files.iter()) {
            if !file.slack.is_empty() {
                println!("{}.{} slack: {}",entry.dir as char,entry.name,hex::encode(&file.slack));
            }
        }
        println!("catalogue tail 0: {}",hex::encode(&model.catalogue_tail0));
        println!("catalogue tail 1: {}",hex::encode(&model.catalogue_tail1));
    }
    Ok(())
}

/// Load whichever kind of input path was given (an SSD file or a previously
/// unpacked directory) into a disc model, for commands that only need to
/// read.
pub fn load_model(input: &Path) -> Result<DiscModel,crate::error::Error> {
    if input.is_dir() {
        Ok(crate::dirimage::DirImage::load(input)?.model)
    } else {
        let bytes = std::fs::read(input)?;
        DiscModel::from_ssd_bytes(bytes)
    }
}
