use assert_cmd::cargo;
use predicates::prelude::*;
use std::io::Write;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

fn minimal_ssd() -> Vec<u8> {
    // title "TEST", serial 0x11, boot option 3, 56 declared sectors, one
    // file "!BOOT" in dir "$" spanning sector 2 with 14 bytes of content.
    let mut sector0 = [0u8;256];
    sector0[0..4].copy_from_slice(b"TEST");
    sector0[8..16].copy_from_slice(b"!BOOT  $");
    let mut sector1 = [0u8;256];
    sector1[4] = 0x11;
    sector1[5] = 0x08; // one entry, 8 bytes
    sector1[6] = (3 << 4) | 0; // boot option 3, sector-count-high 0
    sector1[7] = 56;
    sector1[8..16].copy_from_slice(&[0x00,0x20,0x00,0x20,14,0,0,2]); // load/exec 0x2000, length 14, start sector 2
    let mut bytes = vec![0u8; 56*256 + 1];
    bytes[0..256].copy_from_slice(&sector0);
    bytes[256..512].copy_from_slice(&sector1);
    bytes[512..526].copy_from_slice(&[0xAA;14]);
    bytes
}

#[test]
fn bare_input_catalogues_to_stdout() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let ssd_path = dir.path().join("disc.ssd");
    std::fs::File::create(&ssd_path)?.write_all(&minimal_ssd())?;
    let mut cmd = cargo::cargo_bin_cmd!("dfskit");
    cmd.arg(&ssd_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("!BOOT"));
    Ok(())
}

#[test]
fn missing_input_exits_with_code_2() -> STDRESULT {
    let mut cmd = cargo::cargo_bin_cmd!("dfskit");
    cmd.arg("/nonexistent/path/to/disc.ssd")
        .assert()
        .code(2);
    Ok(())
}

#[test]
fn unpack_then_pack_round_trips_unchanged_disc() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let ssd_path = dir.path().join("disc.ssd");
    let original = minimal_ssd();
    std::fs::File::create(&ssd_path)?.write_all(&original)?;
    let unpack_dir = dir.path().join("unpacked");

    let mut cmd = cargo::cargo_bin_cmd!("dfskit");
    cmd.arg(&ssd_path).arg(&unpack_dir).assert().success();

    let repacked_path = dir.path().join("repacked.ssd");
    let mut cmd = cargo::cargo_bin_cmd!("dfskit");
    cmd.arg(&unpack_dir).arg(&repacked_path).assert().success();

    let repacked = std::fs::read(&repacked_path)?;
    assert_eq!(repacked,original);
    Ok(())
}
