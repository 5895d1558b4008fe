use assert_cmd::Command;
use predicates::prelude::*;

fn ozxcheck() -> Command {
    Command::cargo_bin("ozxcheck").unwrap()
}

#[test]
fn test_help_flag() {
    ozxcheck()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("OME-Zarr"))
        .stdout(predicate::str::contains("--generate"));
}

#[test]
fn test_no_args_shows_usage() {
    ozxcheck()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_generate_then_validate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fixture.ozx");

    ozxcheck()
        .arg("--generate")
        .arg(&path)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("req-single-hierarchy"))
        .stdout(predicate::str::contains("conformant (9 rules)"));
    assert!(path.exists());

    // the written file validates on its own too
    ozxcheck().arg(&path).assert().code(0);
}

#[test]
fn test_generate_refuses_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taken.ozx");
    std::fs::write(&path, b"already here").unwrap();

    ozxcheck()
        .arg("--generate")
        .arg(&path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("File already exists"));
    assert_eq!(std::fs::read(&path).unwrap(), b"already here");
}

#[test]
fn test_failed_recommendation_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flat.ozx");

    ozxcheck()
        .args(["--generate", "--no-shards", "--deflate", "6"])
        .arg(&path)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("not conformant (2 of 9 rules failed)"));
}

#[test]
fn test_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("image.ozx");
    ozxcheck().arg("--generate").arg(&path).assert().success();

    let output = ozxcheck().arg("--json").arg(&path).assert().success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(report["conformant"], true);
    let rules = report["rules"].as_array().unwrap();
    assert_eq!(rules.len(), 9);
    assert_eq!(rules[0]["id"], "req-single-hierarchy");
    assert_eq!(rules[8]["id"], "rec-extension");
    assert!(rules.iter().all(|r| r["outcome"] == "pass"));
}

#[test]
fn test_quiet_prints_nothing_when_conformant() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("image.ozx");
    ozxcheck().arg("--generate").arg(&path).assert().success();

    ozxcheck()
        .arg("-q")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_not_a_zip_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.ozx");
    std::fs::write(&path, "plain text, not an archive").unwrap();

    ozxcheck()
        .arg(&path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Format error"));
}

#[test]
fn test_missing_file_is_an_error() {
    ozxcheck()
        .arg("/nonexistent/path/image.ozx")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_fixture_options_require_generate() {
    ozxcheck()
        .args(["--no-zip64", "image.ozx"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--generate"));
}

/// One stored `zarr.json` whose central directory claims `1 << 62` bytes
/// through a ZIP64 extra field.
fn archive_with_oversized_entry() -> Vec<u8> {
    use byteorder::{LittleEndian, WriteBytesExt};

    let name = b"zarr.json";
    let data = b"{}";
    let mut out = Vec::new();
    out.extend_from_slice(b"PK\x03\x04");
    for value in [45u16, 0, 0, 0, 0] {
        out.write_u16::<LittleEndian>(value).unwrap();
    }
    out.write_u32::<LittleEndian>(0).unwrap();
    out.write_u32::<LittleEndian>(data.len() as u32).unwrap();
    out.write_u32::<LittleEndian>(data.len() as u32).unwrap();
    out.write_u16::<LittleEndian>(name.len() as u16).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.extend_from_slice(name);
    out.extend_from_slice(data);

    let cd_offset = out.len() as u32;
    out.extend_from_slice(b"PK\x01\x02");
    for value in [45u16, 45, 0, 0, 0, 0] {
        out.write_u16::<LittleEndian>(value).unwrap();
    }
    out.write_u32::<LittleEndian>(0).unwrap();
    out.write_u32::<LittleEndian>(0xFFFFFFFF).unwrap();
    out.write_u32::<LittleEndian>(0xFFFFFFFF).unwrap();
    out.write_u16::<LittleEndian>(name.len() as u16).unwrap();
    out.write_u16::<LittleEndian>(20).unwrap();
    for value in [0u16, 0, 0] {
        out.write_u16::<LittleEndian>(value).unwrap();
    }
    out.write_u32::<LittleEndian>(0).unwrap();
    out.write_u32::<LittleEndian>(0).unwrap();
    out.extend_from_slice(name);
    out.write_u16::<LittleEndian>(0x0001).unwrap();
    out.write_u16::<LittleEndian>(16).unwrap();
    out.write_u64::<LittleEndian>(1 << 62).unwrap();
    out.write_u64::<LittleEndian>(1 << 62).unwrap();
    let cd_size = out.len() as u32 - cd_offset;

    out.extend_from_slice(b"PK\x05\x06");
    for value in [0u16, 0, 1, 1] {
        out.write_u16::<LittleEndian>(value).unwrap();
    }
    out.write_u32::<LittleEndian>(cd_size).unwrap();
    out.write_u32::<LittleEndian>(cd_offset).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out
}

#[test]
fn test_oversized_entry_is_a_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("huge.ozx");
    std::fs::write(&path, archive_with_oversized_entry()).unwrap();

    ozxcheck()
        .arg(&path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Format error"));
}
