use std::process::Command;
use tempfile::tempdir;

fn bin() -> String {
    env!("CARGO_BIN_EXE_xdelta").to_string()
}

#[test]
fn cli_create_apply_roundtrip() {
    let dir = tempdir().unwrap();
    let old = dir.path().join("old.bin");
    let new = dir.path().join("new.bin");
    let patch = dir.path().join("patch.xdlt");
    let output = dir.path().join("output.bin");

    std::fs::write(&old, b"abcde12345abcde12345").unwrap();
    std::fs::write(&new, b"abcdeXXXXXabcde12345!").unwrap();

    let st = Command::new(bin())
        .args(["create", "--block-size", "5"])
        .arg(&old)
        .arg(&new)
        .arg(&patch)
        .status()
        .unwrap();
    assert!(st.success());

    let st = Command::new(bin())
        .arg("apply")
        .arg(&old)
        .arg(&patch)
        .arg(&output)
        .status()
        .unwrap();
    assert!(st.success());
    assert_eq!(
        std::fs::read(&output).unwrap(),
        std::fs::read(&new).unwrap()
    );
}

#[test]
fn cli_refuses_overwrite_without_force() {
    let dir = tempdir().unwrap();
    let old = dir.path().join("old.bin");
    let new = dir.path().join("new.bin");
    let patch = dir.path().join("patch.xdlt");
    std::fs::write(&old, b"old").unwrap();
    std::fs::write(&new, b"new").unwrap();
    std::fs::write(&patch, b"keep me").unwrap();

    let out = Command::new(bin())
        .arg("create")
        .arg(&old)
        .arg(&new)
        .arg(&patch)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.starts_with("xdelta: "), "{stderr}");
    assert_eq!(std::fs::read(&patch).unwrap(), b"keep me");

    let st = Command::new(bin())
        .arg("-f")
        .arg("create")
        .arg(&old)
        .arg(&new)
        .arg(&patch)
        .status()
        .unwrap();
    assert!(st.success());
    assert_eq!(&std::fs::read(&patch).unwrap()[..4], b"XDLT");
}

#[test]
fn cli_corrupt_patch_fails_without_output() {
    let dir = tempdir().unwrap();
    let old = dir.path().join("old.bin");
    let new = dir.path().join("new.bin");
    let patch = dir.path().join("patch.xdlt");
    let output = dir.path().join("output.bin");
    std::fs::write(&old, b"hello").unwrap();
    std::fs::write(&new, b"hello, world").unwrap();

    let st = Command::new(bin())
        .arg("create")
        .arg(&old)
        .arg(&new)
        .arg(&patch)
        .status()
        .unwrap();
    assert!(st.success());

    let mut bytes = std::fs::read(&patch).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    std::fs::write(&patch, &bytes).unwrap();

    let out = Command::new(bin())
        .arg("apply")
        .arg(&old)
        .arg(&patch)
        .arg(&output)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("checksum mismatch"), "{stderr}");
    assert!(!output.exists());
}

#[test]
fn cli_json_stats() {
    let dir = tempdir().unwrap();
    let old = dir.path().join("old.bin");
    let new = dir.path().join("new.bin");
    let patch = dir.path().join("patch.xdlt");
    std::fs::write(&old, vec![7u8; 10_000]).unwrap();
    std::fs::write(&new, vec![7u8; 10_000]).unwrap();

    let out = Command::new(bin())
        .args(["--json", "create", "-b", "1K"])
        .arg(&old)
        .arg(&new)
        .arg(&patch)
        .output()
        .unwrap();
    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_slice(&out.stderr).unwrap();
    assert_eq!(json["command"], "create");
    assert_eq!(json["block_size"], 1024);
    assert_eq!(json["new_size"], 10_000);
    assert_eq!(json["instructions"], 1);
}

#[test]
fn cli_missing_input_reports_error() {
    let dir = tempdir().unwrap();
    let out = Command::new(bin())
        .arg("apply")
        .arg(dir.path().join("nope.bin"))
        .arg(dir.path().join("nope.xdlt"))
        .arg(dir.path().join("out.bin"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).starts_with("xdelta: I/O error"));
}
