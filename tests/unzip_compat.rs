use std::io::Cursor;
use std::process::Command;
use tempfile::tempdir;

use zipwright::model::{DataSource, ZipEntry, ZipModel};
use zipwright::write::write_archive;

// Writes a ZIP using the library and then calls `unzip -t` to verify
// compatibility. If `unzip` is not present on the system, the test is
// skipped.
#[test]
fn unzip_compatibility() {
    let check = Command::new("unzip").arg("-v").output();
    if check.is_err() {
        eprintln!("skipping test: `unzip` not found");
        return;
    }

    let dir = tempdir().unwrap();
    let zip_path = dir.path().join("compat.zip");

    let mut model = ZipModel::new();
    model
        .add(
            ZipEntry::new_file("hello.txt", DataSource::FromBytes(b"hello from test".to_vec())),
            false,
        )
        .unwrap();
    model
        .add(
            ZipEntry::new_file("big.bin", DataSource::FromBytes(vec![0u8; 1024 * 1024])),
            false,
        )
        .unwrap();

    let mut buf = Cursor::new(Vec::new());
    write_archive(model, &mut buf, None).unwrap();
    std::fs::write(&zip_path, buf.into_inner()).unwrap();

    let output = Command::new("unzip")
        .arg("-t")
        .arg(&zip_path)
        .output()
        .expect("failed to run unzip");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(
        output.status.success(),
        "unzip reported failure: {} {}",
        stdout,
        stderr
    );
}
