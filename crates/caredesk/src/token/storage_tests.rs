// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn memory_set_get_remove() -> anyhow::Result<()> {
    let storage = MemoryStorage::new();
    assert_eq!(storage.get("accessToken"), None);
    storage.set_all(&[("accessToken", "a"), ("refreshToken", "r")])?;
    assert_eq!(storage.get("accessToken").as_deref(), Some("a"));
    storage.remove("accessToken")?;
    assert_eq!(storage.get("accessToken"), None);
    assert_eq!(storage.get("refreshToken").as_deref(), Some("r"));
    Ok(())
}

#[test]
fn file_storage_survives_reopen() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    {
        let storage = FileStorage::open(dir.path())?;
        storage.set_all(&[("accessToken", "a"), ("refreshToken", "r")])?;
    }
    let reopened = FileStorage::open(dir.path())?;
    assert_eq!(reopened.get("accessToken").as_deref(), Some("a"));
    assert_eq!(reopened.get("refreshToken").as_deref(), Some("r"));
    Ok(())
}

#[test]
fn file_layout_is_plain_string_values() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let storage = FileStorage::open(dir.path())?;
    storage.set("accessToken", "header.payload.sig")?;

    let raw = std::fs::read_to_string(storage.path())?;
    let json: serde_json::Value = serde_json::from_str(&raw)?;
    assert_eq!(json["accessToken"], "header.payload.sig");
    Ok(())
}

#[test]
fn file_remove_persists() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let storage = FileStorage::open(dir.path())?;
    storage.set_all(&[("accessToken", "a"), ("refreshToken", "r")])?;
    storage.remove_all(&["accessToken", "refreshToken"])?;

    let reopened = FileStorage::open(dir.path())?;
    assert_eq!(reopened.get("accessToken"), None);
    assert_eq!(reopened.get("refreshToken"), None);
    Ok(())
}

#[test]
fn removing_absent_keys_skips_write() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let storage = FileStorage::open(dir.path())?;
    storage.remove("accessToken")?;
    assert!(!storage.path().exists());
    Ok(())
}

#[test]
fn corrupt_file_is_discarded() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join(FileStorage::FILE_NAME), "{not json")?;
    let storage = FileStorage::open(dir.path())?;
    assert_eq!(storage.get("accessToken"), None);
    storage.set("accessToken", "fresh")?;
    assert_eq!(FileStorage::open(dir.path())?.get("accessToken").as_deref(), Some("fresh"));
    Ok(())
}

#[test]
fn no_temp_files_left_behind() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let storage = FileStorage::open(dir.path())?;
    for i in 0..5 {
        storage.set("accessToken", &format!("t{i}"))?;
    }
    let names: Vec<String> = std::fs::read_dir(dir.path())?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![FileStorage::FILE_NAME.to_owned()]);
    Ok(())
}

#[cfg(unix)]
#[test]
fn session_file_is_owner_only() -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir()?;
    let storage = FileStorage::open(dir.path())?;
    storage.set("accessToken", "a")?;
    let mode = std::fs::metadata(storage.path())?.permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    Ok(())
}

#[cfg(unix)]
#[test]
fn temp_file_is_created_owner_only() -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("session.json.tmp");
    write_private(&path, b"{}")?;
    let mode = std::fs::metadata(&path)?.permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    Ok(())
}

#[test]
fn failed_rename_removes_temp_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let target = dir.path().join(FileStorage::FILE_NAME);
    std::fs::create_dir(&target)?;
    std::fs::write(target.join("occupied"), "x")?;

    let mut entries = BTreeMap::new();
    entries.insert("accessToken".to_owned(), "a".to_owned());
    assert!(save(&target, &entries).is_err());

    let names: Vec<String> = std::fs::read_dir(dir.path())?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![FileStorage::FILE_NAME.to_owned()]);
    Ok(())
}
