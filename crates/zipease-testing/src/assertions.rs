//! Common assertions for zipease testing

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;
use walkdir::WalkDir;

/// Regular files below `dir`, keyed by `/`-joined relative path, with their contents
pub fn collect_relative_files(dir: &Path) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut files = BTreeMap::new();

    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(dir)?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        files.insert(name, std::fs::read(entry.path())?);
    }

    Ok(files)
}

/// Asserts that two directories hold the same regular files with the same contents
pub fn assert_dirs_equal(dir1: &Path, dir2: &Path) -> Result<()> {
    let files1 = collect_relative_files(dir1)?;
    let files2 = collect_relative_files(dir2)?;

    assert_eq!(
        files1.keys().collect::<Vec<_>>(),
        files2.keys().collect::<Vec<_>>(),
        "Different file sets in {:?} and {:?}",
        dir1,
        dir2
    );

    for (name, content) in &files1 {
        assert!(
            files2.get(name) == Some(content),
            "Content mismatch for {}",
            name
        );
    }

    Ok(())
}
