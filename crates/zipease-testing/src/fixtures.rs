//! Common test fixtures for zipease testing

use crate::TestDir;
use anyhow::Result;
use std::path::PathBuf;

/// The two-file tree `a.txt` ("hello") and `sub/b.txt` ("world") under `folder`
pub fn create_sample_tree(test_dir: &TestDir, folder: &str) -> Result<PathBuf> {
    let root = test_dir.create_dir(folder)?;
    test_dir.create_file(&format!("{}/a.txt", folder), b"hello")?;
    test_dir.create_file(&format!("{}/sub/b.txt", folder), b"world")?;
    Ok(root)
}

/// A wider tree with binary, empty, large and deeply nested files
pub fn create_mixed_tree(test_dir: &TestDir, folder: &str) -> Result<PathBuf> {
    let root = create_sample_tree(test_dir, folder)?;

    test_dir.create_file(&format!("{}/empty.dat", folder), b"")?;
    test_dir.create_file(&format!("{}/image.jpg", folder), &[0xFF, 0xD8, 0xFF, 0xE0])?;
    test_dir.create_file(&format!("{}/src/modules/mod.rs", folder), b"pub mod utils;")?;

    let large_content = "zipease ".repeat(128 * 1024); // 1MB
    test_dir.create_file(&format!("{}/logs/large.log", folder), large_content.as_bytes())?;

    test_dir.create_dir(&format!("{}/empty_dir", folder))?;

    Ok(root)
}
