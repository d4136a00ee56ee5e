//! Helpers that build or patch archives directly

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const EOCD_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x05, 0x06];
const CENTRAL_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x01, 0x02];
const LOCAL_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];
const ENCRYPTED_FLAG: u16 = 0x0001;

/// Writes an archive straight through the `zip` crate
///
/// Names ending in `/` become directory entries. Everything is stored
/// uncompressed so the bytes on disk are easy to reason about.
pub fn write_raw_archive(path: &Path, entries: &[(&str, &[u8])]) -> Result<()> {
    let mut zip = ZipWriter::new(File::create(path)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    for (name, content) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, options)?;
        } else {
            zip.start_file(*name, options)?;
            zip.write_all(content)?;
        }
    }

    zip.finish()?;
    Ok(())
}

fn read_u16(bytes: &[u8], at: usize) -> Result<u16> {
    let raw = bytes
        .get(at..at + 2)
        .context("archive truncated while reading u16")?;
    Ok(u16::from_le_bytes([raw[0], raw[1]]))
}

fn read_u32(bytes: &[u8], at: usize) -> Result<u32> {
    let raw = bytes
        .get(at..at + 4)
        .context("archive truncated while reading u32")?;
    Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

fn set_flag(bytes: &mut [u8], at: usize) -> Result<()> {
    let flags = read_u16(bytes, at)? | ENCRYPTED_FLAG;
    bytes[at..at + 2].copy_from_slice(&flags.to_le_bytes());
    Ok(())
}

/// Where one entry's headers live inside the archive bytes
struct EntryHeaders {
    central: usize,
    local: usize,
}

fn locate_entry(bytes: &[u8], name: &str) -> Result<EntryHeaders> {
    let eocd = bytes
        .windows(4)
        .rposition(|w| w == EOCD_SIGNATURE)
        .context("end of central directory not found")?;
    let count = read_u16(bytes, eocd + 10)? as usize;
    let mut offset = read_u32(bytes, eocd + 16)? as usize;

    for _ in 0..count {
        if bytes.get(offset..offset + 4) != Some(&CENTRAL_SIGNATURE[..]) {
            bail!("bad central directory header at {}", offset);
        }

        let name_len = read_u16(bytes, offset + 28)? as usize;
        let extra_len = read_u16(bytes, offset + 30)? as usize;
        let comment_len = read_u16(bytes, offset + 32)? as usize;
        let local = read_u32(bytes, offset + 42)? as usize;
        let entry_name = bytes
            .get(offset + 46..offset + 46 + name_len)
            .context("archive truncated in entry name")?;

        if entry_name == name.as_bytes() {
            if bytes.get(local..local + 4) != Some(&LOCAL_SIGNATURE[..]) {
                bail!("bad local header at {}", local);
            }
            return Ok(EntryHeaders {
                central: offset,
                local,
            });
        }

        offset += 46 + name_len + extra_len + comment_len;
    }

    bail!("entry {} not found", name)
}

/// Sets the "encrypted" general purpose bit of entry `name`
///
/// Both the central directory record and the local header are patched, so
/// readers see the entry as encrypted while its name stays readable.
pub fn mark_entry_encrypted(archive: &Path, name: &str) -> Result<()> {
    let mut bytes = std::fs::read(archive)?;
    let headers = locate_entry(&bytes, name).with_context(|| format!("in {:?}", archive))?;

    set_flag(&mut bytes, headers.central + 8)?;
    set_flag(&mut bytes, headers.local + 6)?;
    std::fs::write(archive, bytes)?;
    Ok(())
}

/// Renames entry `from` to `to` in place
///
/// Both names must have the same length so no offsets move. Renaming onto an
/// existing name produces an archive with a repeated entry name, which the
/// `zip` writer itself never emits.
pub fn rename_entry(archive: &Path, from: &str, to: &str) -> Result<()> {
    if from.len() != to.len() {
        bail!("cannot rename {:?} to {:?}: lengths differ", from, to);
    }

    let mut bytes = std::fs::read(archive)?;
    let headers = locate_entry(&bytes, from).with_context(|| format!("in {:?}", archive))?;
    let len = to.len();

    bytes[headers.central + 46..headers.central + 46 + len].copy_from_slice(to.as_bytes());
    bytes[headers.local + 30..headers.local + 30 + len].copy_from_slice(to.as_bytes());
    std::fs::write(archive, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TestDir;

    #[test]
    fn test_mark_entry_encrypted() {
        let test_dir = TestDir::new().unwrap();
        let path = test_dir.join("t.zip");
        write_raw_archive(&path, &[("a.txt", b"a".as_slice()), ("b.txt", b"b".as_slice())]).unwrap();

        mark_entry_encrypted(&path, "b.txt").unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        assert!(!archive.by_index_raw(0).unwrap().encrypted());
        assert!(archive.by_index_raw(1).unwrap().encrypted());
    }

    #[test]
    fn test_mark_missing_entry_fails() {
        let test_dir = TestDir::new().unwrap();
        let path = test_dir.join("t.zip");
        write_raw_archive(&path, &[("a.txt", b"a".as_slice())]).unwrap();

        assert!(mark_entry_encrypted(&path, "nope.txt").is_err());
    }

    #[test]
    fn test_rename_entry_patches_both_headers() {
        let test_dir = TestDir::new().unwrap();
        let path = test_dir.join("t.zip");
        write_raw_archive(&path, &[("a.txt", b"a".as_slice()), ("b.txt", b"b".as_slice())]).unwrap();

        rename_entry(&path, "b.txt", "c.txt").unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(archive.by_index_raw(1).unwrap().name(), "c.txt");
        let mut content = String::new();
        std::io::Read::read_to_string(&mut archive.by_name("c.txt").unwrap(), &mut content)
            .unwrap();
        assert_eq!(content, "b");
    }

    #[test]
    fn test_rename_needs_equal_lengths() {
        let test_dir = TestDir::new().unwrap();
        let path = test_dir.join("t.zip");
        write_raw_archive(&path, &[("a.txt", b"a".as_slice())]).unwrap();

        assert!(rename_entry(&path, "a.txt", "longer.txt").is_err());
    }
}
