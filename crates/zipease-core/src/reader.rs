//! Archive listing and extraction facade

use crate::codec::{ArchiveSource, EntryInfo, ZipSource};
use crate::config::ReaderConfig;
use crate::paths::{create_parent_dirs, safe_join};
use crate::report::{EntryFailure, ExtractReport};
use crate::{Error, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

enum ReaderState<R> {
    Ready(R),
    Failed(String),
}

/// Lists and extracts the entries of one archive
///
/// Opening never fails outright: a reader whose archive could not be opened
/// answers every later call with [`Error::ReaderUnavailable`].
pub struct ArchiveReader<R: ArchiveSource = ZipSource> {
    state: ReaderState<R>,
    config: ReaderConfig,
}

impl ArchiveReader<ZipSource> {
    /// Open the archive at `path` with default settings
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self::open_with_config(path, ReaderConfig::default())
    }

    /// Open the archive at `path`
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: ReaderConfig) -> Self {
        let path = path.as_ref();
        match ZipSource::open(path) {
            Ok(source) => {
                info!("Opened archive {:?}", path);
                Self::from_source(source, config)
            }
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to open archive");
                Self {
                    state: ReaderState::Failed(format!("{}: {}", path.display(), e)),
                    config,
                }
            }
        }
    }

    /// Open the archive at `path`, returning the error instead of a failed reader
    pub fn try_open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let source = ZipSource::open(path.as_ref())?;
        Ok(Self::from_source(source, ReaderConfig::default()))
    }
}

impl<R: ArchiveSource> ArchiveReader<R> {
    /// Wrap an already opened source
    pub fn from_source(source: R, config: ReaderConfig) -> Self {
        Self {
            state: ReaderState::Ready(source),
            config,
        }
    }

    /// Whether the archive was opened successfully
    pub fn is_open(&self) -> bool {
        matches!(self.state, ReaderState::Ready(_))
    }

    /// Why opening failed, if it did
    pub fn open_error(&self) -> Option<&str> {
        match &self.state {
            ReaderState::Ready(_) => None,
            ReaderState::Failed(reason) => Some(reason),
        }
    }

    fn source(&mut self) -> Result<&mut R> {
        match &mut self.state {
            ReaderState::Ready(source) => Ok(source),
            ReaderState::Failed(reason) => Err(Error::ReaderUnavailable(reason.clone())),
        }
    }

    /// Metadata for every entry the codec can describe, encrypted ones included
    pub fn entries(&mut self) -> Result<Vec<EntryInfo>> {
        let source = self.source()?;
        let mut entries = Vec::with_capacity(source.len());

        for index in 0..source.len() {
            match source.entry(index) {
                Ok(info) => entries.push(info),
                Err(e) => warn!(index, error = %e, "Skipping entry with unreadable metadata"),
            }
        }

        Ok(entries)
    }

    /// Names of the readable, unencrypted entries in archive order
    pub fn list_entries(&mut self) -> Result<Vec<String>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|info| !info.encrypted)
            .map(|info| info.name)
            .collect())
    }

    /// Extract `name` below `dest_folder`, creating missing directories
    ///
    /// Returns the written path, or `None` when the archive has no such entry.
    pub fn extract_one<P: AsRef<Path>>(
        &mut self,
        name: &str,
        dest_folder: P,
    ) -> Result<Option<PathBuf>> {
        let dest_folder = dest_folder.as_ref();
        let overwrite = self.config.overwrite;
        let source = self.source()?;

        let Some(index) = source.index_of(name) else {
            debug!(entry = name, "Entry not found");
            return Ok(None);
        };

        let info = source.entry(index)?;
        let target = safe_join(dest_folder, &info.name)?;
        create_parent_dirs(&target)?;
        write_entry(source, &info, &target, overwrite)?;
        Ok(Some(target))
    }

    /// Extract `name` to exactly `dest_file`
    ///
    /// Parent directories of `dest_file` must already exist. Returns `false`
    /// when the archive has no such entry.
    pub fn extract_one_to_file<P: AsRef<Path>>(&mut self, name: &str, dest_file: P) -> Result<bool> {
        let overwrite = self.config.overwrite;
        let source = self.source()?;

        let Some(index) = source.index_of(name) else {
            debug!(entry = name, "Entry not found");
            return Ok(false);
        };

        let info = source.entry(index)?;
        ensure_file_entry(&info)?;
        write_entry(source, &info, dest_file.as_ref(), overwrite)?;
        Ok(true)
    }

    /// Extract every unencrypted entry below `dest_folder`
    ///
    /// A failing entry is recorded in the report and extraction moves on.
    pub fn extract_all<P: AsRef<Path>>(&mut self, dest_folder: P) -> Result<ExtractReport> {
        let dest_folder = dest_folder.as_ref();
        let overwrite = self.config.overwrite;
        let source = self.source()?;
        let mut report = ExtractReport::default();

        info!("Extracting {} entries to {:?}", source.len(), dest_folder);

        for index in 0..source.len() {
            let info = match source.entry(index) {
                Ok(info) => info,
                Err(e) => {
                    warn!(index, error = %e, "Unreadable entry metadata");
                    report
                        .failures
                        .push(EntryFailure::new(format!("#{}", index), e));
                    continue;
                }
            };

            if info.encrypted {
                warn!(entry = %info.name, "Skipping encrypted entry");
                report.skipped_encrypted.push(info.name);
                continue;
            }

            let written = safe_join(dest_folder, &info.name).and_then(|target| {
                create_parent_dirs(&target)?;
                write_entry(source, &info, &target, overwrite)?;
                Ok(target)
            });

            match written {
                Ok(target) => report.extracted.push(target),
                Err(e) => {
                    warn!(entry = %info.name, error = %e, "Failed to extract entry");
                    report.failures.push(EntryFailure::new(info.name, e));
                }
            }
        }

        info!(
            "Extracted {} entries ({} encrypted skipped, {} failed)",
            report.extracted.len(),
            report.skipped_encrypted.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Extract the first entry to exactly `dest_file`, creating its parent directories
    ///
    /// Meant for single-entry archives; other entries are ignored. Returns
    /// `false` for an empty archive and an error when the first entry is a
    /// directory.
    pub fn extract_first_to_file<P: AsRef<Path>>(&mut self, dest_file: P) -> Result<bool> {
        let dest_file = dest_file.as_ref();
        let overwrite = self.config.overwrite;
        let source = self.source()?;

        if source.is_empty() {
            return Ok(false);
        }

        let info = source.entry(0)?;
        ensure_file_entry(&info)?;
        create_parent_dirs(dest_file)?;
        write_entry(source, &info, dest_file, overwrite)?;
        Ok(true)
    }
}

/// A literal destination path only makes sense for file content
fn ensure_file_entry(info: &EntryInfo) -> Result<()> {
    if info.is_dir {
        return Err(Error::InvalidPath(format!(
            "{} is a directory entry, not a file",
            info.name
        )));
    }
    Ok(())
}

fn write_entry<R: ArchiveSource>(
    source: &mut R,
    info: &EntryInfo,
    target: &Path,
    overwrite: bool,
) -> Result<()> {
    if info.encrypted {
        return Err(Error::Encrypted(info.name.clone()));
    }

    if info.is_dir {
        fs::create_dir_all(target)?;
        return Ok(());
    }

    if !overwrite && target.exists() {
        return Err(Error::FileExists(target.to_path_buf()));
    }

    let result = File::create(target).map_err(Error::from).and_then(|file| {
        let mut out = BufWriter::new(file);
        let written = source.extract_to(info.index, &mut out)?;
        out.flush()?;
        Ok(written)
    });

    match result {
        Ok(written) => {
            debug!(entry = %info.name, bytes = written, "Extracted {:?}", target);
            Ok(())
        }
        Err(e) => {
            if target.is_file() {
                let _ = fs::remove_file(target);
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::memory::{MemoryEntry, MemorySource};
    use tempfile::TempDir;

    fn reader(entries: Vec<MemoryEntry>) -> ArchiveReader<MemorySource> {
        ArchiveReader::from_source(MemorySource { entries }, ReaderConfig::default())
    }

    fn encrypted(name: &str) -> MemoryEntry {
        MemoryEntry {
            encrypted: true,
            ..MemoryEntry::file(name, b"secret")
        }
    }

    #[test]
    fn test_list_skips_encrypted() {
        let mut reader = reader(vec![
            MemoryEntry::file("a.txt", b"a"),
            encrypted("secret.txt"),
            MemoryEntry::file("sub/b.txt", b"b"),
        ]);

        assert_eq!(reader.list_entries().unwrap(), vec!["a.txt", "sub/b.txt"]);
        assert_eq!(reader.entries().unwrap().len(), 3);
    }

    #[test]
    fn test_failed_reader_fails_fast() {
        let temp_dir = TempDir::new().unwrap();
        let mut reader = ArchiveReader::open(temp_dir.path().join("missing.zip"));

        assert!(!reader.is_open());
        assert!(reader.open_error().unwrap().contains("missing.zip"));
        assert!(matches!(
            reader.list_entries(),
            Err(Error::ReaderUnavailable(_))
        ));
        assert!(matches!(
            reader.extract_all(temp_dir.path()),
            Err(Error::ReaderUnavailable(_))
        ));
        assert!(matches!(
            reader.extract_first_to_file(temp_dir.path().join("x")),
            Err(Error::ReaderUnavailable(_))
        ));
        assert!(fs::read_dir(temp_dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_extract_one_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let mut reader = reader(vec![MemoryEntry::file("deep/er/file.txt", b"content")]);

        let written = reader
            .extract_one("deep/er/file.txt", temp_dir.path())
            .unwrap()
            .unwrap();
        assert_eq!(written, temp_dir.path().join("deep/er/file.txt"));
        assert_eq!(fs::read(written).unwrap(), b"content");
    }

    #[test]
    fn test_extract_one_missing_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let mut reader = reader(vec![MemoryEntry::file("a.txt", b"a")]);

        assert!(reader.extract_one("b.txt", temp_dir.path()).unwrap().is_none());
        assert!(!reader
            .extract_one_to_file("b.txt", temp_dir.path().join("b.txt"))
            .unwrap());
        assert!(fs::read_dir(temp_dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_extract_one_to_file_needs_parent() {
        let temp_dir = TempDir::new().unwrap();
        let mut reader = reader(vec![MemoryEntry::file("a.txt", b"a")]);

        let err = reader
            .extract_one_to_file("a.txt", temp_dir.path().join("no/such/dir/a.txt"))
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));

        let renamed = temp_dir.path().join("renamed.txt");
        assert!(reader.extract_one_to_file("a.txt", &renamed).unwrap());
        assert_eq!(fs::read(renamed).unwrap(), b"a");
    }

    #[test]
    fn test_extract_all_continues_after_failure() {
        let temp_dir = TempDir::new().unwrap();
        let mut broken = MemoryEntry::file("broken.bin", b"0123456789");
        broken.corrupt = true;

        let mut reader = reader(vec![
            MemoryEntry::file("a.txt", b"a"),
            broken,
            encrypted("locked.txt"),
            MemoryEntry::file("../escape.txt", b"evil"),
            MemoryEntry::file("dir/", b""),
            MemoryEntry::file("z.txt", b"z"),
        ]);

        let report = reader.extract_all(temp_dir.path()).unwrap();

        assert_eq!(
            report.extracted,
            vec![
                temp_dir.path().join("a.txt"),
                temp_dir.path().join("dir"),
                temp_dir.path().join("z.txt"),
            ]
        );
        assert_eq!(report.skipped_encrypted, vec!["locked.txt"]);
        let failed: Vec<_> = report.failures.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(failed, vec!["broken.bin", "../escape.txt"]);
        assert!(!report.is_complete());

        assert!(temp_dir.path().join("dir").is_dir());
        assert!(!temp_dir.path().join("broken.bin").exists());
        assert!(!temp_dir.path().join("locked.txt").exists());
        assert!(!temp_dir.path().parent().unwrap().join("escape.txt").exists());
    }

    #[test]
    fn test_extract_one_encrypted_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut reader = reader(vec![encrypted("locked.txt")]);

        assert!(matches!(
            reader.extract_one("locked.txt", temp_dir.path()),
            Err(Error::Encrypted(_))
        ));
    }

    #[test]
    fn test_overwrite_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("a.txt");
        fs::write(&target, "existing").unwrap();

        let mut reader = ArchiveReader::from_source(
            MemorySource {
                entries: vec![MemoryEntry::file("a.txt", b"new")],
            },
            ReaderConfig { overwrite: false },
        );

        assert!(matches!(
            reader.extract_one("a.txt", temp_dir.path()),
            Err(Error::FileExists(_))
        ));
        assert_eq!(fs::read_to_string(&target).unwrap(), "existing");
    }

    #[test]
    fn test_extract_first_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("nested/out/first.bin");

        let mut empty = reader(Vec::new());
        assert!(!empty.extract_first_to_file(&dest).unwrap());

        let mut reader = reader(vec![
            MemoryEntry::file("one.bin", b"first"),
            MemoryEntry::file("two.bin", b"second"),
        ]);
        assert!(reader.extract_first_to_file(&dest).unwrap());
        assert_eq!(fs::read(&dest).unwrap(), b"first");
    }

    #[test]
    fn test_directory_entry_to_literal_path_is_refused() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("out/first.bin");
        let mut reader = reader(vec![
            MemoryEntry::file("docs/", b""),
            MemoryEntry::file("docs/readme.txt", b"read me"),
        ]);

        assert!(matches!(
            reader.extract_first_to_file(&dest),
            Err(Error::InvalidPath(_))
        ));
        assert!(matches!(
            reader.extract_one_to_file("docs/", &dest),
            Err(Error::InvalidPath(_))
        ));
        assert!(!dest.exists());
        assert!(!temp_dir.path().join("out").exists());
    }

    #[test]
    fn test_unreadable_metadata_is_dropped_from_listing_and_reported() {
        let temp_dir = TempDir::new().unwrap();
        let mut damaged = MemoryEntry::file("damaged.txt", b"??");
        damaged.unreadable = true;

        let mut reader = reader(vec![
            MemoryEntry::file("a.txt", b"a"),
            damaged,
            MemoryEntry::file("b.txt", b"b"),
        ]);

        assert_eq!(reader.list_entries().unwrap(), vec!["a.txt", "b.txt"]);

        let report = reader.extract_all(temp_dir.path()).unwrap();
        assert_eq!(report.extracted.len(), 2);
        let failed: Vec<_> = report.failures.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(failed, vec!["#1"]);
    }
}
