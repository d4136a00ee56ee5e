//! Archive creation facade

use crate::codec::{ArchiveSink, ZipSink};
use crate::config::WriterConfig;
use crate::paths::entry_name;
use crate::report::EntryFailure;
use crate::{Error, Result};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Builds one archive from files, buffers and folders
///
/// The first failed operation is recorded and every later add-operation is
/// skipped with [`Error::WriterFailed`]. The archive is finalized by
/// [`flush`](Self::flush) or, failing that, when the writer is dropped.
///
/// ```no_run
/// use zipease_core::ArchiveWriter;
///
/// let mut writer = ArchiveWriter::create("backup.zip");
/// writer.add_folder("documents")?;
/// writer.add_string("created by zipease", "README")?;
/// writer.flush()?;
/// assert!(writer.is_successful());
/// # Ok::<(), zipease_core::Error>(())
/// ```
pub struct ArchiveWriter<S: ArchiveSink = ZipSink> {
    sink: Option<S>,
    config: WriterConfig,
    failures: Vec<EntryFailure>,
    written: usize,
    finalized: bool,
}

impl ArchiveWriter<ZipSink> {
    /// Create (or replace) the archive at `path` with default settings
    pub fn create<P: AsRef<Path>>(path: P) -> Self {
        Self::create_with_config(path, WriterConfig::default())
    }

    /// Create (or replace) the archive at `path`
    pub fn create_with_config<P: AsRef<Path>>(path: P, config: WriterConfig) -> Self {
        let path = path.as_ref();
        let opened = config.validate().and_then(|_| ZipSink::create(path));

        match opened {
            Ok(sink) => {
                info!("Creating archive {:?}", path);
                Self::with_sink(sink, config)
            }
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to create archive");
                let mut writer = Self::empty(config);
                writer
                    .failures
                    .push(EntryFailure::new(path.display().to_string(), e));
                writer
            }
        }
    }
}

impl<S: ArchiveSink> ArchiveWriter<S> {
    /// Wrap an already opened sink
    pub fn with_sink(sink: S, config: WriterConfig) -> Self {
        let mut writer = Self::empty(config);
        writer.sink = Some(sink);
        writer
    }

    fn empty(config: WriterConfig) -> Self {
        Self {
            sink: None,
            config,
            failures: Vec::new(),
            written: 0,
            finalized: false,
        }
    }

    /// Stream a file from disk into the archive as `name`
    pub fn add_file<P: AsRef<Path>>(&mut self, source: P, name: &str) -> Result<()> {
        let source = source.as_ref();
        self.guard(name)?;

        let result = match self.sink.as_mut() {
            Some(sink) => File::open(source)
                .map_err(Error::from)
                .and_then(|mut file| sink.add_stream(name, &mut file, &self.config)),
            None => Err(Error::WriterFailed),
        };
        self.record(name, result.map(|_| ()))
    }

    /// Add an in-memory buffer as `name`
    pub fn add_bytes(&mut self, data: &[u8], name: &str) -> Result<()> {
        self.guard(name)?;

        let result = match self.sink.as_mut() {
            Some(sink) => sink.add_bytes(name, data, &self.config),
            None => Err(Error::WriterFailed),
        };
        self.record(name, result)
    }

    /// Add UTF-8 text as `name`
    pub fn add_string(&mut self, text: &str, name: &str) -> Result<()> {
        self.add_bytes(text.as_bytes(), name)
    }

    /// Add every regular file below `root`, named by its path relative to `root`
    ///
    /// Directories, symlinks and special files are skipped. Walk errors are
    /// recorded like any other failure and do not stop the walk. Returns the
    /// number of files added.
    pub fn add_folder<P: AsRef<Path>>(&mut self, root: P) -> Result<usize> {
        let root = root.as_ref();
        self.guard(&root.display().to_string())?;
        info!("Adding folder {:?}", root);

        let mut added = 0;
        let mut failed = 0;
        let mut skipped = 0;

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let location = e
                        .path()
                        .unwrap_or(root)
                        .display()
                        .to_string();
                    warn!(path = %location, error = %e, "Failed to walk folder");
                    self.failures.push(EntryFailure::new(location, e));
                    failed += 1;
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                if !entry.file_type().is_dir() {
                    debug!("Skipping non-regular file {:?}", entry.path());
                }
                continue;
            }

            let name = match entry_name(root, entry.path()) {
                Ok(name) => name,
                Err(e) => {
                    let location = entry.path().display().to_string();
                    warn!(path = %location, error = %e, "Cannot name entry");
                    self.failures.push(EntryFailure::new(location, e));
                    failed += 1;
                    continue;
                }
            };

            match self.add_file(entry.path(), &name) {
                Ok(()) => added += 1,
                Err(Error::WriterFailed) => skipped += 1,
                Err(_) => failed += 1,
            }
        }

        if failed + skipped > 0 {
            warn!(
                "Folder {:?}: {} added, {} failed, {} skipped",
                root, added, failed, skipped
            );
            return Err(Error::PartialFailure { failed, skipped });
        }

        info!("Added {} files from {:?}", added, root);
        Ok(added)
    }

    /// Write the central directory and release the archive
    ///
    /// Only the first call does any work; later calls return `Ok(())`.
    pub fn flush(&mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }
        self.finalized = true;

        let Some(mut sink) = self.sink.take() else {
            return Ok(());
        };

        match sink.finish() {
            Ok(()) => {
                info!("Archive finalized with {} entries", self.written);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to finalize archive");
                self.failures
                    .push(EntryFailure::new("<central directory>", &e));
                Err(e)
            }
        }
    }

    /// True when no operation has failed so far
    pub fn is_successful(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failures recorded so far, oldest first
    pub fn failures(&self) -> &[EntryFailure] {
        &self.failures
    }

    /// Number of entries added successfully
    pub fn entries_written(&self) -> usize {
        self.written
    }

    fn guard(&mut self, name: &str) -> Result<()> {
        if self.finalized {
            warn!(entry = name, "Add after flush");
            self.failures
                .push(EntryFailure::new(name, Error::Finalized));
            return Err(Error::Finalized);
        }
        if !self.failures.is_empty() || self.sink.is_none() {
            debug!(entry = name, "Skipping, writer already failed");
            return Err(Error::WriterFailed);
        }
        Ok(())
    }

    fn record(&mut self, name: &str, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => {
                self.written += 1;
                Ok(())
            }
            Err(e) => {
                warn!(entry = name, error = %e, "Failed to add entry");
                self.failures.push(EntryFailure::new(name, &e));
                Err(e)
            }
        }
    }
}

impl<S: ArchiveSink> Drop for ArchiveWriter<S> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(error = %e, "Archive could not be finalized on drop");
        }
    }
}
