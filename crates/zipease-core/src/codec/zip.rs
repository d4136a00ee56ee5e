//! Codec backed by the `zip` crate

use super::{ArchiveSink, ArchiveSource, EntryInfo};
use crate::config::{Compression, WriterConfig};
use crate::{Error, Result};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Writes a ZIP file on disk
pub struct ZipSink {
    writer: Option<ZipWriter<BufWriter<File>>>,
}

impl ZipSink {
    /// Replace whatever is at `path` with a new, empty archive
    pub fn create(path: &Path) -> Result<Self> {
        match fs::remove_file(path) {
            Ok(()) => debug!("Removed existing file {:?}", path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::Io(e)),
        }

        let file = File::create(path)?;
        Ok(Self {
            writer: Some(ZipWriter::new(BufWriter::new(file))),
        })
    }

    fn writer(&mut self) -> Result<&mut ZipWriter<BufWriter<File>>> {
        self.writer.as_mut().ok_or(Error::Finalized)
    }
}

fn file_options(config: &WriterConfig) -> SimpleFileOptions {
    let options = SimpleFileOptions::default().unix_permissions(config.unix_permissions);

    match config.compression {
        Compression::Deflated => options
            .compression_method(CompressionMethod::Deflated)
            .compression_level(config.level),
        Compression::Stored => options.compression_method(CompressionMethod::Stored),
    }
}

impl ArchiveSink for ZipSink {
    fn add_stream(
        &mut self,
        name: &str,
        source: &mut dyn Read,
        config: &WriterConfig,
    ) -> Result<u64> {
        let writer = self.writer()?;
        writer.start_file(name, file_options(config))?;
        match io::copy(source, writer) {
            Ok(written) => {
                debug!(entry = name, bytes = written, "Added entry");
                Ok(written)
            }
            Err(e) => {
                // Drop the half-written entry so finish() never lists it
                if let Err(abort) = writer.abort_file() {
                    warn!(entry = name, "Failed to discard partial entry: {}", abort);
                }
                Err(Error::Io(e))
            }
        }
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            let mut inner = writer.finish()?;
            inner.flush()?;
        }
        Ok(())
    }
}

const EOCD_SIGNATURE: &[u8; 4] = b"PK\x05\x06";
const EOCD_LEN: u64 = 22;
const ZIP64_SENTINEL: u16 = u16::MAX;

/// Entry count the end-of-central-directory record declares
///
/// `None` when the record cannot be found or defers to ZIP64.
fn declared_entry_count(file: &mut File) -> Result<Option<usize>> {
    let len = file.metadata()?.len();
    let window = len.min(EOCD_LEN + u64::from(u16::MAX));
    file.seek(SeekFrom::Start(len - window))?;

    let mut tail = Vec::with_capacity(window as usize);
    Read::take(&mut *file, window).read_to_end(&mut tail)?;
    file.rewind()?;

    let Some(pos) = tail.windows(4).rposition(|w| w == EOCD_SIGNATURE) else {
        return Ok(None);
    };
    let Some(raw) = tail.get(pos + 10..pos + 12) else {
        return Ok(None);
    };
    match u16::from_le_bytes([raw[0], raw[1]]) {
        ZIP64_SENTINEL => Ok(None),
        total => Ok(Some(usize::from(total))),
    }
}

/// Reads a ZIP file from disk
pub struct ZipSource {
    archive: ZipArchive<BufReader<File>>,
}

impl ZipSource {
    /// Open an existing archive and parse its central directory
    ///
    /// The `zip` crate keys entries by name and keeps only the last of any
    /// repeated name, so an archive whose central directory holds more
    /// records than the parsed index is refused.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let declared = declared_entry_count(&mut file)?;
        let archive = ZipArchive::new(BufReader::new(file))?;

        if let Some(declared) = declared {
            if declared > archive.len() {
                return Err(Error::DuplicateEntries(declared - archive.len()));
            }
        }
        Ok(Self { archive })
    }
}

impl ArchiveSource for ZipSource {
    fn len(&self) -> usize {
        self.archive.len()
    }

    fn entry(&mut self, index: usize) -> Result<EntryInfo> {
        let file = self.archive.by_index_raw(index)?;
        Ok(EntryInfo {
            index,
            name: file.name().to_string(),
            size: file.size(),
            compressed_size: file.compressed_size(),
            is_dir: file.is_dir(),
            encrypted: file.encrypted(),
        })
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.archive.index_for_name(name)
    }

    fn extract_to(&mut self, index: usize, out: &mut dyn Write) -> Result<u64> {
        let mut file = self.archive.by_index(index)?;
        Ok(io::copy(&mut file, out)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sink_replaces_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.zip");
        fs::write(&path, b"not a zip").unwrap();

        let mut sink = ZipSink::create(&path).unwrap();
        sink.add_bytes("a.txt", b"hello", &WriterConfig::default())
            .unwrap();
        sink.finish().unwrap();

        let mut source = ZipSource::open(&path).unwrap();
        assert_eq!(source.len(), 1);
        let info = source.entry(0).unwrap();
        assert_eq!(info.name, "a.txt");
        assert_eq!(info.size, 5);
        assert!(!info.encrypted);
    }

    #[test]
    fn test_finish_twice_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.zip");

        let mut sink = ZipSink::create(&path).unwrap();
        sink.finish().unwrap();
        sink.finish().unwrap();

        assert!(matches!(
            sink.add_bytes("late.txt", b"x", &WriterConfig::default()),
            Err(Error::Finalized)
        ));
        assert!(ZipSource::open(&path).unwrap().is_empty());
    }

    #[test]
    fn test_stored_entries_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("stored.zip");
        let config = WriterConfig {
            compression: Compression::Stored,
            ..Default::default()
        };

        let mut sink = ZipSink::create(&path).unwrap();
        sink.add_bytes("raw.bin", &[1, 2, 3, 4], &config).unwrap();
        sink.finish().unwrap();

        let mut source = ZipSource::open(&path).unwrap();
        let info = source.entry(0).unwrap();
        assert_eq!(info.compressed_size, 4);

        let mut out = Vec::new();
        assert_eq!(source.extract_to(0, &mut out).unwrap(), 4);
        assert_eq!(out, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_open_rejects_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.zip");
        fs::write(&path, b"definitely not an archive").unwrap();

        assert!(matches!(ZipSource::open(&path), Err(Error::Zip(_))));
    }

    #[test]
    fn test_failed_stream_is_discarded() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.zip");
        let config = WriterConfig::default();

        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "disk went away"))
            }
        }

        let mut sink = ZipSink::create(&path).unwrap();
        sink.add_bytes("first.txt", b"one", &config).unwrap();
        assert!(matches!(
            sink.add_stream("broken.txt", &mut Broken, &config),
            Err(Error::Io(_))
        ));
        sink.add_bytes("last.txt", b"three", &config).unwrap();
        sink.finish().unwrap();

        let mut source = ZipSource::open(&path).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(source.entry(0).unwrap().name, "first.txt");
        assert_eq!(source.entry(1).unwrap().name, "last.txt");
        assert_eq!(source.index_of("broken.txt"), None);
    }

    #[test]
    fn test_declared_count_matches_written_entries() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.zip");

        let mut sink = ZipSink::create(&path).unwrap();
        for name in ["a.txt", "b.txt", "c.txt"] {
            sink.add_bytes(name, name.as_bytes(), &WriterConfig::default())
                .unwrap();
        }
        sink.finish().unwrap();

        let mut file = File::open(&path).unwrap();
        assert_eq!(declared_entry_count(&mut file).unwrap(), Some(3));
    }
}
