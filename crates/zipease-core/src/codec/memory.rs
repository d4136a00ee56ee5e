//! In-memory codec used by unit tests

use super::{ArchiveSink, ArchiveSource, EntryInfo};
use crate::config::WriterConfig;
use crate::{Error, Result};
use std::cell::RefCell;
use std::io::{Read, Write};
use std::rc::Rc;

#[derive(Debug, Clone)]
pub(crate) struct MemoryEntry {
    pub name: String,
    pub data: Vec<u8>,
    pub encrypted: bool,
    pub corrupt: bool,
    pub unreadable: bool,
}

impl MemoryEntry {
    pub fn file(name: &str, data: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            data: data.to_vec(),
            encrypted: false,
            corrupt: false,
            unreadable: false,
        }
    }
}

/// Shared entry list so a test can inspect what a sink received
pub(crate) type Entries = Rc<RefCell<Vec<MemoryEntry>>>;

pub(crate) struct MemorySink {
    pub entries: Entries,
    pub fail_names: Vec<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            entries: Rc::new(RefCell::new(Vec::new())),
            fail_names: Vec::new(),
        }
    }
}

impl ArchiveSink for MemorySink {
    fn add_stream(
        &mut self,
        name: &str,
        source: &mut dyn Read,
        _config: &WriterConfig,
    ) -> Result<u64> {
        if self.fail_names.iter().any(|n| n == name) {
            return Err(Error::Zip(format!("refusing {}", name)));
        }
        let mut data = Vec::new();
        source.read_to_end(&mut data)?;
        let len = data.len() as u64;
        self.entries.borrow_mut().push(MemoryEntry::file(name, &data));
        Ok(len)
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

pub(crate) struct MemorySource {
    pub entries: Vec<MemoryEntry>,
}

impl ArchiveSource for MemorySource {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn entry(&mut self, index: usize) -> Result<EntryInfo> {
        let entry = self
            .entries
            .get(index)
            .ok_or_else(|| Error::NotFound(format!("index {}", index)))?;
        if entry.unreadable {
            return Err(Error::Zip(format!("bad central header at index {}", index)));
        }
        Ok(EntryInfo {
            index,
            name: entry.name.clone(),
            size: entry.data.len() as u64,
            compressed_size: entry.data.len() as u64,
            is_dir: entry.name.ends_with('/'),
            encrypted: entry.encrypted,
        })
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    fn extract_to(&mut self, index: usize, out: &mut dyn Write) -> Result<u64> {
        let entry = &self.entries[index];
        if entry.corrupt {
            out.write_all(&entry.data[..entry.data.len() / 2])?;
            return Err(Error::Zip("invalid checksum".to_string()));
        }
        out.write_all(&entry.data)?;
        Ok(entry.data.len() as u64)
    }
}
