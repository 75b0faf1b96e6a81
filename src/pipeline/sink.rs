//! Output sinks: where named resources end up.
//!
//! Every sink is append-only and refuses to write the same name twice in one
//! run; a repeated name means the sequence counter was reset or two writers
//! share a prefix, and silently overwriting would leave a document pointing at
//! the wrong image.

use crate::error::BookpatchError;
use std::collections::{BTreeMap, HashSet};
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Destination for named resources.
pub trait OutputSink {
    fn write_resource(&mut self, name: &str, bytes: &[u8]) -> Result<(), BookpatchError>;
}

fn claim(written: &mut HashSet<String>, name: &str) -> Result<(), BookpatchError> {
    if !written.insert(name.to_string()) {
        return Err(BookpatchError::DuplicateResource {
            name: name.to_string(),
        });
    }
    Ok(())
}

// ── Directory ────────────────────────────────────────────────────────────

/// Writes each resource to `root/name`. Parent directories must already
/// exist; files left over from an earlier run are overwritten.
#[derive(Debug)]
pub struct DirSink {
    root: PathBuf,
    written: HashSet<String>,
}

impl DirSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            written: HashSet::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl OutputSink for DirSink {
    fn write_resource(&mut self, name: &str, bytes: &[u8]) -> Result<(), BookpatchError> {
        claim(&mut self.written, name)?;
        let path = self.root.join(name);
        std::fs::write(&path, bytes)
            .map_err(|e| BookpatchError::OutputWriteFailed { path: path.clone(), source: e })?;
        debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}

// ── Memory ───────────────────────────────────────────────────────────────

/// Keeps resources in memory, ordered by name.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> BTreeMap<String, Vec<u8>> {
        self.entries
    }
}

impl OutputSink for MemorySink {
    fn write_resource(&mut self, name: &str, bytes: &[u8]) -> Result<(), BookpatchError> {
        if self.entries.contains_key(name) {
            return Err(BookpatchError::DuplicateResource {
                name: name.to_string(),
            });
        }
        self.entries.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }
}

// ── Zip archive ──────────────────────────────────────────────────────────

/// Writes resources as entries of a zip archive. New entries are deflated;
/// entries copied from another archive keep their original compression.
pub struct ArchiveSink<W: Write + Seek> {
    writer: ZipWriter<W>,
    written: HashSet<String>,
    options: SimpleFileOptions,
}

impl<W: Write + Seek> ArchiveSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: ZipWriter::new(inner),
            written: HashSet::new(),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    /// Copy entry `index` of `source` without decompressing it. Returns the
    /// entry name.
    pub fn copy_raw<R: Read + Seek>(
        &mut self,
        source: &mut ZipArchive<R>,
        index: usize,
    ) -> Result<String, BookpatchError> {
        let entry = source
            .by_index_raw(index)
            .map_err(|e| BookpatchError::ArchiveWriteFailed {
                entry: format!("#{index}"),
                detail: e.to_string(),
            })?;
        let name = entry.name().to_string();
        claim(&mut self.written, &name)?;
        self.writer
            .raw_copy_file(entry)
            .map_err(|e| BookpatchError::ArchiveWriteFailed {
                entry: name.clone(),
                detail: e.to_string(),
            })?;
        Ok(name)
    }

    /// Write the central directory and hand back the underlying writer.
    pub fn finish(self) -> Result<W, BookpatchError> {
        self.writer
            .finish()
            .map_err(|e| BookpatchError::ArchiveWriteFailed {
                entry: "<central directory>".to_string(),
                detail: e.to_string(),
            })
    }
}

impl<W: Write + Seek> OutputSink for ArchiveSink<W> {
    fn write_resource(&mut self, name: &str, bytes: &[u8]) -> Result<(), BookpatchError> {
        claim(&mut self.written, name)?;
        let wrap = |e: String| BookpatchError::ArchiveWriteFailed {
            entry: name.to_string(),
            detail: e,
        };
        self.writer
            .start_file(name, self.options)
            .map_err(|e| wrap(e.to_string()))?;
        self.writer.write_all(bytes).map_err(|e| wrap(e.to_string()))?;
        debug!("Added archive entry {} ({} bytes)", name, bytes.len());
        Ok(())
    }
}
