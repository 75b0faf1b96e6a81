//! Archive pass: rewrite document entries, copy everything else.
//!
//! Entries are visited in central-directory order. A document entry is read
//! fully into memory, rewritten line by line (each fetched image is added to
//! the destination archive as it is resolved), and then stored under its
//! original name. Any other entry is copied raw, so its bytes and
//! compression method survive unchanged. That matters for EPUB, whose
//! `mimetype` entry must stay first and uncompressed.
//!
//! Documents that are not valid UTF-8 (older Latin-1 chapters) are read one
//! byte per char and written back the same way, so bytes outside the
//! rewritten references are kept exactly.

use crate::config::ArchiveOptions;
use crate::error::BookpatchError;
use crate::output::RewriteStats;
use crate::pipeline::allocate::SequenceCounter;
use crate::pipeline::resolve::ResourceResolver;
use crate::pipeline::rewrite::Rewriter;
use crate::pipeline::sink::{ArchiveSink, OutputSink};
use std::io::{Read, Seek, Write};
use std::path::Path;
use tracing::{debug, info};
use zip::ZipArchive;

/// Rewrite `source` into `dest` and return the destination writer once the
/// archive has been finalised.
pub async fn rewrite_archive<Src, Dst, R>(
    source: Src,
    source_path: &Path,
    dest: Dst,
    rewriter: &Rewriter<R>,
    options: &ArchiveOptions,
    counter: &mut SequenceCounter,
) -> Result<(Dst, RewriteStats), BookpatchError>
where
    Src: Read + Seek,
    Dst: Write + Seek,
    R: ResourceResolver,
{
    let mut archive = ZipArchive::new(source).map_err(|e| BookpatchError::InvalidArchive {
        path: source_path.to_path_buf(),
        detail: e.to_string(),
    })?;
    let mut sink = ArchiveSink::new(dest);
    let mut stats = RewriteStats::default();
    let progress = rewriter.progress();

    if let Some(cb) = progress {
        cb.on_run_start(archive.len());
    }

    for index in 0..archive.len() {
        let name = entry_name(&mut archive, index, source_path)?;

        if !options.is_document(&name) {
            sink.copy_raw(&mut archive, index)?;
            debug!("Copied {}", name);
            stats.entries_copied += 1;
            if let Some(cb) = progress {
                cb.on_entry_copied(&name);
            }
            continue;
        }

        info!("Processing {}", name);
        if let Some(cb) = progress {
            cb.on_document_start(&name);
        }

        let contents = read_document(&mut archive, index, &name)?;
        let (rewritten, written) = rewriter
            .rewrite_text(contents.text(), counter, &mut sink)
            .await?;
        sink.write_resource(&name, &contents.encode(rewritten)?)?;

        stats.documents_rewritten += 1;
        stats.resources_written += written;
        if let Some(cb) = progress {
            cb.on_document_complete(&name, written);
        }
    }

    let dest = sink.finish()?;
    Ok((dest, stats))
}

fn entry_name<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    index: usize,
    source_path: &Path,
) -> Result<String, BookpatchError> {
    let entry = archive
        .by_index_raw(index)
        .map_err(|e| BookpatchError::InvalidArchive {
            path: source_path.to_path_buf(),
            detail: format!("entry #{index}: {e}"),
        })?;
    Ok(entry.name().to_string())
}

/// A document entry's text and the encoding it is written back in.
enum Document {
    Utf8(String),
    Latin1 { name: String, text: String },
}

impl Document {
    fn decode(name: &str, bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => Document::Utf8(text),
            Err(e) => {
                debug!("{} is not UTF-8 ({}); reading it as Latin-1", name, e.utf8_error());
                let text = e.into_bytes().into_iter().map(char::from).collect();
                Document::Latin1 {
                    name: name.to_string(),
                    text,
                }
            }
        }
    }

    fn text(&self) -> &str {
        match self {
            Document::Utf8(text) | Document::Latin1 { text, .. } => text,
        }
    }

    fn encode(&self, rewritten: String) -> Result<Vec<u8>, BookpatchError> {
        match self {
            Document::Utf8(_) => Ok(rewritten.into_bytes()),
            Document::Latin1 { name, .. } => rewritten
                .chars()
                .map(|c| {
                    u8::try_from(c).map_err(|_| BookpatchError::UnreadableEntry {
                        entry: name.clone(),
                        detail: format!("rewritten text has {c:?}, which Latin-1 cannot hold"),
                    })
                })
                .collect(),
        }
    }
}

fn read_document<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    index: usize,
    name: &str,
) -> Result<Document, BookpatchError> {
    let unreadable = |detail: String| BookpatchError::UnreadableEntry {
        entry: name.to_string(),
        detail,
    };
    let mut entry = archive
        .by_index(index)
        .map_err(|e| unreadable(e.to_string()))?;
    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| unreadable(e.to_string()))?;
    Ok(Document::decode(name, bytes))
}
