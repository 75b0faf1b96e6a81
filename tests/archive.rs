//! Integration test: patch a small EPUB-like archive against a local image
//! server and check the result entry by entry.

mod common;

use bookpatch::{patch_archive, patch_archive_to, ArchiveOptions, BookpatchError, RewriteConfig};
use common::chart_server;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use tempfile::tempdir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const CHAPTER: &str = "<html><body>\n\
<p>Sales:</p>\n\
<img src=\"http://chart.apis.google.com/chart?cht=p3&amp;chd=t:60,40\"/> <img src=\"http://chart.apis.google.com/chart?cht=bvs&amp;chl=a+b\"/>\n\
</body></html>\n";

fn cover_bytes() -> Vec<u8> {
    (0u8..=255).cycle().take(4096).collect()
}

fn write_book(path: &Path, chapter: &str) {
    let mut w = ZipWriter::new(std::fs::File::create(path).unwrap());
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    w.start_file("mimetype", stored).unwrap();
    w.write_all(b"application/epub+zip").unwrap();
    w.start_file("OEBPS/ch01.xhtml", deflated).unwrap();
    w.write_all(chapter.as_bytes()).unwrap();
    w.start_file("OEBPS/cover.jpg", stored).unwrap();
    w.write_all(&cover_bytes()).unwrap();
    w.finish().unwrap();
}

fn read_entry(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    archive
        .by_name(name)
        .unwrap_or_else(|e| panic!("{name}: {e}"))
        .read_to_end(&mut buf)
        .unwrap();
    buf
}

fn open(path: &Path) -> ZipArchive<Cursor<Vec<u8>>> {
    ZipArchive::new(Cursor::new(std::fs::read(path).unwrap())).unwrap()
}

fn config_for(server: &chart_server::ChartServer) -> RewriteConfig {
    RewriteConfig::archive_charts()
        .to_builder()
        .base_url(&server.base_url)
        .fetch_timeout_secs(5)
        .build()
        .unwrap()
}

#[tokio::test]
async fn two_charts_become_local_images() {
    common::init_tracing();
    let server = chart_server::start();
    let dir = tempdir().unwrap();
    let book = dir.path().join("book.epub");
    write_book(&book, CHAPTER);

    let stats = patch_archive(&book, &config_for(&server), &ArchiveOptions::default())
        .await
        .unwrap();

    assert_eq!(stats.documents_rewritten, 1);
    assert_eq!(stats.entries_copied, 2);
    assert_eq!(stats.resources_written, 2);

    let mut archive = open(&book);
    let chapter = String::from_utf8(read_entry(&mut archive, "OEBPS/ch01.xhtml")).unwrap();
    assert_eq!(
        chapter,
        "<html><body>\n<p>Sales:</p>\n\
         <img src=\"images/eqn_00.png\"/> <img src=\"images/eqn_01.png\"/>\n\
         </body></html>\n"
    );

    // Entities and `+` are decoded before the request is made.
    assert_eq!(
        server.requests(),
        vec![
            "/chart?cht=p3&chd=t:60,40".to_string(),
            "/chart?cht=bvs&chl=a%20b".to_string(),
        ]
    );
    assert_eq!(
        read_entry(&mut archive, "images/eqn_00.png"),
        chart_server::body_for("/chart?cht=p3&chd=t:60,40")
    );
    assert_eq!(
        read_entry(&mut archive, "images/eqn_01.png"),
        chart_server::body_for("/chart?cht=bvs&chl=a%20b")
    );

    assert_eq!(read_entry(&mut archive, "OEBPS/cover.jpg"), cover_bytes());
    let first = archive.by_index(0).unwrap();
    assert_eq!(first.name(), "mimetype");
    assert_eq!(first.compression(), CompressionMethod::Stored);
}

#[tokio::test]
async fn failed_fetch_leaves_original_untouched() {
    common::init_tracing();
    let server = chart_server::start();
    let dir = tempdir().unwrap();
    let book = dir.path().join("book.epub");
    let chapter = CHAPTER.replace("cht=bvs", "cht=missing");
    write_book(&book, &chapter);
    let before = std::fs::read(&book).unwrap();

    let err = patch_archive(&book, &config_for(&server), &ArchiveOptions::default())
        .await
        .unwrap_err();

    match err {
        BookpatchError::FetchFailed { url, reason } => {
            assert!(url.contains("missing"), "url: {url}");
            assert!(reason.contains("404"), "reason: {reason}");
        }
        other => panic!("expected FetchFailed, got {other:?}"),
    }
    assert_eq!(std::fs::read(&book).unwrap(), before);
    // No temp file left next to the book.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn patch_to_separate_output_keeps_input() {
    common::init_tracing();
    let server = chart_server::start();
    let dir = tempdir().unwrap();
    let book = dir.path().join("book.epub");
    let out = dir.path().join("book.patched.epub");
    write_book(&book, CHAPTER);
    let before = std::fs::read(&book).unwrap();

    patch_archive_to(&book, &out, &config_for(&server), &ArchiveOptions::default())
        .await
        .unwrap();

    assert_eq!(std::fs::read(&book).unwrap(), before);
    let mut archive = open(&out);
    assert_eq!(archive.len(), 5);
    assert!(!read_entry(&mut archive, "images/eqn_01.png").is_empty());
}

#[tokio::test]
async fn archive_without_charts_is_rewritten_verbatim() {
    common::init_tracing();
    let server = chart_server::start();
    let dir = tempdir().unwrap();
    let book = dir.path().join("plain.epub");
    write_book(&book, "<p>No charts here.</p>\n");

    let stats = patch_archive(&book, &config_for(&server), &ArchiveOptions::default())
        .await
        .unwrap();

    assert_eq!(stats.resources_written, 0);
    assert!(server.requests().is_empty());
    let mut archive = open(&book);
    assert_eq!(archive.len(), 3);
    assert_eq!(
        read_entry(&mut archive, "OEBPS/ch01.xhtml"),
        b"<p>No charts here.</p>\n"
    );
}
