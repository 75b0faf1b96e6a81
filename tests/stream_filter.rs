//! Integration test: inline TeX in a text stream becomes Markdown images
//! fetched from a local server.

mod common;

use bookpatch::{filter_stream, filter_text, BookpatchError, MemorySink, RewriteConfig};
use common::chart_server;
use tempfile::tempdir;

fn config_for(server: &chart_server::ChartServer) -> RewriteConfig {
    RewriteConfig::inline_equations()
        .to_builder()
        .base_url(format!("{}chart?cht=tx&chl=", server.base_url))
        .fetch_timeout_secs(5)
        .build()
        .unwrap()
}

#[tokio::test]
async fn inline_math_becomes_markdown_image() {
    common::init_tracing();
    let server = chart_server::start();
    let root = tempdir().unwrap();
    std::fs::create_dir(root.path().join("tpimg")).unwrap();

    let input = "The value is $x+1$ units.\nNo maths here.\n";
    let mut output = Vec::new();
    let stats = filter_stream(input.as_bytes(), &mut output, &config_for(&server), root.path())
        .await
        .unwrap();

    assert_eq!(
        String::from_utf8(output).unwrap(),
        "The value is ![x+1](tpimg/eqn_00.png) units.\nNo maths here.\n"
    );
    assert_eq!(stats.lines_processed, 2);
    assert_eq!(stats.resources_written, 1);
    assert_eq!(
        std::fs::read(root.path().join("tpimg/eqn_00.png")).unwrap(),
        chart_server::body_for("/chart?cht=tx&chl=x+1")
    );
}

#[tokio::test]
async fn display_math_is_one_occurrence() {
    common::init_tracing();
    let server = chart_server::start();
    let root = tempdir().unwrap();
    std::fs::create_dir(root.path().join("tpimg")).unwrap();

    let mut output = Vec::new();
    filter_stream(
        "See $$a+b$$ and $c$.\n".as_bytes(),
        &mut output,
        &config_for(&server),
        root.path(),
    )
    .await
    .unwrap();

    assert_eq!(
        String::from_utf8(output).unwrap(),
        "See ![a+b](tpimg/eqn_00.png) and ![c](tpimg/eqn_01.png).\n"
    );
    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn counter_runs_across_lines() {
    common::init_tracing();
    let server = chart_server::start();
    let mut sink = MemorySink::new();

    let (text, stats) = filter_text("$a$\n$b$ $c$\n", &config_for(&server), &mut sink)
        .await
        .unwrap();

    assert_eq!(
        text,
        "![a](tpimg/eqn_00.png)\n![b](tpimg/eqn_01.png) ![c](tpimg/eqn_02.png)\n"
    );
    assert_eq!(stats.resources_written, 3);
    let names: Vec<&str> = sink.names().collect();
    assert_eq!(
        names,
        vec!["tpimg/eqn_00.png", "tpimg/eqn_01.png", "tpimg/eqn_02.png"]
    );
}

#[tokio::test]
async fn missing_image_directory_is_an_error() {
    common::init_tracing();
    let server = chart_server::start();
    let root = tempdir().unwrap();

    let mut output = Vec::new();
    let err = filter_stream(
        "$x$\n".as_bytes(),
        &mut output,
        &config_for(&server),
        root.path(),
    )
    .await
    .unwrap_err();

    assert!(
        matches!(err, BookpatchError::OutputWriteFailed { .. }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn not_found_aborts_the_run() {
    common::init_tracing();
    let server = chart_server::start();
    let root = tempdir().unwrap();
    std::fs::create_dir(root.path().join("tpimg")).unwrap();

    let mut output = Vec::new();
    let err = filter_stream(
        "ok $y$\nthen $missing$\n".as_bytes(),
        &mut output,
        &config_for(&server),
        root.path(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, BookpatchError::FetchFailed { .. }), "got {err:?}");
    assert_eq!(String::from_utf8(output).unwrap(), "ok ![y](tpimg/eqn_00.png)\n");
}
