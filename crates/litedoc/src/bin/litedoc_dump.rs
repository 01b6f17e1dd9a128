//! `litedoc-dump`: decode a litedoc document (stdin) to JSON (stdout).
//!
//! Usage:
//!   litedoc-dump [--config FILE] [--stats]
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`.

use std::io::{self, Read, Write};

use litedoc::{Document, DocumentConfig};
use tracing_subscriber::EnvFilter;

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut config = DocumentConfig::default();
    let mut stats = false;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--stats" => stats = true,
            "--config" => {
                i += 1;
                let Some(path) = args.get(i) else {
                    fail("--config needs a file");
                };
                let text = std::fs::read_to_string(path).unwrap_or_else(|e| fail(format!("{path}: {e}")));
                config = DocumentConfig::from_toml_str(&text).unwrap_or_else(|e| fail(e));
            }
            other => fail(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    let mut buf = Vec::new();
    if let Err(e) = io::stdin().read_to_end(&mut buf) {
        fail(e);
    }

    let mut doc = Document::from_bytes_with(buf, config).unwrap_or_else(|e| fail(e));
    if stats {
        if let Err(e) = doc.materialize_all() {
            fail(e);
        }
    }
    let json = doc.to_json().unwrap_or_else(|e| fail(e));
    let mut out = io::stdout().lock();
    let written = serde_json::to_writer_pretty(&mut out, &json)
        .map_err(io::Error::from)
        .and_then(|_| writeln!(out));
    if let Err(e) = written {
        fail(e);
    }
    if stats {
        let s = doc.stats();
        eprintln!(
            "materialized={} nodes={} bytes={}",
            s.materialized,
            s.nodes_created,
            doc.source().len()
        );
    }
}
