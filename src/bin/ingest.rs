//! CLI tool for ingesting a book into the knowledge base.
//!
//! Usage: ingest <file.txt> [book_id] [title]

use std::env;
use std::fs;
use std::path::Path;
use std::process;

use anyhow::Context;

use bookrag_backend::{AppState, RagError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let Some(file_path) = args.first() else {
        eprintln!("Usage: ingest <file.txt> [book_id] [title]");
        eprintln!("Example: ingest data/alice.txt alice 'Alice in Wonderland'");
        process::exit(1);
    };

    let state = AppState::initialize().await?;

    let default_id = Path::new(file_path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_lowercase().replace(' ', "-"))
        .unwrap_or_else(|| "book".to_string());
    let book_id = args.get(1).cloned().unwrap_or(default_id);
    let title = args.get(2).cloned().unwrap_or_else(|| book_id.replace('-', " "));

    let bytes = fs::read(file_path).with_context(|| format!("Failed to read {file_path}"))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| RagError::InvalidInput(format!("{file_path} is not valid UTF-8 text")))?;

    println!(
        "Ingesting '{}' (id: {}) using {}...",
        title,
        book_id,
        state.engine.provider_name()
    );

    let progress = |done: usize, total: usize| {
        if done % 50 == 0 || done == total {
            println!("  Processed {done}/{total} chunks...");
        }
    };

    let chunks = state
        .engine
        .ingest(&text, &book_id, Some(&title), Some(&progress))
        .await?;

    println!("Done! Added {chunks} chunks to the knowledge base.");
    Ok(())
}
