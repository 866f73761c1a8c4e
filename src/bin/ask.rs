//! CLI tool for querying the knowledge base.
//!
//! Usage: ask <question> [book_id]

use std::env;
use std::process;

use bookrag_backend::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();

    let state = AppState::initialize().await?;

    let Some(question) = args.first() else {
        let books = state.engine.list_books().await.unwrap_or_default();
        eprintln!("Usage: ask <question> [book_id]");
        eprintln!("Example: ask 'Who is the Queen?' alice");
        eprintln!();
        if books.is_empty() {
            eprintln!("Available books: none");
        } else {
            eprintln!("Available books: {}", books.join(", "));
        }
        eprintln!("Current provider: {}", state.engine.provider_name());
        process::exit(1);
    };

    let book_id = args.get(1).map(String::as_str);

    println!("Querying with {}...", state.engine.provider_name());

    let outcome = state.engine.query(question, book_id, 3).await?;

    println!("\nSOURCES:");
    for source in &outcome.sources {
        println!("  [{}] {}...", source.book, source.text);
    }

    println!("\nANSWER:\n{}", outcome.answer);
    Ok(())
}
