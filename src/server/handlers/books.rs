use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::core::errors::RagError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub book_id: String,
    pub title: String,
    pub chunks: usize,
}

pub async fn list_books(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, RagError> {
    let books = state.engine.list_books().await?;
    Ok(Json(books))
}

/// Upload and ingest a `.txt` book as multipart form data.
///
/// Fields: `file` (required), `book_id`, `title`. Missing id/title are
/// derived from the filename.
pub async fn upload_book(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, RagError> {
    let mut text: Option<String> = None;
    let mut filename = String::new();
    let mut book_id: Option<String> = None;
    let mut title: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RagError::InvalidInput(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                filename = field.file_name().unwrap_or_default().to_string();
                if !filename.ends_with(".txt") {
                    return Err(RagError::InvalidInput(
                        "only .txt files are supported".to_string(),
                    ));
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| RagError::InvalidInput(e.to_string()))?;
                let decoded = String::from_utf8(bytes.to_vec())
                    .map_err(|_| RagError::InvalidInput("file is not valid UTF-8 text".to_string()))?;
                text = Some(decoded);
            }
            "book_id" => {
                book_id = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| RagError::InvalidInput(e.to_string()))?,
                );
            }
            "title" => {
                title = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| RagError::InvalidInput(e.to_string()))?,
                );
            }
            _ => {}
        }
    }

    let text = text.ok_or_else(|| RagError::InvalidInput("missing 'file' field".to_string()))?;

    let book_id = book_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| default_book_id(&filename));
    let title = title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| default_title(&book_id));

    let chunks = state
        .engine
        .ingest(&text, &book_id, Some(&title), None)
        .await?;

    Ok(Json(IngestResponse {
        book_id,
        title,
        chunks,
    }))
}

pub async fn remove_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> Result<impl IntoResponse, RagError> {
    let books = state.engine.list_books().await?;
    if !books.contains(&book_id) {
        return Err(RagError::NotFound(format!("book '{book_id}' not found")));
    }

    state.engine.delete(&book_id).await?;
    Ok(Json(json!({ "status": "deleted", "book_id": book_id })))
}

fn default_book_id(filename: &str) -> String {
    filename
        .trim_end_matches(".txt")
        .to_lowercase()
        .replace(' ', "-")
}

fn default_title(book_id: &str) -> String {
    book_id
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
