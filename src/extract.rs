//! PDF text extraction.
//!
//! Pages are extracted individually; pages that yield no text (scans, blank
//! pages) are skipped and the remaining pages are each followed by a newline.
//! A PDF without any extractable text produces an empty string, not an error.

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("PDF extraction aborted: {0}")]
    Panicked(String),
}

/// Reads the file at `path` and extracts its text on the blocking pool.
///
/// The PDF library can panic on malformed input; such a panic is reported
/// as [`ExtractError::Panicked`].
pub async fn extract_pdf_text(path: &Path) -> Result<String, ExtractError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| ExtractError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    tokio::task::spawn_blocking(move || extract_pdf_bytes(&bytes))
        .await
        .map_err(|e| ExtractError::Panicked(e.to_string()))?
}

/// Extracts text from in-memory PDF bytes.
pub fn extract_pdf_bytes(bytes: &[u8]) -> Result<String, ExtractError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    Ok(join_pages(&pages))
}

fn join_pages(pages: &[String]) -> String {
    let mut text = String::new();
    for page in pages {
        if page.trim().is_empty() {
            continue;
        }
        text.push_str(page);
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_pdf_bytes(b"not a pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn blank_pages_are_skipped() {
        let pages = vec![
            "first page".to_string(),
            "   \n".to_string(),
            String::new(),
            "third page".to_string(),
        ];
        assert_eq!(join_pages(&pages), "first page\nthird page\n");
    }

    #[test]
    fn no_text_yields_empty_string() {
        let pages = vec![String::new(), "\n\n".to_string()];
        assert_eq!(join_pages(&pages), "");
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let err = extract_pdf_text(Path::new("/nonexistent/regdesk/missing.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
    }
}
