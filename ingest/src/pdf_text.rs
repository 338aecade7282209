//! PDF statement text extraction.
//!
//! Only the first few thousand characters go to the model; a multi-page
//! statement tail adds token cost without adding the transaction table, which
//! banks put up front.

use thiserror::Error;

/// Characters of extracted text forwarded to the model.
pub const TEXT_CAP: usize = 8_000;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("failed to extract text from pdf: {0}")]
    Extract(#[from] pdf_extract::OutputError),
    #[error("pdf contains no extractable text")]
    Empty,
}

/// Extract statement text from PDF bytes, capped at [`TEXT_CAP`] characters.
pub fn extract_statement_text(bytes: &[u8]) -> Result<String, PdfError> {
    let text = pdf_extract::extract_text_from_mem(bytes)?;
    let text = truncate_chars(&text, TEXT_CAP);
    if text.trim().is_empty() {
        return Err(PdfError::Empty);
    }
    Ok(text.to_string())
}

/// Truncate on a char boundary; byte-index slicing would panic mid-codepoint.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_short_text_intact() {
        assert_eq!(truncate_chars("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_cuts_at_char_count() {
        assert_eq!(truncate_chars("hello world", 5), "hello");
    }

    #[test]
    fn test_truncate_respects_multibyte_boundaries() {
        let text = "käse küche";
        let cut = truncate_chars(text, 4);
        assert_eq!(cut, "käse");
    }

    #[test]
    fn test_garbage_bytes_are_an_extract_error() {
        assert!(matches!(
            extract_statement_text(b"not a pdf at all"),
            Err(PdfError::Extract(_))
        ));
    }
}
