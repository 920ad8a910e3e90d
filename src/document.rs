use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

const PARSER_PANIC: &str = "PDF parser failed on this file";

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("{0}")]
    Unreadable(String),
}

/// Extracts the text of every page of a PDF, in page order.
///
/// Malformed input is reported as [`DocumentError::Unreadable`], including
/// inputs that make the PDF parser panic.
pub fn extract_text(bytes: &[u8]) -> Result<String, DocumentError> {
    let parse = || pdf_extract::extract_text_from_mem(bytes);
    match panic::catch_unwind(AssertUnwindSafe(parse)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(DocumentError::Unreadable(e.to_string())),
        Err(_) => Err(DocumentError::Unreadable(PARSER_PANIC.to_string())),
    }
}

fn allowed_in_collection_name(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Maps a document name onto a collection name: every character outside
/// `[A-Za-z0-9_-]` becomes `_`.
///
/// Distinct names can collide (`"a b.pdf"` and `"a_b_pdf"` share `a_b_pdf`).
pub fn sanitize_collection_name(name: &str) -> String {
    name.replace(|c: char| !allowed_in_collection_name(c), "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_disallowed_characters() {
        assert_eq!(
            sanitize_collection_name("report (final).pdf"),
            "report__final__pdf"
        );
        assert_eq!(sanitize_collection_name("my-doc_v2.pdf"), "my-doc_v2_pdf");
        assert_eq!(sanitize_collection_name("résumé.pdf"), "r_sum__pdf");
    }

    #[test]
    fn sanitization_is_idempotent() {
        for name in ["report (final).pdf", "a b/c\\d.pdf", "plain", ""] {
            let once = sanitize_collection_name(name);
            assert_eq!(sanitize_collection_name(&once), once);
        }
    }

    #[test]
    fn cosmetically_different_names_collide() {
        assert_eq!(
            sanitize_collection_name("report (final).pdf"),
            sanitize_collection_name("report__final__pdf")
        );
        assert_eq!(
            sanitize_collection_name("a b.pdf"),
            sanitize_collection_name("a_b.pdf")
        );
    }

    #[test]
    fn non_pdf_bytes_are_unreadable() {
        let err = extract_text(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, DocumentError::Unreadable(_)));
    }

    #[test]
    fn empty_input_is_unreadable() {
        assert!(extract_text(&[]).is_err());
    }
}
