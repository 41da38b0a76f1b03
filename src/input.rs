//! Reading the transcript and mailbox files.
//!
//! Both corpora are UTF-8. A leading BOM is removed and malformed byte
//! sequences are replaced with U+FFFD (logged once per file).

use std::path::Path;

use tracing::{debug, warn};

use crate::error::{OrderMatchError, Result};

/// Read a whole corpus file into a `String`.
pub fn read_corpus(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| OrderMatchError::io(path, e))?;
    let text = decode_utf8(&bytes, path);
    debug!(path = %path.display(), bytes = bytes.len(), "Read corpus");
    Ok(text)
}

fn decode_utf8(bytes: &[u8], path: &Path) -> String {
    let (text, had_errors) = encoding_rs::UTF_8.decode_with_bom_removal(bytes);
    if had_errors {
        warn!(
            path = %path.display(),
            "Input is not valid UTF-8, malformed sequences were replaced"
        );
    }
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bom_removed() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("Buyer:\n".as_bytes());
        assert_eq!(decode_utf8(&bytes, Path::new("t.txt")), "Buyer:\n");
    }

    #[test]
    fn test_invalid_bytes_replaced() {
        let text = decode_utf8(b"Bestellung \xFF 1", Path::new("t.txt"));
        assert_eq!(text, "Bestellung \u{FFFD} 1");
    }

    #[test]
    fn test_missing_file() {
        let err = read_corpus("/definitely/not/here.txt").unwrap_err();
        assert!(matches!(err, OrderMatchError::FileNotFound(_)));
    }

    #[test]
    fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mail.txt");
        std::fs::write(&path, "attachment: a.pdf\n").unwrap();
        assert_eq!(read_corpus(&path).unwrap(), "attachment: a.pdf\n");
    }
}
