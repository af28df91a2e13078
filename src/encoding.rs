//! Text file decoding with a GBK fallback for files saved by Chinese-locale tools.

use std::fs;
use std::path::Path;

use crate::error::{RectifyError, Result};

/// Decodes bytes as UTF-8 (BOM stripped), falling back to GBK.
///
/// Returns `None` when neither encoding decodes cleanly.
pub fn decode_text(bytes: Vec<u8>) -> Option<String> {
    match String::from_utf8(bytes) {
        Ok(s) => Some(s.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(s)),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, had_errors) = encoding_rs::GBK.decode(&bytes);
            if had_errors {
                None
            } else {
                Some(decoded.into_owned())
            }
        }
    }
}

/// Reads a text file as UTF-8 or GBK.
///
/// # Errors
///
/// Returns [`RectifyError::FileNotFound`] if the file is missing and
/// [`RectifyError::Encoding`] if it is neither UTF-8 nor GBK.
pub fn read_text_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(RectifyError::FileNotFound(path.to_path_buf()));
    }
    let bytes = fs::read(path)?;
    decode_text(bytes).ok_or_else(|| RectifyError::Encoding(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_with_bom_is_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("张三".as_bytes());
        assert_eq!(decode_text(bytes).as_deref(), Some("张三"));
    }

    #[test]
    fn gbk_is_decoded() {
        let (bytes, _, _) = encoding_rs::GBK.encode("工单\t户名");
        assert_eq!(decode_text(bytes.into_owned()).as_deref(), Some("工单\t户名"));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = read_text_file(Path::new("/nonexistent/manifest.txt")).unwrap_err();
        assert!(matches!(err, RectifyError::FileNotFound(_)));
    }
}
