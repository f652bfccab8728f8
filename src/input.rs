//! Loading the text to type.

use crate::error::{Result, TyperError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where the text for the next session comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSource {
    /// Text entered directly (command line or console).
    Inline(String),
    /// A UTF-8 text file, read when the session starts.
    File(PathBuf),
}

impl TextSource {
    pub fn describe(&self) -> String {
        match self {
            Self::Inline(text) => format!("{} characters of text", text.chars().count()),
            Self::File(path) => format!("file {}", path.display()),
        }
    }
}

/// Resolves a source into the text to type.
///
/// Inline text is trimmed when `trim_inline` is set; file contents are typed
/// verbatim. Either way an empty result is rejected.
pub fn load_text(source: &TextSource, trim_inline: bool) -> Result<String> {
    let text = match source {
        TextSource::Inline(text) if trim_inline => text.trim().to_string(),
        TextSource::Inline(text) => text.clone(),
        TextSource::File(path) => read_text_file(path)?,
    };

    if text.is_empty() {
        return Err(TyperError::EmptyInput);
    }
    Ok(text)
}

pub fn read_text_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => TyperError::file_not_found(path),
        _ => TyperError::Io(e),
    })?;
    debug!(path = %path.display(), bytes = bytes.len(), "read text file");

    String::from_utf8(bytes).map_err(|e| TyperError::decode(path, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_inline_trimmed() {
        let source = TextSource::Inline("  hello world \n".to_string());
        assert_eq!(load_text(&source, true).unwrap(), "hello world");
        assert_eq!(load_text(&source, false).unwrap(), "  hello world \n");
    }

    #[test]
    fn test_inline_whitespace_only_is_empty() {
        let source = TextSource::Inline(" \n\t ".to_string());
        assert!(matches!(load_text(&source, true), Err(TyperError::EmptyInput)));
    }

    #[test]
    fn test_file_verbatim() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all("  line one\nline two\n".as_bytes()).unwrap();

        let source = TextSource::File(file.path().to_path_buf());
        assert_eq!(load_text(&source, true).unwrap(), "  line one\nline two\n");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = TextSource::File(dir.path().join("nope.txt"));
        assert!(matches!(
            load_text(&source, true),
            Err(TyperError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0x66, 0x6f, 0xff, 0xfe]).unwrap();

        let source = TextSource::File(file.path().to_path_buf());
        assert!(matches!(
            load_text(&source, true),
            Err(TyperError::Decode { .. })
        ));
    }

    #[test]
    fn test_empty_file() {
        let file = NamedTempFile::new().unwrap();
        let source = TextSource::File(file.path().to_path_buf());
        assert!(matches!(load_text(&source, true), Err(TyperError::EmptyInput)));
    }
}
