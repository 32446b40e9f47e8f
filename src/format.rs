use std::path::Path;

use crate::error::{ReadError, Result};

/// Extension of text-encoded files.
pub const ASCII_EXTENSION: &str = "slow5";
/// Extension of binary-encoded files.
pub const BINARY_EXTENSION: &str = "blow5";

/// The two wire encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Line-oriented text encoding (`.slow5`)
    Ascii,
    /// Length-prefixed binary encoding (`.blow5`)
    Binary,
}
impl Format {
    /// The format name written on the `#file_format` header line.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Format::Ascii => "slow5",
            Format::Binary => "blow5",
        }
    }

    /// Resolves a format name from the `#file_format` header line.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "slow5" => Some(Format::Ascii),
            "blow5" => Some(Format::Binary),
            _ => None,
        }
    }

    /// Auto-detects the format from a path's extension.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::UnknownExtension`] when the extension is neither
    /// `.slow5` nor `.blow5`; callers holding an explicit format should
    /// consult [`Format::from_path_opt`] instead.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_path_opt(&path).ok_or_else(|| {
            ReadError::UnknownExtension(path.as_ref().to_string_lossy().to_string()).into()
        })
    }

    /// Extension-implied format, if the extension is recognized.
    #[must_use]
    pub fn from_path_opt<P: AsRef<Path>>(path: P) -> Option<Self> {
        match path.as_ref().extension()?.to_str()? {
            ASCII_EXTENSION => Some(Format::Ascii),
            BINARY_EXTENSION => Some(Format::Binary),
            _ => None,
        }
    }
}
