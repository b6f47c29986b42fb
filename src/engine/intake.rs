//! File intake
//!
//! Decides which files the board accepts and derives their display names.

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::IntakeError;

/// Extensions accepted regardless of MIME type
pub const ALLOWED_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a", "aac", "flac", "webm"];

/// One file handed to the engine
#[derive(Clone)]
pub struct AudioFile {
    pub name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl AudioFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: None,
            bytes,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Read a file from disk
    pub fn from_path(path: &Path) -> Result<Self, IntakeError> {
        let bytes = std::fs::read(path).map_err(|source| IntakeError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }

    /// Lower-cased extension of the file name
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.name)
    }

    /// Whether intake accepts this file
    pub fn is_supported(&self) -> bool {
        let by_extension = self
            .extension()
            .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false);
        let by_mime = self
            .mime
            .as_deref()
            .map(|mime| mime.to_ascii_lowercase().starts_with("audio/"))
            .unwrap_or(false);
        by_extension || by_mime
    }

    pub fn display_name(&self) -> String {
        display_name(&self.name)
    }
}

impl fmt::Debug for AudioFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

fn extension_regex() -> &'static Regex {
    static EXTENSION: OnceLock<Regex> = OnceLock::new();
    EXTENSION.get_or_init(|| Regex::new(r"\.[^/.]+$").expect("static regex is valid"))
}

fn extension_of(name: &str) -> Option<String> {
    extension_regex()
        .find(name)
        .map(|m| m.as_str()[1..].to_ascii_lowercase())
}

/// File name with its last extension stripped
pub fn display_name(file_name: &str) -> String {
    extension_regex().replace(file_name, "").into_owned()
}

/// Split files into accepted and rejected
pub fn partition(files: Vec<AudioFile>) -> (Vec<AudioFile>, Vec<AudioFile>) {
    files.into_iter().partition(AudioFile::is_supported)
}
