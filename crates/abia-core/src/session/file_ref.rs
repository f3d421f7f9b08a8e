//! File references tracked by a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Type tag for spreadsheets (.xlsx, .xls, .csv).
pub const FILE_TYPE_EXCEL: &str = "excel";
/// Type tag for PDF files.
pub const FILE_TYPE_PDF: &str = "pdf";
/// Type tag for Word files (.docx, .doc).
pub const FILE_TYPE_WORD: &str = "word";
/// Type tag for plain text and markdown.
pub const FILE_TYPE_TEXT: &str = "text";
/// Fallback type tag.
pub const FILE_TYPE_DOCUMENT: &str = "document";

/// A reference to a file attached to (or produced within) a session.
///
/// Paths are unique within a session's `active_files`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    /// Absolute or user-supplied path.
    pub path: String,
    /// Display name (file name component of `path`).
    pub name: String,
    /// Type tag (`excel`, `pdf`, `word`, `text`, `image`, `document`).
    #[serde(rename = "type")]
    pub file_type: String,
    /// Size in bytes, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// True for files produced by an agent (translations, letters).
    #[serde(default)]
    pub generated: bool,
    pub added_at: DateTime<Utc>,
}

impl FileRef {
    /// Builds a reference for a user-supplied path without touching the filesystem.
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = Path::new(&path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone());
        let file_type = file_type_tag(&path).to_string();
        Self {
            path,
            name,
            file_type,
            size: None,
            generated: false,
            added_at: Utc::now(),
        }
    }

    /// Builds a reference and fills in the size from file metadata when available.
    pub async fn stat(path: impl Into<String>) -> Self {
        let mut file = Self::new(path);
        if let Ok(meta) = tokio::fs::metadata(&file.path).await {
            file.size = Some(meta.len());
        }
        file
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Marks the file as produced by an agent.
    pub fn generated(mut self) -> Self {
        self.generated = true;
        self
    }
}

/// Derives the type tag of a path from its extension.
pub fn file_type_tag(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "xlsx" | "xls" | "csv" => FILE_TYPE_EXCEL,
        "pdf" => FILE_TYPE_PDF,
        "docx" | "doc" => FILE_TYPE_WORD,
        "txt" | "md" => FILE_TYPE_TEXT,
        _ => match mime_guess::from_path(path).first_raw() {
            Some(mime) if mime.starts_with("text/") => FILE_TYPE_TEXT,
            Some(mime) if mime.starts_with("image/") => "image",
            _ => FILE_TYPE_DOCUMENT,
        },
    }
}
