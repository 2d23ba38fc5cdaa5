//! Raw document loading keyed by file extension.

use std::path::Path;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Pdf,
    PlainText,
    Markdown,
}

impl DocumentKind {
    pub const SUPPORTED_EXTENSIONS: &'static [&'static str] = &["pdf", "txt", "md", "markdown"];

    /// Accepts the extension with or without a leading dot, any case.
    pub fn from_extension(ext: &str) -> Result<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Ok(Self::Pdf),
            "txt" => Ok(Self::PlainText),
            "md" | "markdown" => Ok(Self::Markdown),
            _ => Err(Error::UnsupportedFileType(ext)),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::from_extension(ext)
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::PlainText => "text/plain",
            Self::Markdown => "text/markdown",
        }
    }

    /// Turn raw file bytes into text.
    pub fn extract(self, bytes: &[u8]) -> Result<String> {
        match self {
            Self::PlainText | Self::Markdown => Ok(decode_text(bytes)),
            Self::Pdf => extract_pdf(bytes),
        }
    }
}

fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[cfg(feature = "pdf")]
fn extract_pdf(bytes: &[u8]) -> Result<String> {
    // pdf-extract panics on some malformed files
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(Error::Load(format!("pdf: {e}"))),
        Err(_) => Err(Error::Load("pdf: malformed document".into())),
    }
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf(_bytes: &[u8]) -> Result<String> {
    Err(Error::Load("pdf support not compiled in (enable the `pdf` feature)".into()))
}

/// A document loaded into memory, ready for chunking.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub kind: DocumentKind,
    pub text: String,
}

/// Size-checked loading from disk or from in-memory bytes.
#[derive(Debug, Clone, Copy)]
pub struct DocumentLoader {
    max_file_size: u64,
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self { max_file_size: crate::config::DEFAULT_MAX_FILE_SIZE }
    }
}

impl DocumentLoader {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    pub fn max_file_size(&self) -> u64 { self.max_file_size }

    pub fn load_path(&self, path: &Path) -> Result<LoadedDocument> {
        let kind = DocumentKind::from_path(path)?;
        let meta = std::fs::metadata(path)
            .map_err(|e| Error::Load(format!("{}: {e}", path.display())))?;
        self.check_size(meta.len())?;
        let bytes = std::fs::read(path).map_err(|e| Error::Load(format!("{}: {e}", path.display())))?;
        Ok(LoadedDocument { kind, text: kind.extract(&bytes)? })
    }

    pub fn load_bytes(&self, bytes: &[u8], extension: &str) -> Result<LoadedDocument> {
        let kind = DocumentKind::from_extension(extension)?;
        self.check_size(bytes.len() as u64)?;
        Ok(LoadedDocument { kind, text: kind.extract(bytes)? })
    }

    fn check_size(&self, size: u64) -> Result<()> {
        if size > self.max_file_size {
            return Err(Error::FileTooLarge { size, limit: self.max_file_size });
        }
        Ok(())
    }
}
