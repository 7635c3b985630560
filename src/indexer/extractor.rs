use std::path::Path;

use crate::error::IngestionError;

/// Turns raw document bytes into text.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, IngestionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportedFormat {
    PlainText,
    Pdf,
}

impl SupportedFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "txt" | "md" => Some(Self::PlainText),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn extractor(self) -> Box<dyn TextExtractor> {
        match self {
            Self::PlainText => Box::new(PlainTextExtractor),
            Self::Pdf => Box::new(PdfExtractor),
        }
    }
}

pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, IngestionError> {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| IngestionError::Extraction(format!("source is not valid UTF-8: {}", e)))
    }
}

pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, IngestionError> {
        pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| IngestionError::Extraction(format!("failed to extract PDF text: {}", e)))
    }
}
