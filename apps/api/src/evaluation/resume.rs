//! Resume upload → plain text.

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::AppError;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported resume type '{0}'. Upload a PDF or text file.")]
    UnsupportedType(String),

    #[error("Resume text file is not valid UTF-8")]
    InvalidUtf8,

    #[error("Could not read PDF: {0}")]
    Pdf(String),
}

impl From<ExtractError> for AppError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::Pdf(_) => AppError::UnprocessableEntity(e.to_string()),
            _ => AppError::Validation(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeKind {
    Pdf,
    Text,
}

impl ResumeKind {
    /// Decides by file extension first, then by content type.
    pub fn detect(file_name: Option<&str>, content_type: Option<&str>) -> Result<Self, ExtractError> {
        let name = file_name.unwrap_or_default().to_ascii_lowercase();
        if name.ends_with(".pdf") {
            return Ok(ResumeKind::Pdf);
        }
        if name.ends_with(".txt") {
            return Ok(ResumeKind::Text);
        }
        match content_type.map(|c| c.to_ascii_lowercase()) {
            Some(c) if c == "application/pdf" => Ok(ResumeKind::Pdf),
            Some(c) if c.starts_with("text/plain") => Ok(ResumeKind::Text),
            _ => Err(ExtractError::UnsupportedType(if name.is_empty() {
                content_type.unwrap_or("unknown").to_string()
            } else {
                name
            })),
        }
    }
}

/// Extracts resume text. PDF parsing runs on the blocking pool.
pub async fn extract_text(kind: ResumeKind, data: Bytes) -> Result<String, ExtractError> {
    match kind {
        ResumeKind::Text => decode_text(&data),
        ResumeKind::Pdf => tokio::task::spawn_blocking(move || extract_pdf(&data))
            .await
            .map_err(|e| {
                warn!("PDF extraction task failed: {e}");
                ExtractError::Pdf("the document could not be parsed".to_string())
            })?,
    }
}

fn decode_text(data: &[u8]) -> Result<String, ExtractError> {
    String::from_utf8(data.to_vec()).map_err(|_| ExtractError::InvalidUtf8)
}

fn extract_pdf(data: &[u8]) -> Result<String, ExtractError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(data).map_err(|e| ExtractError::Pdf(e.to_string()))?;
    let text = join_pages(&pages);
    debug!("Extracted {} chars from {} PDF pages", text.len(), pages.len());
    Ok(text)
}

/// Each page's text followed by a newline.
fn join_pages(pages: &[String]) -> String {
    let mut out = String::with_capacity(pages.iter().map(|p| p.len() + 1).sum());
    for page in pages {
        out.push_str(page);
        out.push('\n');
    }
    out
}

/// True when extraction produced something besides whitespace.
pub fn has_content(text: &str) -> bool {
    !text.trim().is_empty()
}
