use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use tracing::debug;

use crate::error::LoadError;

/// Raw upload: the file name as shown to the user and its bytes.
#[derive(Clone, Debug)]
pub struct Document {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// Reads a file from disk, keeping only its file name for display.
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let bytes = fs::read(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let filename = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { filename, bytes })
    }
}

/// Text of one physical page. `page_number` is 1-based.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page {
    pub source: String,
    pub page_number: usize,
    pub text: String,
}

pub trait DocumentLoader: Send + Sync {
    /// Returns one page per physical page, in order. Image-only pages come
    /// back with empty text.
    fn load(&self, doc: &Document) -> Result<Vec<Page>, LoadError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PdfLoader;

impl DocumentLoader for PdfLoader {
    fn load(&self, doc: &Document) -> Result<Vec<Page>, LoadError> {
        if !doc.bytes.starts_with(b"%PDF-") {
            return Err(LoadError::NotPdf {
                filename: doc.filename.clone(),
            });
        }
        match panic::catch_unwind(AssertUnwindSafe(|| has_encrypt_entry(&doc.bytes))) {
            Ok(true) => {
                return Err(LoadError::Encrypted {
                    filename: doc.filename.clone(),
                })
            }
            // A parser panic is left for the extractor to report.
            Ok(false) | Err(_) => {}
        }

        // pdf-extract panics on some malformed inputs; treat that like any
        // other extraction failure so the remaining documents still load.
        let extracted = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(&doc.bytes)
        }));
        let texts = match extracted {
            Ok(Ok(texts)) => texts,
            Ok(Err(err)) => {
                return Err(LoadError::Unreadable {
                    filename: doc.filename.clone(),
                    reason: err.to_string(),
                })
            }
            Err(_) => {
                return Err(LoadError::Unreadable {
                    filename: doc.filename.clone(),
                    reason: "extractor panicked".to_string(),
                })
            }
        };

        Ok(pages_from_texts(&doc.filename, texts))
    }
}

/// Numbers extracted page texts from 1, keeping empty pages so numbering
/// matches the physical document.
pub fn pages_from_texts(source: &str, texts: Vec<String>) -> Vec<Page> {
    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| Page {
            source: source.to_string(),
            page_number: i + 1,
            text,
        })
        .collect()
}

/// True when the document trailer carries an `/Encrypt` entry. Page text
/// that merely mentions the key does not count.
fn has_encrypt_entry(bytes: &[u8]) -> bool {
    match lopdf::Document::load_mem(bytes) {
        Ok(pdf) => pdf.trailer.get(b"Encrypt").is_ok(),
        Err(err) => {
            debug!(error = %err, "trailer parse failed, checking raw trailer");
            raw_trailer_has_encrypt(bytes)
        }
    }
}

/// Looks for `/Encrypt` only after the last `trailer` keyword.
fn raw_trailer_has_encrypt(bytes: &[u8]) -> bool {
    const TRAILER: &[u8] = b"trailer";
    const KEY: &[u8] = b"/Encrypt";
    let Some(start) = bytes
        .windows(TRAILER.len())
        .rposition(|w| w == TRAILER)
    else {
        return false;
    };
    bytes[start..].windows(KEY.len()).any(|w| w == KEY)
}
