//! PDF text extraction.

use async_trait::async_trait;
use bytes::Bytes;
use cached::{Cached, SizedCache};
use parking_lot::Mutex;
use pdfium_render::prelude::*;
use std::sync::OnceLock;

/// Default number of extracted documents kept by [`CachingExtractor`].
pub const DEFAULT_TEXT_CACHE_SIZE: usize = 256;

/// Errors raised inside an extractor. They never leave [`extract_pdf_text`].
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("pdfium library unavailable: {0}")]
    Unavailable(String),

    #[error("failed to load document: {0}")]
    Document(String),

    #[error("extraction task failed: {0}")]
    Task(String),
}

/// Turns a document payload into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract the text of all pages, in order, joined with `\n`.
    ///
    /// `data` is a shared, immutable handle; implementations work on it
    /// without affecting the caller's copy.
    async fn extract_text(&self, data: Bytes) -> Result<String, ExtractError>;
}

/// Extract text from a PDF payload, degrading any failure to an empty string.
pub async fn extract_pdf_text(extractor: &dyn TextExtractor, data: &Bytes) -> String {
    match extractor.extract_text(data.clone()).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("PDF text extraction failed, treating as empty: {}", e);
            String::new()
        }
    }
}

struct SyncPdfium(Pdfium);

// SAFETY: built with the `thread_safe` feature, which serializes every call
// into the pdfium library behind a global lock.
unsafe impl Send for SyncPdfium {}
unsafe impl Sync for SyncPdfium {}

static PDFIUM: OnceLock<Result<SyncPdfium, String>> = OnceLock::new();

/// Bind the system pdfium library once; later calls reuse the outcome.
fn load_pdfium() -> Result<&'static Pdfium, ExtractError> {
    PDFIUM
        .get_or_init(|| match Pdfium::bind_to_system_library() {
            Ok(bindings) => {
                tracing::info!("Using system pdfium library");
                Ok(SyncPdfium(Pdfium::new(bindings)))
            }
            Err(e) => {
                tracing::error!("No pdfium library available, PDF content search disabled: {:?}", e);
                Err(format!("{:?}", e))
            }
        })
        .as_ref()
        .map(|pdfium| &pdfium.0)
        .map_err(|e| ExtractError::Unavailable(e.clone()))
}

fn extract_from_bytes(pdfium: &Pdfium, data: &[u8]) -> Result<String, ExtractError> {
    let document = pdfium
        .load_pdf_from_byte_slice(data, None)
        .map_err(|e| ExtractError::Document(format!("{:?}", e)))?;

    let pages = document.pages();
    let mut page_texts = Vec::with_capacity(pages.len() as usize);
    for index in 0..pages.len() {
        match pages.get(index) {
            Ok(page) => match page.text() {
                Ok(text) => page_texts.push(text.all()),
                Err(e) => tracing::debug!("Skipping page {}: no text ({:?})", index, e),
            },
            Err(e) => tracing::debug!("Skipping page {}: {:?}", index, e),
        }
    }

    Ok(page_texts.join("\n").trim().to_string())
}

/// Extractor backed by the pdfium shared library.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfiumExtractor;

impl PdfiumExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextExtractor for PdfiumExtractor {
    async fn extract_text(&self, data: Bytes) -> Result<String, ExtractError> {
        tokio::task::spawn_blocking(move || {
            let pdfium = load_pdfium()?;
            extract_from_bytes(pdfium, &data)
        })
        .await
        .map_err(|e| ExtractError::Task(e.to_string()))?
    }
}

/// Memoizes another extractor by payload digest.
pub struct CachingExtractor<E> {
    inner: E,
    cache: Mutex<SizedCache<String, String>>,
}

impl<E: TextExtractor> CachingExtractor<E> {
    pub fn new(inner: E, capacity: usize) -> Self {
        Self {
            inner,
            cache: Mutex::new(SizedCache::with_size(capacity.max(1))),
        }
    }

    /// Number of documents currently cached.
    pub fn cached_documents(&self) -> usize {
        self.cache.lock().cache_size()
    }
}

#[async_trait]
impl<E: TextExtractor> TextExtractor for CachingExtractor<E> {
    async fn extract_text(&self, data: Bytes) -> Result<String, ExtractError> {
        let key = format!("{:x}", md5::compute(&data));

        let hit = self.cache.lock().cache_get(&key).cloned();
        if let Some(text) = hit {
            return Ok(text);
        }

        let text = self.inner.extract_text(data).await?;
        self.cache.lock().cache_set(key, text.clone());
        Ok(text)
    }
}
