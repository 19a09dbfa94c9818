//! Field extraction and querying for scanned Explanation of Benefits PDFs
//!
//! This crate provides:
//! - Rasterization and OCR for scanned EOB documents (pdfium + Tesseract)
//! - Pattern-first field extraction with a language-model fallback for the
//!   fields the patterns miss
//! - Per-document consolidation across pages and CSV persistence
//! - Natural-language querying over the accumulated dataset
//!
//! The unit of work is an upload batch: each document is rasterized page by
//! page, OCR'd, extracted, consolidated into one nine-field record, and
//! appended to the dataset. Transient failures anywhere in that chain are
//! logged and degrade to null fields; they never abort a batch.

pub mod dataset;
pub mod extract;
pub mod llm;
pub mod ocr;
pub mod query;
pub mod record;
pub mod render;
pub mod status;

pub use extract::{extract_fields, FieldExtractor, PatternExtractor};
pub use llm::{LlmClient, LlmConfig, LlmExtractor};
pub use ocr::{OcrConfig, OcrEngine};
pub use query::{answer_query, QueryAnswer};
pub use record::{consolidate, FieldCoverage, FieldRecord, FIELD_NAMES};
pub use render::{PageRenderer, RenderConfig};
pub use status::BatchStatus;

use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for the whole pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory where uploaded documents are stored before processing
    pub upload_dir: PathBuf,
    /// CSV file receiving one row per consolidated document
    pub dataset_path: PathBuf,
    /// Rasterization settings
    pub render: RenderConfig,
    /// OCR settings
    pub ocr: OcrConfig,
    /// Chat-completion settings for fallback extraction
    pub llm: LlmConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("./uploads"),
            dataset_path: PathBuf::from("./output/data.csv"),
            render: RenderConfig::default(),
            ocr: OcrConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

/// One uploaded document: a client-supplied name and the raw PDF bytes.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Outcome of one upload batch
#[derive(Debug)]
pub struct BatchResult {
    /// One consolidated record per uploaded document, in submission order
    pub records: Vec<FieldRecord>,
    /// The processing trace for the batch
    pub status: BatchStatus,
}

/// The extraction pipeline: rendering, OCR, and model engines bound once,
/// then reused for every document.
///
/// Processing is strictly sequential: one document, one page, one request
/// at a time. The dataset file likewise assumes a single writer.
pub struct Pipeline {
    config: PipelineConfig,
    renderer: PageRenderer,
    ocr: OcrEngine,
    llm: LlmClient,
}

impl Pipeline {
    /// Bind the engines and create the upload and dataset directories.
    ///
    /// Engine binding failures (no pdfium library, no Tesseract language
    /// data) are configuration problems and do fail construction; nothing
    /// that happens per document will.
    pub fn new(config: PipelineConfig) -> Result<Self, EobError> {
        fs::create_dir_all(&config.upload_dir)?;
        if let Some(parent) = config.dataset_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let renderer = PageRenderer::new(config.render.clone())?;
        let ocr = OcrEngine::new(config.ocr.clone())?;
        let llm = LlmClient::new(config.llm.clone())?;

        Ok(Self {
            config,
            renderer,
            ocr,
            llm,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process a batch of uploads in submission order.
    ///
    /// Every upload produces a record, however degraded; a batch never
    /// fails part-way. The returned status trace starts fresh for each
    /// batch.
    pub fn process_batch(&self, uploads: &[UploadFile]) -> BatchResult {
        let mut status = BatchStatus::new();
        let mut records = Vec::with_capacity(uploads.len());

        for upload in uploads {
            let record = self.process_upload(upload, &mut status);
            records.push(record);
        }

        BatchResult { records, status }
    }

    /// Store one upload under the upload directory and run it through the
    /// pipeline.
    ///
    /// Only the final path component of the upload name is used, so a
    /// hostile name cannot escape the upload directory.
    pub fn process_upload(&self, upload: &UploadFile, status: &mut BatchStatus) -> FieldRecord {
        let file_name = sanitize_file_name(&upload.name);
        let path = self.config.upload_dir.join(&file_name);
        if let Err(e) = fs::write(&path, &upload.bytes) {
            log::error!("failed to store upload at {}: {}", path.display(), e);
        }
        self.process_file(&path, status)
    }

    /// Run one stored document through the full state machine: rasterize,
    /// then per page OCR -> pattern extraction -> coverage scoring -> model
    /// fallback, then consolidate and append to the dataset.
    ///
    /// Always returns a record. Rasterization failure yields an all-null
    /// record that is still persisted; page-level failures null out that
    /// page and processing moves on.
    pub fn process_file<P: AsRef<Path>>(&self, path: P, status: &mut BatchStatus) -> FieldRecord {
        let path = path.as_ref();
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        status.file_started(&display_name);

        let pages = match self.renderer.render_pages(path) {
            Ok(pages) => pages,
            Err(e) => {
                log::error!("failed to rasterize {}: {}", path.display(), e);
                Vec::new()
            }
        };

        let mut page_records = Vec::with_capacity(pages.len());
        for (index, page) in pages.iter().enumerate() {
            let page_number = index + 1;

            let text = match self.ocr.recognize(page) {
                Ok(text) => text,
                Err(e) => {
                    log::error!(
                        "OCR failed on page {} of {}: {}",
                        page_number,
                        display_name,
                        e
                    );
                    String::new()
                }
            };

            let record = extract_page(
                &text,
                &LlmExtractor::new(&self.llm),
                self.llm.model(),
                page_number,
                status,
            );
            page_records.push(record);
        }

        let consolidated = consolidate(page_records);

        if let Err(e) = dataset::append_record(&self.config.dataset_path, &consolidated) {
            log::error!("failed to persist record for {}: {}", display_name, e);
        }

        consolidated
    }
}

/// Extract one page of text: pattern extraction and coverage scoring, then
/// the fallback whenever any field is still missing.
///
/// The fallback's record replaces the pattern record outright rather than
/// merging into it; a complete pattern result never consults the fallback.
fn extract_page(
    text: &str,
    fallback: &dyn FieldExtractor,
    fallback_name: &str,
    page_number: usize,
    status: &mut BatchStatus,
) -> FieldRecord {
    let record = PatternExtractor.extract(text);
    let coverage = FieldCoverage::of(&record);
    status.page_scored(page_number, &coverage);

    if coverage.is_complete() {
        return record;
    }
    status.fallback_started(fallback_name, page_number);
    fallback.extract(text)
}

/// Reduce an upload name to a bare file name that cannot traverse out of
/// the upload directory.
fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if base.is_empty() {
        "upload.pdf".to_string()
    } else {
        base
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EobError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF rendering error: {0}")]
    Render(String),
    #[error("OCR error: {0}")]
    Ocr(String),
    #[error("language model error: {0}")]
    Llm(String),
    #[error("malformed model reply: {0}")]
    MalformedReply(String),
    #[error("dataset error: {0}")]
    Dataset(String),
    #[error("No data available to query. Upload and process a file first.")]
    NoData,
    #[error("No query provided.")]
    EmptyQuery,
}

impl From<csv::Error> for EobError {
    fn from(e: csv::Error) -> Self {
        EobError::Dataset(e.to_string())
    }
}
