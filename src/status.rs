//! Ordered status trace for one upload batch
//!
//! A [`BatchStatus`] is created at the start of each batch, appended to as
//! documents and pages move through the pipeline, and handed back with the
//! results. Keeping it a per-batch value (rather than shared mutable
//! state) means one batch's trace can never interleave with another's.
//! Every message is also emitted through `log` at info level as it is
//! recorded.

use crate::record::FieldCoverage;

/// Human-readable, ordered processing messages for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchStatus {
    messages: Vec<String>,
}

impl BatchStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a document has entered the pipeline.
    pub fn file_started(&mut self, name: &str) {
        self.push(format!("Processing file: {}", name));
    }

    /// Record a page's per-field coverage after pattern extraction.
    pub fn page_scored(&mut self, page_number: usize, coverage: &FieldCoverage) {
        self.push(format!("Page {} field coverage: {}", page_number, coverage));
    }

    /// Record that the model fallback fired for a page.
    pub fn fallback_started(&mut self, model: &str, page_number: usize) {
        self.push(format!(
            "Falling back to {} for missing fields on page {}",
            model, page_number
        ));
    }

    /// Append a message and mirror it to the log.
    pub fn push(&mut self, message: String) {
        log::info!("{}", message);
        self.messages.push(message);
    }

    /// All messages recorded so far, oldest first.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
