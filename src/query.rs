//! Natural-language queries over the persisted dataset
//!
//! The full dataset rides along inside the prompt as JSON records, so no
//! retrieval or filtering happens on this side: the model sees every row
//! and answers free-form. Precondition failures (no dataset, blank
//! question) are caught before any model call is issued.

use crate::dataset;
use crate::llm::LlmClient;
use crate::EobError;
use serde::Serialize;
use std::path::Path;

/// An answered dataset query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryAnswer {
    /// The question as sent to the model
    pub query: String,
    /// The model's reply, surrounding whitespace removed
    pub answer: String,
}

/// Answer a free-form question over the dataset at `dataset_path`.
///
/// Fails with [`EobError::NoData`] when the dataset is missing or has no
/// rows and with [`EobError::EmptyQuery`] when the question is blank, in
/// that order; neither case reaches the model.
pub fn answer_query<P: AsRef<Path>>(
    dataset_path: P,
    question: &str,
    client: &LlmClient,
) -> Result<QueryAnswer, EobError> {
    let dataset_path = dataset_path.as_ref();
    if !dataset_path.exists() {
        return Err(EobError::NoData);
    }
    let records = dataset::load_records(dataset_path)?;
    if records.is_empty() {
        return Err(EobError::NoData);
    }

    let question = question.trim();
    if question.is_empty() {
        return Err(EobError::EmptyQuery);
    }

    let data_json = serde_json::to_string(&records)
        .map_err(|e| EobError::Dataset(format!("failed to encode dataset as JSON: {}", e)))?;
    let prompt = build_query_prompt(&data_json, question);

    let reply = client.complete(&prompt)?;
    log::debug!("model query reply: {}", reply);

    Ok(QueryAnswer {
        query: question.to_string(),
        answer: reply.trim().to_string(),
    })
}

/// Build the data-analyst prompt: dataset rows as JSON, then the question.
pub fn build_query_prompt(data_json: &str, question: &str) -> String {
    format!(
        "You are a data analyst. Here is the structured data extracted from \
         Explanation of Benefits (EOB) documents:\n\
         {}\n\
         Answer the following query based on this data:\n\
         {}",
        data_json, question
    )
}
