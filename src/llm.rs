//! Chat-completion client and the language-model extraction fallback
//!
//! When the pattern extractor leaves any field null, the raw page text is
//! sent to an OpenAI-compatible chat-completion endpoint with a prompt that
//! pins the reply to a nine-key JSON object. The same client serves the
//! dataset query engine. All calls are blocking with an explicit timeout;
//! the pipeline never issues more than one at a time.

use crate::extract::FieldExtractor;
use crate::record::{FieldRecord, FIELD_NAMES};
use crate::EobError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default OpenAI-compatible API root.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Default model for fallback extraction and dataset queries.
pub const DEFAULT_MODEL: &str = "gpt-4";

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for the chat-completion client
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API root, e.g. `https://api.openai.com/v1`
    pub api_base: String,
    /// Bearer token; an empty key surfaces as an auth error on first call
    pub api_key: String,
    /// Model identifier sent with every request
    pub model: String,
    /// Sampling temperature; 0 keeps extraction replies deterministic
    pub temperature: f64,
    /// Hard timeout for one request
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Blocking HTTP client for chat-completion requests
pub struct LlmClient {
    client: reqwest::blocking::Client,
    config: LlmConfig,
}

impl LlmClient {
    /// Build a client with the configured timeout baked in.
    pub fn new(config: LlmConfig) -> Result<Self, EobError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EobError::Llm(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// The configured model identifier.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send one single-message completion request and return the reply text.
    pub fn complete(&self, prompt: &str) -> Result<String, EobError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.config.temperature,
        };

        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .map_err(|e| EobError::Llm(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().unwrap_or_default();
            return Err(EobError::Llm(format!(
                "API error ({}): {}",
                status, error_text
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .map_err(|e| EobError::Llm(format!("failed to parse API response: {}", e)))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| EobError::Llm("response contained no choices".to_string()))?
            .message
            .content;
        Ok(content)
    }

    /// Ask the model for all nine schema fields of one page of text.
    pub fn extract_fields(&self, text: &str) -> Result<FieldRecord, EobError> {
        let prompt = build_extraction_prompt(text);
        let reply = self.complete(&prompt)?;
        log::debug!("model extraction reply: {}", reply);
        parse_fields_reply(&reply)
    }
}

/// Build the fallback extraction prompt: the nine keys as a JSON template,
/// the null instruction, then the raw page text.
pub fn build_extraction_prompt(text: &str) -> String {
    let template = FIELD_NAMES
        .iter()
        .map(|name| format!("\"{}\": <value>", name))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Extract the following fields from this text and return them as a JSON object:\n\
         {{ {} }}\n\n\
         If any field is missing or not found, set its value to null.\n\n\
         Text:\n{}",
        template, text
    )
}

/// Parse a model reply into a [`FieldRecord`].
///
/// The reply is first narrowed to its JSON payload with [`extract_json`]
/// (models wrap objects in markdown fences or prose often enough to
/// matter), then parsed strictly: unknown keys are ignored, absent keys
/// become null, anything else is a [`EobError::MalformedReply`].
pub fn parse_fields_reply(reply: &str) -> Result<FieldRecord, EobError> {
    let json = extract_json(reply);
    let record: FieldRecord = serde_json::from_str(&json)
        .map_err(|e| EobError::MalformedReply(format!("{}: {}", e, json)))?;
    Ok(record.normalized())
}

/// Extract JSON from a model reply, handling markdown code blocks.
pub fn extract_json(text: &str) -> String {
    let text = text.trim();

    // Handle ```json ... ``` wrapper
    if text.starts_with("```") {
        if let Some(start) = text.find('\n') {
            let after_first_line = &text[start + 1..];
            if let Some(end) = after_first_line.rfind("```") {
                return after_first_line[..end].trim().to_string();
            }
        }
    }

    // Otherwise take the outermost brace-delimited span
    if let Some(start) = text.find('{') {
        if let Some(end) = text.rfind('}') {
            if end > start {
                return text[start..=end].to_string();
            }
        }
    }

    text.to_string()
}

/// [`FieldExtractor`] adapter over [`LlmClient`] with the pipeline's
/// never-raise policy: any failure is logged and comes back as the all-null
/// record, so one bad page cannot sink a batch.
pub struct LlmExtractor<'a> {
    client: &'a LlmClient,
}

impl<'a> LlmExtractor<'a> {
    pub fn new(client: &'a LlmClient) -> Self {
        Self { client }
    }
}

impl FieldExtractor for LlmExtractor<'_> {
    fn extract(&self, text: &str) -> FieldRecord {
        match self.client.extract_fields(text) {
            Ok(record) => record,
            Err(e) => {
                log::error!("model fallback extraction failed: {}", e);
                FieldRecord::default()
            }
        }
    }
}
