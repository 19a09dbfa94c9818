//! Deterministic label-anchored field extraction from OCR text
//!
//! One compiled-once regex per schema field, matched case-sensitively
//! against the raw page text. Labels are matched exactly as they appear on
//! real EOB layouts, which is why two of them are spelled in lowercase
//! ("Payment date:", "Payment number:") while the schema names keep their
//! canonical capitalization.

use crate::record::{normalize_value, FieldRecord};
use once_cell::sync::Lazy;
use regex::Regex;

/// A strategy that turns one page of raw text into a [`FieldRecord`].
///
/// Implemented by [`PatternExtractor`] (deterministic, label-driven) and by
/// the language-model fallback; the pipeline composes the two without
/// caring which one produced a record.
pub trait FieldExtractor {
    fn extract(&self, text: &str) -> FieldRecord;
}

static PAYMENT_TO_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Payment to:\s*(.*)").unwrap());
static PAYMENT_DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Payment date:\s*(.*)").unwrap());
static PAYMENT_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Payment number:\s*(.*)").unwrap());
static TOTAL_CHARGED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Total Amount Charged:\s*\$(\d[\d,]*\.\d{2})").unwrap());
static TOTAL_CONTRACTED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Total Contracted Amount:\s*\$(\d[\d,]*\.\d{2})").unwrap());
static ELIGIBLE_AMOUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Amount Eligible for Coverage:\s*\$(\d[\d,]*\.\d{2})").unwrap());
static PATIENT_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Patient Name:\s*(.*)").unwrap());
static PATIENT_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Patient ID:\s*(.*)").unwrap());
static PROVIDER_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Service Provider ID:\s*(.*)").unwrap());

/// First capture of `re` in `text`, trimmed, with empty captures collapsed
/// to null.
fn first_capture(re: &Regex, text: &str) -> Option<String> {
    let raw = re
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());
    normalize_value(raw)
}

/// Extract all nine schema fields from one page of OCR text.
///
/// Each field takes the first match of its label anywhere in the text.
/// Free-text labels capture the remainder of the line; monetary labels
/// only match a `$`-prefixed amount with two decimal places and capture the
/// numeric portion without the currency symbol. Fields whose label never
/// appears come back null.
pub fn extract_fields(text: &str) -> FieldRecord {
    FieldRecord {
        payment_to: first_capture(&PAYMENT_TO_RE, text),
        payment_date: first_capture(&PAYMENT_DATE_RE, text),
        payment_number: first_capture(&PAYMENT_NUMBER_RE, text),
        total_amount_charged: first_capture(&TOTAL_CHARGED_RE, text),
        total_contracted_amount: first_capture(&TOTAL_CONTRACTED_RE, text),
        amount_eligible_for_coverage: first_capture(&ELIGIBLE_AMOUNT_RE, text),
        patient_name: first_capture(&PATIENT_NAME_RE, text),
        patient_id: first_capture(&PATIENT_ID_RE, text),
        service_provider_id: first_capture(&PROVIDER_ID_RE, text),
    }
}

/// The deterministic extraction strategy: cheap, offline, first line of
/// attack for every page.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternExtractor;

impl FieldExtractor for PatternExtractor {
    fn extract(&self, text: &str) -> FieldRecord {
        extract_fields(text)
    }
}
