//! The nine-field EOB record, presence scoring, and multi-page consolidation
//!
//! Every stage of the pipeline trades in [`FieldRecord`]: the pattern
//! extractor and the language-model fallback both produce one per page, the
//! consolidator folds the per-page records into one per document, and the
//! dataset stores one CSV row per consolidated record.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical field names, in schema order. This order is the CSV column
/// order and the JSON key order shown to the language model.
pub const FIELD_NAMES: [&str; 9] = [
    "Payment to",
    "Payment Date",
    "Payment Number",
    "Total Amount Charged",
    "Total Contracted Amount",
    "Amount Eligible for Coverage",
    "Patient Name",
    "Patient ID",
    "Service Provider ID",
];

/// One extraction result: exactly nine optional fields, no more, no less.
///
/// `None` is the single notion of absence. Producers are expected to pass
/// raw values through [`normalize_value`] so that empty or whitespace-only
/// captures never masquerade as present fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldRecord {
    #[serde(rename = "Payment to")]
    pub payment_to: Option<String>,
    #[serde(rename = "Payment Date")]
    pub payment_date: Option<String>,
    #[serde(rename = "Payment Number")]
    pub payment_number: Option<String>,
    #[serde(rename = "Total Amount Charged")]
    pub total_amount_charged: Option<String>,
    #[serde(rename = "Total Contracted Amount")]
    pub total_contracted_amount: Option<String>,
    #[serde(rename = "Amount Eligible for Coverage")]
    pub amount_eligible_for_coverage: Option<String>,
    #[serde(rename = "Patient Name")]
    pub patient_name: Option<String>,
    #[serde(rename = "Patient ID")]
    pub patient_id: Option<String>,
    #[serde(rename = "Service Provider ID")]
    pub service_provider_id: Option<String>,
}

impl FieldRecord {
    /// Field values in schema order, parallel to [`FIELD_NAMES`].
    pub fn values(&self) -> [Option<&str>; 9] {
        [
            self.payment_to.as_deref(),
            self.payment_date.as_deref(),
            self.payment_number.as_deref(),
            self.total_amount_charged.as_deref(),
            self.total_contracted_amount.as_deref(),
            self.amount_eligible_for_coverage.as_deref(),
            self.patient_name.as_deref(),
            self.patient_id.as_deref(),
            self.service_provider_id.as_deref(),
        ]
    }

    /// True when every field is null.
    pub fn is_empty(&self) -> bool {
        self.values().iter().all(|v| v.is_none())
    }

    /// Adopt `other`'s value for each field that is still null here.
    /// Filled fields are never overwritten.
    pub fn fill_missing_from(&mut self, other: FieldRecord) {
        self.payment_to = self.payment_to.take().or(other.payment_to);
        self.payment_date = self.payment_date.take().or(other.payment_date);
        self.payment_number = self.payment_number.take().or(other.payment_number);
        self.total_amount_charged = self
            .total_amount_charged
            .take()
            .or(other.total_amount_charged);
        self.total_contracted_amount = self
            .total_contracted_amount
            .take()
            .or(other.total_contracted_amount);
        self.amount_eligible_for_coverage = self
            .amount_eligible_for_coverage
            .take()
            .or(other.amount_eligible_for_coverage);
        self.patient_name = self.patient_name.take().or(other.patient_name);
        self.patient_id = self.patient_id.take().or(other.patient_id);
        self.service_provider_id = self
            .service_provider_id
            .take()
            .or(other.service_provider_id);
    }

    /// Re-run [`normalize_value`] over every field. Used on records parsed
    /// from external sources (model replies) where values arrive untrimmed.
    pub fn normalized(mut self) -> Self {
        self.payment_to = normalize_value(self.payment_to);
        self.payment_date = normalize_value(self.payment_date);
        self.payment_number = normalize_value(self.payment_number);
        self.total_amount_charged = normalize_value(self.total_amount_charged);
        self.total_contracted_amount = normalize_value(self.total_contracted_amount);
        self.amount_eligible_for_coverage = normalize_value(self.amount_eligible_for_coverage);
        self.patient_name = normalize_value(self.patient_name);
        self.patient_id = normalize_value(self.patient_id);
        self.service_provider_id = normalize_value(self.service_provider_id);
        self
    }
}

/// Trim a raw captured value and collapse empty or whitespace-only values
/// to null, so presence checks have a single absence representation.
pub fn normalize_value(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == v.len() {
            Some(v)
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Per-field presence scores for one record: 1 if the field is filled,
/// 0 if it is null. Purely derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCoverage {
    present: [bool; 9],
}

impl FieldCoverage {
    /// Score a record.
    pub fn of(record: &FieldRecord) -> Self {
        let values = record.values();
        let mut present = [false; 9];
        for (slot, value) in present.iter_mut().zip(values.iter()) {
            *slot = value.is_some();
        }
        FieldCoverage { present }
    }

    /// True when all nine fields scored 1.
    pub fn is_complete(&self) -> bool {
        self.present.iter().all(|&p| p)
    }

    /// Number of fields that scored 1.
    pub fn present_count(&self) -> usize {
        self.present.iter().filter(|&&p| p).count()
    }

    /// Names of the fields that scored 0, in schema order.
    pub fn missing(&self) -> Vec<&'static str> {
        FIELD_NAMES
            .iter()
            .zip(self.present.iter())
            .filter(|(_, &p)| !p)
            .map(|(&name, _)| name)
            .collect()
    }

    /// (field name, score) pairs in schema order.
    pub fn scores(&self) -> [(&'static str, u8); 9] {
        let mut out = [("", 0u8); 9];
        for (i, (&name, &p)) in FIELD_NAMES.iter().zip(self.present.iter()).enumerate() {
            out[i] = (name, p as u8);
        }
        out
    }
}

impl fmt::Display for FieldCoverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/9 fields", self.present_count())?;
        if !self.is_complete() {
            write!(f, " (missing: {})", self.missing().join(", "))?;
        }
        Ok(())
    }
}

/// Fold ordered per-page records into one document record.
///
/// The first page to fill a field wins; later pages never override. An
/// all-null result is valid and simply means no page yielded anything.
pub fn consolidate<I>(pages: I) -> FieldRecord
where
    I: IntoIterator<Item = FieldRecord>,
{
    let mut consolidated = FieldRecord::default();
    for page in pages {
        consolidated.fill_missing_from(page);
    }
    consolidated
}
