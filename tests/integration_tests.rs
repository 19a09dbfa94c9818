//! Integration tests for the EOB extraction library

use eob_extractor::dataset::{append_record, has_records, load_records};
use eob_extractor::llm::{build_extraction_prompt, extract_json, parse_fields_reply};
use eob_extractor::{
    answer_query, consolidate, extract_fields, BatchStatus, EobError, FieldCoverage,
    FieldExtractor, FieldRecord, LlmClient, LlmConfig, PatternExtractor, FIELD_NAMES,
};
use std::time::Duration;

// Helper to build a record with just the two patient fields
fn patient_record(name: Option<&str>, id: Option<&str>) -> FieldRecord {
    FieldRecord {
        patient_name: name.map(str::to_string),
        patient_id: id.map(str::to_string),
        ..Default::default()
    }
}

// A client whose endpoint is a closed local port: reaching the model at
// all turns into an immediate connection error.
fn unreachable_client() -> LlmClient {
    LlmClient::new(LlmConfig {
        api_base: "http://127.0.0.1:9/v1".to_string(),
        timeout: Duration::from_secs(1),
        ..Default::default()
    })
    .unwrap()
}

const SAMPLE_PAGE: &str = "EXPLANATION OF BENEFITS\n\
    Payment to: Jane Doe\n\
    Payment date: 2024-01-01\n\
    Payment number: EFT-0042\n\
    Total Amount Charged: $1,234.56\n\
    Total Contracted Amount: $900.00\n\
    Amount Eligible for Coverage: $850.25\n\
    Patient Name: John Roe\n\
    Patient ID: P-31415\n\
    Service Provider ID: SP-2718\n";

// ============================================================================
// Schema Tests
// ============================================================================

#[test]
fn test_schema_has_exactly_nine_fields() {
    assert_eq!(FIELD_NAMES.len(), 9);
    assert_eq!(FieldRecord::default().values().len(), 9);
}

#[test]
fn test_json_output_carries_only_canonical_keys() {
    let record = extract_fields(SAMPLE_PAGE);
    let json = serde_json::to_value(&record).unwrap();
    let object = json.as_object().unwrap();

    assert_eq!(object.len(), 9);
    for name in FIELD_NAMES {
        assert!(object.contains_key(name), "missing key {}", name);
    }
}

// ============================================================================
// Pattern Extraction Tests
// ============================================================================

#[test]
fn test_reference_page_extracts_completely() {
    let record = extract_fields(SAMPLE_PAGE);
    assert_eq!(record.payment_to.as_deref(), Some("Jane Doe"));
    assert_eq!(record.payment_date.as_deref(), Some("2024-01-01"));
    assert_eq!(record.payment_number.as_deref(), Some("EFT-0042"));
    assert_eq!(record.total_amount_charged.as_deref(), Some("1,234.56"));
    assert_eq!(record.total_contracted_amount.as_deref(), Some("900.00"));
    assert_eq!(record.amount_eligible_for_coverage.as_deref(), Some("850.25"));
    assert_eq!(record.patient_name.as_deref(), Some("John Roe"));
    assert_eq!(record.patient_id.as_deref(), Some("P-31415"));
    assert_eq!(record.service_provider_id.as_deref(), Some("SP-2718"));
    assert!(FieldCoverage::of(&record).is_complete());
}

#[test]
fn test_partial_page_scenario() {
    let text = "Payment to: Jane Doe\nPayment date: 2024-01-01\nTotal Amount Charged: $123.45";
    let record = extract_fields(text);

    assert_eq!(record.payment_to.as_deref(), Some("Jane Doe"));
    assert_eq!(record.payment_date.as_deref(), Some("2024-01-01"));
    assert_eq!(record.total_amount_charged.as_deref(), Some("123.45"));
    // Everything without a label stays null.
    assert!(record.payment_number.is_none());
    assert!(record.total_contracted_amount.is_none());
    assert!(record.amount_eligible_for_coverage.is_none());
    assert!(record.patient_name.is_none());
    assert!(record.patient_id.is_none());
    assert!(record.service_provider_id.is_none());
}

#[test]
fn test_extracted_values_are_substrings_of_the_page() {
    let record = extract_fields(SAMPLE_PAGE);
    for value in record.values().into_iter().flatten() {
        assert!(
            SAMPLE_PAGE.contains(value),
            "extracted value {:?} does not occur in the page text",
            value
        );
    }
}

#[test]
fn test_monetary_values_match_amount_shape() {
    let shape = regex::Regex::new(r"^\d[\d,]*\.\d{2}$").unwrap();
    let record = extract_fields(SAMPLE_PAGE);
    for value in [
        record.total_amount_charged.as_deref(),
        record.total_contracted_amount.as_deref(),
        record.amount_eligible_for_coverage.as_deref(),
    ] {
        let value = value.unwrap();
        assert!(shape.is_match(value), "bad amount shape: {:?}", value);
        assert!(!value.contains('$'));
    }
}

#[test]
fn test_empty_text_extracts_nothing_and_triggers_fallback_condition() {
    let record = extract_fields("");
    assert!(record.is_empty());

    let coverage = FieldCoverage::of(&record);
    assert_eq!(coverage.present_count(), 0);
    // Zero coverage is exactly the condition that sends a page to the model.
    assert!(!coverage.is_complete());
}

#[test]
fn test_extractor_trait_is_object_safe() {
    let extractors: Vec<Box<dyn FieldExtractor>> = vec![Box::new(PatternExtractor)];
    let record = extractors[0].extract(SAMPLE_PAGE);
    assert!(FieldCoverage::of(&record).is_complete());
}

// ============================================================================
// Consolidation Tests
// ============================================================================

#[test]
fn test_two_page_document_scenario() {
    // Page 1 names the patient; page 2 repeats a conflicting name but also
    // carries the ID. The first name wins, the ID fills in.
    let page1 = patient_record(Some("Person A"), None);
    let page2 = patient_record(Some("Person B"), Some("P-200"));

    let consolidated = consolidate(vec![page1, page2]);
    assert_eq!(consolidated.patient_name.as_deref(), Some("Person A"));
    assert_eq!(consolidated.patient_id.as_deref(), Some("P-200"));
}

#[test]
fn test_null_pages_do_not_disturb_consolidation() {
    let filled = patient_record(Some("Person A"), Some("P-1"));

    let front = consolidate(vec![FieldRecord::default(), filled.clone()]);
    let back = consolidate(vec![filled.clone(), FieldRecord::default()]);
    let both = consolidate(vec![
        FieldRecord::default(),
        filled.clone(),
        FieldRecord::default(),
    ]);

    assert_eq!(front, filled);
    assert_eq!(back, filled);
    assert_eq!(both, filled);
}

#[test]
fn test_consolidation_never_overwrites() {
    let first = patient_record(Some("Person A"), None);
    let later_pages = vec![
        patient_record(Some("Person B"), None),
        patient_record(Some("Person C"), Some("P-9")),
    ];

    let mut pages = vec![first];
    pages.extend(later_pages);
    let consolidated = consolidate(pages);

    assert_eq!(consolidated.patient_name.as_deref(), Some("Person A"));
    assert_eq!(consolidated.patient_id.as_deref(), Some("P-9"));
}

#[test]
fn test_all_null_consolidation_is_valid() {
    let consolidated = consolidate(vec![FieldRecord::default(), FieldRecord::default()]);
    assert!(consolidated.is_empty());
}

// ============================================================================
// Fallback Prompt and Reply Tests
// ============================================================================

#[test]
fn test_fallback_prompt_contract() {
    let prompt = build_extraction_prompt("Payment to: Jane");
    for name in FIELD_NAMES {
        assert!(prompt.contains(&format!("\"{}\"", name)));
    }
    assert!(prompt.contains("return them as a JSON object"));
    assert!(prompt.contains("set its value to null"));
    assert!(prompt.contains("Payment to: Jane"));
}

#[test]
fn test_reply_parsing_accepts_plain_and_fenced_json() {
    let plain = r#"{"Patient Name": "Jane Doe", "Patient ID": null}"#;
    let record = parse_fields_reply(plain).unwrap();
    assert_eq!(record.patient_name.as_deref(), Some("Jane Doe"));
    assert!(record.patient_id.is_none());

    let fenced = "```json\n{\"Patient Name\": \"Jane Doe\"}\n```";
    let record = parse_fields_reply(fenced).unwrap();
    assert_eq!(record.patient_name.as_deref(), Some("Jane Doe"));
}

#[test]
fn test_reply_parsing_rejects_garbage() {
    for reply in ["", "Sorry, I cannot help with that.", "```json\nnot json\n```"] {
        assert!(
            matches!(parse_fields_reply(reply), Err(EobError::MalformedReply(_))),
            "reply unexpectedly parsed: {:?}",
            reply
        );
    }
}

#[test]
fn test_extract_json_variants() {
    assert_eq!(extract_json("{\"a\":1}"), "{\"a\":1}");
    assert_eq!(extract_json("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    assert_eq!(extract_json("prefix {\"a\":1} suffix"), "{\"a\":1}");
}

// ============================================================================
// Dataset Round-Trip Tests
// ============================================================================

#[test]
fn test_appended_records_reload_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.csv");

    let names = ["First Person", "Second Person", "Third Person"];
    for name in names {
        append_record(&path, &patient_record(Some(name), None)).unwrap();
    }

    let records = load_records(&path).unwrap();
    assert_eq!(records.len(), 3);
    for (record, name) in records.iter().zip(names) {
        assert_eq!(record.patient_name.as_deref(), Some(name));
    }
}

#[test]
fn test_dataset_header_is_canonical_and_stable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.csv");

    append_record(&path, &patient_record(Some("A"), None)).unwrap();
    append_record(&path, &patient_record(Some("B"), None)).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let first_line = contents.lines().next().unwrap();
    assert_eq!(first_line, FIELD_NAMES.join(","));
    assert_eq!(contents.lines().count(), 3);
}

#[test]
fn test_has_records_reflects_dataset_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.csv");

    assert!(!has_records(&path));
    append_record(&path, &FieldRecord::default()).unwrap();
    assert!(has_records(&path));
}

// ============================================================================
// Query Precondition Tests
// ============================================================================

#[test]
fn test_query_without_dataset_never_reaches_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.csv");

    let err = answer_query(&path, "total charged?", &unreachable_client()).unwrap_err();
    assert!(matches!(err, EobError::NoData));
    assert_eq!(
        err.to_string(),
        "No data available to query. Upload and process a file first."
    );
}

#[test]
fn test_query_with_header_only_dataset_is_no_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.csv");
    std::fs::write(&path, format!("{}\n", FIELD_NAMES.join(","))).unwrap();

    let err = answer_query(&path, "total charged?", &unreachable_client()).unwrap_err();
    assert!(matches!(err, EobError::NoData));
}

#[test]
fn test_query_with_blank_question_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.csv");
    append_record(&path, &patient_record(Some("Jane"), None)).unwrap();

    let err = answer_query(&path, "  ", &unreachable_client()).unwrap_err();
    assert!(matches!(err, EobError::EmptyQuery));
    assert_eq!(err.to_string(), "No query provided.");
}

#[test]
fn test_query_with_data_attempts_the_model_call() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.csv");
    append_record(&path, &patient_record(Some("Jane"), None)).unwrap();

    let err = answer_query(&path, "who is the patient?", &unreachable_client()).unwrap_err();
    assert!(matches!(err, EobError::Llm(_)));
}

// ============================================================================
// Batch Status Tests
// ============================================================================

#[test]
fn test_status_trace_for_a_partial_page() {
    let mut status = BatchStatus::new();
    status.file_started("march_eob.pdf");

    let record = extract_fields("Payment to: Jane Doe");
    let coverage = FieldCoverage::of(&record);
    status.page_scored(1, &coverage);
    if !coverage.is_complete() {
        status.fallback_started("gpt-4", 1);
    }

    let messages = status.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0], "Processing file: march_eob.pdf");
    assert!(messages[1].starts_with("Page 1 field coverage: 1/9 fields"));
    assert!(messages[1].contains("Payment Date"));
    assert_eq!(
        messages[2],
        "Falling back to gpt-4 for missing fields on page 1"
    );
}

#[test]
fn test_status_trace_for_a_complete_page_has_no_fallback() {
    let mut status = BatchStatus::new();
    status.file_started("clean.pdf");

    let coverage = FieldCoverage::of(&extract_fields(SAMPLE_PAGE));
    status.page_scored(1, &coverage);
    if !coverage.is_complete() {
        status.fallback_started("gpt-4", 1);
    }

    assert_eq!(status.len(), 2);
    assert_eq!(status.messages()[1], "Page 1 field coverage: 9/9 fields");
}
