use eob_extractor::{extract_fields, FieldCoverage, FIELD_NAMES};
use std::env;
use std::fs;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: debug_fields <text_file>");
        eprintln!("Runs the pattern extractor over saved OCR text.");
        std::process::exit(1);
    }

    let text = fs::read_to_string(&args[1]).expect("Failed to read text file");
    let record = extract_fields(&text);
    let coverage = FieldCoverage::of(&record);

    println!("=== FIELDS ===");
    for (name, value) in FIELD_NAMES.iter().zip(record.values().iter()) {
        match value {
            Some(v) => println!("  {:30} {:?}", name, v),
            None => println!("  {:30} -", name),
        }
    }
    println!();
    println!("coverage: {}", coverage);
}
