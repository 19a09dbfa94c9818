//! CLI batch runner: extract EOB fields from scanned PDFs into the dataset

use eob_extractor::{LlmConfig, Pipeline, PipelineConfig, UploadFile, FIELD_NAMES};
use std::env;
use std::fs;
use std::process;

fn llm_config_from_env() -> LlmConfig {
    let mut config = LlmConfig::default();
    if let Ok(key) = env::var("OPENAI_API_KEY") {
        config.api_key = key;
    }
    if let Ok(base) = env::var("EOB_LLM_BASE_URL") {
        config.api_base = base;
    }
    if let Ok(model) = env::var("EOB_LLM_MODEL") {
        config.model = model;
    }
    config
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <pdf_file>... [--json]", args[0]);
        eprintln!();
        eprintln!("Extracts the nine EOB fields from each scanned PDF and appends");
        eprintln!("one consolidated record per document to the dataset CSV.");
        eprintln!();
        eprintln!("Environment:");
        eprintln!("  OPENAI_API_KEY    API key for the fallback model");
        eprintln!("  EOB_LLM_BASE_URL  OpenAI-compatible API root (optional)");
        eprintln!("  EOB_LLM_MODEL     model identifier (default: gpt-4)");
        process::exit(1);
    }

    let json_output = args.iter().any(|a| a == "--json");
    let files: Vec<&String> = args[1..].iter().filter(|a| *a != "--json").collect();
    if files.is_empty() {
        eprintln!("Usage: {} <pdf_file>... [--json]", args[0]);
        process::exit(1);
    }

    let config = PipelineConfig {
        llm: llm_config_from_env(),
        ..Default::default()
    };

    let pipeline = match Pipeline::new(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let mut uploads = Vec::with_capacity(files.len());
    for file in &files {
        match fs::read(file) {
            Ok(bytes) => uploads.push(UploadFile {
                name: file.to_string(),
                bytes,
            }),
            Err(e) => {
                eprintln!("Error: cannot read {}: {}", file, e);
                process::exit(1);
            }
        }
    }

    let result = pipeline.process_batch(&uploads);

    if json_output {
        let payload = serde_json::json!({
            "records": result.records,
            "status": result.status.messages(),
        });
        println!("{}", payload);
    } else {
        println!("EOB Field Extraction");
        println!("====================");

        for (upload, record) in uploads.iter().zip(result.records.iter()) {
            println!();
            println!("File: {}", upload.name);
            for (name, value) in FIELD_NAMES.iter().zip(record.values().iter()) {
                println!("  {}: {}", name, value.unwrap_or("null"));
            }
        }

        println!();
        println!("--- Status ---");
        for message in result.status.messages() {
            println!("{}", message);
        }

        println!();
        println!(
            "Appended {} record(s) to {}",
            result.records.len(),
            pipeline.config().dataset_path.display()
        );
    }
}
