//! CLI for asking natural-language questions over the extracted dataset

use eob_extractor::{answer_query, EobError, LlmClient, LlmConfig, PipelineConfig};
use std::env;
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
        eprintln!("Usage: {} <question> [--json]", args[0]);
        eprintln!();
        eprintln!("Answers a question over the records extracted so far,");
        eprintln!("e.g.: {} \"what is the largest amount charged?\"", args[0]);
        process::exit(1);
    }

    let json_output = args.iter().any(|a| a == "--json");
    let question = args[1..]
        .iter()
        .filter(|a| *a != "--json")
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");

    let dataset_path = PipelineConfig::default().dataset_path;

    let client = match LlmClient::new(llm_config_from_env()) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    match answer_query(&dataset_path, &question, &client) {
        Ok(answer) => {
            if json_output {
                println!(
                    "{}",
                    serde_json::to_string(&answer).expect("Failed to encode answer")
                );
            } else {
                println!("{}", answer.answer);
            }
        }
        Err(e) => {
            if json_output {
                println!("{}", serde_json::json!({ "error": e.to_string() }));
            } else {
                eprintln!("Error: {}", e);
            }
            // User-fixable conditions get their own exit code.
            match e {
                EobError::NoData | EobError::EmptyQuery => process::exit(2),
                _ => process::exit(1),
            }
        }
    }
}
