//! Writes the OpenAPI document of the HTTP API.
//!
//! Usage:
//!   cargo run --bin generate_openapi > openapi.json
//!   cargo run --bin generate_openapi -- --output openapi.json

use std::{
    env, fs,
    io::{self, Write},
    path::PathBuf,
    process,
};

use plant_care_service::api::handlers::ApiDoc;
use utoipa::OpenApi;

fn main() {
    let json = match ApiDoc::openapi().to_pretty_json() {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Failed to serialise OpenAPI document: {e}");
            process::exit(1);
        }
    };

    let output = output_path(env::args().collect());
    let written = match &output {
        Some(path) => fs::write(path, &json),
        None => io::stdout().write_all(json.as_bytes()),
    };
    if let Err(e) = written {
        let target = output.map_or_else(|| "stdout".to_owned(), |p| p.display().to_string());
        eprintln!("Error writing to {target}: {e}");
        process::exit(1);
    }
    if let Some(path) = output {
        eprintln!("OpenAPI document written to {}", path.display());
    }
}

/// Value following `--output`, if any.
fn output_path(args: Vec<String>) -> Option<PathBuf> {
    args.windows(2)
        .find(|w| w[0] == "--output")
        .map(|w| PathBuf::from(&w[1]))
}
