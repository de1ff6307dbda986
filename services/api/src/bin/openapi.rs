//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI document for the lesson API to disk, so client code can be
//! generated without starting the server.
//!
//! Usage: `openapi [OUTPUT_PATH]` (defaults to `openapi.json`).

use api_lib::web::rest::ApiDoc;
use std::path::{Path, PathBuf};
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn write_document(api_doc: &utoipa::openapi::OpenApi, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let json = api_doc.to_pretty_json()?;
    std::fs::write(path, json)?;
    println!(
        "OpenAPI document with {} paths written to {}",
        api_doc.paths.paths.len(),
        path.display()
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
    write_document(&ApiDoc::openapi(), &output)
}
