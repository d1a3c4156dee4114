//! services/api/src/bin/openapi.rs
//!
//! Writes the DocChat OpenAPI document. Usage: `openapi [PATH]`, where PATH
//! defaults to `openapi.json` and `-` prints to stdout.

use api_lib::web::rest::ApiDoc;
use std::io::Write;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn document() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = "DocChat API".to_string();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let target = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());
    let json = document().to_pretty_json()?;

    if target == "-" {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
    } else {
        std::fs::write(&target, json)?;
        eprintln!("Wrote {} paths to {}", ApiDoc::openapi().paths.paths.len(), target);
    }
    Ok(())
}
