//! Writes the OpenAPI document for duet-api to `specs/duet-api.json` at the
//! workspace root.

use utoipa::OpenApi;

fn main() {
    let doc = duet_api::routes::ApiDoc::openapi()
        .to_pretty_json()
        .expect("failed to serialize OpenAPI document");
    let out = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../specs/duet-api.json");
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent).expect("failed to create specs directory");
    }
    std::fs::write(&out, doc).expect("failed to write OpenAPI document");
    println!("Wrote {}", out.display());
}
