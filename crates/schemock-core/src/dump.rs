//! JSON output of assembled schemas.
//!
//! String in, JSON string out, so callers outside Rust need no bindings
//! beyond a string boundary.

use serde::Serialize;

use crate::assemble::assemble_all;
use crate::catalogs::{GENERATOR_VERSION, SCHEMA_VERSION};
use crate::collection::ModelSchemaCollection;
use crate::error::EvalError;
use crate::loader::default_known_constants;
use crate::parser::parse_source;

/// Versioned envelope around a set of schemas.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDocument<'a> {
    pub schema_version: &'static str,
    pub generator_version: &'static str,
    pub models: &'a ModelSchemaCollection,
}

impl<'a> SchemaDocument<'a> {
    pub fn new(models: &'a ModelSchemaCollection) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            generator_version: GENERATOR_VERSION,
            models,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DumpResult<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn collection_to_json(
    collection: &ModelSchemaCollection,
    pretty: bool,
) -> Result<String, serde_json::Error> {
    let doc = SchemaDocument::new(collection);
    if pretty {
        serde_json::to_string_pretty(&doc)
    } else {
        serde_json::to_string(&doc)
    }
}

/// Parse one model source and return its schema document as JSON.
/// Failures are reported inside the result object, never as an `Err`.
pub fn source_to_json(content: &str, filename: &str) -> String {
    let result = parse_source(content, filename, &default_known_constants())
        .and_then(|ns| ns.into_first_class())
        .map(|def| assemble_all([&def]));
    encode(result)
}

/// Like [`source_to_json`] but for several sources assembled together.
pub fn sources_to_json(files: &[(&str, &str)]) -> String {
    let known = default_known_constants();
    let defs: Result<Vec<_>, EvalError> = files
        .iter()
        .map(|(content, filename)| {
            parse_source(content, filename, &known).and_then(|ns| ns.into_first_class())
        })
        .collect();
    encode(defs.map(|defs| assemble_all(&defs)))
}

fn encode(result: Result<ModelSchemaCollection, EvalError>) -> String {
    let out = match result {
        Ok(collection) => serde_json::to_string(&DumpResult {
            success: true,
            data: Some(SchemaDocument::new(&collection)),
            error: None,
        }),
        Err(err) => serde_json::to_string(&DumpResult::<()> {
            success: false,
            data: None,
            error: Some(err.to_string()),
        }),
    };
    out.unwrap_or_else(|e| format!(r#"{{"success":false,"error":"JSON serialization error: {e}"}}"#))
}
