use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use schemock_core::{collection_to_json, load_all};

use crate::reader::Project;

/// Assemble every model under `path` and return the schema document as pretty JSON.
pub fn run_schema(path: &Path, output_file: Option<&Path>) -> Result<String> {
    let project = Project::open(path)?;
    if project.models.is_empty() {
        anyhow::bail!("No model files found at: {}", path.display());
    }

    let collection = load_all(&project.model_dir, &project.models, &project.loader_options())
        .context("Failed to load models")?;
    let json = collection_to_json(&collection, true).context("JSON serialization error")?;

    if let Some(out_path) = output_file {
        fs::write(out_path, &json)
            .with_context(|| format!("Failed to write {}", out_path.display()))?;
        tracing::info!(path = %out_path.display(), models = collection.len(), "wrote schema");
        return Ok(format!("Written to {}", out_path.display()));
    }

    Ok(json)
}
