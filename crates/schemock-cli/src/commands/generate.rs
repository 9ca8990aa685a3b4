use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use heck::ToSnakeCase;

use schemock_core::{load_all, DEFAULT_MOCK_SUFFIX, DEFAULT_TEMPLATE};

use crate::reader::Project;

pub struct GenerateArgs<'a> {
    pub path: &'a Path,
    pub output_dir: Option<&'a Path>,
    pub suffix: Option<&'a str>,
    pub template: Option<&'a Path>,
}

/// Render a mock for every model. Returns the rendered text when no
/// output directory is configured, otherwise a summary of written files.
pub fn run_generate(args: &GenerateArgs) -> Result<String> {
    let project = Project::open(args.path)?;
    if project.models.is_empty() {
        anyhow::bail!("No model files found at: {}", args.path.display());
    }

    let suffix = args
        .suffix
        .map(str::to_string)
        .or_else(|| project.config.suffix.clone())
        .unwrap_or_else(|| DEFAULT_MOCK_SUFFIX.to_string());

    let template = match template_path(args, &project) {
        Some(path) => fs::read_to_string(&path)
            .with_context(|| format!("Failed to read template {}", path.display()))?,
        None => DEFAULT_TEMPLATE.to_string(),
    };

    let output_dir = args
        .output_dir
        .map(Path::to_path_buf)
        .or_else(|| project.config.output_dir.as_deref().map(|p| project.config_path(p)));

    let collection = load_all(&project.model_dir, &project.models, &project.loader_options())
        .context("Failed to load models")?;

    let mut rendered = Vec::with_capacity(collection.len());
    for schema in &collection {
        let class_name = schema.class_name().unwrap_or_default();
        let text = schema
            .render(&template, &suffix)
            .with_context(|| format!("Failed to render mock for {class_name}"))?;
        rendered.push((mock_file_name(class_name, &suffix), text));
    }

    let Some(output_dir) = output_dir else {
        let texts: Vec<String> = rendered.into_iter().map(|(_, text)| text).collect();
        return Ok(texts.join("\n"));
    };

    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    for (file_name, text) in &rendered {
        let path = output_dir.join(file_name);
        fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote mock");
    }

    let file_word = if rendered.len() == 1 { "mock" } else { "mocks" };
    Ok(format!(
        "Generated {} {file_word} in {}",
        rendered.len(),
        output_dir.display()
    ))
}

fn template_path(args: &GenerateArgs, project: &Project) -> Option<PathBuf> {
    args.template
        .map(Path::to_path_buf)
        .or_else(|| project.config.template.as_deref().map(|p| project.config_path(p)))
}

/// `Admin::BlogPost` + `Mock` → `admin_blog_post_mock.rb`.
pub fn mock_file_name(class_name: &str, suffix: &str) -> String {
    format!(
        "{}_{}.rb",
        class_name.replace("::", "_").to_snake_case(),
        suffix.to_snake_case()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names() {
        assert_eq!(mock_file_name("Person", "Mock"), "person_mock.rb");
        assert_eq!(mock_file_name("Admin::BlogPost", "Mock"), "admin_blog_post_mock.rb");
        assert_eq!(mock_file_name("Person", "TestDouble"), "person_test_double.rb");
    }
}
