use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use schemock_core::catalogs::SOURCE_EXTENSION;
use schemock_core::loader::default_known_constants;
use schemock_core::{CapabilityRegistry, LoaderOptions};

pub const CONFIG_FILE: &str = "schemock.config.yaml";

/// Project configuration from schemock.config.yaml.
#[derive(Debug, Default, Deserialize)]
pub struct SchemockConfig {
    /// Model directory, relative to the config file.
    pub model_dir: Option<PathBuf>,
    /// Glob patterns selecting model files, relative to the model directory.
    pub models: Option<Vec<String>>,
    pub output_dir: Option<PathBuf>,
    pub suffix: Option<String>,
    pub template: Option<PathBuf>,
    /// Mixins available to `include`/`extend`.
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Extra superclasses that resolve without a declaration.
    #[serde(default)]
    pub known_constants: Vec<String>,
}

/// Where the models live and which ones to load.
#[derive(Debug)]
pub struct Project {
    /// Directory holding the config file (or the input directory).
    pub root: PathBuf,
    pub model_dir: PathBuf,
    /// Model names relative to `model_dir`, without extension.
    pub models: Vec<String>,
    pub config: SchemockConfig,
}

impl Project {
    /// Open a project from a model file or a directory.
    pub fn open(input_path: &Path) -> Result<Project> {
        if !input_path.exists() {
            bail!("Path does not exist: {}", input_path.display());
        }

        if input_path.is_file() {
            let root = input_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            let config = read_project_config(&root)?.unwrap_or_default();
            let name = input_path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .context("model file has no name")?;
            return Ok(Project {
                model_dir: root.clone(),
                root,
                models: vec![name],
                config,
            });
        }

        if input_path.is_dir() {
            let config = read_project_config(input_path)?.unwrap_or_default();
            let model_dir = match &config.model_dir {
                Some(dir) => input_path.join(dir),
                None => input_path.to_path_buf(),
            };
            let patterns = match &config.models {
                Some(p) if !p.is_empty() => p.clone(),
                _ => vec![format!("**/*.{SOURCE_EXTENSION}")],
            };
            let models = scan_models(&model_dir, &patterns)?;
            return Ok(Project {
                root: input_path.to_path_buf(),
                model_dir,
                models,
                config,
            });
        }

        bail!(
            "Path is neither a file nor a directory: {}",
            input_path.display()
        )
    }

    pub fn loader_options(&self) -> LoaderOptions {
        let mut known_constants = default_known_constants();
        known_constants.extend(self.config.known_constants.iter().cloned());
        LoaderOptions::builder()
            .known_constants(known_constants)
            .capabilities(CapabilityRegistry::new(self.config.capabilities.iter().cloned()))
            .build()
    }

    /// Resolve a config-relative path.
    pub fn config_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Read project config from schemock.config.yaml if it exists.
pub fn read_project_config(dir_path: &Path) -> Result<Option<SchemockConfig>> {
    let config_path = dir_path.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    let config = serde_yaml::from_str(&content)
        .with_context(|| format!("Invalid YAML config: {}", config_path.display()))?;
    Ok(Some(config))
}

/// Model names (relative path without extension) matching `patterns`, in sorted order per pattern.
fn scan_models(model_dir: &Path, patterns: &[String]) -> Result<Vec<String>> {
    let mut models = Vec::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    for pattern in patterns {
        let full_pattern = model_dir.join(pattern);
        let pattern_str = full_pattern.to_string_lossy().replace('\\', "/");
        let entries = glob::glob(&pattern_str)
            .with_context(|| format!("Invalid glob pattern '{pattern}'"))?;

        let mut matched: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let path = entry.context("Glob error")?;
            if path.extension().is_some_and(|e| e == SOURCE_EXTENSION) && seen.insert(path.clone()) {
                matched.push(path);
            }
        }
        matched.sort();

        for path in matched {
            models.push(model_name(model_dir, &path));
        }
    }

    Ok(models)
}

fn model_name(model_dir: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(model_dir).unwrap_or(path);
    relative
        .with_extension("")
        .to_string_lossy()
        .replace('\\', "/")
}
