use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use schemock_core::{
    AttachOutcome, DefinitionLoader, FsReader, LoadError, MethodSignature, RelationshipSpec,
};

use crate::reader::Project;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InspectReport {
    class_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    superclass: Option<String>,
    table_name: String,
    class_methods: Vec<MethodSignature>,
    instance_methods: InstanceMethods,
    relationships: BTreeMap<String, Vec<RelationshipSpec>>,
    capabilities: Vec<CapabilityReport>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum InstanceMethods {
    Signatures(Vec<MethodSignature>),
    /// Signatures unavailable; names only, with the reason.
    Names { names: Vec<String>, error: String },
}

#[derive(Debug, Serialize)]
struct CapabilityReport {
    name: String,
    mode: &'static str,
    attached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<&AttachOutcome> for CapabilityReport {
    fn from(outcome: &AttachOutcome) -> Self {
        CapabilityReport {
            name: outcome.capability.clone(),
            mode: outcome.mode.as_str(),
            attached: outcome.is_attached(),
            error: outcome.result.as_ref().err().map(ToString::to_string),
        }
    }
}

/// Load one model and report what introspection sees.
pub fn run_inspect(model: &str, dir: &Path, format: &str) -> Result<String> {
    let project = Project::open(dir)?;
    let mut loader =
        DefinitionLoader::with_reader(&project.model_dir, FsReader, project.loader_options());
    let klass = loader
        .parse(model)
        .with_context(|| format!("Failed to load model '{model}'"))?
        .klass()?;

    let instance_methods = match loader.instance_methods_with_arguments() {
        Ok(signatures) => InstanceMethods::Signatures(signatures),
        Err(LoadError::Introspection(err)) => InstanceMethods::Names {
            names: loader.instance_methods()?,
            error: err.to_string(),
        },
        Err(err) => return Err(err.into()),
    };

    let report = InspectReport {
        class_name: klass.name.clone(),
        superclass: klass.superclass.clone(),
        table_name: klass.table_name.clone(),
        class_methods: loader.class_methods_with_arguments()?,
        instance_methods,
        relationships: loader
            .relationships_types()?
            .into_iter()
            .map(|(kind, rels)| (kind.as_str().to_string(), rels))
            .collect(),
        capabilities: klass.attach_outcomes.iter().map(CapabilityReport::from).collect(),
    };

    if format == "json" {
        return serde_json::to_string_pretty(&report).context("JSON serialization error");
    }
    Ok(render_human(&report))
}

fn render_human(report: &InspectReport) -> String {
    let mut lines: Vec<String> = Vec::new();

    match &report.superclass {
        Some(parent) => lines.push(format!("{} < {}", report.class_name, parent)),
        None => lines.push(report.class_name.clone()),
    }
    lines.push(format!("  table: {}", report.table_name));

    lines.push("  class methods:".into());
    for m in &report.class_methods {
        lines.push(format!("    self.{}({})", m.name, m.arguments.signature()));
    }

    lines.push("  instance methods:".into());
    match &report.instance_methods {
        InstanceMethods::Signatures(sigs) => {
            for m in sigs {
                lines.push(format!("    {}({})", m.name, m.arguments.signature()));
            }
        }
        InstanceMethods::Names { names, error } => {
            for name in names {
                lines.push(format!("    {name}(?)"));
            }
            lines.push(format!("    note: {error}"));
        }
    }

    lines.push("  relationships:".into());
    for (kind, rels) in &report.relationships {
        for r in rels {
            lines.push(format!("    {kind} :{} -> {}", r.name, r.class_name));
        }
    }

    lines.push("  capabilities:".into());
    for c in &report.capabilities {
        let status = match &c.error {
            None => "attached".to_string(),
            Some(err) => format!("skipped ({err})"),
        };
        lines.push(format!("    {} {}: {status}", c.mode, c.name));
    }

    lines.join("\n")
}
