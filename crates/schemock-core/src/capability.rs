//! Capability (mixin) attachment.
//!
//! Models may `include`/`extend` modules that are not available in the
//! analysis environment. Attaching is an attempt-and-record step: every
//! declaration produces an [`AttachOutcome`], failures are logged and the
//! load carries on without that capability.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::CapabilityAttachError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachMode {
    Include,
    Extend,
}

impl AttachMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachMode::Include => "include",
            AttachMode::Extend => "extend",
        }
    }
}

/// An `include`/`extend` line as written in the model definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDecl {
    pub name: String,
    pub mode: AttachMode,
    pub line: usize,
}

/// Where an attached capability came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilitySource {
    /// Registered with the loader.
    Registry,
    /// Declared as a module in the same source file.
    Local,
}

/// Reference to a successfully attached capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityRef {
    pub module: String,
    pub mode: AttachMode,
    pub source: CapabilitySource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttachOutcome {
    pub capability: String,
    pub mode: AttachMode,
    pub result: Result<CapabilityRef, CapabilityAttachError>,
}

impl AttachOutcome {
    pub fn is_attached(&self) -> bool {
        self.result.is_ok()
    }
}

/// Set of capability modules available in the analysis environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityRegistry {
    available: BTreeSet<String>,
}

impl CapabilityRegistry {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            available: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>) {
        self.available.insert(name.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.available.contains(name.trim_start_matches("::"))
    }

    /// Attempt to attach one declared capability to `class_name`.
    /// `local_modules` are modules declared by the same source file.
    pub fn attach(
        &self,
        decl: &CapabilityDecl,
        class_name: &str,
        local_modules: &BTreeSet<String>,
    ) -> AttachOutcome {
        let module = decl.name.trim_start_matches("::").to_string();
        let source = if local_modules.contains(&module) {
            Some(CapabilitySource::Local)
        } else if self.contains(&module) {
            Some(CapabilitySource::Registry)
        } else {
            None
        };

        let result = match source {
            Some(source) => Ok(CapabilityRef {
                module: module.clone(),
                mode: decl.mode,
                source,
            }),
            None => Err(CapabilityAttachError::Unavailable {
                capability: module.clone(),
                mode: decl.mode.as_str(),
                class_name: class_name.to_string(),
                line: decl.line,
            }),
        };

        AttachOutcome {
            capability: module,
            mode: decl.mode,
            result,
        }
    }

    /// Attach every declaration in order. Failures are logged and absorbed.
    pub fn attach_all(
        &self,
        decls: &[CapabilityDecl],
        class_name: &str,
        local_modules: &BTreeSet<String>,
    ) -> (BTreeMap<String, CapabilityRef>, Vec<AttachOutcome>) {
        let mut attached = BTreeMap::new();
        let mut outcomes = Vec::with_capacity(decls.len());

        for decl in decls {
            let outcome = self.attach(decl, class_name, local_modules);
            match &outcome.result {
                Ok(cap) => {
                    tracing::debug!(
                        class = class_name,
                        capability = %cap.module,
                        mode = cap.mode.as_str(),
                        "attached capability"
                    );
                    attached.insert(cap.module.clone(), cap.clone());
                }
                Err(err) => {
                    tracing::debug!(class = class_name, error = %err, "capability not attached");
                }
            }
            outcomes.push(outcome);
        }

        (attached, outcomes)
    }
}
