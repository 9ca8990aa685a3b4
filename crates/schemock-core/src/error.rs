use std::path::PathBuf;

use thiserror::Error;

use crate::types::Parameter;

/// Failure to obtain a usable definition from a model source file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("model file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no model name given; call parse() before querying the loader")]
    MissingModelName,

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Introspection(#[from] IntrospectionError),
}

/// The source text could not be turned into a definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("{file}:{line}: {message}")]
    Syntax {
        file: String,
        line: usize,
        message: String,
    },

    #[error("{file}:{line}: uninitialized constant {name}")]
    UnresolvedName {
        name: String,
        file: String,
        line: usize,
    },

    #[error("{file}: no class is declared")]
    NoClassDefined { file: String },
}

/// A single reflection step failed. Scoped to that step; the load survives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntrospectionError {
    #[error(
        "cannot instantiate {class_name} without arguments (initialize requires: {})",
        parameters.iter().map(|p| p.name.as_str()).collect::<Vec<_>>().join(", ")
    )]
    NotInstantiable {
        class_name: String,
        parameters: Vec<Parameter>,
    },
}

/// A declared capability could not be attached. Recorded and logged, never returned from a load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityAttachError {
    #[error("can't {mode} module {capability} from class {class_name} (line {line})")]
    Unavailable {
        capability: String,
        mode: &'static str,
        class_name: String,
        line: usize,
    },
}

/// The template could not be rendered against a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("template line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("template line {line}: undefined query `{name}`")]
    UndefinedQuery { name: String, line: usize },

    #[error("template line {line}: unknown filter `{name}`")]
    UnknownFilter { name: String, line: usize },

    #[error("template line {line}: `{name}` is not iterable")]
    NotIterable { name: String, line: usize },
}
