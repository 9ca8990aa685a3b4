use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::capability::{AttachOutcome, CapabilityDecl, CapabilityRef};
use crate::schema::{AttributeSpec, ConstantSpec, RelationshipSpec};

// ---------------------------------------------------------------------------
// Source location
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
}

// ---------------------------------------------------------------------------
// Token types (internal, not serialized)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Module,
    Class,
    SingletonClass,
    Def,
    Macro,
    Constant,
    SelfAssign,
    Visibility,
    BlockOpen,
    End,
    Blank,
    Text,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub raw: String,
    pub line: usize,
    pub indent: usize,
    pub data: TokenData,
}

#[derive(Debug, Clone, Default)]
pub struct TokenData {
    pub name: Option<String>,

    // Class
    pub superclass: Option<String>,

    // Def
    pub singleton: bool,
    pub params: Vec<Parameter>,
    pub visibility: Option<Visibility>,

    // Macro / SelfAssign / Constant
    pub args: Vec<ArgValue>,
    pub options: Vec<(String, ArgValue)>,
    pub value: Option<String>,
    pub malformed: Option<String>,

    /// Token opens a body that must be closed by a matching `end`.
    pub opens_block: bool,
}

/// A literal argument passed to a class-level macro.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Symbol(String),
    Str(String),
    Number(String),
    Bool(bool),
    Nil,
    Constant(String),
    Lambda(Vec<Parameter>),
    Raw(String),
}

impl ArgValue {
    /// Identifier-like view of the value (symbols, strings and constants).
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            ArgValue::Symbol(s) | ArgValue::Str(s) | ArgValue::Constant(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The value as it would be written back into generated source.
    pub fn to_literal(&self) -> String {
        match self {
            ArgValue::Symbol(s) => format!(":{s}"),
            ArgValue::Str(s) => format!("{s:?}"),
            ArgValue::Number(n) => n.clone(),
            ArgValue::Bool(b) => b.to_string(),
            ArgValue::Nil => "nil".into(),
            ArgValue::Constant(c) => c.clone(),
            ArgValue::Lambda(_) => "->() {}".into(),
            ArgValue::Raw(r) => r.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared enumerations
// ---------------------------------------------------------------------------

/// Column storage types understood by the type map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    Integer,
    #[serde(rename = "bigint")]
    BigInt,
    Float,
    Decimal,
    #[serde(rename = "datetime")]
    DateTime,
    Timestamp,
    Time,
    Date,
    String,
    Text,
    Binary,
    Uuid,
    Boolean,
    Json,
    Jsonb,
    #[serde(other)]
    Unknown,
}

impl StorageType {
    pub fn parse(s: &str) -> StorageType {
        match s {
            "integer" | "primary_key" => StorageType::Integer,
            "bigint" => StorageType::BigInt,
            "float" => StorageType::Float,
            "decimal" => StorageType::Decimal,
            "datetime" => StorageType::DateTime,
            "timestamp" => StorageType::Timestamp,
            "time" => StorageType::Time,
            "date" => StorageType::Date,
            "string" | "citext" => StorageType::String,
            "text" => StorageType::Text,
            "binary" => StorageType::Binary,
            "uuid" => StorageType::Uuid,
            "boolean" => StorageType::Boolean,
            "json" => StorageType::Json,
            "jsonb" => StorageType::Jsonb,
            _ => StorageType::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    HasMany,
    HasOne,
    BelongsTo,
    HasAndBelongsToMany,
}

impl RelationKind {
    pub fn from_macro(name: &str) -> Option<RelationKind> {
        match name {
            "has_many" => Some(RelationKind::HasMany),
            "has_one" => Some(RelationKind::HasOne),
            "belongs_to" => Some(RelationKind::BelongsTo),
            "has_and_belongs_to_many" => Some(RelationKind::HasAndBelongsToMany),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::HasMany => "has_many",
            RelationKind::HasOne => "has_one",
            RelationKind::BelongsTo => "belongs_to",
            RelationKind::HasAndBelongsToMany => "has_and_belongs_to_many",
        }
    }

    /// Whether the relation names a collection (plural name).
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            RelationKind::HasMany | RelationKind::HasAndBelongsToMany
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    Instance,
    Class,
    Scope,
}

impl MethodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MethodKind::Instance => "instance",
            MethodKind::Class => "class",
            MethodKind::Scope => "scope",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn parse(s: &str) -> Option<Visibility> {
        match s {
            "public" => Some(Visibility::Public),
            "protected" => Some(Visibility::Protected),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }
}

/// Parameter descriptor tag, mirroring the `parameters` reflection of the source language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Req,
    Opt,
    Rest,
    KeyReq,
    Key,
    KeyRest,
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub kind: ParameterKind,
    pub name: String,
}

impl Parameter {
    pub fn new(kind: ParameterKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    /// Parameters that must be supplied by every caller.
    pub fn is_required(&self) -> bool {
        matches!(self.kind, ParameterKind::Req | ParameterKind::KeyReq)
    }
}

// ---------------------------------------------------------------------------
// Declarative definition record (what the loader yields instead of a class object)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDefinition {
    pub name: String,
    pub kind: MethodKind,
    pub visibility: Visibility,
    pub parameters: Vec<Parameter>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    /// Fully qualified name (enclosing modules joined with `::`).
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superclass: Option<String>,
    pub table_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
    pub attributes: Vec<AttributeSpec>,
    /// Declared relationship registry: relation kind → relationships of that kind.
    pub relationships: BTreeMap<RelationKind, Vec<RelationshipSpec>>,
    pub methods: Vec<MethodDefinition>,
    pub constants: Vec<ConstantSpec>,
    pub capabilities: Vec<CapabilityDecl>,
    /// Capabilities that attached successfully, keyed by module name.
    pub attached: BTreeMap<String, CapabilityRef>,
    #[serde(skip)]
    pub attach_outcomes: Vec<AttachOutcome>,
    pub loc: SourceLocation,
}

impl ModelDefinition {
    pub fn new(name: impl Into<String>, loc: SourceLocation) -> Self {
        Self {
            name: name.into(),
            superclass: None,
            table_name: String::new(),
            primary_key: None,
            attributes: Vec::new(),
            relationships: BTreeMap::new(),
            methods: Vec::new(),
            constants: Vec::new(),
            capabilities: Vec::new(),
            attached: BTreeMap::new(),
            attach_outcomes: Vec::new(),
            loc,
        }
    }

    /// Unqualified class name (last `::` segment).
    pub fn short_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }

    /// Parameters of the declared initializer, if any.
    pub fn initializer(&self) -> Option<&MethodDefinition> {
        self.methods
            .iter()
            .find(|m| m.kind == MethodKind::Instance && m.name == "initialize")
    }
}

/// A type declared by a source file.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclaredType {
    Module { name: String, line: usize },
    Class(Box<ModelDefinition>),
}

impl DeclaredType {
    pub fn name(&self) -> &str {
        match self {
            DeclaredType::Module { name, .. } => name,
            DeclaredType::Class(def) => &def.name,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            DeclaredType::Module { line, .. } => *line,
            DeclaredType::Class(def) => def.loc.line,
        }
    }
}
