pub mod assemble;
pub mod capability;
pub mod catalogs;
pub mod collection;
pub mod dump;
pub mod error;
pub mod inflect;
pub mod introspect;
pub mod lexer;
pub mod loader;
pub mod parser;
pub mod render;
pub mod schema;
pub mod types;

pub use assemble::{assemble_all, load_all, load_schema, schema_for};
pub use capability::{AttachMode, AttachOutcome, CapabilityRef, CapabilityRegistry};
pub use catalogs::{DEFAULT_MOCK_SUFFIX, GENERATOR_VERSION, SCHEMA_VERSION};
pub use collection::ModelSchemaCollection;
pub use dump::{collection_to_json, source_to_json, sources_to_json};
pub use error::{CapabilityAttachError, EvalError, IntrospectionError, LoadError, RenderError};
pub use introspect::{Introspector, MethodSignature};
pub use lexer::lex;
pub use loader::{DefinitionLoader, FileReader, FsReader, LoaderOptions, MemoryReader};
pub use parser::{parse_source, Namespace};
pub use render::{render, DEFAULT_TEMPLATE};
pub use schema::{Arguments, AttributeSpec, ConstantSpec, MethodSpec, ModelSchema, RelationshipSpec};
pub use types::*;
