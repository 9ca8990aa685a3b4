//! Assembles schema models from loaded definitions.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::collection::ModelSchemaCollection;
use crate::error::LoadError;
use crate::introspect::{Introspector, MethodSignature};
use crate::loader::{DefinitionLoader, FileReader, FsReader, LoaderOptions};
use crate::schema::{Arguments, MethodSpec, ModelSchema};
use crate::types::{MethodKind, ModelDefinition, RelationKind};

/// Build the schema for one definition.
///
/// A failed instance-signature read is logged and the instance methods are
/// reported without parameters.
pub fn schema_for(def: &ModelDefinition) -> ModelSchema {
    build_schema(def, None)
}

fn build_schema(def: &ModelDefinition, join_members: Option<&BTreeSet<&str>>) -> ModelSchema {
    let introspector = Introspector::new(def);

    let instance = match introspector.instance_methods_with_arguments() {
        Ok(signatures) => signatures,
        Err(err) => {
            tracing::warn!(class = %def.name, error = %err, "instance method parameters unavailable");
            introspector
                .instance_methods()
                .into_iter()
                .map(|name| MethodSignature {
                    name: name.to_string(),
                    arguments: Arguments::default(),
                })
                .collect()
        }
    };

    let mut methods = Vec::new();
    methods.extend(to_specs(introspector.class_methods_with_arguments(), MethodKind::Class));
    methods.extend(to_specs(instance, MethodKind::Instance));
    methods.extend(to_specs(introspector.scope_methods_with_arguments(), MethodKind::Scope));

    ModelSchema::builder()
        .class_name(def.name.clone())
        .table_name(def.table_name.clone())
        .attributes(def.attributes.clone())
        .relationships(
            introspector
                .relationships()
                .into_iter()
                .cloned()
                .collect::<Vec<_>>(),
        )
        .methods(methods)
        .constants(def.constants.clone())
        .modules(def.attached.clone())
        .is_join_table(join_members.is_some())
        .join_table_members(
            join_members.map(|m| m.iter().map(|name| name.to_string()).collect::<Vec<_>>()),
        )
        .build()
}

/// Build schemas for a set of definitions loaded together, resolving
/// join-table membership across them.
pub fn assemble_all<'a, I>(defs: I) -> ModelSchemaCollection
where
    I: IntoIterator<Item = &'a ModelDefinition>,
{
    let defs: Vec<&ModelDefinition> = defs.into_iter().collect();

    // join table → classes declaring a has_and_belongs_to_many through it
    let mut join_tables: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for def in &defs {
        let habtm = def
            .relationships
            .get(&RelationKind::HasAndBelongsToMany)
            .into_iter()
            .flatten();
        for rel in habtm {
            if let Some(table) = rel.join_table.as_deref() {
                join_tables.entry(table).or_default().insert(def.name.as_str());
            }
        }
    }

    defs.iter()
        .map(|def| {
            let members = join_tables.get(def.table_name.as_str());
            if members.is_some() {
                tracing::debug!(class = %def.name, table = %def.table_name, "model is a join table");
            }
            build_schema(def, members)
        })
        .collect()
}

/// Load one model with a fresh loader and build its schema.
pub fn load_schema(
    model_dir: &Path,
    model_name: &str,
    options: LoaderOptions,
) -> Result<ModelSchema, LoadError> {
    let loader = DefinitionLoader::with_reader(model_dir, FsReader, options);
    load_schema_with(loader, model_name)
}

pub fn load_schema_with<R: FileReader>(
    mut loader: DefinitionLoader<R>,
    model_name: &str,
) -> Result<ModelSchema, LoadError> {
    let klass = loader.parse(model_name)?.klass()?;
    Ok(schema_for(&klass))
}

/// Load every named model (one loader each) and assemble them together.
pub fn load_all(
    model_dir: &Path,
    model_names: &[String],
    options: &LoaderOptions,
) -> Result<ModelSchemaCollection, LoadError> {
    let mut defs = Vec::with_capacity(model_names.len());
    for name in model_names {
        let mut loader = DefinitionLoader::with_reader(model_dir, FsReader, options.clone());
        defs.push(loader.parse(name)?.klass()?);
    }
    Ok(assemble_all(defs.iter().map(|d| d.as_ref())))
}

fn to_specs(signatures: Vec<MethodSignature>, kind: MethodKind) -> Vec<MethodSpec> {
    signatures
        .into_iter()
        .map(|s| MethodSpec {
            name: s.name,
            arguments: s.arguments,
            kind,
        })
        .collect()
}
