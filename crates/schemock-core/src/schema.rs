//! Schema model: the structured, queryable description of one model
//! definition that templates render from.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;
use typed_builder::TypedBuilder;

use crate::capability::CapabilityRef;
use crate::catalogs::{target_type_name, DEFAULT_MOCK_SUFFIX};
use crate::error::RenderError;
use crate::render;
use crate::types::{MethodKind, Parameter, ParameterKind, RelationKind, StorageType};

// ---------------------------------------------------------------------------
// Nested value objects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
pub struct AttributeSpec {
    #[builder(setter(into))]
    pub name: String,
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    /// Default as a source literal (`0`, `"active"`, `true`).
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[builder(default)]
    #[serde(default, rename = "isPrimaryKey")]
    pub is_primary_key: bool,
}

impl AttributeSpec {
    /// The integer `id` key synthesized for models without a declared primary key.
    pub fn default_primary_key() -> Self {
        AttributeSpec::builder()
            .name("id")
            .storage_type(StorageType::Integer)
            .is_primary_key(true)
            .build()
    }

    pub fn target_type_name(&self) -> &'static str {
        target_type_name(self.storage_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct RelationshipSpec {
    #[builder(setter(into))]
    pub name: String,
    #[builder(setter(into))]
    #[serde(rename = "className")]
    pub class_name: String,
    #[serde(rename = "type")]
    pub kind: RelationKind,
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub through: Option<String>,
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none", rename = "foreignKey")]
    pub foreign_key: Option<String>,
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none", rename = "joinTable")]
    pub join_table: Option<String>,
}

impl RelationshipSpec {
    /// Value of a named field, for equality lookups. Accepts snake_case or camelCase names.
    pub fn field(&self, field: &str) -> Option<Cow<'_, str>> {
        match field {
            "name" => Some(Cow::Borrowed(&self.name)),
            "class_name" | "className" => Some(Cow::Borrowed(&self.class_name)),
            "type" | "kind" => Some(Cow::Borrowed(self.kind.as_str())),
            "through" => self.through.as_deref().map(Cow::Borrowed),
            "foreign_key" | "foreignKey" => self.foreign_key.as_deref().map(Cow::Borrowed),
            "join_table" | "joinTable" => self.join_table.as_deref().map(Cow::Borrowed),
            _ => None,
        }
    }
}

/// Ordered parameter descriptors of one method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(pub Vec<Parameter>);

impl Arguments {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.0.iter()
    }

    /// Parameter list for a stub definition: `a, b=nil, *rest, key:, opt: nil, **opts, &block`.
    pub fn signature(&self) -> String {
        self.0
            .iter()
            .map(|p| match p.kind {
                ParameterKind::Req => p.name.clone(),
                ParameterKind::Opt => format!("{}=nil", p.name),
                ParameterKind::Rest => prefixed("*", &p.name),
                ParameterKind::KeyReq => format!("{}:", p.name),
                ParameterKind::Key => format!("{}: nil", p.name),
                ParameterKind::KeyRest => prefixed("**", &p.name),
                ParameterKind::Block => prefixed("&", &p.name),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Argument list that forwards every parameter: `a, b, *rest, key: key, **opts, &block`.
    pub fn passable(&self) -> String {
        self.0
            .iter()
            .map(|p| match p.kind {
                ParameterKind::Req | ParameterKind::Opt => p.name.clone(),
                ParameterKind::Rest => prefixed("*", &p.name),
                ParameterKind::KeyReq | ParameterKind::Key => format!("{0}: {0}", p.name),
                ParameterKind::KeyRest => prefixed("**", &p.name),
                ParameterKind::Block => prefixed("&", &p.name),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn prefixed(marker: &str, name: &str) -> String {
    if name == marker {
        marker.to_string()
    } else {
        format!("{marker}{name}")
    }
}

impl From<Vec<Parameter>> for Arguments {
    fn from(params: Vec<Parameter>) -> Self {
        Arguments(params)
    }
}

/// A class-level constant and its source literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantSpec {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ConstantSpec {
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct MethodSpec {
    #[builder(setter(into))]
    pub name: String,
    #[builder(default, setter(into))]
    pub arguments: Arguments,
    #[serde(rename = "type")]
    pub kind: MethodKind,
}

// ---------------------------------------------------------------------------
// Schema model
// ---------------------------------------------------------------------------

/// Queryable description of one model.
///
/// Every field is present only if it was supplied at construction; collection
/// accessors still answer with an empty sequence when their field is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ModelSchema {
    #[builder(default, setter(into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    class_name: Option<String>,
    #[builder(default, setter(into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    table_name: Option<String>,
    #[builder(default, setter(into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    attributes: Option<Vec<AttributeSpec>>,
    #[builder(default, setter(into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    relationships: Option<Vec<RelationshipSpec>>,
    #[builder(default, setter(into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    methods: Option<Vec<MethodSpec>>,
    #[builder(default, setter(into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    constants: Option<Vec<ConstantSpec>>,
    #[builder(default, setter(into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    modules: Option<BTreeMap<String, CapabilityRef>>,
    #[builder(default, setter(into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    is_join_table: Option<bool>,
    #[builder(default, setter(into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    join_table_members: Option<Vec<String>>,
}

impl ModelSchema {
    // --- Plain accessors ---

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    pub fn table_name(&self) -> Option<&str> {
        self.table_name.as_deref()
    }

    pub fn attributes(&self) -> &[AttributeSpec] {
        self.attributes.as_deref().unwrap_or_default()
    }

    pub fn relationships(&self) -> &[RelationshipSpec] {
        self.relationships.as_deref().unwrap_or_default()
    }

    pub fn methods(&self) -> &[MethodSpec] {
        self.methods.as_deref().unwrap_or_default()
    }

    pub fn constants(&self) -> Vec<&str> {
        self.constant_specs().iter().map(|c| c.name.as_str()).collect()
    }

    pub fn constant_specs(&self) -> &[ConstantSpec] {
        self.constants.as_deref().unwrap_or_default()
    }

    pub fn modules(&self) -> Option<&BTreeMap<String, CapabilityRef>> {
        self.modules.as_ref()
    }

    pub fn is_join_table(&self) -> bool {
        self.is_join_table.unwrap_or(false)
    }

    pub fn join_table_members(&self) -> Option<&[String]> {
        self.join_table_members.as_deref()
    }

    /// Value of a named top-level field, for equality lookups.
    pub fn field(&self, field: &str) -> Option<Cow<'_, str>> {
        match field {
            "class_name" | "className" => self.class_name.as_deref().map(Cow::Borrowed),
            "table_name" | "tableName" => self.table_name.as_deref().map(Cow::Borrowed),
            "is_join_table" | "isJoinTable" => {
                self.is_join_table.map(|b| Cow::Owned(b.to_string()))
            }
            _ => None,
        }
    }

    // --- Relationship queries ---

    pub fn has_many(&self) -> Vec<&RelationshipSpec> {
        self.relation_find(RelationKind::HasMany)
    }

    pub fn has_one(&self) -> Vec<&RelationshipSpec> {
        self.relation_find(RelationKind::HasOne)
    }

    pub fn belongs_to(&self) -> Vec<&RelationshipSpec> {
        self.relation_find(RelationKind::BelongsTo)
    }

    pub fn has_and_belongs_to_many(&self) -> Vec<&RelationshipSpec> {
        self.relation_find(RelationKind::HasAndBelongsToMany)
    }

    /// The belongs-to relationship whose foreign key is `key` (`:author_id` and `author_id` match).
    pub fn belongs_to_foreign_key(&self, key: &str) -> Option<&RelationshipSpec> {
        let wanted = normalize_ident(key);
        self.belongs_to().into_iter().find(|r| {
            r.foreign_key
                .as_deref()
                .is_some_and(|fk| normalize_ident(fk).eq_ignore_ascii_case(wanted))
        })
    }

    fn relation_find(&self, kind: RelationKind) -> Vec<&RelationshipSpec> {
        self.relationships()
            .iter()
            .filter(|r| r.kind == kind)
            .collect()
    }

    // --- Method queries ---

    pub fn instance_methods(&self) -> Vec<&MethodSpec> {
        self.method_find(MethodKind::Instance)
    }

    pub fn class_methods(&self) -> Vec<&MethodSpec> {
        self.method_find(MethodKind::Class)
    }

    pub fn scope_methods(&self) -> Vec<&MethodSpec> {
        self.method_find(MethodKind::Scope)
    }

    fn method_find(&self, kind: MethodKind) -> Vec<&MethodSpec> {
        self.methods().iter().filter(|m| m.kind == kind).collect()
    }

    // --- Attribute projections ---

    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes().iter().map(|a| a.name.as_str()).collect()
    }

    /// Attribute name → target type, as the literal text `{ id: Integer, name: String }`.
    /// A repeated name keeps its first position and its last type.
    pub fn types_hash(&self) -> String {
        let mut types: Map<String, Value> = Map::new();
        for a in self.attributes() {
            types.insert(a.name.clone(), Value::from(a.target_type_name()));
        }
        let entries: Vec<String> = types
            .iter()
            .map(|(name, ty)| format!("{name}: {}", ty.as_str().unwrap_or_default()))
            .collect();
        format!("{{ {} }}", entries.join(", "))
    }

    /// Attribute name → default literal; attributes without a default map to null.
    pub fn attributes_with_defaults(&self) -> Map<String, Value> {
        self.attributes()
            .iter()
            .map(|a| {
                let value = a
                    .default_value
                    .as_ref()
                    .map_or(Value::Null, |d| Value::String(d.clone()));
                (a.name.clone(), value)
            })
            .collect()
    }

    /// Relationship name → null: the empty association slots of a fresh mock.
    pub fn associations(&self) -> Map<String, Value> {
        null_map(self.relationships().iter().map(|r| r.name.as_str()))
    }

    pub fn mockable_class_methods(&self) -> Map<String, Value> {
        null_map(self.class_methods().into_iter().map(|m| m.name.as_str()))
    }

    pub fn mockable_instance_methods(&self) -> Map<String, Value> {
        null_map(self.instance_methods().into_iter().map(|m| m.name.as_str()))
    }

    pub fn mock_name(&self, suffix: &str) -> String {
        let suffix = if suffix.is_empty() {
            DEFAULT_MOCK_SUFFIX
        } else {
            suffix
        };
        format!("{}{}", self.class_name().unwrap_or_default(), suffix)
    }

    // --- Primary key ---

    /// The declared primary key, without synthesizing one.
    pub fn declared_primary_key(&self) -> Option<&AttributeSpec> {
        self.attributes().iter().find(|a| a.is_primary_key)
    }

    /// The declared primary key; otherwise the integer `id` key, prepended to the
    /// attributes on first call. Later calls find the prepended key.
    pub fn primary_key(&mut self) -> &AttributeSpec {
        let attributes = self.attributes.get_or_insert_with(Vec::new);
        match attributes.iter().position(|a| a.is_primary_key) {
            Some(idx) => &attributes[idx],
            None => {
                tracing::debug!(
                    class = self.class_name.as_deref().unwrap_or("?"),
                    "synthesizing default primary key `id`"
                );
                attributes.insert(0, AttributeSpec::default_primary_key());
                &attributes[0]
            }
        }
    }

    // --- Rendering ---

    /// Render `template` with this schema as its only data context.
    pub fn render(&self, template: &str, suffix: &str) -> Result<String, RenderError> {
        render::render(template, self, suffix)
    }

    /// Named inputs handed to templates: every public query plus the suffix.
    ///
    /// Queries run on a copy whose primary key has been resolved, so a synthesized `id` shows up
    /// in every attribute projection.
    pub fn render_context(&self, suffix: &str) -> Value {
        let mut keyed = self.clone();
        let primary_key = keyed.primary_key().clone();
        let methods_json = |methods: Vec<&MethodSpec>| -> Value {
            Value::Array(methods.into_iter().map(method_json).collect())
        };
        let relations_json = |relations: Vec<&RelationshipSpec>| -> Value {
            Value::Array(
                relations
                    .into_iter()
                    .map(|r| serde_json::to_value(r).unwrap_or(Value::Null))
                    .collect(),
            )
        };

        let mut ctx = Map::new();
        ctx.insert("suffix".into(), Value::String(suffix.to_string()));
        ctx.insert("mock_name".into(), Value::String(keyed.mock_name(suffix)));
        ctx.insert(
            "class_name".into(),
            Value::String(keyed.class_name().unwrap_or_default().to_string()),
        );
        ctx.insert(
            "table_name".into(),
            Value::String(keyed.table_name().unwrap_or_default().to_string()),
        );
        ctx.insert(
            "attributes".into(),
            Value::Array(keyed.attributes().iter().map(attribute_json).collect()),
        );
        ctx.insert("attribute_names".into(), serde_json::json!(keyed.attribute_names()));
        ctx.insert("primary_key".into(), attribute_json(&primary_key));
        ctx.insert("types_hash".into(), Value::String(keyed.types_hash()));
        ctx.insert(
            "attributes_with_defaults".into(),
            Value::Object(keyed.attributes_with_defaults()),
        );
        ctx.insert("associations".into(), Value::Object(keyed.associations()));
        ctx.insert(
            "relationships".into(),
            relations_json(keyed.relationships().iter().collect()),
        );
        ctx.insert("has_many".into(), relations_json(keyed.has_many()));
        ctx.insert("has_one".into(), relations_json(keyed.has_one()));
        ctx.insert("belongs_to".into(), relations_json(keyed.belongs_to()));
        ctx.insert(
            "has_and_belongs_to_many".into(),
            relations_json(keyed.has_and_belongs_to_many()),
        );
        ctx.insert("instance_methods".into(), methods_json(keyed.instance_methods()));
        ctx.insert("class_methods".into(), methods_json(keyed.class_methods()));
        ctx.insert("scope_methods".into(), methods_json(keyed.scope_methods()));
        ctx.insert(
            "mockable_class_methods".into(),
            Value::Object(keyed.mockable_class_methods()),
        );
        ctx.insert(
            "mockable_instance_methods".into(),
            Value::Object(keyed.mockable_instance_methods()),
        );
        ctx.insert(
            "constants".into(),
            Value::Array(
                keyed.constant_specs()
                    .iter()
                    .map(|c| serde_json::json!({ "name": c.name, "value": c.value }))
                    .collect(),
            ),
        );
        ctx.insert(
            "modules".into(),
            Value::Array(
                keyed.modules()
                    .map(|m| m.keys().map(|k| Value::String(k.clone())).collect())
                    .unwrap_or_default(),
            ),
        );
        ctx.insert("is_join_table".into(), Value::Bool(keyed.is_join_table()));
        ctx.insert(
            "join_table_members".into(),
            serde_json::json!(keyed.join_table_members().unwrap_or_default()),
        );
        Value::Object(ctx)
    }
}

fn attribute_json(attr: &AttributeSpec) -> Value {
    serde_json::json!({
        "name": attr.name,
        "type": attr.target_type_name(),
        "storage_type": attr.storage_type,
        "default": attr.default_value,
        "precision": attr.precision,
        "scale": attr.scale,
        "is_primary_key": attr.is_primary_key,
    })
}

fn method_json(method: &MethodSpec) -> Value {
    serde_json::json!({
        "name": method.name,
        "type": method.kind.as_str(),
        "parameters": method.arguments,
        "signature": method.arguments.signature(),
        "passable": method.arguments.passable(),
    })
}

fn null_map<'a>(names: impl Iterator<Item = &'a str>) -> Map<String, Value> {
    names.map(|n| (n.to_string(), Value::Null)).collect()
}

fn normalize_ident(s: &str) -> &str {
    s.trim().trim_start_matches(':').trim_matches(|c| c == '"' || c == '\'')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rel(name: &str, kind: RelationKind) -> RelationshipSpec {
        RelationshipSpec::builder()
            .name(name)
            .class_name(name.to_uppercase())
            .kind(kind)
            .build()
    }

    fn method(name: &str, kind: MethodKind) -> MethodSpec {
        MethodSpec::builder().name(name).kind(kind).build()
    }

    #[test]
    fn default_primary_key_prepended_once() {
        let mut schema = ModelSchema::builder()
            .attributes(Vec::<AttributeSpec>::new())
            .build();
        let pk = schema.primary_key().clone();
        assert_eq!(pk.name, "id");
        assert_eq!(pk.storage_type, StorageType::Integer);
        assert!(pk.is_primary_key);
        assert_eq!(schema.attributes().len(), 1);

        schema.primary_key();
        assert_eq!(schema.attributes().len(), 1);
    }

    #[test]
    fn declared_primary_key_returned() {
        let mut schema = ModelSchema::builder()
            .attributes(vec![
                AttributeSpec::builder()
                    .name("name")
                    .storage_type(StorageType::String)
                    .build(),
                AttributeSpec::builder()
                    .name("uuid")
                    .storage_type(StorageType::Uuid)
                    .is_primary_key(true)
                    .build(),
            ])
            .build();
        assert_eq!(schema.primary_key().name, "uuid");
        assert_eq!(schema.attribute_names(), vec!["name", "uuid"]);
    }

    #[test]
    fn relationship_queries_partition() {
        let schema = ModelSchema::builder()
            .relationships(vec![
                rel("posts", RelationKind::HasMany),
                rel("profile", RelationKind::HasOne),
                rel("account", RelationKind::BelongsTo),
                rel("tags", RelationKind::HasAndBelongsToMany),
                rel("comments", RelationKind::HasMany),
            ])
            .build();

        let mut all: Vec<&str> = schema
            .has_many()
            .into_iter()
            .chain(schema.has_one())
            .chain(schema.belongs_to())
            .chain(schema.has_and_belongs_to_many())
            .map(|r| r.name.as_str())
            .collect();
        all.sort_unstable();
        assert_eq!(all, vec!["account", "comments", "posts", "profile", "tags"]);
        assert_eq!(schema.has_many().len(), 2);
    }

    #[test]
    fn belongs_to_foreign_key_lookup() {
        let author = RelationshipSpec::builder()
            .name("author")
            .class_name("Person")
            .kind(RelationKind::BelongsTo)
            .foreign_key("author_id")
            .build();
        let editor = RelationshipSpec::builder()
            .name("editor")
            .class_name("Person")
            .kind(RelationKind::BelongsTo)
            .foreign_key("editor_id")
            .build();
        let schema = ModelSchema::builder()
            .relationships(vec![author.clone(), editor])
            .build();

        assert_eq!(schema.belongs_to_foreign_key("author_id"), Some(&author));
        assert_eq!(schema.belongs_to_foreign_key(":author_id"), Some(&author));
        assert_eq!(schema.belongs_to_foreign_key("missing_id"), None);
    }

    #[test]
    fn absent_fields_answer_empty() {
        let schema = ModelSchema::builder().build();
        assert!(schema.instance_methods().is_empty());
        assert!(schema.class_methods().is_empty());
        assert!(schema.scope_methods().is_empty());
        assert!(schema.relationships().is_empty());
        assert!(schema.constants().is_empty());
        assert!(schema.associations().is_empty());
        assert!(!schema.is_join_table());
        assert_eq!(schema.types_hash(), "{  }");
    }

    #[test]
    fn absent_fields_not_serialized() {
        let schema = ModelSchema::builder()
            .class_name("Person".to_string())
            .build();
        let json = serde_json::to_value(&schema).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert_eq!(obj["className"], "Person");
    }

    #[test]
    fn method_queries_filter_by_kind() {
        let schema = ModelSchema::builder()
            .methods(vec![
                method("full_name", MethodKind::Instance),
                method("search", MethodKind::Class),
                method("active", MethodKind::Scope),
            ])
            .build();
        assert_eq!(schema.instance_methods()[0].name, "full_name");
        assert_eq!(schema.class_methods()[0].name, "search");
        assert_eq!(schema.scope_methods()[0].name, "active");
        assert_eq!(
            schema.mockable_class_methods().keys().collect::<Vec<_>>(),
            vec!["search"]
        );
        assert_eq!(
            schema.mockable_instance_methods()["full_name"],
            Value::Null
        );
    }

    #[test]
    fn types_hash_literal() {
        let schema = ModelSchema::builder()
            .attributes(vec![AttributeSpec::builder()
                .name("id")
                .storage_type(StorageType::Integer)
                .build()])
            .build();
        assert_eq!(schema.types_hash(), "{ id: Integer }");

        let schema = ModelSchema::builder()
            .attributes(vec![
                AttributeSpec::builder()
                    .name("id")
                    .storage_type(StorageType::Integer)
                    .build(),
                AttributeSpec::builder()
                    .name("name")
                    .storage_type(StorageType::String)
                    .build(),
                AttributeSpec::builder()
                    .name("price")
                    .storage_type(StorageType::Decimal)
                    .build(),
            ])
            .build();
        assert_eq!(
            schema.types_hash(),
            "{ id: Integer, name: String, price: BigDecimal }"
        );
    }

    #[test]
    fn types_hash_collapses_repeated_names() {
        let attr = |name: &str, storage_type: StorageType| {
            AttributeSpec::builder()
                .name(name)
                .storage_type(storage_type)
                .build()
        };
        let schema = ModelSchema::builder()
            .attributes(vec![
                attr("status", StorageType::Integer),
                attr("id", StorageType::Integer),
                attr("status", StorageType::String),
            ])
            .build();
        assert_eq!(schema.types_hash(), "{ status: String, id: Integer }");
    }

    #[test]
    fn defaults_and_associations_keep_order() {
        let schema = ModelSchema::builder()
            .attributes(vec![
                AttributeSpec::builder()
                    .name("zeta")
                    .storage_type(StorageType::Integer)
                    .default_value("0")
                    .build(),
                AttributeSpec::builder()
                    .name("alpha")
                    .storage_type(StorageType::String)
                    .build(),
            ])
            .relationships(vec![rel("posts", RelationKind::HasMany)])
            .build();
        let defaults = schema.attributes_with_defaults();
        assert_eq!(defaults.keys().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
        assert_eq!(defaults["zeta"], Value::String("0".into()));
        assert_eq!(defaults["alpha"], Value::Null);
        assert_eq!(schema.associations()["posts"], Value::Null);
    }

    #[test]
    fn arguments_signature_and_passable() {
        let args = Arguments(vec![
            Parameter::new(ParameterKind::Req, "a"),
            Parameter::new(ParameterKind::Opt, "b"),
            Parameter::new(ParameterKind::Rest, "rest"),
            Parameter::new(ParameterKind::KeyReq, "key"),
            Parameter::new(ParameterKind::Key, "opt"),
            Parameter::new(ParameterKind::KeyRest, "opts"),
            Parameter::new(ParameterKind::Block, "block"),
        ]);
        assert_eq!(
            args.signature(),
            "a, b=nil, *rest, key:, opt: nil, **opts, &block"
        );
        assert_eq!(
            args.passable(),
            "a, b, *rest, key: key, opt: opt, **opts, &block"
        );
        assert_eq!(
            Arguments(vec![Parameter::new(ParameterKind::Rest, "*")]).signature(),
            "*"
        );
    }

    #[test]
    fn mock_name_uses_suffix() {
        let schema = ModelSchema::builder()
            .class_name("Person".to_string())
            .build();
        assert_eq!(schema.mock_name("Mock"), "PersonMock");
        assert_eq!(schema.mock_name("Double"), "PersonDouble");
        assert_eq!(schema.mock_name(""), "PersonMock");
    }

    #[test]
    fn field_lookup_names() {
        let schema = ModelSchema::builder()
            .class_name("Person".to_string())
            .is_join_table(false)
            .build();
        assert_eq!(schema.field("className").as_deref(), Some("Person"));
        assert_eq!(schema.field("class_name").as_deref(), Some("Person"));
        assert_eq!(schema.field("isJoinTable").as_deref(), Some("false"));
        assert_eq!(schema.field("tableName"), None);
        assert_eq!(schema.field("bogus"), None);
    }
}
