use std::collections::BTreeSet;

use crate::capability::{AttachMode, CapabilityDecl};
use crate::error::EvalError;
use crate::inflect;
use crate::lexer::lex;
use crate::schema::{AttributeSpec, ConstantSpec, RelationshipSpec};
use crate::types::*;

/// Every type declared by one source file, in declaration order.
///
/// A namespace is built fresh for each load and dropped afterwards; nothing
/// declared while parsing leaks into any shared scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Namespace {
    pub file: String,
    pub types: Vec<DeclaredType>,
}

impl Namespace {
    /// Names of modules declared in this namespace.
    pub fn local_modules(&self) -> BTreeSet<String> {
        self.types
            .iter()
            .filter(|t| matches!(t, DeclaredType::Module { .. }))
            .map(|t| t.name().to_string())
            .collect()
    }

    /// Consume the namespace, yielding the first declared class.
    pub fn into_first_class(self) -> Result<ModelDefinition, EvalError> {
        let file = self.file;
        self.types
            .into_iter()
            .find_map(|t| match t {
                DeclaredType::Class(def) => Some(*def),
                DeclaredType::Module { .. } => None,
            })
            .ok_or(EvalError::NoClassDefined { file })
    }
}

// --- Parser state ---

struct ClassFrame {
    def: ModelDefinition,
    visibility: Visibility,
}

enum FrameKind {
    Module(String),
    Class(Box<ClassFrame>),
    SingletonClass(Visibility),
    Method,
    Block,
}

struct Frame {
    kind: FrameKind,
    line: usize,
}

struct ParserState<'a> {
    file: String,
    known_constants: &'a [String],
    frames: Vec<Frame>,
    types: Vec<DeclaredType>,
    declared_names: BTreeSet<String>,
}

/// Parse model definition source into an isolated namespace.
pub fn parse_source(
    content: &str,
    file: &str,
    known_constants: &[String],
) -> Result<Namespace, EvalError> {
    let tokens = lex(content, file);
    parse_tokens(&tokens, file, known_constants)
}

/// Parse a token sequence into an isolated namespace.
pub fn parse_tokens(
    tokens: &[Token],
    file: &str,
    known_constants: &[String],
) -> Result<Namespace, EvalError> {
    let mut state = ParserState {
        file: file.to_string(),
        known_constants,
        frames: Vec::new(),
        types: Vec::new(),
        declared_names: BTreeSet::new(),
    };

    for token in tokens {
        process_token(token, &mut state)?;
    }

    if let Some(frame) = state.frames.last() {
        let what = match &frame.kind {
            FrameKind::Module(name) => format!("module {name}"),
            FrameKind::Class(c) => format!("class {}", c.def.name),
            FrameKind::SingletonClass(_) => "class << self".to_string(),
            FrameKind::Method => "def".to_string(),
            FrameKind::Block => "block".to_string(),
        };
        return Err(syntax(
            &state,
            frame.line,
            format!("`{what}` is never closed (missing `end`)"),
        ));
    }

    state.types.sort_by_key(DeclaredType::line);

    Ok(Namespace {
        file: state.file,
        types: state.types,
    })
}

fn process_token(token: &Token, state: &mut ParserState) -> Result<(), EvalError> {
    match token.token_type {
        TokenType::Blank | TokenType::Text => Ok(()),
        TokenType::Module => handle_module_start(token, state),
        TokenType::Class => handle_class_start(token, state),
        TokenType::SingletonClass => {
            if token.data.opens_block {
                let kind = if in_class_body(state) {
                    FrameKind::SingletonClass(Visibility::Public)
                } else {
                    FrameKind::Block
                };
                push(state, kind, token.line);
            }
            Ok(())
        }
        TokenType::Def => handle_def(token, state),
        TokenType::Macro => handle_macro(token, state),
        TokenType::Visibility => handle_visibility(token, state),
        TokenType::SelfAssign => handle_self_assign(token, state),
        TokenType::Constant => {
            if let Some(class) = class_body_mut(state) {
                if let Some(name) = &token.data.name {
                    class.def.constants.push(ConstantSpec {
                        name: name.clone(),
                        value: token.data.value.clone(),
                    });
                }
            }
            if token.data.opens_block {
                push(state, FrameKind::Block, token.line);
            }
            Ok(())
        }
        TokenType::BlockOpen => {
            push(state, FrameKind::Block, token.line);
            Ok(())
        }
        TokenType::End => handle_end(token, state),
    }
}

fn handle_module_start(token: &Token, state: &mut ParserState) -> Result<(), EvalError> {
    if in_code_body(state) {
        if token.data.opens_block {
            push(state, FrameKind::Block, token.line);
        }
        return Ok(());
    }

    let name = token.data.name.clone().unwrap_or_default();
    let qualified = qualify(state, &name);
    state.declared_names.insert(qualified.clone());
    state.types.push(DeclaredType::Module {
        name: qualified,
        line: token.line,
    });

    if token.data.opens_block {
        push(state, FrameKind::Module(name), token.line);
    }
    Ok(())
}

fn handle_class_start(token: &Token, state: &mut ParserState) -> Result<(), EvalError> {
    if in_code_body(state) {
        if token.data.opens_block {
            push(state, FrameKind::Block, token.line);
        }
        return Ok(());
    }

    let name = token.data.name.clone().unwrap_or_default();

    if let Some(ref superclass) = token.data.superclass {
        if !resolves(state, superclass) {
            return Err(EvalError::UnresolvedName {
                name: superclass.clone(),
                file: state.file.clone(),
                line: token.line,
            });
        }
    }

    let qualified = qualify(state, &name);
    state.declared_names.insert(qualified.clone());

    let mut def = ModelDefinition::new(
        qualified,
        SourceLocation {
            file: state.file.clone(),
            line: token.line,
        },
    );
    def.superclass = token.data.superclass.clone();

    let frame = ClassFrame {
        def,
        visibility: Visibility::Public,
    };

    if token.data.opens_block {
        push(state, FrameKind::Class(Box::new(frame)), token.line);
    } else {
        finalize_class(frame, state)?;
    }
    Ok(())
}

fn handle_def(token: &Token, state: &mut ParserState) -> Result<(), EvalError> {
    if let Some(ref msg) = token.data.malformed {
        return Err(syntax(state, token.line, msg.clone()));
    }

    let name = token.data.name.clone().unwrap_or_default();
    let in_singleton = in_singleton_body(state);

    let target = if in_singleton {
        let visibility = match state.frames.last() {
            Some(Frame {
                kind: FrameKind::SingletonClass(v),
                ..
            }) => *v,
            _ => Visibility::Public,
        };
        singleton_owner_mut(state).map(|class| (class, MethodKind::Class, visibility))
    } else {
        let singleton = token.data.singleton;
        class_body_mut(state).map(|class| {
            if singleton {
                (class, MethodKind::Class, Visibility::Public)
            } else {
                let visibility = class.visibility;
                (class, MethodKind::Instance, visibility)
            }
        })
    };

    if let Some((class, kind, default_visibility)) = target {
        let mut visibility = token.data.visibility.unwrap_or(default_visibility);
        if kind == MethodKind::Instance && name == "initialize" {
            visibility = Visibility::Private;
        }
        class.def.methods.push(MethodDefinition {
            name,
            kind,
            visibility,
            parameters: token.data.params.clone(),
            line: token.line,
        });
    }

    if token.data.opens_block {
        push(state, FrameKind::Method, token.line);
    }
    Ok(())
}

fn handle_macro(token: &Token, state: &mut ParserState) -> Result<(), EvalError> {
    if !in_class_body(state) {
        if token.data.opens_block {
            push(state, FrameKind::Block, token.line);
        }
        return Ok(());
    }

    if let Some(ref msg) = token.data.malformed {
        return Err(syntax(state, token.line, msg.clone()));
    }

    let macro_name = token.data.name.clone().unwrap_or_default();
    let line = token.line;

    if let Some(kind) = RelationKind::from_macro(&macro_name) {
        let spec = build_relationship(kind, &token.data)
            .map_err(|msg| syntax(state, line, msg))?;
        if let Some(class) = class_body_mut(state) {
            class.def.relationships.entry(kind).or_default().push(spec);
        }
    } else {
        match macro_name.as_str() {
            "attribute" => {
                let attr = build_attribute(&token.data).map_err(|msg| syntax(state, line, msg))?;
                let duplicate_pk = attr.is_primary_key
                    && class_body_mut(state)
                        .is_some_and(|c| c.def.attributes.iter().any(|a| a.is_primary_key));
                if duplicate_pk {
                    return Err(syntax(
                        state,
                        line,
                        format!("`{}` declared as a second primary key", attr.name),
                    ));
                }
                if let Some(class) = class_body_mut(state) {
                    class.def.attributes.push(attr);
                }
            }
            "scope" => {
                let method = build_scope(&token.data, line).map_err(|msg| syntax(state, line, msg))?;
                if let Some(class) = class_body_mut(state) {
                    class.def.methods.push(method);
                }
            }
            "include" | "extend" => {
                let mode = if macro_name == "include" {
                    AttachMode::Include
                } else {
                    AttachMode::Extend
                };
                if let Some(class) = class_body_mut(state) {
                    for arg in &token.data.args {
                        let name = arg.as_ident().map(str::to_string).unwrap_or_else(|| arg.to_literal());
                        class.def.capabilities.push(CapabilityDecl { name, mode, line });
                    }
                }
            }
            "private_class_method" | "public_class_method" => {
                let visibility = if macro_name == "private_class_method" {
                    Visibility::Private
                } else {
                    Visibility::Public
                };
                let names = symbol_args(&token.data.args);
                if let Some(class) = class_body_mut(state) {
                    set_visibility(&mut class.def, MethodKind::Class, &names, visibility);
                }
            }
            _ => {}
        }
    }

    if token.data.opens_block {
        push(state, FrameKind::Block, line);
    }
    Ok(())
}

fn handle_visibility(token: &Token, state: &mut ParserState) -> Result<(), EvalError> {
    let Some(visibility) = token.data.visibility else {
        return Ok(());
    };
    let names = symbol_args(&token.data.args);

    if in_singleton_body(state) {
        if names.is_empty() {
            if let Some(Frame {
                kind: FrameKind::SingletonClass(v),
                ..
            }) = state.frames.last_mut()
            {
                *v = visibility;
            }
        } else if let Some(class) = singleton_owner_mut(state) {
            set_visibility(&mut class.def, MethodKind::Class, &names, visibility);
        }
        return Ok(());
    }

    if let Some(class) = class_body_mut(state) {
        if names.is_empty() {
            class.visibility = visibility;
        } else {
            set_visibility(&mut class.def, MethodKind::Instance, &names, visibility);
        }
    }
    Ok(())
}

fn handle_self_assign(token: &Token, state: &mut ParserState) -> Result<(), EvalError> {
    let key = token.data.name.clone().unwrap_or_default();
    let value = token
        .data
        .args
        .first()
        .and_then(|a| a.as_ident())
        .map(str::to_string);

    if let Some(class) = class_body_mut(state) {
        match (key.as_str(), value) {
            ("table_name", Some(v)) => class.def.table_name = v,
            ("primary_key", Some(v)) => class.def.primary_key = Some(v),
            _ => {}
        }
    }

    if token.data.opens_block {
        push(state, FrameKind::Block, token.line);
    }
    Ok(())
}

fn handle_end(token: &Token, state: &mut ParserState) -> Result<(), EvalError> {
    let Some(frame) = state.frames.pop() else {
        return Err(syntax(state, token.line, "unexpected `end`".into()));
    };
    if let FrameKind::Class(class) = frame.kind {
        finalize_class(*class, state)?;
    }
    Ok(())
}

fn finalize_class(frame: ClassFrame, state: &mut ParserState) -> Result<(), EvalError> {
    let mut def = frame.def;

    if def.table_name.is_empty() {
        def.table_name = inflect::table_name_for(&def.name);
    }

    if let Some(ref pk) = def.primary_key {
        if def.attributes.iter().any(|a| &a.name == pk) {
            for attr in def.attributes.iter_mut() {
                attr.is_primary_key = &attr.name == pk;
            }
        } else {
            for attr in def.attributes.iter_mut() {
                attr.is_primary_key = false;
            }
            def.attributes.insert(
                0,
                AttributeSpec::builder()
                    .name(pk.clone())
                    .storage_type(StorageType::Integer)
                    .is_primary_key(true)
                    .build(),
            );
        }
    }

    let own_table = def.table_name.clone();
    if let Some(habtm) = def
        .relationships
        .get_mut(&RelationKind::HasAndBelongsToMany)
    {
        for rel in habtm.iter_mut().filter(|r| r.join_table.is_none()) {
            let target_table = inflect::table_name_for(&rel.class_name);
            rel.join_table = Some(inflect::join_table_for(&own_table, &target_table));
        }
    }

    tracing::debug!(
        class = %def.name,
        table = %def.table_name,
        file = %state.file,
        "parsed model definition"
    );

    state.types.push(DeclaredType::Class(Box::new(def)));
    Ok(())
}

// --- Builders for macro facts ---

fn build_relationship(kind: RelationKind, data: &TokenData) -> Result<RelationshipSpec, String> {
    let name = data
        .args
        .first()
        .and_then(ArgValue::as_ident)
        .ok_or_else(|| format!("{} requires a relation name", kind.as_str()))?
        .to_string();

    let option = |key: &str| -> Option<String> {
        data.options
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_ident())
            .map(|s| s.trim_start_matches("::").to_string())
    };

    let class_name = option("class_name")
        .unwrap_or_else(|| inflect::class_name_for(&name, kind.is_collection()));
    let foreign_key = option("foreign_key").or_else(|| {
        (kind == RelationKind::BelongsTo).then(|| inflect::foreign_key_for(&name))
    });

    Ok(RelationshipSpec {
        name,
        class_name,
        kind,
        through: option("through"),
        foreign_key,
        join_table: option("join_table"),
    })
}

fn build_attribute(data: &TokenData) -> Result<AttributeSpec, String> {
    let name = data
        .args
        .first()
        .and_then(ArgValue::as_ident)
        .ok_or_else(|| "attribute requires a name".to_string())?
        .to_string();

    let storage_type = data
        .args
        .get(1)
        .and_then(ArgValue::as_ident)
        .map(StorageType::parse)
        .unwrap_or(StorageType::Unknown);

    let mut attr = AttributeSpec::builder()
        .name(name)
        .storage_type(storage_type)
        .build();

    for (key, value) in &data.options {
        match key.as_str() {
            "default" => attr.default_value = Some(value.to_literal()),
            "precision" => attr.precision = numeric_option(key, value)?,
            "scale" => attr.scale = numeric_option(key, value)?,
            "primary_key" => attr.is_primary_key = *value == ArgValue::Bool(true),
            _ => {}
        }
    }

    Ok(attr)
}

fn numeric_option(key: &str, value: &ArgValue) -> Result<Option<u32>, String> {
    match value {
        ArgValue::Number(n) => n
            .replace('_', "")
            .parse::<u32>()
            .map(Some)
            .map_err(|_| format!("`{key}` must be a non-negative integer, got {n}")),
        ArgValue::Nil => Ok(None),
        other => Err(format!(
            "`{key}` must be a non-negative integer, got {}",
            other.to_literal()
        )),
    }
}

fn build_scope(data: &TokenData, line: usize) -> Result<MethodDefinition, String> {
    let name = data
        .args
        .first()
        .and_then(ArgValue::as_ident)
        .ok_or_else(|| "scope requires a name".to_string())?
        .to_string();

    let parameters = match data.args.get(1) {
        Some(ArgValue::Lambda(params)) => params.clone(),
        Some(_) => Vec::new(),
        None if data.opens_block => Vec::new(),
        None => return Err(format!("scope :{name} requires a body")),
    };

    Ok(MethodDefinition {
        name,
        kind: MethodKind::Scope,
        visibility: Visibility::Public,
        parameters,
        line,
    })
}

fn symbol_args(args: &[ArgValue]) -> Vec<String> {
    args.iter()
        .filter_map(ArgValue::as_ident)
        .map(str::to_string)
        .collect()
}

fn set_visibility(def: &mut ModelDefinition, kind: MethodKind, names: &[String], visibility: Visibility) {
    for method in def
        .methods
        .iter_mut()
        .filter(|m| m.kind == kind && names.contains(&m.name))
    {
        method.visibility = visibility;
    }
}

// --- Scope helpers ---

fn push(state: &mut ParserState, kind: FrameKind, line: usize) {
    state.frames.push(Frame { kind, line });
}

fn in_class_body(state: &ParserState) -> bool {
    matches!(
        state.frames.last(),
        Some(Frame {
            kind: FrameKind::Class(_),
            ..
        })
    )
}

fn in_singleton_body(state: &ParserState) -> bool {
    matches!(
        state.frames.last(),
        Some(Frame {
            kind: FrameKind::SingletonClass(_),
            ..
        })
    )
}

/// Inside a method body or block, where declarations are not class structure.
fn in_code_body(state: &ParserState) -> bool {
    matches!(
        state.frames.last(),
        Some(Frame {
            kind: FrameKind::Method | FrameKind::Block,
            ..
        })
    )
}

fn class_body_mut<'s>(state: &'s mut ParserState) -> Option<&'s mut ClassFrame> {
    match state.frames.last_mut() {
        Some(Frame {
            kind: FrameKind::Class(class),
            ..
        }) => Some(class.as_mut()),
        _ => None,
    }
}

/// The class whose `class << self` body is currently open.
fn singleton_owner_mut<'s>(state: &'s mut ParserState) -> Option<&'s mut ClassFrame> {
    let idx = state.frames.len().checked_sub(2)?;
    match state.frames.get_mut(idx) {
        Some(Frame {
            kind: FrameKind::Class(class),
            ..
        }) => Some(class.as_mut()),
        _ => None,
    }
}

/// Name qualified by every enclosing module and class.
fn qualify(state: &ParserState, name: &str) -> String {
    let mut parts: Vec<&str> = state
        .frames
        .iter()
        .filter_map(|f| match &f.kind {
            FrameKind::Module(m) => Some(m.as_str()),
            FrameKind::Class(c) => Some(c.def.short_name()),
            _ => None,
        })
        .collect();
    parts.push(name);
    parts.join("::")
}

fn resolves(state: &ParserState, name: &str) -> bool {
    if state.known_constants.iter().any(|k| k == name) || state.declared_names.contains(name) {
        return true;
    }
    // Relative lookup through enclosing scopes
    let mut prefix: Vec<&str> = state
        .frames
        .iter()
        .filter_map(|f| match &f.kind {
            FrameKind::Module(m) => Some(m.as_str()),
            FrameKind::Class(c) => Some(c.def.short_name()),
            _ => None,
        })
        .collect();
    while !prefix.is_empty() {
        let candidate = format!("{}::{}", prefix.join("::"), name);
        if state.declared_names.contains(&candidate) {
            return true;
        }
        prefix.pop();
    }
    false
}

fn syntax(state: &ParserState, line: usize, message: String) -> EvalError {
    EvalError::Syntax {
        file: state.file.clone(),
        line,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known() -> Vec<String> {
        vec!["ActiveRecord::Base".into(), "ApplicationRecord".into()]
    }

    fn parse(src: &str) -> Result<Namespace, EvalError> {
        parse_source(src, "person.rb", &known())
    }

    #[test]
    fn parse_empty_has_no_class() {
        let ns = parse("").unwrap();
        assert!(ns.types.is_empty());
        assert_eq!(
            ns.into_first_class(),
            Err(EvalError::NoClassDefined {
                file: "person.rb".into()
            })
        );
    }

    #[test]
    fn parse_simple_model() {
        let src = "class Person < ActiveRecord::Base\n  has_many :posts\n  belongs_to :account\nend";
        let def = parse(src).unwrap().into_first_class().unwrap();
        assert_eq!(def.name, "Person");
        assert_eq!(def.table_name, "people");
        assert_eq!(def.superclass.as_deref(), Some("ActiveRecord::Base"));
        let has_many = &def.relationships[&RelationKind::HasMany];
        assert_eq!(has_many[0].class_name, "Post");
        assert_eq!(has_many[0].foreign_key, None);
        let belongs_to = &def.relationships[&RelationKind::BelongsTo];
        assert_eq!(belongs_to[0].foreign_key.as_deref(), Some("account_id"));
    }

    #[test]
    fn parse_unresolved_superclass() {
        let err = parse("class Person < Missing::Base\nend").unwrap_err();
        assert_eq!(
            err,
            EvalError::UnresolvedName {
                name: "Missing::Base".into(),
                file: "person.rb".into(),
                line: 1,
            }
        );
    }

    #[test]
    fn parse_superclass_declared_in_file() {
        let src = "class Base < ActiveRecord::Base\nend\nclass Person < Base\nend";
        let ns = parse(src).unwrap();
        assert_eq!(ns.types.len(), 2);
        assert_eq!(ns.into_first_class().unwrap().name, "Base");
    }

    #[test]
    fn parse_module_qualifies_class() {
        let src = "module Admin\n  class User < ApplicationRecord\n  end\nend";
        let ns = parse(src).unwrap();
        assert_eq!(ns.local_modules().into_iter().collect::<Vec<_>>(), vec!["Admin"]);
        let def = ns.into_first_class().unwrap();
        assert_eq!(def.name, "Admin::User");
        assert_eq!(def.short_name(), "User");
        assert_eq!(def.table_name, "users");
    }

    #[test]
    fn parse_methods_and_visibility() {
        let src = r##"class Person < ApplicationRecord
  def self.search(query, page: 1)
    where(name: query).page(page)
  end

  class << self
    def bulk(*ids)
      ids.each do |id|
        find(id)
      end
    end

    private

    def helper; end
  end

  def initialize(attrs = {})
    super
  end

  def full_name
    if first_name
      "#{first_name} #{last_name}"
    end
  end

  private

  def secret; end

  public def shown = true
end"##;
        let def = parse(src).unwrap().into_first_class().unwrap();
        let names: Vec<(&str, MethodKind, Visibility)> = def
            .methods
            .iter()
            .map(|m| (m.name.as_str(), m.kind, m.visibility))
            .collect();
        assert_eq!(
            names,
            vec![
                ("search", MethodKind::Class, Visibility::Public),
                ("bulk", MethodKind::Class, Visibility::Public),
                ("helper", MethodKind::Class, Visibility::Private),
                ("initialize", MethodKind::Instance, Visibility::Private),
                ("full_name", MethodKind::Instance, Visibility::Public),
                ("secret", MethodKind::Instance, Visibility::Private),
                ("shown", MethodKind::Instance, Visibility::Public),
            ]
        );
        assert_eq!(def.initializer().unwrap().parameters.len(), 1);
    }

    #[test]
    fn parse_retroactive_visibility() {
        let src = "class Person < ApplicationRecord\n  def self.a; end\n  def b; end\n  private :b\n  private_class_method :a\nend";
        let def = parse(src).unwrap().into_first_class().unwrap();
        assert!(def.methods.iter().all(|m| m.visibility == Visibility::Private));
    }

    #[test]
    fn parse_attributes_and_primary_key_override() {
        let src = r#"class Person < ApplicationRecord
  self.table_name = "folks"
  self.primary_key = :uuid
  attribute :uuid, :string
  attribute :age, :integer, default: 0
  attribute :balance, :decimal, precision: 10, scale: 2
end"#;
        let def = parse(src).unwrap().into_first_class().unwrap();
        assert_eq!(def.table_name, "folks");
        assert_eq!(def.attributes.len(), 3);
        assert!(def.attributes[0].is_primary_key);
        assert_eq!(def.attributes[1].default_value.as_deref(), Some("0"));
        assert_eq!(def.attributes[2].precision, Some(10));
        assert_eq!(def.attributes[2].scale, Some(2));
    }

    #[test]
    fn parse_primary_key_override_without_attribute() {
        let src = "class Person < ApplicationRecord\n  self.primary_key = 'person_id'\nend";
        let def = parse(src).unwrap().into_first_class().unwrap();
        assert_eq!(def.attributes.len(), 1);
        assert_eq!(def.attributes[0].name, "person_id");
        assert!(def.attributes[0].is_primary_key);
    }

    #[test]
    fn parse_second_primary_key_rejected() {
        let src = "class Person < ApplicationRecord\n  attribute :a, :integer, primary_key: true\n  attribute :b, :integer, primary_key: true\nend";
        assert!(matches!(
            parse(src),
            Err(EvalError::Syntax { line: 3, .. })
        ));
    }

    #[test]
    fn parse_habtm_default_join_table() {
        let src = "class Person < ApplicationRecord\n  has_and_belongs_to_many :tags\n  has_and_belongs_to_many :groups, join_table: 'memberships'\nend";
        let def = parse(src).unwrap().into_first_class().unwrap();
        let habtm = &def.relationships[&RelationKind::HasAndBelongsToMany];
        assert_eq!(habtm[0].join_table.as_deref(), Some("people_tags"));
        assert_eq!(habtm[1].join_table.as_deref(), Some("memberships"));
    }

    #[test]
    fn parse_scopes_constants_and_capabilities() {
        let src = r#"class Person < ApplicationRecord
  include Searchable, Comparable
  extend Reportable
  MAX_POSTS = 10
  STATES = %w[active inactive]
  scope :active, -> { where(active: true) }
  scope :named, ->(name, limit = 10) { where(name: name).limit(limit) }
end"#;
        let def = parse(src).unwrap().into_first_class().unwrap();
        let names: Vec<&str> = def.constants.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["MAX_POSTS", "STATES"]);
        assert_eq!(def.constants[0].value.as_deref(), Some("10"));
        assert_eq!(def.capabilities.len(), 3);
        assert_eq!(def.capabilities[2].mode, AttachMode::Extend);
        let scopes: Vec<&MethodDefinition> = def
            .methods
            .iter()
            .filter(|m| m.kind == MethodKind::Scope)
            .collect();
        assert_eq!(scopes.len(), 2);
        assert!(scopes[0].parameters.is_empty());
        assert_eq!(scopes[1].parameters.len(), 2);
    }

    #[test]
    fn parse_scope_without_body_rejected() {
        let src = "class Person < ApplicationRecord\n  scope :broken\nend";
        assert!(matches!(parse(src), Err(EvalError::Syntax { line: 2, .. })));
    }

    #[test]
    fn parse_unexpected_end() {
        let err = parse("class Person < ApplicationRecord\nend\nend").unwrap_err();
        assert!(matches!(err, EvalError::Syntax { line: 3, .. }));
    }

    #[test]
    fn parse_unclosed_class() {
        let err = parse("class Person < ApplicationRecord\n  def a\n  end").unwrap_err();
        match err {
            EvalError::Syntax { line, message, .. } => {
                assert_eq!(line, 1);
                assert!(message.contains("class Person"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parse_macros_in_method_body_ignored() {
        let src = "class Person < ApplicationRecord\n  def setup\n    extend Tracking\n  end\nend";
        let def = parse(src).unwrap().into_first_class().unwrap();
        assert!(def.capabilities.is_empty());
    }
}
