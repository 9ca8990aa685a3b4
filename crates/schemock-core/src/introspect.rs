//! Read operations over a loaded [`ModelDefinition`].

use serde::Serialize;

use crate::error::IntrospectionError;
use crate::schema::{Arguments, RelationshipSpec};
use crate::types::{MethodDefinition, MethodKind, ModelDefinition, Parameter, Visibility};

/// A method name paired with its ordered parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodSignature {
    pub name: String,
    pub arguments: Arguments,
}

pub struct Introspector<'a> {
    def: &'a ModelDefinition,
}

impl<'a> Introspector<'a> {
    pub fn new(def: &'a ModelDefinition) -> Self {
        Self { def }
    }

    /// Public class methods declared directly on the class.
    pub fn class_methods(&self) -> Vec<&'a str> {
        self.own_methods(MethodKind::Class)
            .map(|m| m.name.as_str())
            .collect()
    }

    /// Public instance methods declared directly on the class.
    pub fn instance_methods(&self) -> Vec<&'a str> {
        self.own_methods(MethodKind::Instance)
            .map(|m| m.name.as_str())
            .collect()
    }

    pub fn scope_methods(&self) -> Vec<&'a str> {
        self.own_methods(MethodKind::Scope)
            .map(|m| m.name.as_str())
            .collect()
    }

    pub fn class_methods_with_arguments(&self) -> Vec<MethodSignature> {
        self.signatures(MethodKind::Class)
    }

    pub fn scope_methods_with_arguments(&self) -> Vec<MethodSignature> {
        self.signatures(MethodKind::Scope)
    }

    /// Instance method signatures are read off a throwaway instance, so the
    /// class must be constructible without arguments.
    pub fn instance_methods_with_arguments(
        &self,
    ) -> Result<Vec<MethodSignature>, IntrospectionError> {
        self.check_instantiable()?;
        Ok(self.signatures(MethodKind::Instance))
    }

    /// Declared relationship registry, keyed by kind.
    pub fn relationships_types(
        &self,
    ) -> &'a std::collections::BTreeMap<crate::types::RelationKind, Vec<RelationshipSpec>> {
        &self.def.relationships
    }

    /// Every declared relationship, flattened.
    pub fn relationships(&self) -> Vec<&'a RelationshipSpec> {
        self.def.relationships.values().flatten().collect()
    }

    fn check_instantiable(&self) -> Result<(), IntrospectionError> {
        let Some(init) = self.def.initializer() else {
            return Ok(());
        };
        let required: Vec<Parameter> = init
            .parameters
            .iter()
            .filter(|p| p.is_required())
            .cloned()
            .collect();
        if required.is_empty() {
            Ok(())
        } else {
            Err(IntrospectionError::NotInstantiable {
                class_name: self.def.name.clone(),
                parameters: required,
            })
        }
    }

    fn own_methods(&self, kind: MethodKind) -> impl Iterator<Item = &'a MethodDefinition> {
        self.def
            .methods
            .iter()
            .filter(move |m| m.kind == kind && m.visibility == Visibility::Public)
    }

    fn signatures(&self, kind: MethodKind) -> Vec<MethodSignature> {
        self.own_methods(kind)
            .map(|m| MethodSignature {
                name: m.name.clone(),
                arguments: Arguments::from(m.parameters.clone()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use crate::types::{ParameterKind, RelationKind};
    use pretty_assertions::assert_eq;

    fn load(src: &str) -> ModelDefinition {
        let known = vec!["ActiveRecord::Base".to_string()];
        parse_source(src, "person.rb", &known)
            .unwrap()
            .into_first_class()
            .unwrap()
    }

    const SRC: &str = r#"class Person < ActiveRecord::Base
  has_many :posts
  belongs_to :account
  scope :named, ->(name) { where(name: name) }

  def self.search(query, page: 1)
  end

  def full_name
  end

  def greet(other, *rest, &block)
  end

  private

  def secret
  end
end
"#;

    #[test]
    fn own_public_methods() {
        let def = load(SRC);
        let i = Introspector::new(&def);
        assert_eq!(i.class_methods(), vec!["search"]);
        assert_eq!(i.instance_methods(), vec!["full_name", "greet"]);
        assert_eq!(i.scope_methods(), vec!["named"]);
    }

    #[test]
    fn signatures_carry_parameters() {
        let def = load(SRC);
        let i = Introspector::new(&def);
        let class = i.class_methods_with_arguments();
        assert_eq!(class[0].arguments.signature(), "query, page: nil");

        let instance = i.instance_methods_with_arguments().unwrap();
        assert!(instance[0].arguments.is_empty());
        let kinds: Vec<ParameterKind> = instance[1].arguments.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![ParameterKind::Req, ParameterKind::Rest, ParameterKind::Block]
        );
    }

    #[test]
    fn required_initializer_blocks_instance_signatures() {
        let def = load("class Person < ActiveRecord::Base\n  def initialize(name, age = 0)\n  end\n  def hello\n  end\nend\n");
        let i = Introspector::new(&def);
        assert_eq!(
            i.instance_methods_with_arguments(),
            Err(IntrospectionError::NotInstantiable {
                class_name: "Person".into(),
                parameters: vec![Parameter::new(ParameterKind::Req, "name")],
            })
        );
        // Names remain available.
        assert_eq!(i.instance_methods(), vec!["hello"]);
    }

    #[test]
    fn optional_initializer_is_fine() {
        let def = load("class Person < ActiveRecord::Base\n  def initialize(attrs = {})\n  end\nend\n");
        assert!(Introspector::new(&def)
            .instance_methods_with_arguments()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn relationships_flattened() {
        let def = load(SRC);
        let i = Introspector::new(&def);
        assert_eq!(i.relationships_types().len(), 2);
        let mut names: Vec<&str> = i.relationships().iter().map(|r| r.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["account", "posts"]);
        assert_eq!(
            i.relationships_types()[&RelationKind::BelongsTo][0].foreign_key.as_deref(),
            Some("account_id")
        );
    }
}
