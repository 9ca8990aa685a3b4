//! Definition loader: model name → source text → isolated namespace → the
//! single defined class, memoized for the lifetime of the loader.

use std::cell::OnceCell;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use typed_builder::TypedBuilder;

use crate::capability::CapabilityRegistry;
use crate::catalogs::{DEFAULT_KNOWN_CONSTANTS, SOURCE_EXTENSION};
use crate::error::LoadError;
use crate::introspect::{Introspector, MethodSignature};
use crate::parser::parse_source;
use crate::schema::RelationshipSpec;
use crate::types::{ModelDefinition, RelationKind};

/// Reads model source text.
pub trait FileReader {
    fn read(&self, path: &Path) -> Result<String, LoadError>;
}

/// Reads from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

impl FileReader for FsReader {
    fn read(&self, path: &Path) -> Result<String, LoadError> {
        std::fs::read_to_string(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => LoadError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => LoadError::Io {
                path: path.to_path_buf(),
                source,
            },
        })
    }
}

/// In-memory sources keyed by path, for callers that already hold the text.
#[derive(Debug, Clone, Default)]
pub struct MemoryReader {
    files: HashMap<PathBuf, String>,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }
}

impl FileReader for MemoryReader {
    fn read(&self, path: &Path) -> Result<String, LoadError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| LoadError::FileNotFound {
                path: path.to_path_buf(),
            })
    }
}

pub fn default_known_constants() -> Vec<String> {
    DEFAULT_KNOWN_CONSTANTS.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct LoaderOptions {
    /// Names a superclass may resolve to without being declared in the file.
    #[builder(default = default_known_constants())]
    pub known_constants: Vec<String>,
    /// Capability modules available to `include`/`extend`.
    #[builder(default)]
    pub capabilities: CapabilityRegistry,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Loads one model definition from `<model_dir>/<model_name>.rb`.
///
/// The first successful load is cached; every later query on the same
/// loader sees that same definition. Build a new loader to force a reload.
pub struct DefinitionLoader<R: FileReader = FsReader> {
    model_dir: PathBuf,
    reader: R,
    options: LoaderOptions,
    model_name: Option<String>,
    klass: OnceCell<Rc<ModelDefinition>>,
}

impl DefinitionLoader<FsReader> {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self::with_reader(model_dir, FsReader, LoaderOptions::default())
    }
}

impl<R: FileReader> DefinitionLoader<R> {
    pub fn with_reader(model_dir: impl Into<PathBuf>, reader: R, options: LoaderOptions) -> Self {
        Self {
            model_dir: model_dir.into(),
            reader,
            options,
            model_name: None,
            klass: OnceCell::new(),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model_name.as_deref()
    }

    /// Load `model_name` and return the loader for chained queries.
    ///
    /// Once a definition is cached, later names are ignored. A failed load caches nothing, so the
    /// next call loads the name it is given.
    pub fn parse(&mut self, model_name: &str) -> Result<&mut Self, LoadError> {
        match (&self.model_name, self.klass.get()) {
            (Some(current), Some(_)) if current != model_name => {
                tracing::debug!(
                    loaded = %current,
                    requested = model_name,
                    "loader already holds a model; keeping the cached definition"
                );
            }
            (_, Some(_)) => {}
            (_, None) => self.model_name = Some(model_name.to_string()),
        }
        self.klass()?;
        Ok(self)
    }

    /// The loaded definition, loading it on first call.
    pub fn klass(&self) -> Result<Rc<ModelDefinition>, LoadError> {
        if let Some(klass) = self.klass.get() {
            return Ok(Rc::clone(klass));
        }
        let klass = Rc::new(self.load()?);
        Ok(Rc::clone(self.klass.get_or_init(|| klass)))
    }

    pub fn source_path(&self, model_name: &str) -> PathBuf {
        let suffix = format!(".{SOURCE_EXTENSION}");
        if model_name.ends_with(&suffix) {
            self.model_dir.join(model_name)
        } else {
            self.model_dir.join(format!("{model_name}{suffix}"))
        }
    }

    fn load(&self) -> Result<ModelDefinition, LoadError> {
        let model_name = self.model_name.as_deref().ok_or(LoadError::MissingModelName)?;
        let path = self.source_path(model_name);
        tracing::debug!(path = %path.display(), "loading model definition");

        let content = self.reader.read(&path)?;
        let file = path.display().to_string();
        let namespace = parse_source(&content, &file, &self.options.known_constants)?;
        let local_modules = namespace.local_modules();
        let mut def = namespace.into_first_class()?;

        let (attached, outcomes) =
            self.options
                .capabilities
                .attach_all(&def.capabilities, &def.name, &local_modules);
        def.attached = attached;
        def.attach_outcomes = outcomes;

        tracing::debug!(
            class = %def.name,
            attributes = def.attributes.len(),
            methods = def.methods.len(),
            "model definition loaded"
        );
        Ok(def)
    }

    // --- Introspection over the loaded definition ---

    pub fn class_methods(&self) -> Result<Vec<String>, LoadError> {
        let klass = self.klass()?;
        Ok(to_owned(Introspector::new(&klass).class_methods()))
    }

    pub fn instance_methods(&self) -> Result<Vec<String>, LoadError> {
        let klass = self.klass()?;
        Ok(to_owned(Introspector::new(&klass).instance_methods()))
    }

    pub fn class_methods_with_arguments(&self) -> Result<Vec<MethodSignature>, LoadError> {
        let klass = self.klass()?;
        Ok(Introspector::new(&klass).class_methods_with_arguments())
    }

    /// Fails with [`LoadError::Introspection`] when the class cannot be
    /// instantiated without arguments; the loaded definition stays usable.
    pub fn instance_methods_with_arguments(&self) -> Result<Vec<MethodSignature>, LoadError> {
        let klass = self.klass()?;
        Ok(Introspector::new(&klass).instance_methods_with_arguments()?)
    }

    pub fn relationships_types(
        &self,
    ) -> Result<std::collections::BTreeMap<RelationKind, Vec<RelationshipSpec>>, LoadError> {
        Ok(self.klass()?.relationships.clone())
    }

    pub fn relationships(&self) -> Result<Vec<RelationshipSpec>, LoadError> {
        let klass = self.klass()?;
        Ok(Introspector::new(&klass)
            .relationships()
            .into_iter()
            .cloned()
            .collect())
    }
}

fn to_owned(names: Vec<&str>) -> Vec<String> {
    names.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;

    const PERSON: &str = "class Person < ActiveRecord::Base\n  has_many :posts\n  def full_name\n  end\nend\n";

    fn loader(reader: MemoryReader) -> DefinitionLoader<MemoryReader> {
        DefinitionLoader::with_reader("models", reader, LoaderOptions::default())
    }

    #[test]
    fn source_path_appends_extension_once() {
        let l = loader(MemoryReader::new());
        assert_eq!(l.source_path("person"), Path::new("models/person.rb"));
        assert_eq!(l.source_path("person.rb"), Path::new("models/person.rb"));
    }

    #[test]
    fn parse_is_memoized() {
        let mut l = loader(MemoryReader::new().with_file("models/person.rb", PERSON));
        let first = l.parse("person").unwrap().klass().unwrap();
        let second = l.parse("person").unwrap().klass().unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(first.name, "Person");
    }

    #[test]
    fn second_name_keeps_cached_definition() {
        let reader = MemoryReader::new()
            .with_file("models/person.rb", PERSON)
            .with_file("models/post.rb", "class Post < ApplicationRecord\nend\n");
        let mut l = loader(reader);
        let first = l.parse("person").unwrap().klass().unwrap();
        let second = l.parse("post").unwrap().klass().unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(l.model_name(), Some("person"));
    }

    #[test]
    fn klass_before_parse_is_an_error() {
        let l = loader(MemoryReader::new());
        assert!(matches!(l.klass(), Err(LoadError::MissingModelName)));
    }

    #[test]
    fn missing_file_reported() {
        let mut l = loader(MemoryReader::new());
        let err = l.parse("ghost").err().unwrap();
        assert!(matches!(err, LoadError::FileNotFound { ref path } if path == Path::new("models/ghost.rb")));
    }

    #[test]
    fn unresolved_superclass_fails_immediately() {
        let mut l = loader(
            MemoryReader::new().with_file("models/person.rb", "class Person < Unknown::Base\nend\n"),
        );
        let err = l.parse("person").err().unwrap();
        assert!(matches!(
            err,
            LoadError::Eval(EvalError::UnresolvedName { ref name, .. }) if name == "Unknown::Base"
        ));
    }

    #[test]
    fn failed_load_is_not_cached() {
        let mut l = loader(MemoryReader::new());
        assert!(l.parse("person").is_err());
        assert!(l.klass().is_err());
    }

    #[test]
    fn failed_parse_then_other_name_loads_it() {
        let mut l = loader(MemoryReader::new().with_file("models/person.rb", PERSON));
        assert!(l.parse("ghost").is_err());
        let klass = l.parse("person").unwrap().klass().unwrap();
        assert_eq!(klass.name, "Person");
        assert_eq!(l.model_name(), Some("person"));
    }

    #[test]
    fn introspection_delegates() {
        let mut l = loader(MemoryReader::new().with_file("models/person.rb", PERSON));
        l.parse("person").unwrap();
        assert_eq!(l.instance_methods().unwrap(), vec!["full_name"]);
        assert!(l.class_methods().unwrap().is_empty());
        assert_eq!(l.relationships().unwrap()[0].name, "posts");
        assert_eq!(l.relationships_types().unwrap().len(), 1);
    }
}
