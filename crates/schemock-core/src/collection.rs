use serde::{Deserialize, Serialize};
use std::ops::Index;

use crate::schema::{ModelSchema, RelationshipSpec};

/// Ordered set of schemas with equality lookups across models.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelSchemaCollection {
    schemas: Vec<ModelSchema>,
}

impl ModelSchemaCollection {
    pub fn new(schemas: Vec<ModelSchema>) -> Self {
        Self { schemas }
    }

    pub fn push(&mut self, schema: ModelSchema) {
        self.schemas.push(schema);
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ModelSchema> {
        self.schemas.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ModelSchema> {
        self.schemas.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ModelSchema> {
        self.schemas.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, ModelSchema> {
        self.schemas.iter_mut()
    }

    /// First schema whose `field` equals `value`.
    pub fn find_by(&self, field: &str, value: &str) -> Option<&ModelSchema> {
        self.schemas
            .iter()
            .find(|s| s.field(field).is_some_and(|v| v == value))
    }

    /// Relationships of every schema whose `field` equals `value`, in model order.
    pub fn find_by_in_relationships(&self, field: &str, value: &str) -> Vec<&RelationshipSpec> {
        self.schemas
            .iter()
            .flat_map(|s| s.relationships())
            .filter(|r| r.field(field).is_some_and(|v| v == value))
            .collect()
    }

    pub fn into_inner(self) -> Vec<ModelSchema> {
        self.schemas
    }
}

impl Index<usize> for ModelSchemaCollection {
    type Output = ModelSchema;

    fn index(&self, index: usize) -> &ModelSchema {
        &self.schemas[index]
    }
}

impl<'a> IntoIterator for &'a ModelSchemaCollection {
    type Item = &'a ModelSchema;
    type IntoIter = std::slice::Iter<'a, ModelSchema>;

    fn into_iter(self) -> Self::IntoIter {
        self.schemas.iter()
    }
}

impl IntoIterator for ModelSchemaCollection {
    type Item = ModelSchema;
    type IntoIter = std::vec::IntoIter<ModelSchema>;

    fn into_iter(self) -> Self::IntoIter {
        self.schemas.into_iter()
    }
}

impl FromIterator<ModelSchema> for ModelSchemaCollection {
    fn from_iter<I: IntoIterator<Item = ModelSchema>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
