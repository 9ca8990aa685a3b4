use std::collections::HashMap;
use std::sync::LazyLock;

use crate::types::StorageType;

/// Storage column type → target type name used in generated mocks.
/// Storage types not in this table map to [`FALLBACK_TARGET_TYPE`].
pub static TYPE_MAP: LazyLock<HashMap<StorageType, &'static str>> = LazyLock::new(|| {
    let mut m = HashMap::new();
    // Numeric
    m.insert(StorageType::Integer, "Integer");
    m.insert(StorageType::BigInt, "Integer");
    m.insert(StorageType::Float, "Float");
    m.insert(StorageType::Decimal, "BigDecimal");
    // Temporal
    m.insert(StorageType::DateTime, "DateTime");
    m.insert(StorageType::Timestamp, "DateTime");
    m.insert(StorageType::Time, "Time");
    m.insert(StorageType::Date, "Date");
    // Textual
    m.insert(StorageType::String, "String");
    m.insert(StorageType::Text, "String");
    m.insert(StorageType::Binary, "String");
    m.insert(StorageType::Uuid, "String");
    // Structural
    m.insert(StorageType::Boolean, "Boolean");
    m.insert(StorageType::Json, "Hash");
    m.insert(StorageType::Jsonb, "Hash");
    m
});

pub const FALLBACK_TARGET_TYPE: &str = "Object";

/// Look up the target type name for a storage type.
pub fn target_type_name(storage_type: StorageType) -> &'static str {
    TYPE_MAP
        .get(&storage_type)
        .copied()
        .unwrap_or(FALLBACK_TARGET_TYPE)
}

/// Superclasses every loader resolves without a declaration in the source file.
pub static DEFAULT_KNOWN_CONSTANTS: &[&str] = &[
    "ActiveRecord::Base",
    "ApplicationRecord",
    "Object",
    "Struct",
    "StandardError",
];

/// Suffix appended to generated mock type names when none is supplied.
pub const DEFAULT_MOCK_SUFFIX: &str = "Mock";

/// Extension of model definition source files.
pub const SOURCE_EXTENSION: &str = "rb";

pub const SCHEMA_VERSION: &str = "1.0";

pub const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");
