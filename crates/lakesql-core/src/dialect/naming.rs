//! Schema-based object name prefixing.

use std::collections::{BTreeMap, BTreeSet};

/// Per-schema prefixes applied to object names.
///
/// Schema matching is case-insensitive. An exempt schema never receives a
/// prefix, even if a prefix rule or a default prefix would apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamingRules {
    schema_prefixes: BTreeMap<String, String>,
    default_prefix: Option<String>,
    exempt_schemas: BTreeSet<String>,
}

impl NamingRules {
    /// Creates rules that never prefix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefixes objects in `schema` with `prefix`.
    #[must_use]
    pub fn with_schema_prefix(mut self, schema: &str, prefix: impl Into<String>) -> Self {
        self.schema_prefixes
            .insert(schema.to_ascii_lowercase(), prefix.into());
        self
    }

    /// Prefixes objects in schemas without an explicit rule.
    #[must_use]
    pub fn with_default_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.default_prefix = Some(prefix.into());
        self
    }

    /// Exempts `schema` from prefixing.
    #[must_use]
    pub fn with_exempt_schema(mut self, schema: &str) -> Self {
        self.exempt_schemas.insert(schema.to_ascii_lowercase());
        self
    }

    /// Returns true if objects in `schema` are never prefixed.
    #[must_use]
    pub fn is_exempt(&self, schema: &str) -> bool {
        self.exempt_schemas.contains(&schema.to_ascii_lowercase())
    }

    /// Returns the prefix for objects in `schema`, if any.
    #[must_use]
    pub fn prefix_for(&self, schema: &str) -> Option<&str> {
        if self.is_exempt(schema) {
            return None;
        }
        self.schema_prefixes
            .get(&schema.to_ascii_lowercase())
            .or(self.default_prefix.as_ref())
            .map(String::as_str)
            .filter(|p| !p.is_empty())
    }

    /// Returns the stored name of `object` in `schema`.
    #[must_use]
    pub fn physical_name(&self, schema: &str, object: &str) -> String {
        match self.prefix_for(schema) {
            Some(prefix) => format!("{prefix}{object}"),
            None => object.to_string(),
        }
    }
}
