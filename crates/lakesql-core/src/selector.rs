//! Backend selection from a configuration descriptor.
//!
//! [`select`] reads the backend discriminator of a [`DialectConfig`] and
//! returns a ready-to-use formatter. The descriptor is only read; the
//! returned handle owns everything it needs.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::dialect::{
    ExternalTableDialect, ExternalTableOptions, ManagedTableDialect, ManagedTableOptions,
    NamingRules, SqlDialect,
};
use crate::error::{CompileError, Result};
use crate::validate::{DenyList, DenyPattern, PatternScope, Validator};

/// A formatter chosen by [`select`].
pub type FormatterHandle = Box<dyn SqlDialect>;

/// Configuration descriptor for a target backend.
///
/// ```json
/// {
///   "backend_type": "external-table",
///   "schema_prefix_rules": {"staging": "stg_"},
///   "prefix_exempt_schemas": ["dbo"],
///   "options": {"data_source": "Lake", "parquet_file_format": "Parquet"}
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DialectConfig {
    /// Backend discriminator, e.g. `external-table` or `managed-table`.
    pub backend_type: String,
    /// Object name prefix per schema.
    #[serde(default)]
    pub schema_prefix_rules: BTreeMap<String, String>,
    /// Prefix for schemas without a rule.
    #[serde(default)]
    pub default_prefix: Option<String>,
    /// Schemas whose objects are never prefixed.
    #[serde(default)]
    pub prefix_exempt_schemas: BTreeSet<String>,
    /// Additional deny-list regexes, applied to every fragment.
    #[serde(default)]
    pub extra_deny_patterns: Vec<String>,
    /// Backend-specific options.
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl DialectConfig {
    /// Creates a descriptor with no naming rules and no options.
    #[must_use]
    pub fn new(backend_type: impl Into<String>) -> Self {
        Self {
            backend_type: backend_type.into(),
            schema_prefix_rules: BTreeMap::new(),
            default_prefix: None,
            prefix_exempt_schemas: BTreeSet::new(),
            extra_deny_patterns: Vec::new(),
            options: serde_json::Map::new(),
        }
    }

    /// Adds a schema prefix rule.
    #[must_use]
    pub fn with_schema_prefix(
        mut self,
        schema: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        self.schema_prefix_rules.insert(schema.into(), prefix.into());
        self
    }

    /// Sets the default prefix.
    #[must_use]
    pub fn with_default_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.default_prefix = Some(prefix.into());
        self
    }

    /// Exempts a schema from prefixing.
    #[must_use]
    pub fn with_exempt_schema(mut self, schema: impl Into<String>) -> Self {
        self.prefix_exempt_schemas.insert(schema.into());
        self
    }

    /// Adds a deny-list regex.
    #[must_use]
    pub fn with_deny_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.extra_deny_patterns.push(pattern.into());
        self
    }

    /// Sets a backend option.
    #[must_use]
    pub fn with_option(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Builds the naming rules described by this configuration.
    #[must_use]
    pub fn naming_rules(&self) -> NamingRules {
        let mut rules = NamingRules::new();
        for (schema, prefix) in &self.schema_prefix_rules {
            rules = rules.with_schema_prefix(schema, prefix.clone());
        }
        if let Some(prefix) = &self.default_prefix {
            rules = rules.with_default_prefix(prefix.clone());
        }
        for schema in &self.prefix_exempt_schemas {
            rules = rules.with_exempt_schema(schema);
        }
        rules
    }

    /// Builds the validator: the seeded deny-list plus the extra patterns.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidConfig`] if an extra pattern is not a
    /// valid regular expression.
    pub fn validator(&self) -> Result<Validator> {
        let mut deny_list = DenyList::seeded();
        for (i, pattern) in self.extra_deny_patterns.iter().enumerate() {
            let name = format!("extra_deny_patterns[{i}]");
            let compiled = DenyPattern::new(name, pattern, PatternScope::Fragment).map_err(|err| {
                CompileError::InvalidConfig {
                    backend: self.backend_type.clone(),
                    message: format!("invalid deny pattern '{pattern}': {err}"),
                }
            })?;
            deny_list = deny_list.with_pattern(compiled);
        }
        Ok(Validator::with_deny_list(deny_list))
    }

    fn typed_options<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(serde_json::Value::Object(self.options.clone())).map_err(|err| {
            CompileError::InvalidConfig {
                backend: self.backend_type.clone(),
                message: err.to_string(),
            }
        })
    }
}

/// The backends a descriptor can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// External tables over object storage.
    ExternalTable,
    /// Warehouse-managed tables.
    ManagedTable,
}

impl BackendKind {
    /// All backends.
    pub const ALL: [Self; 2] = [Self::ExternalTable, Self::ManagedTable];

    /// Returns the canonical discriminator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExternalTable => ExternalTableDialect::NAME,
            Self::ManagedTable => ManagedTableDialect::NAME,
        }
    }

    /// Returns the accepted aliases of the canonical discriminator.
    #[must_use]
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::ExternalTable => &["external", "serverless"],
            Self::ManagedTable => &["managed", "warehouse"],
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted || kind.aliases().contains(&wanted.as_str()))
            .ok_or_else(|| CompileError::UnrecognizedBackend(s.to_string()))
    }
}

/// Returns the formatter for the backend a configuration names.
///
/// # Errors
///
/// Returns [`CompileError::UnrecognizedBackend`] for an unknown discriminator
/// and [`CompileError::InvalidConfig`] for options or deny patterns that do
/// not resolve.
pub fn select(config: &DialectConfig) -> Result<FormatterHandle> {
    let backend: BackendKind = config.backend_type.parse()?;
    let naming = config.naming_rules();
    let validator = config.validator()?;
    debug!(
        backend = %backend,
        prefix_rules = config.schema_prefix_rules.len(),
        extra_deny_patterns = config.extra_deny_patterns.len(),
        "selected dialect"
    );
    let handle: FormatterHandle = match backend {
        BackendKind::ExternalTable => {
            let options: ExternalTableOptions = config.typed_options()?;
            Box::new(ExternalTableDialect::new(naming, options).with_validator(validator))
        }
        BackendKind::ManagedTable => {
            let options: ManagedTableOptions = config.typed_options()?;
            Box::new(ManagedTableDialect::new(naming, options).with_validator(validator))
        }
    };
    Ok(handle)
}
