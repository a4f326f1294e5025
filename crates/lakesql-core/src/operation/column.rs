//! Column definitions for CREATE TABLE.

use serde::Deserialize;

use super::value::Value;

const fn default_true() -> bool {
    true
}

/// A column in a CREATE TABLE column list.
///
/// The data type is kept as text (`NVARCHAR(100)`, `DECIMAL(18, 2)`) and is
/// validated when the statement is compiled.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnDefinition {
    /// Column name.
    pub name: String,
    /// SQL data type.
    pub data_type: String,
    /// Whether NULL is allowed.
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// Default value.
    #[serde(default)]
    pub default: Option<Value>,
    /// Whether this column is the primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Whether values must be unique.
    #[serde(default)]
    pub unique: bool,
    /// CHECK constraint expression.
    #[serde(default)]
    pub check: Option<String>,
}

impl ColumnDefinition {
    /// Creates a nullable column with no constraints.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default: None,
            primary_key: false,
            unique: false,
            check: None,
        }
    }

    /// Marks the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Marks the column as the primary key. Implies NOT NULL.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Marks the column as unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Adds a CHECK constraint.
    #[must_use]
    pub fn check(mut self, expression: impl Into<String>) -> Self {
        self.check = Some(expression.into());
        self
    }

    /// Returns true if the column carries any constraint beyond nullability.
    #[must_use]
    pub const fn has_constraints(&self) -> bool {
        self.primary_key || self.unique || self.check.is_some() || self.default.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_builder() {
        let col = ColumnDefinition::new("id", "BIGINT").primary_key();
        assert!(col.primary_key);
        assert!(!col.nullable);
        assert!(col.has_constraints());

        let col = ColumnDefinition::new("email", "NVARCHAR(255)")
            .not_null()
            .unique()
            .default_value("unknown");
        assert!(col.unique);
        assert_eq!(col.default, Some(Value::text("unknown")));
    }

    #[test]
    fn test_deserialize_defaults() {
        let col: ColumnDefinition =
            serde_json::from_str(r#"{"name": "amount", "data_type": "DECIMAL(18, 2)"}"#).unwrap();
        assert!(col.nullable);
        assert!(!col.has_constraints());
    }
}
