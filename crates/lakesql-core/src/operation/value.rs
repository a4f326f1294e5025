//! Values embedded in generated statements.

use serde::Deserialize;

/// A value for INSERT rows, UPDATE assignments, column defaults, and options.
///
/// `Text` is classified when rendered: numbers and recognized expression
/// shapes are emitted as-is, anything else becomes a quoted string literal.
/// Use `Expression` or `Literal` to override the classification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// NULL.
    Null,
    /// Boolean, rendered as `1` or `0`.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// Text, classified as number, expression, or string literal.
    Text(String),
    /// Text that is always treated as a SQL expression.
    Expression {
        /// The expression text.
        expression: String,
    },
    /// Text that is always quoted as a string literal.
    Literal {
        /// The literal text, unescaped.
        literal: String,
    },
}

impl Value {
    /// Creates a text value, classified at render time.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Creates a value that is always emitted as an expression.
    #[must_use]
    pub fn expr(expression: impl Into<String>) -> Self {
        Self::Expression {
            expression: expression.into(),
        }
    }

    /// Creates a value that is always emitted as a quoted string literal.
    #[must_use]
    pub fn literal(literal: impl Into<String>) -> Self {
        Self::Literal {
            literal: literal.into(),
        }
    }

    /// Returns true if this is NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// A `column = value` pair of an UPDATE SET clause.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Assignment {
    /// Target column.
    pub column: String,
    /// New value.
    pub value: Value,
}

impl Assignment {
    /// Creates an assignment.
    #[must_use]
    pub fn new(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(Value::from(42), Value::Int(42));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from("x"), Value::Text("x".into()));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("y")), Value::Text("y".into()));
        assert!(Value::Null.is_null());
    }

    #[test]
    fn test_deserialize_untagged() {
        let values: Vec<Value> =
            serde_json::from_str(r#"[null, true, 7, 1.5, "abc", {"expression": "GETDATE()"}, {"literal": "42"}]"#)
                .unwrap();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Int(7),
                Value::Float(1.5),
                Value::text("abc"),
                Value::expr("GETDATE()"),
                Value::literal("42"),
            ]
        );
    }
}
