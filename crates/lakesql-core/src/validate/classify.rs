//! Literal versus expression classification.
//!
//! Telling a SQL expression apart from a string value is a best-effort
//! heuristic over the text. Everything that decides it lives in
//! [`is_expression`], so a stricter parser can replace it without touching
//! callers.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

/// The classification of a textual value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueClass {
    /// A string literal, already quoted and escaped.
    StringLiteral(String),
    /// A numeric literal, emitted as-is.
    NumericLiteral(String),
    /// A SQL expression, emitted unquoted after validation.
    Expression(String),
}

fn ci(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("Invalid classifier regex")
}

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?(0|[1-9][0-9]*)(\.[0-9]+)?$").expect("Invalid number regex"));

static FUNCTION_CALL: LazyLock<Regex> =
    LazyLock::new(|| ci(r"^[a-z_][a-z0-9_]*(\.[a-z_][a-z0-9_]*)*\(.*\)$"));

static NILADIC: LazyLock<Regex> = LazyLock::new(|| {
    ci(r"^(CURRENT_TIMESTAMP|CURRENT_DATE|CURRENT_TIME|CURRENT_USER|SESSION_USER|SYSTEM_USER)$")
});

static CASE_EXPR: LazyLock<Regex> = LazyLock::new(|| ci(r"(?s)^CASE\s.*\sEND$"));

const OPERAND: &str = r"(\[[^\]]+\]|[a-z_][a-z0-9_]*)(\.(\[[^\]]+\]|[a-z_][a-z0-9_]*))*|[0-9]+(\.[0-9]+)?";

static OPERATOR_EXPR: LazyLock<Regex> = LazyLock::new(|| {
    let op = r"(\s*(<>|!=|<=|>=|=|<|>|\+|\*|%)\s*|\s+[-/]\s+)";
    ci(&format!("^({OPERAND})({op}({OPERAND}))+$"))
});

static IDENT_OPERAND: LazyLock<Regex> = LazyLock::new(|| ci(r"(^|[^0-9.])[a-z_\[]"));

/// Returns true if `value` looks like a SQL expression rather than a string.
///
/// Recognized shapes:
/// - a function call such as `GETDATE()` or `COALESCE(a, b)`
/// - a niladic function such as `CURRENT_TIMESTAMP`
/// - a `CASE ... END` expression
/// - operands joined by arithmetic or comparison operators, where every
///   operand is a bare identifier or a number and at least one is an
///   identifier (`price * 1.1`, `a = b`); `-` and `/` need surrounding
///   whitespace so values like `well-known` or `N/A` stay literals
#[must_use]
pub fn is_expression(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }
    FUNCTION_CALL.is_match(value)
        || NILADIC.is_match(value)
        || CASE_EXPR.is_match(value)
        || (OPERATOR_EXPR.is_match(value) && IDENT_OPERAND.is_match(value))
}

/// Returns true if `value` is a plain decimal number.
#[must_use]
pub fn is_numeric(value: &str) -> bool {
    NUMBER.is_match(value)
}

/// Classifies a textual value.
///
/// Numbers are checked first, then expression shapes; anything else is a
/// string literal and comes back quoted.
#[must_use]
pub fn classify(value: &str) -> ValueClass {
    if is_numeric(value) {
        ValueClass::NumericLiteral(value.to_string())
    } else if is_expression(value) {
        ValueClass::Expression(value.trim().to_string())
    } else {
        ValueClass::StringLiteral(quote_string(value))
    }
}

/// Wraps `value` in single quotes, doubling embedded single quotes.
#[must_use]
pub fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Reverses [`quote_string`].
///
/// Returns `None` when `literal` is not a well-formed quoted string.
#[must_use]
pub fn unquote_string(literal: &str) -> Option<String> {
    let inner = literal.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\'' {
            // A lone quote would have terminated the literal.
            if chars.next() != Some('\'') {
                return None;
            }
        }
        out.push(c);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_calls_are_expressions() {
        assert!(is_expression("GETDATE()"));
        assert!(is_expression("getdate()"));
        assert!(is_expression("COALESCE(a, 'x')"));
        assert!(is_expression("dbo.fn_mask(email)"));
        assert!(is_expression("CURRENT_TIMESTAMP"));
    }

    #[test]
    fn test_operator_expressions() {
        assert!(is_expression("price * 1.1"));
        assert!(is_expression("a = b"));
        assert!(is_expression("qty+1"));
        assert!(is_expression("total / 2"));
        assert!(is_expression("t.amount - s.amount"));
        assert!(is_expression("[order date] >= start_date"));
        assert!(is_expression("CASE WHEN a > 1 THEN 'x' ELSE 'y' END"));
    }

    #[test]
    fn test_plain_text_is_literal() {
        assert!(!is_expression("hello world"));
        assert!(!is_expression("O'Brien"));
        assert!(!is_expression("well-known"));
        assert!(!is_expression("N/A"));
        assert!(!is_expression("2024-01-01"));
        assert!(!is_expression("1 + 2"));
        assert!(!is_expression("(not a call"));
        assert!(!is_expression(""));
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("42"), ValueClass::NumericLiteral("42".into()));
        assert_eq!(classify("-3.5"), ValueClass::NumericLiteral("-3.5".into()));
        assert_eq!(classify("00123"), ValueClass::StringLiteral("'00123'".into()));
        assert_eq!(
            classify("GETDATE()"),
            ValueClass::Expression("GETDATE()".into())
        );
        assert_eq!(
            classify("O'Brien"),
            ValueClass::StringLiteral("'O''Brien'".into())
        );
    }

    #[test]
    fn test_quote_string() {
        assert_eq!(quote_string("O'Brien"), "'O''Brien'");
        assert_eq!(quote_string(""), "''");
        assert_eq!(quote_string("''"), "''''''");
    }

    #[test]
    fn test_unquote_reverses_quote() {
        for s in ["O'Brien", "", "'", "a''b", "plain", "trailing'", "ünïcode'"] {
            assert_eq!(unquote_string(&quote_string(s)).as_deref(), Some(s));
        }
    }

    #[test]
    fn test_unquote_rejects_malformed() {
        assert_eq!(unquote_string("abc"), None);
        assert_eq!(unquote_string("'a'b'"), None);
        assert_eq!(unquote_string("'"), None);
    }
}
