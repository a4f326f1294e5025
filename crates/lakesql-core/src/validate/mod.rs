//! Identifier and expression validation.
//!
//! Every fragment that ends up in generated SQL passes through a
//! [`Validator`] first. Identifiers are held to a strict character set,
//! expressions and sub-queries to the deny-list, and values that are not
//! expressions are quoted with [`quote_string`].
//!
//! Failures are reported, never corrected: nothing here truncates, strips,
//! or rewrites input beyond removing delimiters that the quoting step adds
//! back.

mod classify;
mod deny_list;

pub use classify::{classify, is_expression, is_numeric, quote_string, unquote_string, ValueClass};
pub use deny_list::{has_stacked_statement, DenyList, DenyPattern, PatternScope};

use std::fmt;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::error::{Rejection, ValidationError};

/// Maximum identifier length in characters.
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// What a validated fragment is meant to be. Used for error reporting only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    /// Schema name.
    Schema,
    /// Table name.
    Table,
    /// View name.
    View,
    /// Column name.
    Column,
    /// Statistics object name.
    Statistics,
    /// Database principal.
    Principal,
    /// External data source name.
    DataSource,
    /// External file format name.
    FileFormat,
    /// Storage format keyword.
    StorageFormat,
    /// Option or property key.
    OptionKey,
    /// Column data type.
    DataType,
    /// Scalar or boolean expression.
    Expression,
    /// Embedded query.
    Query,
    /// Storage path.
    Path,
    /// Caller-supplied SQL.
    RawSql,
}

impl FragmentKind {
    /// Returns the lowercase name used in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::Table => "table",
            Self::View => "view",
            Self::Column => "column",
            Self::Statistics => "statistics",
            Self::Principal => "principal",
            Self::DataSource => "data source",
            Self::FileFormat => "file format",
            Self::StorageFormat => "storage format",
            Self::OptionKey => "option key",
            Self::DataType => "data type",
            Self::Expression => "expression",
            Self::Query => "query",
            Self::Path => "path",
            Self::RawSql => "raw sql",
        }
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static DATA_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"^[a-z][a-z0-9_]*( [a-z][a-z0-9_]*)*(\s*\(\s*([0-9]+|MAX)(\s*,\s*[0-9]+)?\s*\))?$")
        .case_insensitive(true)
        .build()
        .expect("Invalid data type regex")
});

const EXPRESSION_PUNCTUATION: &str = "_.,()[]'\"=<>!+-*/%:@#&|^~? ";
const PATH_PUNCTUATION: &str = "_-./:@?=&%*~+";

/// Validates identifiers, expressions, and SQL text against a deny-list.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    deny_list: DenyList,
}

impl Validator {
    /// Creates a validator with the seeded deny-list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a validator with a custom deny-list.
    #[must_use]
    pub const fn with_deny_list(deny_list: DenyList) -> Self {
        Self { deny_list }
    }

    /// Returns the deny-list in use.
    #[must_use]
    pub const fn deny_list(&self) -> &DenyList {
        &self.deny_list
    }

    fn check_deny_list(
        &self,
        text: &str,
        context: PatternScope,
        kind: FragmentKind,
        original: &str,
    ) -> Result<(), ValidationError> {
        match self.deny_list.first_match(text, context) {
            Some(name) => Err(ValidationError::new(
                kind,
                original,
                Rejection::DangerousPattern(name.to_string()),
            )),
            None => Ok(()),
        }
    }

    /// Validates an identifier and returns it without delimiters.
    ///
    /// Surrounding whitespace and then one pair of `[...]`, `"..."`, or
    /// backtick delimiters are stripped first so that already-quoted names
    /// are not quoted twice. Whitespace inside the delimiters is rejected.
    /// The remainder must be 1 to 128 characters, start with an ASCII
    /// letter, contain only ASCII letters, digits, `_`, and `-`, and match no
    /// deny-list pattern.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the first rule the name breaks.
    pub fn validate_identifier(
        &self,
        name: &str,
        kind: FragmentKind,
    ) -> Result<String, ValidationError> {
        let stripped = strip_delimiters(name.trim());
        let reject = |reason| ValidationError::new(kind, name, reason);

        if stripped.trim().is_empty() {
            return Err(reject(Rejection::Empty));
        }
        self.check_deny_list(stripped, PatternScope::Fragment, kind, name)?;
        if stripped.contains(['\'', '"', '`']) {
            return Err(reject(Rejection::DangerousPattern(
                "quote character".to_string(),
            )));
        }

        let length = stripped.chars().count();
        if length > MAX_IDENTIFIER_LEN {
            return Err(reject(Rejection::TooLong {
                length,
                max: MAX_IDENTIFIER_LEN,
            }));
        }
        // Whitespace inside delimiters is part of the name, not padding.
        if let Some(space) = stripped.chars().next().filter(|c| c.is_whitespace()) {
            return Err(reject(Rejection::InvalidCharacter(space)));
        }
        if !stripped.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(reject(Rejection::MustStartWithLetter));
        }
        if let Some(bad) = stripped
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(reject(Rejection::InvalidCharacter(bad)));
        }
        Ok(stripped.to_string())
    }

    /// Validates an expression such as a filter, default, or check constraint.
    ///
    /// Expressions may contain operators, parentheses, dots, commas, quoted
    /// literals, and bracketed identifiers, but quotes, brackets, and
    /// parentheses must pair up and no deny-list pattern may match.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the first rule the expression breaks.
    pub fn validate_expression(
        &self,
        expr: &str,
        kind: FragmentKind,
    ) -> Result<String, ValidationError> {
        let trimmed = expr.trim();
        let reject = |reason| ValidationError::new(kind, expr, reason);

        if trimmed.is_empty() {
            return Err(reject(Rejection::Empty));
        }
        self.check_deny_list(trimmed, PatternScope::Fragment, kind, expr)?;
        if let Some(bad) = trimmed
            .chars()
            .find(|c| !(c.is_alphanumeric() || c.is_whitespace() || EXPRESSION_PUNCTUATION.contains(*c)))
        {
            return Err(reject(Rejection::InvalidCharacter(bad)));
        }
        if let Some(open) = unbalanced(trimmed) {
            return Err(reject(Rejection::Unbalanced(open)));
        }
        Ok(trimmed.to_string())
    }

    /// Validates a query embedded in a larger statement.
    ///
    /// Keywords are allowed, but comments, injection payloads, and a second
    /// statement are not. A single trailing `;` is removed so the query can be
    /// nested.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the query is empty, matches the
    /// deny-list, or stacks statements.
    pub fn validate_query(&self, sql: &str, kind: FragmentKind) -> Result<String, ValidationError> {
        let trimmed = sql.trim();
        let reject = |reason| ValidationError::new(kind, sql, reason);

        if trimmed.is_empty() {
            return Err(reject(Rejection::Empty));
        }
        self.check_deny_list(trimmed, PatternScope::Query, kind, sql)?;
        if has_stacked_statement(trimmed) {
            return Err(reject(Rejection::StatementStacking));
        }
        let body = trimmed.trim_end_matches(|c: char| c == ';' || c.is_whitespace());
        if body.is_empty() {
            return Err(reject(Rejection::Empty));
        }
        Ok(body.to_string())
    }

    /// Validates caller-supplied SQL text.
    ///
    /// Only the `Everywhere` deny-list patterns apply. A statement terminator
    /// followed by another statement is rejected unless `trusted_script` is
    /// set.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the text is empty, matches the
    /// deny-list, or stacks statements without being trusted.
    pub fn validate_raw_sql(
        &self,
        sql: &str,
        trusted_script: bool,
    ) -> Result<String, ValidationError> {
        let trimmed = sql.trim();
        let reject = |reason| ValidationError::new(FragmentKind::RawSql, sql, reason);

        if trimmed.is_empty() {
            return Err(reject(Rejection::Empty));
        }
        self.check_deny_list(trimmed, PatternScope::Everywhere, FragmentKind::RawSql, sql)?;
        if !trusted_script && has_stacked_statement(trimmed) {
            return Err(reject(Rejection::StatementStacking));
        }
        Ok(trimmed.to_string())
    }

    /// Validates a column data type such as `NVARCHAR(100)` or `DECIMAL(18, 2)`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the type name is not of that shape.
    pub fn validate_data_type(&self, data_type: &str) -> Result<String, ValidationError> {
        let trimmed = data_type.trim();
        let kind = FragmentKind::DataType;
        let reject = |reason| ValidationError::new(kind, data_type, reason);

        if trimmed.is_empty() {
            return Err(reject(Rejection::Empty));
        }
        self.check_deny_list(trimmed, PatternScope::Fragment, kind, data_type)?;
        if !trimmed.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(reject(Rejection::MustStartWithLetter));
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || "_ (),".contains(*c)))
        {
            return Err(reject(Rejection::InvalidCharacter(bad)));
        }
        if !DATA_TYPE.is_match(trimmed) {
            return Err(reject(Rejection::Malformed));
        }
        Ok(trimmed.to_string())
    }

    /// Validates a storage path embedded in a string literal.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the path is empty, walks up with `..`,
    /// matches the deny-list, or contains characters outside the path set.
    pub fn validate_path(&self, path: &str, kind: FragmentKind) -> Result<String, ValidationError> {
        let trimmed = path.trim();
        let reject = |reason| ValidationError::new(kind, path, reason);

        if trimmed.is_empty() {
            return Err(reject(Rejection::Empty));
        }
        self.check_deny_list(trimmed, PatternScope::Everywhere, kind, path)?;
        if trimmed.split(['/', '\\']).any(|segment| segment == "..") {
            return Err(reject(Rejection::DangerousPattern(
                "parent directory".to_string(),
            )));
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| !(c.is_alphanumeric() || PATH_PUNCTUATION.contains(*c)))
        {
            return Err(reject(Rejection::InvalidCharacter(bad)));
        }
        Ok(trimmed.to_string())
    }
}

fn strip_delimiters(name: &str) -> &str {
    for (open, close) in [('[', ']'), ('"', '"'), ('`', '`')] {
        if name.len() >= 2 && name.starts_with(open) && name.ends_with(close) {
            return &name[1..name.len() - 1];
        }
    }
    name
}

/// Returns the first delimiter that is left open or closed without opening.
fn unbalanced(expr: &str) -> Option<char> {
    let mut stack: Vec<char> = Vec::new();
    let mut chars = expr.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                let mut closed = false;
                while let Some(inner) = chars.next() {
                    if inner == c {
                        // Doubled delimiter is an escape.
                        if chars.peek() == Some(&c) {
                            chars.next();
                        } else {
                            closed = true;
                            break;
                        }
                    }
                }
                if !closed {
                    return Some(c);
                }
            }
            '[' => {
                if !chars.by_ref().any(|inner| inner == ']') {
                    return Some('[');
                }
            }
            '(' => stack.push(c),
            ')' => {
                if stack.pop().is_none() {
                    return Some(')');
                }
            }
            ']' => return Some(']'),
            _ => {}
        }
    }
    stack.pop()
}

static DEFAULT_VALIDATOR: LazyLock<Validator> = LazyLock::new(Validator::new);

/// Validates an identifier with the seeded deny-list.
///
/// # Errors
///
/// See [`Validator::validate_identifier`].
pub fn validate_identifier(name: &str, kind: FragmentKind) -> Result<String, ValidationError> {
    DEFAULT_VALIDATOR.validate_identifier(name, kind)
}

/// Validates an expression with the seeded deny-list.
///
/// # Errors
///
/// See [`Validator::validate_expression`].
pub fn validate_expression(expr: &str, kind: FragmentKind) -> Result<String, ValidationError> {
    DEFAULT_VALIDATOR.validate_expression(expr, kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(result: Result<String, ValidationError>) -> Rejection {
        result.expect_err("expected rejection").reason
    }

    #[test]
    fn test_valid_identifiers_unchanged() {
        for name in ["customers", "Sales_2024", "a", "first-name", "X9"] {
            assert_eq!(validate_identifier(name, FragmentKind::Table).unwrap(), name);
        }
    }

    #[test]
    fn test_brackets_and_quotes_stripped() {
        assert_eq!(
            validate_identifier("[customers]", FragmentKind::Table).unwrap(),
            "customers"
        );
        assert_eq!(
            validate_identifier("\"orders\"", FragmentKind::Table).unwrap(),
            "orders"
        );
        assert_eq!(
            validate_identifier("  [id] ", FragmentKind::Column).unwrap(),
            "id"
        );
    }

    #[test]
    fn test_whitespace_inside_delimiters_rejected() {
        for name in ["[ id ]", "[ id]", "\" id\""] {
            assert_eq!(
                reason(validate_identifier(name, FragmentKind::Column)),
                Rejection::InvalidCharacter(' '),
                "{name}"
            );
        }
        assert_eq!(
            reason(validate_identifier("[id ]", FragmentKind::Column)),
            Rejection::InvalidCharacter(' ')
        );
        assert_eq!(
            reason(validate_identifier("[  ]", FragmentKind::Column)),
            Rejection::Empty
        );
    }

    #[test]
    fn test_identifier_rejections() {
        assert_eq!(
            reason(validate_identifier("", FragmentKind::Table)),
            Rejection::Empty
        );
        assert_eq!(
            reason(validate_identifier("[]", FragmentKind::Table)),
            Rejection::Empty
        );
        assert_eq!(
            reason(validate_identifier("123_table", FragmentKind::Table)),
            Rejection::MustStartWithLetter
        );
        assert_eq!(
            reason(validate_identifier("_hidden", FragmentKind::Table)),
            Rejection::MustStartWithLetter
        );
        assert_eq!(
            reason(validate_identifier(&"a".repeat(130), FragmentKind::Table)),
            Rejection::TooLong {
                length: 130,
                max: MAX_IDENTIFIER_LEN
            }
        );
        assert_eq!(
            reason(validate_identifier("my table", FragmentKind::Table)),
            Rejection::InvalidCharacter(' ')
        );
        assert_eq!(
            reason(validate_identifier("a.b", FragmentKind::Table)),
            Rejection::InvalidCharacter('.')
        );
    }

    #[test]
    fn test_identifier_dangerous_patterns() {
        for name in [
            "drop; table users--",
            "users;",
            "a--b",
            "DropTables",
            "x'y",
            "truncate_me",
        ] {
            assert!(
                matches!(
                    reason(validate_identifier(name, FragmentKind::Table)),
                    Rejection::DangerousPattern(_)
                ),
                "{name} should be dangerous"
            );
        }
    }

    #[test]
    fn test_max_length_identifier_accepted() {
        let name = format!("a{}", "b".repeat(127));
        assert_eq!(validate_identifier(&name, FragmentKind::Column).unwrap(), name);
    }

    #[test]
    fn test_expressions() {
        assert_eq!(
            validate_expression("  status = 'active' ", FragmentKind::Expression).unwrap(),
            "status = 'active'"
        );
        assert!(validate_expression("COALESCE(a, 'n/a')", FragmentKind::Expression).is_ok());
        assert!(validate_expression("t.[Order Id] = s.[Order Id]", FragmentKind::Expression).is_ok());
        assert!(validate_expression("name = 'it''s'", FragmentKind::Expression).is_ok());
        assert!(validate_expression("\"Order \"\"Id\"\"\" = 1", FragmentKind::Expression).is_ok());
    }

    #[test]
    fn test_expression_rejections() {
        assert!(matches!(
            reason(validate_expression("1=1; DROP TABLE x", FragmentKind::Expression)),
            Rejection::DangerousPattern(_)
        ));
        assert!(matches!(
            reason(validate_expression("a = 1 OR 1=1", FragmentKind::Expression)),
            Rejection::DangerousPattern(_)
        ));
        assert_eq!(
            reason(validate_expression("name = 'x", FragmentKind::Expression)),
            Rejection::Unbalanced('\'')
        );
        assert_eq!(
            reason(validate_expression("name = \"x", FragmentKind::Expression)),
            Rejection::Unbalanced('"')
        );
        assert_eq!(
            reason(validate_expression("f(a", FragmentKind::Expression)),
            Rejection::Unbalanced('(')
        );
        assert_eq!(
            reason(validate_expression("a)", FragmentKind::Expression)),
            Rejection::Unbalanced(')')
        );
        assert_eq!(
            reason(validate_expression("a = $1", FragmentKind::Expression)),
            Rejection::InvalidCharacter('$')
        );
        assert_eq!(
            reason(validate_expression("   ", FragmentKind::Expression)),
            Rejection::Empty
        );
    }

    #[test]
    fn test_queries() {
        let v = Validator::new();
        assert_eq!(
            v.validate_query("SELECT * FROM bronze.raw_customers;", FragmentKind::Query)
                .unwrap(),
            "SELECT * FROM bronze.raw_customers"
        );
        assert_eq!(
            v.validate_query("SELECT 1; SELECT 2", FragmentKind::Query)
                .unwrap_err()
                .reason,
            Rejection::StatementStacking
        );
        assert!(matches!(
            v.validate_query("SELECT 1 /* x */", FragmentKind::Query)
                .unwrap_err()
                .reason,
            Rejection::DangerousPattern(_)
        ));
        assert!(v
            .validate_query("SELECT dropoff_at FROM trips", FragmentKind::Query)
            .is_ok());
        assert_eq!(
            v.validate_query(" ; ", FragmentKind::Query).unwrap_err().reason,
            Rejection::Empty
        );
    }

    #[test]
    fn test_raw_sql() {
        let v = Validator::new();
        assert!(v.validate_raw_sql("DROP TABLE staging.tmp", false).is_ok());
        assert_eq!(
            v.validate_raw_sql("SELECT 1; DROP TABLE users", false)
                .unwrap_err()
                .reason,
            Rejection::StatementStacking
        );
        assert!(v
            .validate_raw_sql("TRUNCATE TABLE a; TRUNCATE TABLE b;", true)
            .is_ok());
        assert!(matches!(
            v.validate_raw_sql("EXEC xp_cmdshell 'dir'", true)
                .unwrap_err()
                .reason,
            Rejection::DangerousPattern(_)
        ));
    }

    #[test]
    fn test_data_types() {
        let v = Validator::new();
        for dt in [
            "INT",
            "NVARCHAR(100)",
            "DECIMAL(18, 2)",
            "VARCHAR(MAX)",
            "DOUBLE PRECISION",
            "datetime2(6)",
        ] {
            assert_eq!(v.validate_data_type(dt).unwrap(), dt);
        }
        assert_eq!(
            v.validate_data_type("INT)").unwrap_err().reason,
            Rejection::Malformed
        );
        assert_eq!(
            v.validate_data_type("INT NOT NULL DEFAULT 'x'").unwrap_err().reason,
            Rejection::InvalidCharacter('\'')
        );
    }

    #[test]
    fn test_paths() {
        let v = Validator::new();
        assert!(v.validate_path("silver/customers/", FragmentKind::Path).is_ok());
        assert!(v
            .validate_path(
                "abfss://lake@acct.dfs.core.windows.net/raw/*.parquet",
                FragmentKind::Path
            )
            .is_ok());
        assert!(matches!(
            v.validate_path("silver/../gold/", FragmentKind::Path)
                .unwrap_err()
                .reason,
            Rejection::DangerousPattern(_)
        ));
        assert_eq!(
            v.validate_path("a'b", FragmentKind::Path).unwrap_err().reason,
            Rejection::InvalidCharacter('\'')
        );
    }

    #[test]
    fn test_custom_deny_list() {
        let v = Validator::with_deny_list(DenyList::seeded().with_pattern(
            DenyPattern::new("tmp prefix", r"^tmp_", PatternScope::Fragment).unwrap(),
        ));
        assert!(matches!(
            v.validate_identifier("tmp_orders", FragmentKind::Table)
                .unwrap_err()
                .reason,
            Rejection::DangerousPattern(_)
        ));
        assert!(v.validate_identifier("orders", FragmentKind::Table).is_ok());
    }

    #[test]
    fn test_kind_in_error() {
        let err = validate_identifier("1x", FragmentKind::Column).unwrap_err();
        assert_eq!(err.kind, FragmentKind::Column);
        assert_eq!(err.value, "1x");
        assert!(err.to_string().contains("column"));
    }
}
