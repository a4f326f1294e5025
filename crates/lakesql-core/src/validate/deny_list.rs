//! Deny-list of injection patterns.

use regex::{Regex, RegexBuilder};

/// Where a deny-list pattern is enforced.
///
/// Scopes are ordered: a pattern applies to every context at or below its
/// scope, so `Everywhere` patterns are also checked on identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PatternScope {
    /// Identifiers and embedded expressions.
    Fragment,
    /// Also embedded sub-queries (source selects, merge sources, view bodies).
    Query,
    /// Also caller-supplied raw SQL.
    Everywhere,
}

/// A single named deny-list entry.
#[derive(Debug, Clone)]
pub struct DenyPattern {
    name: String,
    regex: Regex,
    scope: PatternScope,
}

impl DenyPattern {
    /// Compiles a case-insensitive pattern.
    ///
    /// # Errors
    ///
    /// Returns the regex error if `pattern` is not a valid regular expression.
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        scope: PatternScope,
    ) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self {
            name: name.into(),
            regex,
            scope,
        })
    }

    /// Returns the pattern name reported on rejection.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the scope of this pattern.
    #[must_use]
    pub const fn scope(&self) -> PatternScope {
        self.scope
    }

    fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

const SEEDED: &[(&str, &str, PatternScope)] = &[
    ("statement terminator", r";", PatternScope::Fragment),
    ("DROP", r"DROP", PatternScope::Fragment),
    ("DELETE FROM", r"DELETE\s+FROM", PatternScope::Fragment),
    ("TRUNCATE", r"TRUNCATE", PatternScope::Fragment),
    ("UNION SELECT", r"UNION\s+(ALL\s+)?SELECT", PatternScope::Fragment),
    ("line comment", r"--", PatternScope::Query),
    ("block comment", r"/\*|\*/", PatternScope::Query),
    ("OR 1=1", r"OR\s+1\s*=\s*1", PatternScope::Everywhere),
    ("OR '1'='1'", r"OR\s+'1'\s*=\s*'1'", PatternScope::Everywhere),
    ("EXEC", r"\bEXEC(UTE)?\s*\(", PatternScope::Everywhere),
    ("EXECUTE IMMEDIATE", r"\bEXECUTE\s+IMMEDIATE\b", PatternScope::Everywhere),
    ("xp_cmdshell", r"xp_cmdshell", PatternScope::Everywhere),
    ("sp_configure", r"sp_configure", PatternScope::Everywhere),
    ("sp_addextendedproc", r"sp_addextendedproc", PatternScope::Everywhere),
    (
        "sp_execute_external_script",
        r"sp_execute_external_script",
        PatternScope::Everywhere,
    ),
    ("OPENDATASOURCE", r"\bOPENDATASOURCE\b", PatternScope::Everywhere),
    ("OPENROWSET BULK", r"\bOPENROWSET\s*\(\s*BULK\b", PatternScope::Everywhere),
];

/// An ordered set of dangerous patterns.
#[derive(Debug, Clone)]
pub struct DenyList {
    patterns: Vec<DenyPattern>,
}

impl DenyList {
    /// Creates an empty deny-list.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Creates the deny-list seeded with the built-in injection patterns.
    ///
    /// # Panics
    ///
    /// Panics if a built-in pattern fails to compile, which is a programming error.
    #[must_use]
    pub fn seeded() -> Self {
        let patterns = SEEDED
            .iter()
            .map(|(name, pattern, scope)| {
                DenyPattern::new(*name, pattern, *scope).expect("Invalid built-in deny pattern")
            })
            .collect();
        Self { patterns }
    }

    /// Adds a pattern.
    #[must_use]
    pub fn with_pattern(mut self, pattern: DenyPattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    /// Returns the patterns in evaluation order.
    #[must_use]
    pub fn patterns(&self) -> &[DenyPattern] {
        &self.patterns
    }

    /// Returns the name of the first pattern enforced in `context` that matches `text`.
    #[must_use]
    pub fn first_match(&self, text: &str, context: PatternScope) -> Option<&str> {
        self.patterns
            .iter()
            .filter(|p| p.scope >= context)
            .find(|p| p.is_match(text))
            .map(DenyPattern::name)
    }
}

impl Default for DenyList {
    fn default() -> Self {
        Self::seeded()
    }
}

/// Returns true when `sql` holds a second statement after a `;`.
///
/// Terminators inside string literals, quoted or bracketed identifiers, and
/// comments are ignored. A single trailing terminator is accepted.
#[must_use]
pub fn has_stacked_statement(sql: &str) -> bool {
    let mut chars = sql.chars().peekable();
    let mut seen_terminator = false;

    while let Some(c) = chars.next() {
        if seen_terminator && !c.is_whitespace() && c != ';' {
            return true;
        }
        match c {
            '\'' | '"' => {
                let close = c;
                while let Some(inner) = chars.next() {
                    if inner == close {
                        // Doubled delimiter is an escape, stay inside.
                        if chars.peek() == Some(&close) {
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
            }
            '[' => {
                for inner in chars.by_ref() {
                    if inner == ']' {
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                for inner in chars.by_ref() {
                    if inner == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for inner in chars.by_ref() {
                    if prev == '*' && inner == '/' {
                        break;
                    }
                    prev = inner;
                }
            }
            ';' => seen_terminator = true,
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_patterns_compile() {
        let list = DenyList::seeded();
        assert_eq!(list.patterns().len(), SEEDED.len());
    }

    #[test]
    fn test_fragment_context_sees_all_patterns() {
        let list = DenyList::seeded();
        assert_eq!(
            list.first_match("name; x", PatternScope::Fragment),
            Some("statement terminator")
        );
        assert_eq!(
            list.first_match("a OR 1=1", PatternScope::Fragment),
            Some("OR 1=1")
        );
        assert_eq!(list.first_match("dropzone", PatternScope::Fragment), Some("DROP"));
    }

    #[test]
    fn test_raw_context_ignores_fragment_patterns() {
        let list = DenyList::seeded();
        assert_eq!(
            list.first_match("DROP TABLE old_stuff", PatternScope::Everywhere),
            None
        );
        assert_eq!(
            list.first_match("EXEC xp_cmdshell 'dir'", PatternScope::Everywhere),
            Some("xp_cmdshell")
        );
    }

    #[test]
    fn test_query_context_rejects_comments() {
        let list = DenyList::seeded();
        assert_eq!(
            list.first_match("SELECT 1 -- hidden", PatternScope::Query),
            Some("line comment")
        );
        assert_eq!(
            list.first_match("SELECT * FROM dropoffs", PatternScope::Query),
            None
        );
    }

    #[test]
    fn test_custom_pattern() {
        let list = DenyList::empty().with_pattern(
            DenyPattern::new("waitfor", r"WAITFOR\s+DELAY", PatternScope::Everywhere).unwrap(),
        );
        assert_eq!(
            list.first_match("waitfor delay '0:0:5'", PatternScope::Fragment),
            Some("waitfor")
        );
    }

    #[test]
    fn test_invalid_custom_pattern() {
        assert!(DenyPattern::new("bad", "(", PatternScope::Fragment).is_err());
    }

    #[test]
    fn test_stacked_statements() {
        assert!(has_stacked_statement("SELECT 1; DROP TABLE x"));
        assert!(has_stacked_statement("SELECT 1;SELECT 2"));
        assert!(!has_stacked_statement("SELECT 1;"));
        assert!(!has_stacked_statement("SELECT 1 ;  \n"));
        assert!(!has_stacked_statement("SELECT 'a;b' AS x"));
        assert!(!has_stacked_statement("SELECT 'it''s; fine'"));
        assert!(!has_stacked_statement("SELECT [odd;name] FROM t"));
        assert!(!has_stacked_statement("SELECT 1 -- trailing; comment"));
        assert!(!has_stacked_statement("SELECT /* ; */ 1"));
    }
}
