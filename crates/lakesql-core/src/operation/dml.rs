//! Data operations: queries, writes, merges, loads, and raw SQL.

use std::collections::BTreeMap;
use std::num::NonZeroU32;

use serde::Deserialize;

use super::ddl::{first_duplicate, FileFormat};
use super::value::{Assignment, Value};
use super::{ObjectRef, OperationKind};
use crate::error::{CompileError, Result};

/// SELECT from a single table.
///
/// An empty column list selects `*`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "SelectBuilder")]
pub struct SelectOp {
    target: ObjectRef,
    columns: Vec<String>,
    distinct: bool,
    join_clause: Option<String>,
    where_clause: Option<String>,
    group_by: Vec<String>,
    having_clause: Option<String>,
    order_by: Vec<String>,
    limit: Option<NonZeroU32>,
    offset: Option<u32>,
}

impl SelectOp {
    /// Starts building a SELECT.
    #[must_use]
    pub fn builder(schema_name: impl Into<String>, object_name: impl Into<String>) -> SelectBuilder {
        SelectBuilder::new(schema_name, object_name)
    }

    /// Returns the table queried.
    #[must_use]
    pub const fn target(&self) -> &ObjectRef {
        &self.target
    }

    /// Returns the selected columns; empty means all.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns whether duplicates are removed.
    #[must_use]
    pub const fn distinct(&self) -> bool {
        self.distinct
    }

    /// Returns the JOIN clause, if any.
    #[must_use]
    pub fn join_clause(&self) -> Option<&str> {
        self.join_clause.as_deref()
    }

    /// Returns the WHERE condition, if any.
    #[must_use]
    pub fn where_clause(&self) -> Option<&str> {
        self.where_clause.as_deref()
    }

    /// Returns the GROUP BY columns.
    #[must_use]
    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    /// Returns the HAVING condition, if any.
    #[must_use]
    pub fn having_clause(&self) -> Option<&str> {
        self.having_clause.as_deref()
    }

    /// Returns the ORDER BY terms.
    #[must_use]
    pub fn order_by(&self) -> &[String] {
        &self.order_by
    }

    /// Returns the row limit, if any.
    #[must_use]
    pub const fn limit(&self) -> Option<NonZeroU32> {
        self.limit
    }

    /// Returns the number of rows skipped, if any.
    #[must_use]
    pub const fn offset(&self) -> Option<u32> {
        self.offset
    }
}

/// Builder for [`SelectOp`].
#[derive(Debug, Clone, Deserialize)]
pub struct SelectBuilder {
    target: ObjectRef,
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    distinct: bool,
    #[serde(default)]
    join_clause: Option<String>,
    #[serde(default)]
    where_clause: Option<String>,
    #[serde(default)]
    group_by: Vec<String>,
    #[serde(default)]
    having_clause: Option<String>,
    #[serde(default)]
    order_by: Vec<String>,
    #[serde(default)]
    limit: Option<NonZeroU32>,
    #[serde(default)]
    offset: Option<u32>,
}

impl SelectBuilder {
    /// Creates a builder selecting all columns of the given table.
    #[must_use]
    pub fn new(schema_name: impl Into<String>, object_name: impl Into<String>) -> Self {
        Self {
            target: ObjectRef::new(schema_name, object_name),
            columns: Vec::new(),
            distinct: false,
            join_clause: None,
            where_clause: None,
            group_by: Vec::new(),
            having_clause: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Sets the selected columns.
    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Removes duplicate rows.
    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Adds a JOIN clause.
    #[must_use]
    pub fn join(mut self, clause: impl Into<String>) -> Self {
        self.join_clause = Some(clause.into());
        self
    }

    /// Sets the WHERE condition.
    #[must_use]
    pub fn filter(mut self, condition: impl Into<String>) -> Self {
        self.where_clause = Some(condition.into());
        self
    }

    /// Sets the GROUP BY columns.
    #[must_use]
    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the HAVING condition.
    #[must_use]
    pub fn having(mut self, condition: impl Into<String>) -> Self {
        self.having_clause = Some(condition.into());
        self
    }

    /// Sets the ORDER BY terms, such as `created_at DESC`.
    #[must_use]
    pub fn order_by<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_by = terms.into_iter().map(Into::into).collect();
        self
    }

    /// Limits the number of rows returned.
    #[must_use]
    pub fn limit(mut self, limit: NonZeroU32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the given number of rows.
    #[must_use]
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Builds the operation.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::MalformedOperation`] if HAVING is set without
    /// GROUP BY.
    pub fn build(self) -> Result<SelectOp> {
        if self.having_clause.is_some() && self.group_by.is_empty() {
            return Err(CompileError::malformed(
                OperationKind::Select,
                "HAVING requires GROUP BY",
            ));
        }
        Ok(SelectOp {
            target: self.target,
            columns: self.columns,
            distinct: self.distinct,
            join_clause: self.join_clause,
            where_clause: self.where_clause,
            group_by: self.group_by,
            having_clause: self.having_clause,
            order_by: self.order_by,
            limit: self.limit,
            offset: self.offset,
        })
    }
}

impl TryFrom<SelectBuilder> for SelectOp {
    type Error = CompileError;

    fn try_from(builder: SelectBuilder) -> Result<Self> {
        builder.build()
    }
}

/// Whether INSERT adds to or replaces the table contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertMode {
    /// INSERT INTO.
    #[default]
    Append,
    /// INSERT OVERWRITE.
    Overwrite,
}

/// Where inserted rows come from.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    /// A query.
    Query(String),
    /// Literal rows.
    Values(Vec<Vec<Value>>),
}

/// INSERT from a query or literal rows.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "InsertBuilder")]
pub struct InsertOp {
    target: ObjectRef,
    columns: Vec<String>,
    source: InsertSource,
    mode: InsertMode,
}

impl InsertOp {
    /// Starts building an INSERT.
    #[must_use]
    pub fn builder(schema_name: impl Into<String>, object_name: impl Into<String>) -> InsertBuilder {
        InsertBuilder::new(schema_name, object_name)
    }

    /// Returns the table written to.
    #[must_use]
    pub const fn target(&self) -> &ObjectRef {
        &self.target
    }

    /// Returns the target columns; empty means positional.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the row source.
    #[must_use]
    pub const fn source(&self) -> &InsertSource {
        &self.source
    }

    /// Returns the insert mode.
    #[must_use]
    pub const fn mode(&self) -> InsertMode {
        self.mode
    }
}

/// Builder for [`InsertOp`].
#[derive(Debug, Clone, Deserialize)]
pub struct InsertBuilder {
    target: ObjectRef,
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    source_query: Option<String>,
    #[serde(default)]
    values: Option<Vec<Vec<Value>>>,
    #[serde(default)]
    mode: InsertMode,
}

impl InsertBuilder {
    /// Creates a builder for the given table.
    #[must_use]
    pub fn new(schema_name: impl Into<String>, object_name: impl Into<String>) -> Self {
        Self {
            target: ObjectRef::new(schema_name, object_name),
            columns: Vec::new(),
            source_query: None,
            values: None,
            mode: InsertMode::Append,
        }
    }

    /// Sets the target columns.
    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Inserts the result of a query.
    #[must_use]
    pub fn query(mut self, sql: impl Into<String>) -> Self {
        self.source_query = Some(sql.into());
        self
    }

    /// Adds a literal row.
    #[must_use]
    pub fn row<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.values
            .get_or_insert_with(Vec::new)
            .push(values.into_iter().map(Into::into).collect());
        self
    }

    /// Replaces the table contents instead of appending.
    #[must_use]
    pub fn overwrite(mut self) -> Self {
        self.mode = InsertMode::Overwrite;
        self
    }

    /// Builds the operation.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::MalformedOperation`] unless exactly one of a
    /// query or literal rows was given, or if rows are empty or their width
    /// does not match the column list.
    pub fn build(self) -> Result<InsertOp> {
        let malformed = |message: String| CompileError::malformed(OperationKind::Insert, message);
        if let Some(dup) = first_duplicate(self.columns.iter().map(String::as_str)) {
            return Err(malformed(format!("duplicate column '{dup}'")));
        }
        let source = match (self.source_query, self.values) {
            (Some(_), Some(_)) => {
                return Err(malformed(
                    "a source query and literal values are mutually exclusive".into(),
                ))
            }
            (None, None) => {
                return Err(malformed(
                    "either a source query or literal values is required".into(),
                ))
            }
            (Some(query), None) => InsertSource::Query(query),
            (None, Some(rows)) => {
                let Some(first) = rows.first() else {
                    return Err(malformed("values must contain at least one row".into()));
                };
                let width = if self.columns.is_empty() {
                    first.len()
                } else {
                    self.columns.len()
                };
                if width == 0 {
                    return Err(malformed("rows must not be empty".into()));
                }
                if let Some((index, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
                    return Err(malformed(format!(
                        "row {index} has {} values, expected {width}",
                        row.len()
                    )));
                }
                InsertSource::Values(rows)
            }
        };
        Ok(InsertOp {
            target: self.target,
            columns: self.columns,
            source,
            mode: self.mode,
        })
    }
}

impl TryFrom<InsertBuilder> for InsertOp {
    type Error = CompileError;

    fn try_from(builder: InsertBuilder) -> Result<Self> {
        builder.build()
    }
}

/// UPDATE with an ordered SET list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "UpdateBuilder")]
pub struct UpdateOp {
    target: ObjectRef,
    assignments: Vec<Assignment>,
    where_clause: Option<String>,
    from_clause: Option<String>,
}

impl UpdateOp {
    /// Starts building an UPDATE.
    #[must_use]
    pub fn builder(schema_name: impl Into<String>, object_name: impl Into<String>) -> UpdateBuilder {
        UpdateBuilder::new(schema_name, object_name)
    }

    /// Returns the table updated.
    #[must_use]
    pub const fn target(&self) -> &ObjectRef {
        &self.target
    }

    /// Returns the assignments in emission order.
    #[must_use]
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Returns the WHERE condition, if any.
    #[must_use]
    pub fn where_clause(&self) -> Option<&str> {
        self.where_clause.as_deref()
    }

    /// Returns the FROM clause used to join other tables, if any.
    #[must_use]
    pub fn from_clause(&self) -> Option<&str> {
        self.from_clause.as_deref()
    }
}

/// Builder for [`UpdateOp`].
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateBuilder {
    target: ObjectRef,
    #[serde(default)]
    assignments: Vec<Assignment>,
    #[serde(default)]
    where_clause: Option<String>,
    #[serde(default)]
    from_clause: Option<String>,
}

impl UpdateBuilder {
    /// Creates a builder for the given table.
    #[must_use]
    pub fn new(schema_name: impl Into<String>, object_name: impl Into<String>) -> Self {
        Self {
            target: ObjectRef::new(schema_name, object_name),
            assignments: Vec::new(),
            where_clause: None,
            from_clause: None,
        }
    }

    /// Adds a `column = value` assignment.
    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.assignments.push(Assignment::new(column, value));
        self
    }

    /// Sets the WHERE condition.
    #[must_use]
    pub fn filter(mut self, condition: impl Into<String>) -> Self {
        self.where_clause = Some(condition.into());
        self
    }

    /// Sets a FROM clause for joined updates.
    #[must_use]
    pub fn from_clause(mut self, clause: impl Into<String>) -> Self {
        self.from_clause = Some(clause.into());
        self
    }

    /// Builds the operation.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::MalformedOperation`] if there are no
    /// assignments or a column is assigned twice.
    pub fn build(self) -> Result<UpdateOp> {
        if self.assignments.is_empty() {
            return Err(CompileError::malformed(
                OperationKind::Update,
                "at least one assignment is required",
            ));
        }
        if let Some(dup) = first_duplicate(self.assignments.iter().map(|a| a.column.as_str())) {
            return Err(CompileError::malformed(
                OperationKind::Update,
                format!("column '{dup}' is assigned more than once"),
            ));
        }
        Ok(UpdateOp {
            target: self.target,
            assignments: self.assignments,
            where_clause: self.where_clause,
            from_clause: self.from_clause,
        })
    }
}

impl TryFrom<UpdateBuilder> for UpdateOp {
    type Error = CompileError;

    fn try_from(builder: UpdateBuilder) -> Result<Self> {
        builder.build()
    }
}

/// DELETE, optionally filtered.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeleteOp {
    /// Table deleted from.
    pub target: ObjectRef,
    /// Rows to delete; `None` deletes every row.
    #[serde(default)]
    pub where_clause: Option<String>,
}

impl DeleteOp {
    /// Creates a DELETE of every row.
    #[must_use]
    pub fn new(schema_name: impl Into<String>, object_name: impl Into<String>) -> Self {
        Self {
            target: ObjectRef::new(schema_name, object_name),
            where_clause: None,
        }
    }

    /// Restricts the rows deleted.
    #[must_use]
    pub fn filter(mut self, condition: impl Into<String>) -> Self {
        self.where_clause = Some(condition.into());
        self
    }
}

/// MERGE a source query into a table on key columns.
///
/// The source is aliased `source` and the table `target`; actions name
/// columns present on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "MergeBuilder")]
pub struct MergeOp {
    target: ObjectRef,
    source_query: String,
    match_keys: Vec<String>,
    update_columns: Vec<String>,
    insert_columns: Vec<String>,
    delete_condition: Option<String>,
    delete_not_matched_by_source: bool,
}

impl MergeOp {
    /// Starts building a MERGE.
    #[must_use]
    pub fn builder(
        schema_name: impl Into<String>,
        object_name: impl Into<String>,
        source_query: impl Into<String>,
    ) -> MergeBuilder {
        MergeBuilder::new(schema_name, object_name, source_query)
    }

    /// Returns the table merged into.
    #[must_use]
    pub const fn target(&self) -> &ObjectRef {
        &self.target
    }

    /// Returns the source query.
    #[must_use]
    pub fn source_query(&self) -> &str {
        &self.source_query
    }

    /// Returns the columns rows are matched on.
    #[must_use]
    pub fn match_keys(&self) -> &[String] {
        &self.match_keys
    }

    /// Returns the columns updated on match.
    #[must_use]
    pub fn update_columns(&self) -> &[String] {
        &self.update_columns
    }

    /// Returns the columns inserted when the source row has no match.
    #[must_use]
    pub fn insert_columns(&self) -> &[String] {
        &self.insert_columns
    }

    /// Returns the condition under which matched rows are deleted.
    #[must_use]
    pub fn delete_condition(&self) -> Option<&str> {
        self.delete_condition.as_deref()
    }

    /// Returns whether target rows absent from the source are deleted.
    #[must_use]
    pub const fn delete_not_matched_by_source(&self) -> bool {
        self.delete_not_matched_by_source
    }
}

/// Builder for [`MergeOp`].
#[derive(Debug, Clone, Deserialize)]
pub struct MergeBuilder {
    target: ObjectRef,
    source_query: String,
    #[serde(default)]
    match_keys: Vec<String>,
    #[serde(default)]
    update_columns: Vec<String>,
    #[serde(default)]
    insert_columns: Vec<String>,
    #[serde(default)]
    delete_condition: Option<String>,
    #[serde(default)]
    delete_not_matched_by_source: bool,
}

impl MergeBuilder {
    /// Creates a builder merging `source_query` into the given table.
    #[must_use]
    pub fn new(
        schema_name: impl Into<String>,
        object_name: impl Into<String>,
        source_query: impl Into<String>,
    ) -> Self {
        Self {
            target: ObjectRef::new(schema_name, object_name),
            source_query: source_query.into(),
            match_keys: Vec::new(),
            update_columns: Vec::new(),
            insert_columns: Vec::new(),
            delete_condition: None,
            delete_not_matched_by_source: false,
        }
    }

    /// Sets the match-key columns.
    #[must_use]
    pub fn match_keys<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.match_keys = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the columns updated on match.
    #[must_use]
    pub fn update_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.update_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the columns inserted for unmatched source rows.
    #[must_use]
    pub fn insert_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Deletes matched rows satisfying `condition`.
    #[must_use]
    pub fn delete_when(mut self, condition: impl Into<String>) -> Self {
        self.delete_condition = Some(condition.into());
        self
    }

    /// Deletes target rows that have no source row.
    #[must_use]
    pub fn delete_not_matched_by_source(mut self) -> Self {
        self.delete_not_matched_by_source = true;
        self
    }

    /// Builds the operation.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::MalformedOperation`] if there are no match
    /// keys or no action.
    pub fn build(self) -> Result<MergeOp> {
        let malformed = |message: &str| CompileError::malformed(OperationKind::Merge, message);
        if self.match_keys.is_empty() {
            return Err(malformed("match key columns must not be empty"));
        }
        if self.update_columns.is_empty()
            && self.insert_columns.is_empty()
            && self.delete_condition.is_none()
            && !self.delete_not_matched_by_source
        {
            return Err(malformed("at least one merge action is required"));
        }
        Ok(MergeOp {
            target: self.target,
            source_query: self.source_query,
            match_keys: self.match_keys,
            update_columns: self.update_columns,
            insert_columns: self.insert_columns,
            delete_condition: self.delete_condition,
            delete_not_matched_by_source: self.delete_not_matched_by_source,
        })
    }
}

impl TryFrom<MergeBuilder> for MergeOp {
    type Error = CompileError;

    fn try_from(builder: MergeBuilder) -> Result<Self> {
        builder.build()
    }
}

/// Bulk load from storage into a table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CopyOp {
    /// Table loaded into.
    pub target: ObjectRef,
    /// Storage path or URL of the files.
    pub source_path: String,
    /// Format of the source files.
    #[serde(default)]
    pub file_format: Option<FileFormat>,
    /// Additional load options, emitted in key order.
    #[serde(default)]
    pub options: BTreeMap<String, Value>,
}

impl CopyOp {
    /// Creates a load of `source_path` into the given table.
    #[must_use]
    pub fn new(
        schema_name: impl Into<String>,
        object_name: impl Into<String>,
        source_path: impl Into<String>,
    ) -> Self {
        Self {
            target: ObjectRef::new(schema_name, object_name),
            source_path: source_path.into(),
            file_format: None,
            options: BTreeMap::new(),
        }
    }

    /// Sets the source file format.
    #[must_use]
    pub fn file_format(mut self, file_format: FileFormat) -> Self {
        self.file_format = Some(file_format);
        self
    }

    /// Adds a load option such as `FIRSTROW = 2`.
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// Caller-supplied SQL, checked against the deny-list but otherwise passed through.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "ExecuteSqlBuilder")]
pub struct ExecuteSqlOp {
    sql: String,
    trusted_script: bool,
    row_limit: Option<NonZeroU32>,
}

impl ExecuteSqlOp {
    /// Creates a single-statement raw SQL operation.
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            trusted_script: false,
            row_limit: None,
        }
    }

    /// Creates a trusted script that may contain several statements.
    #[must_use]
    pub fn trusted_script(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            trusted_script: true,
            row_limit: None,
        }
    }

    /// Caps the rows returned by wrapping the query.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::MalformedOperation`] for trusted scripts and
    /// for text that is not a SELECT.
    pub fn with_row_limit(mut self, limit: NonZeroU32) -> Result<Self> {
        let malformed = |message: &str| CompileError::malformed(OperationKind::ExecuteSql, message);
        if self.trusted_script {
            return Err(malformed("a row limit cannot apply to a multi-statement script"));
        }
        if !starts_with_select(&self.sql) {
            return Err(malformed("a row limit requires a SELECT statement"));
        }
        self.row_limit = Some(limit);
        Ok(self)
    }

    /// Returns the SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Returns whether several statements are allowed.
    #[must_use]
    pub const fn is_trusted_script(&self) -> bool {
        self.trusted_script
    }

    /// Returns the row limit, if any.
    #[must_use]
    pub const fn row_limit(&self) -> Option<NonZeroU32> {
        self.row_limit
    }
}

fn starts_with_select(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("SELECT"))
}

#[derive(Debug, Deserialize)]
struct ExecuteSqlBuilder {
    sql: String,
    #[serde(default)]
    trusted_script: bool,
    #[serde(default)]
    row_limit: Option<NonZeroU32>,
}

impl TryFrom<ExecuteSqlBuilder> for ExecuteSqlOp {
    type Error = CompileError;

    fn try_from(builder: ExecuteSqlBuilder) -> Result<Self> {
        let op = Self {
            sql: builder.sql,
            trusted_script: builder.trusted_script,
            row_limit: None,
        };
        match builder.row_limit {
            Some(limit) => op.with_row_limit(limit),
            None => Ok(op),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn malformed_message(err: CompileError) -> String {
        match err {
            CompileError::MalformedOperation { message, .. } => message,
            other => panic!("Expected malformed operation, got {other:?}"),
        }
    }

    #[test]
    fn test_select_having_requires_group_by() {
        let err = SelectOp::builder("s", "t").having("COUNT(*) > 1").build().unwrap_err();
        assert!(malformed_message(err).contains("GROUP BY"));

        let op = SelectOp::builder("s", "t")
            .columns(["region"])
            .group_by(["region"])
            .having("COUNT(*) > 1")
            .build()
            .unwrap();
        assert_eq!(op.having_clause(), Some("COUNT(*) > 1"));
    }

    #[test]
    fn test_select_rejects_zero_limit_on_deserialize() {
        let err = serde_json::from_str::<SelectOp>(
            r#"{"target": {"schema_name": "s", "object_name": "t"}, "limit": 0}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_insert_requires_exactly_one_source() {
        let err = InsertOp::builder("s", "t").build().unwrap_err();
        assert!(malformed_message(err).contains("required"));

        let err = InsertOp::builder("s", "t")
            .query("SELECT 1")
            .row([1])
            .build()
            .unwrap_err();
        assert!(malformed_message(err).contains("mutually exclusive"));
    }

    #[test]
    fn test_insert_row_width() {
        let err = InsertOp::builder("s", "t")
            .columns(["a", "b"])
            .row([Value::from(1), Value::from(2)])
            .row([Value::from(3)])
            .build()
            .unwrap_err();
        assert_eq!(malformed_message(err), "row 1 has 1 values, expected 2");

        let op = InsertOp::builder("s", "t")
            .row([Value::from(1), Value::from("x")])
            .row([Value::from(2), Value::from("y")])
            .build()
            .unwrap();
        assert!(matches!(op.source(), InsertSource::Values(rows) if rows.len() == 2));
    }

    #[test]
    fn test_update_requires_assignments() {
        let err = UpdateOp::builder("s", "t").filter("id = 1").build().unwrap_err();
        assert!(malformed_message(err).contains("assignment"));

        let err = UpdateOp::builder("s", "t")
            .set("a", 1)
            .set("A", 2)
            .build()
            .unwrap_err();
        assert!(malformed_message(err).contains("more than once"));
    }

    #[test]
    fn test_merge_requires_keys_and_action() {
        let err = MergeOp::builder("s", "t", "SELECT * FROM x")
            .update_columns(["a"])
            .build()
            .unwrap_err();
        assert!(malformed_message(err).contains("match key"));

        let err = MergeOp::builder("s", "t", "SELECT * FROM x")
            .match_keys(["id"])
            .build()
            .unwrap_err();
        assert!(malformed_message(err).contains("action"));

        assert!(MergeOp::builder("s", "t", "SELECT * FROM x")
            .match_keys(["id"])
            .delete_not_matched_by_source()
            .build()
            .is_ok());
    }

    #[test]
    fn test_row_limit_requires_select() {
        let limit = NonZeroU32::new(10).unwrap();
        assert!(ExecuteSqlOp::new("  select * from t").with_row_limit(limit).is_ok());
        assert!(ExecuteSqlOp::new("DELETE FROM t").with_row_limit(limit).is_err());
        assert!(ExecuteSqlOp::trusted_script("SELECT 1; SELECT 2")
            .with_row_limit(limit)
            .is_err());
    }

    #[test]
    fn test_execute_sql_deserialize() {
        let op: ExecuteSqlOp =
            serde_json::from_str(r#"{"sql": "SELECT * FROM t", "row_limit": 5}"#).unwrap();
        assert_eq!(op.row_limit().map(NonZeroU32::get), Some(5));
        assert!(!op.is_trusted_script());

        assert!(
            serde_json::from_str::<ExecuteSqlOp>(r#"{"sql": "UPDATE t SET a = 1", "row_limit": 5}"#)
                .is_err()
        );
    }
}
