//! Schema-level operations: tables, schemas, views, and statistics.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::column::ColumnDefinition;
use super::{ObjectRef, OperationKind};
use crate::error::{CompileError, Result};

const fn default_true() -> bool {
    true
}

/// Storage file format of a table or a COPY source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// Apache Parquet.
    #[default]
    Parquet,
    /// Delimited text.
    Csv,
}

impl FileFormat {
    /// Returns the SQL keyword for this format.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Parquet => "PARQUET",
            Self::Csv => "CSV",
        }
    }
}

/// How a table gets its columns.
#[derive(Debug, Clone, PartialEq)]
pub enum TableDefinition {
    /// An explicit column list.
    Columns(Vec<ColumnDefinition>),
    /// Columns inferred from a query (CREATE TABLE ... AS SELECT).
    AsSelect(String),
}

/// CREATE TABLE, from a column list or a query.
///
/// Build with [`CreateTableOp::builder`]; exactly one of a column list or a
/// source query must be given.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "CreateTableBuilder")]
pub struct CreateTableOp {
    target: ObjectRef,
    definition: TableDefinition,
    location: Option<String>,
    file_format: FileFormat,
    partition_by: Vec<String>,
    cluster_by: Vec<String>,
    properties: BTreeMap<String, String>,
    if_not_exists: bool,
}

impl CreateTableOp {
    /// Starts building a CREATE TABLE operation.
    #[must_use]
    pub fn builder(schema_name: impl Into<String>, object_name: impl Into<String>) -> CreateTableBuilder {
        CreateTableBuilder::new(schema_name, object_name)
    }

    /// Returns the table being created.
    #[must_use]
    pub const fn target(&self) -> &ObjectRef {
        &self.target
    }

    /// Returns the column list or source query.
    #[must_use]
    pub const fn definition(&self) -> &TableDefinition {
        &self.definition
    }

    /// Returns the explicit storage location, if any.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Returns the storage file format.
    #[must_use]
    pub const fn file_format(&self) -> FileFormat {
        self.file_format
    }

    /// Returns the partition columns.
    #[must_use]
    pub fn partition_by(&self) -> &[String] {
        &self.partition_by
    }

    /// Returns the clustering columns.
    #[must_use]
    pub fn cluster_by(&self) -> &[String] {
        &self.cluster_by
    }

    /// Returns the table properties.
    #[must_use]
    pub const fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Returns whether creation is skipped when the table exists.
    #[must_use]
    pub const fn if_not_exists(&self) -> bool {
        self.if_not_exists
    }
}

/// Builder for [`CreateTableOp`].
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTableBuilder {
    target: ObjectRef,
    #[serde(default)]
    columns: Option<Vec<ColumnDefinition>>,
    #[serde(default)]
    as_select: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    file_format: FileFormat,
    #[serde(default)]
    partition_by: Vec<String>,
    #[serde(default)]
    cluster_by: Vec<String>,
    #[serde(default)]
    properties: BTreeMap<String, String>,
    #[serde(default)]
    if_not_exists: bool,
}

impl CreateTableBuilder {
    /// Creates a builder for the given table.
    #[must_use]
    pub fn new(schema_name: impl Into<String>, object_name: impl Into<String>) -> Self {
        Self {
            target: ObjectRef::new(schema_name, object_name),
            columns: None,
            as_select: None,
            location: None,
            file_format: FileFormat::default(),
            partition_by: Vec::new(),
            cluster_by: Vec::new(),
            properties: BTreeMap::new(),
            if_not_exists: false,
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.columns.get_or_insert_with(Vec::new).push(column);
        self
    }

    /// Adds several columns.
    #[must_use]
    pub fn columns(mut self, columns: impl IntoIterator<Item = ColumnDefinition>) -> Self {
        self.columns.get_or_insert_with(Vec::new).extend(columns);
        self
    }

    /// Sets the source query.
    #[must_use]
    pub fn as_select(mut self, select: impl Into<String>) -> Self {
        self.as_select = Some(select.into());
        self
    }

    /// Overrides the derived storage location.
    #[must_use]
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the storage file format.
    #[must_use]
    pub fn file_format(mut self, file_format: FileFormat) -> Self {
        self.file_format = file_format;
        self
    }

    /// Sets the partition columns.
    #[must_use]
    pub fn partition_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.partition_by = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the clustering columns.
    #[must_use]
    pub fn cluster_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cluster_by = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a table property.
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Skips creation when the table already exists.
    #[must_use]
    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    /// Builds the operation.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::MalformedOperation`] unless exactly one of a
    /// non-empty column list or a source query was given, or if two columns
    /// share a name.
    pub fn build(self) -> Result<CreateTableOp> {
        let malformed = |message: &str| CompileError::malformed(OperationKind::CreateTable, message);
        let definition = match (self.columns, self.as_select) {
            (Some(_), Some(_)) => {
                return Err(malformed(
                    "a column list and a source select are mutually exclusive",
                ))
            }
            (None, None) => return Err(malformed("either a column list or a source select is required")),
            (Some(columns), None) => {
                if columns.is_empty() {
                    return Err(malformed("column list must not be empty"));
                }
                if let Some(dup) = first_duplicate(columns.iter().map(|c| c.name.as_str())) {
                    return Err(malformed(&format!("duplicate column '{dup}'")));
                }
                TableDefinition::Columns(columns)
            }
            (None, Some(select)) => TableDefinition::AsSelect(select),
        };
        Ok(CreateTableOp {
            target: self.target,
            definition,
            location: self.location,
            file_format: self.file_format,
            partition_by: self.partition_by,
            cluster_by: self.cluster_by,
            properties: self.properties,
            if_not_exists: self.if_not_exists,
        })
    }
}

impl TryFrom<CreateTableBuilder> for CreateTableOp {
    type Error = CompileError;

    fn try_from(builder: CreateTableBuilder) -> Result<Self> {
        builder.build()
    }
}

/// Returns the first name that appears twice, ignoring case.
pub(crate) fn first_duplicate<'a>(mut names: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut seen = std::collections::BTreeSet::new();
    names.find(|name| !seen.insert(name.to_ascii_lowercase()))
}

/// DROP TABLE.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DropTableOp {
    /// Table to drop.
    pub target: ObjectRef,
    /// Whether a missing table is ignored.
    #[serde(default = "default_true")]
    pub if_exists: bool,
}

impl DropTableOp {
    /// Creates a DROP TABLE that ignores a missing table.
    #[must_use]
    pub fn new(schema_name: impl Into<String>, object_name: impl Into<String>) -> Self {
        Self {
            target: ObjectRef::new(schema_name, object_name),
            if_exists: true,
        }
    }

    /// Sets whether a missing table is ignored.
    #[must_use]
    pub fn if_exists(mut self, if_exists: bool) -> Self {
        self.if_exists = if_exists;
        self
    }
}

/// CREATE SCHEMA.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateSchemaOp {
    /// Schema to create.
    pub schema_name: String,
    /// Whether an existing schema is tolerated.
    #[serde(default = "default_true")]
    pub if_not_exists: bool,
    /// Owning principal.
    #[serde(default)]
    pub authorization: Option<String>,
}

impl CreateSchemaOp {
    /// Creates a CREATE SCHEMA that tolerates an existing schema.
    #[must_use]
    pub fn new(schema_name: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
            if_not_exists: true,
            authorization: None,
        }
    }

    /// Sets whether an existing schema is tolerated.
    #[must_use]
    pub fn if_not_exists(mut self, if_not_exists: bool) -> Self {
        self.if_not_exists = if_not_exists;
        self
    }

    /// Sets the owning principal.
    #[must_use]
    pub fn authorization(mut self, principal: impl Into<String>) -> Self {
        self.authorization = Some(principal.into());
        self
    }
}

/// What happens to objects inside a dropped schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropBehavior {
    /// Backend default.
    #[default]
    Default,
    /// Drop contained objects.
    Cascade,
    /// Refuse if the schema is not empty.
    Restrict,
}

/// DROP SCHEMA.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DropSchemaOp {
    /// Schema to drop.
    pub schema_name: String,
    /// Whether a missing schema is ignored.
    #[serde(default = "default_true")]
    pub if_exists: bool,
    /// Handling of contained objects.
    #[serde(default)]
    pub behavior: DropBehavior,
}

impl DropSchemaOp {
    /// Creates a DROP SCHEMA that ignores a missing schema.
    #[must_use]
    pub fn new(schema_name: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
            if_exists: true,
            behavior: DropBehavior::Default,
        }
    }

    /// Sets whether a missing schema is ignored.
    #[must_use]
    pub fn if_exists(mut self, if_exists: bool) -> Self {
        self.if_exists = if_exists;
        self
    }

    /// Sets the drop behavior.
    #[must_use]
    pub fn behavior(mut self, behavior: DropBehavior) -> Self {
        self.behavior = behavior;
        self
    }
}

/// CREATE OR ALTER VIEW.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateOrAlterViewOp {
    /// View to create or replace.
    pub target: ObjectRef,
    /// Query the view selects.
    pub select_query: String,
    /// Column aliases; empty to inherit the query's names.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Whether to bind the view to the schema of referenced objects.
    #[serde(default)]
    pub with_schemabinding: bool,
}

impl CreateOrAlterViewOp {
    /// Creates a view over `select_query`.
    #[must_use]
    pub fn new(
        schema_name: impl Into<String>,
        object_name: impl Into<String>,
        select_query: impl Into<String>,
    ) -> Self {
        Self {
            target: ObjectRef::new(schema_name, object_name),
            select_query: select_query.into(),
            columns: Vec::new(),
            with_schemabinding: false,
        }
    }

    /// Sets the column aliases.
    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Binds the view to the schema of the objects it references.
    #[must_use]
    pub fn with_schemabinding(mut self) -> Self {
        self.with_schemabinding = true;
        self
    }
}

/// DROP VIEW.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DropViewOp {
    /// View to drop.
    pub target: ObjectRef,
    /// Whether a missing view is ignored.
    #[serde(default = "default_true")]
    pub if_exists: bool,
}

impl DropViewOp {
    /// Creates a DROP VIEW that ignores a missing view.
    #[must_use]
    pub fn new(schema_name: impl Into<String>, object_name: impl Into<String>) -> Self {
        Self {
            target: ObjectRef::new(schema_name, object_name),
            if_exists: true,
        }
    }

    /// Sets whether a missing view is ignored.
    #[must_use]
    pub fn if_exists(mut self, if_exists: bool) -> Self {
        self.if_exists = if_exists;
        self
    }
}

/// How many rows CREATE STATISTICS reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Sampling {
    /// Backend default sample.
    #[default]
    Default,
    /// Every row.
    FullScan,
    /// A percentage of rows, 1 to 100.
    Percent(u8),
}

/// CREATE STATISTICS on a single column.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "CreateStatisticsBuilder")]
pub struct CreateStatisticsOp {
    target: ObjectRef,
    column: String,
    stats_name: Option<String>,
    sampling: Sampling,
}

impl CreateStatisticsOp {
    /// Starts building a CREATE STATISTICS operation.
    #[must_use]
    pub fn builder(
        schema_name: impl Into<String>,
        object_name: impl Into<String>,
    ) -> CreateStatisticsBuilder {
        CreateStatisticsBuilder::new(schema_name, object_name)
    }

    /// Returns the table the statistics cover.
    #[must_use]
    pub const fn target(&self) -> &ObjectRef {
        &self.target
    }

    /// Returns the column the statistics cover.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Returns the explicit statistics name, if any.
    #[must_use]
    pub fn stats_name(&self) -> Option<&str> {
        self.stats_name.as_deref()
    }

    /// Returns the sampling mode.
    #[must_use]
    pub const fn sampling(&self) -> Sampling {
        self.sampling
    }
}

/// Builder for [`CreateStatisticsOp`].
#[derive(Debug, Clone, Deserialize)]
pub struct CreateStatisticsBuilder {
    target: ObjectRef,
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    stats_name: Option<String>,
    #[serde(default)]
    with_fullscan: bool,
    #[serde(default)]
    sample_percent: Option<u8>,
}

impl CreateStatisticsBuilder {
    /// Creates a builder for statistics on the given table.
    #[must_use]
    pub fn new(schema_name: impl Into<String>, object_name: impl Into<String>) -> Self {
        Self {
            target: ObjectRef::new(schema_name, object_name),
            columns: Vec::new(),
            stats_name: None,
            with_fullscan: false,
            sample_percent: None,
        }
    }

    /// Adds a column. Exactly one is accepted.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self
    }

    /// Sets the statistics object name.
    #[must_use]
    pub fn stats_name(mut self, name: impl Into<String>) -> Self {
        self.stats_name = Some(name.into());
        self
    }

    /// Reads every row.
    #[must_use]
    pub fn with_fullscan(mut self) -> Self {
        self.with_fullscan = true;
        self
    }

    /// Reads the given percentage of rows.
    #[must_use]
    pub fn sample_percent(mut self, percent: u8) -> Self {
        self.sample_percent = Some(percent);
        self
    }

    /// Builds the operation.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::MalformedOperation`] unless exactly one column
    /// was given, or if full scan and sampling are combined, or if the
    /// sample percentage is outside 1 to 100.
    pub fn build(self) -> Result<CreateStatisticsOp> {
        let malformed =
            |message: &str| CompileError::malformed(OperationKind::CreateStatistics, message);
        let mut columns = self.columns;
        if columns.len() != 1 {
            return Err(malformed(&format!(
                "exactly one column is required, got {}",
                columns.len()
            )));
        }
        let sampling = match (self.with_fullscan, self.sample_percent) {
            (true, Some(_)) => {
                return Err(malformed("full scan and sample percent are mutually exclusive"))
            }
            (true, None) => Sampling::FullScan,
            (false, Some(p)) if p == 0 || p > 100 => {
                return Err(malformed("sample percent must be between 1 and 100"))
            }
            (false, Some(p)) => Sampling::Percent(p),
            (false, None) => Sampling::Default,
        };
        Ok(CreateStatisticsOp {
            target: self.target,
            column: columns.remove(0),
            stats_name: self.stats_name,
            sampling,
        })
    }
}

impl TryFrom<CreateStatisticsBuilder> for CreateStatisticsOp {
    type Error = CompileError;

    fn try_from(builder: CreateStatisticsBuilder) -> Result<Self> {
        builder.build()
    }
}
