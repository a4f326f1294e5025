//! Database operations.
//!
//! An [`Operation`] describes one statement to generate. Operations are plain
//! values: they hold no connection or execution state, and the ones with
//! shape invariants can only be obtained through a builder that checks them.
//! Identifiers and expressions inside are not validated here; that happens
//! when a dialect compiles the operation.

mod column;
mod ddl;
mod dml;
mod value;

use std::fmt;

use serde::Deserialize;

pub use column::ColumnDefinition;
pub use ddl::{
    CreateOrAlterViewOp, CreateSchemaOp, CreateStatisticsBuilder, CreateStatisticsOp,
    CreateTableBuilder, CreateTableOp, DropBehavior, DropSchemaOp, DropTableOp, DropViewOp,
    FileFormat, Sampling, TableDefinition,
};
pub use dml::{
    CopyOp, DeleteOp, ExecuteSqlOp, InsertBuilder, InsertMode, InsertOp, InsertSource, MergeBuilder,
    MergeOp, SelectBuilder, SelectOp, UpdateBuilder, UpdateOp,
};
pub use value::{Assignment, Value};

/// A schema-qualified object name, before prefixing and quoting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct ObjectRef {
    /// Schema name.
    pub schema_name: String,
    /// Table or view name.
    pub object_name: String,
}

impl ObjectRef {
    /// Creates an object reference.
    #[must_use]
    pub fn new(schema_name: impl Into<String>, object_name: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
            object_name: object_name.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema_name, self.object_name)
    }
}

/// Variant tag of an [`Operation`], used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    CreateTable,
    DropTable,
    CreateSchema,
    DropSchema,
    Select,
    Insert,
    Update,
    Delete,
    Merge,
    Copy,
    CreateOrAlterView,
    DropView,
    CreateStatistics,
    ExecuteSql,
}

impl OperationKind {
    /// All operation kinds, in declaration order.
    pub const ALL: [Self; 14] = [
        Self::CreateTable,
        Self::DropTable,
        Self::CreateSchema,
        Self::DropSchema,
        Self::Select,
        Self::Insert,
        Self::Update,
        Self::Delete,
        Self::Merge,
        Self::Copy,
        Self::CreateOrAlterView,
        Self::DropView,
        Self::CreateStatistics,
        Self::ExecuteSql,
    ];

    /// Returns the variant name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateTable => "CreateTable",
            Self::DropTable => "DropTable",
            Self::CreateSchema => "CreateSchema",
            Self::DropSchema => "DropSchema",
            Self::Select => "Select",
            Self::Insert => "Insert",
            Self::Update => "Update",
            Self::Delete => "Delete",
            Self::Merge => "Merge",
            Self::Copy => "Copy",
            Self::CreateOrAlterView => "CreateOrAlterView",
            Self::DropView => "DropView",
            Self::CreateStatistics => "CreateStatistics",
            Self::ExecuteSql => "ExecuteSql",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All supported operations.
///
/// Deserializes from an object tagged with `type`, e.g.
/// `{"type": "drop_table", "target": {...}}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Create a table.
    CreateTable(CreateTableOp),
    /// Drop a table.
    DropTable(DropTableOp),
    /// Create a schema.
    CreateSchema(CreateSchemaOp),
    /// Drop a schema.
    DropSchema(DropSchemaOp),
    /// Query a table.
    Select(SelectOp),
    /// Insert rows.
    Insert(InsertOp),
    /// Update rows.
    Update(UpdateOp),
    /// Delete rows.
    Delete(DeleteOp),
    /// Merge a source into a table.
    Merge(MergeOp),
    /// Bulk load files into a table.
    Copy(CopyOp),
    /// Create or replace a view.
    CreateOrAlterView(CreateOrAlterViewOp),
    /// Drop a view.
    DropView(DropViewOp),
    /// Create single-column statistics.
    CreateStatistics(CreateStatisticsOp),
    /// Run caller-supplied SQL.
    ExecuteSql(ExecuteSqlOp),
}

impl Operation {
    /// Returns the variant tag.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::CreateTable(_) => OperationKind::CreateTable,
            Self::DropTable(_) => OperationKind::DropTable,
            Self::CreateSchema(_) => OperationKind::CreateSchema,
            Self::DropSchema(_) => OperationKind::DropSchema,
            Self::Select(_) => OperationKind::Select,
            Self::Insert(_) => OperationKind::Insert,
            Self::Update(_) => OperationKind::Update,
            Self::Delete(_) => OperationKind::Delete,
            Self::Merge(_) => OperationKind::Merge,
            Self::Copy(_) => OperationKind::Copy,
            Self::CreateOrAlterView(_) => OperationKind::CreateOrAlterView,
            Self::DropView(_) => OperationKind::DropView,
            Self::CreateStatistics(_) => OperationKind::CreateStatistics,
            Self::ExecuteSql(_) => OperationKind::ExecuteSql,
        }
    }

    /// Returns the object the operation acts on.
    ///
    /// Schema operations and raw SQL have no object and return `None`.
    #[must_use]
    pub const fn target(&self) -> Option<&ObjectRef> {
        match self {
            Self::CreateTable(op) => Some(op.target()),
            Self::DropTable(op) => Some(&op.target),
            Self::Select(op) => Some(op.target()),
            Self::Insert(op) => Some(op.target()),
            Self::Update(op) => Some(op.target()),
            Self::Delete(op) => Some(&op.target),
            Self::Merge(op) => Some(op.target()),
            Self::Copy(op) => Some(&op.target),
            Self::CreateOrAlterView(op) => Some(&op.target),
            Self::DropView(op) => Some(&op.target),
            Self::CreateStatistics(op) => Some(op.target()),
            Self::CreateSchema(_) | Self::DropSchema(_) | Self::ExecuteSql(_) => None,
        }
    }
}

macro_rules! impl_from_op {
    ($($op:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$op> for Operation {
                fn from(op: $op) -> Self {
                    Self::$variant(op)
                }
            }
        )*
    };
}

impl_from_op! {
    CreateTableOp => CreateTable,
    DropTableOp => DropTable,
    CreateSchemaOp => CreateSchema,
    DropSchemaOp => DropSchema,
    SelectOp => Select,
    InsertOp => Insert,
    UpdateOp => Update,
    DeleteOp => Delete,
    MergeOp => Merge,
    CopyOp => Copy,
    CreateOrAlterViewOp => CreateOrAlterView,
    DropViewOp => DropView,
    CreateStatisticsOp => CreateStatistics,
    ExecuteSqlOp => ExecuteSql,
}
