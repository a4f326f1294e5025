//! Managed-table dialect.
//!
//! Tables are managed by the warehouse in an open table format. This dialect
//! supports the full set of operations: row-level writes, MERGE, bulk loads
//! with `COPY INTO`, and table maintenance.

use serde::Deserialize;

use super::{NamingRules, SqlDialect};
use crate::error::Result;
use crate::operation::{
    ColumnDefinition, CopyOp, CreateSchemaOp, CreateTableOp, DeleteOp, DropBehavior, DropSchemaOp,
    DropTableOp, FileFormat, InsertMode, InsertOp, InsertSource, MergeOp, ObjectRef, OperationKind,
    TableDefinition, UpdateOp,
};
use crate::validate::{quote_string, FragmentKind, Validator};

fn default_storage_format() -> String {
    "DELTA".to_string()
}

/// Backend options for the managed-table dialect.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManagedTableOptions {
    /// Table format named in `USING`.
    #[serde(default = "default_storage_format")]
    pub storage_format: String,
    /// Partition columns for tables that do not name their own.
    #[serde(default)]
    pub partition_columns: Vec<String>,
    /// Clustering columns for tables that do not name their own.
    #[serde(default)]
    pub cluster_columns: Vec<String>,
}

impl Default for ManagedTableOptions {
    fn default() -> Self {
        Self {
            storage_format: default_storage_format(),
            partition_columns: Vec::new(),
            cluster_columns: Vec::new(),
        }
    }
}

/// Managed-table dialect.
#[derive(Debug, Clone)]
pub struct ManagedTableDialect {
    naming: NamingRules,
    validator: Validator,
    options: ManagedTableOptions,
}

impl ManagedTableDialect {
    /// Dialect name.
    pub const NAME: &'static str = "managed-table";

    /// Creates the dialect with the seeded validator.
    #[must_use]
    pub fn new(naming: NamingRules, options: ManagedTableOptions) -> Self {
        Self {
            naming,
            validator: Validator::new(),
            options,
        }
    }

    /// Replaces the validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Returns the backend options.
    #[must_use]
    pub const fn options(&self) -> &ManagedTableOptions {
        &self.options
    }

    /// Generates `OPTIMIZE <table>`, with `ZORDER BY` when columns are given.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an invalid table or column name.
    pub fn optimize_table(&self, target: &ObjectRef, zorder_by: &[String]) -> Result<String> {
        let mut sql = format!("OPTIMIZE {}", self.qualified_name(target, FragmentKind::Table)?);
        if !zorder_by.is_empty() {
            sql.push_str(&format!(" ZORDER BY ({})", self.column_list("zorder_by", zorder_by)?));
        }
        Ok(sql)
    }

    /// Generates `VACUUM <table>`, with `RETAIN n HOURS` when given.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an invalid table name.
    pub fn vacuum_table(&self, target: &ObjectRef, retain_hours: Option<u32>) -> Result<String> {
        let mut sql = format!("VACUUM {}", self.qualified_name(target, FragmentKind::Table)?);
        if let Some(hours) = retain_hours {
            sql.push_str(&format!(" RETAIN {hours} HOURS"));
        }
        Ok(sql)
    }

    fn column_definition(&self, index: usize, column: &ColumnDefinition) -> Result<String> {
        if column.check.is_some() {
            return Err(self.unsupported_feature(OperationKind::CreateTable, "CHECK constraint"));
        }
        let mut def = self.column_head(index, column)?;
        if let Some(default) = &column.default {
            def.push_str(" DEFAULT ");
            def.push_str(&self.render_value(&format!("columns[{index}].default"), default)?);
        }
        // Constraints are informational only; the engine does not enforce them.
        if column.primary_key {
            def.push_str(" PRIMARY KEY NONCLUSTERED NOT ENFORCED");
        }
        if column.unique {
            def.push_str(" UNIQUE NOT ENFORCED");
        }
        Ok(def)
    }
}

impl SqlDialect for ManagedTableDialect {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn naming(&self) -> &NamingRules {
        &self.naming
    }

    fn validator(&self) -> &Validator {
        &self.validator
    }

    fn create_table(&self, op: &CreateTableOp) -> Result<String> {
        if op.file_format() != FileFormat::Parquet {
            return Err(self.unsupported_feature(OperationKind::CreateTable, "file format"));
        }
        let mut sql = String::from("CREATE TABLE ");
        if op.if_not_exists() {
            sql.push_str("IF NOT EXISTS ");
        }
        sql.push_str(&self.qualified_name(op.target(), FragmentKind::Table)?);

        if let TableDefinition::Columns(columns) = op.definition() {
            let defs = columns
                .iter()
                .enumerate()
                .map(|(i, c)| self.column_definition(i, c))
                .collect::<Result<Vec<_>>>()?;
            sql.push_str(&format!(" ({})", defs.join(", ")));
        }

        let storage_format = self.identifier(
            "options.storage_format",
            &self.options.storage_format,
            FragmentKind::StorageFormat,
        )?;
        sql.push_str(&format!(" USING {storage_format}"));

        let (partition_field, partition_by) = if op.partition_by().is_empty() {
            ("options.partition_columns", self.options.partition_columns.as_slice())
        } else {
            ("partition_by", op.partition_by())
        };
        if !partition_by.is_empty() {
            sql.push_str(&format!(
                " PARTITIONED BY ({})",
                self.column_list(partition_field, partition_by)?
            ));
        }
        let (cluster_field, cluster_by) = if op.cluster_by().is_empty() {
            ("options.cluster_columns", self.options.cluster_columns.as_slice())
        } else {
            ("cluster_by", op.cluster_by())
        };
        if !cluster_by.is_empty() {
            sql.push_str(&format!(
                " CLUSTER BY ({})",
                self.column_list(cluster_field, cluster_by)?
            ));
        }

        if let Some(location) = op.location() {
            sql.push_str(&format!(" LOCATION {}", self.path_literal("location", location)?));
        }
        if !op.properties().is_empty() {
            let properties = op
                .properties()
                .iter()
                .map(|(k, v)| format!("{} = {}", quote_string(k), quote_string(v)))
                .collect::<Vec<_>>();
            sql.push_str(&format!(" TBLPROPERTIES ({})", properties.join(", ")));
        }
        if let TableDefinition::AsSelect(select) = op.definition() {
            sql.push_str(" AS ");
            sql.push_str(&self.query("as_select", select)?);
        }
        Ok(sql)
    }

    fn drop_table(&self, op: &DropTableOp) -> Result<String> {
        let name = self.qualified_name(&op.target, FragmentKind::Table)?;
        Ok(if op.if_exists {
            format!("DROP TABLE IF EXISTS {name}")
        } else {
            format!("DROP TABLE {name}")
        })
    }

    fn create_schema(&self, op: &CreateSchemaOp) -> Result<String> {
        let mut sql = String::from("CREATE SCHEMA ");
        if op.if_not_exists {
            sql.push_str("IF NOT EXISTS ");
        }
        sql.push_str(&self.quote_identifier("schema_name", &op.schema_name, FragmentKind::Schema)?);
        if let Some(principal) = &op.authorization {
            sql.push_str(" AUTHORIZATION ");
            sql.push_str(&self.quote_identifier("authorization", principal, FragmentKind::Principal)?);
        }
        Ok(sql)
    }

    fn drop_schema(&self, op: &DropSchemaOp) -> Result<String> {
        let mut sql = String::from("DROP SCHEMA ");
        if op.if_exists {
            sql.push_str("IF EXISTS ");
        }
        sql.push_str(&self.quote_identifier("schema_name", &op.schema_name, FragmentKind::Schema)?);
        match op.behavior {
            DropBehavior::Default => {}
            DropBehavior::Cascade => sql.push_str(" CASCADE"),
            DropBehavior::Restrict => sql.push_str(" RESTRICT"),
        }
        Ok(sql)
    }

    fn insert(&self, op: &InsertOp) -> Result<String> {
        let mut sql = match op.mode() {
            InsertMode::Append => String::from("INSERT INTO "),
            InsertMode::Overwrite => String::from("INSERT OVERWRITE "),
        };
        sql.push_str(&self.qualified_name(op.target(), FragmentKind::Table)?);
        if !op.columns().is_empty() {
            sql.push_str(&format!(" ({})", self.column_list("columns", op.columns())?));
        }
        match op.source() {
            InsertSource::Query(query) => {
                sql.push(' ');
                sql.push_str(&self.query("source_query", query)?);
            }
            InsertSource::Values(rows) => {
                let rows = rows
                    .iter()
                    .enumerate()
                    .map(|(i, row)| self.value_list(&format!("values[{i}]"), row))
                    .collect::<Result<Vec<_>>>()?;
                sql.push_str(" VALUES ");
                sql.push_str(&rows.join(", "));
            }
        }
        Ok(sql)
    }

    fn update(&self, op: &UpdateOp) -> Result<String> {
        let mut sql = format!(
            "UPDATE {} SET {}",
            self.qualified_name(op.target(), FragmentKind::Table)?,
            self.set_clause(op.assignments())?
        );
        if let Some(from) = op.from_clause() {
            sql.push_str(" FROM ");
            sql.push_str(&self.query("from_clause", from)?);
        }
        if let Some(condition) = op.where_clause() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.expression("where_clause", condition)?);
        }
        Ok(sql)
    }

    fn delete(&self, op: &DeleteOp) -> Result<String> {
        let mut sql = format!(
            "DELETE FROM {}",
            self.qualified_name(&op.target, FragmentKind::Table)?
        );
        if let Some(condition) = &op.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(&self.expression("where_clause", condition)?);
        }
        Ok(sql)
    }

    fn merge(&self, op: &MergeOp) -> Result<String> {
        let column = |field: &str, i: usize, name: &str| {
            self.quote_identifier(&format!("{field}[{i}]"), name, FragmentKind::Column)
        };

        let on = op
            .match_keys()
            .iter()
            .enumerate()
            .map(|(i, k)| -> Result<String> {
                let k = column("match_keys", i, k)?;
                Ok(format!("target.{k} = source.{k}"))
            })
            .collect::<Result<Vec<_>>>()?;
        let mut sql = format!(
            "MERGE INTO {} AS target USING ({}) AS source ON {}",
            self.qualified_name(op.target(), FragmentKind::Table)?,
            self.query("source_query", op.source_query())?,
            on.join(" AND ")
        );

        // The conditional DELETE must come before the unconditional UPDATE.
        if let Some(condition) = op.delete_condition() {
            sql.push_str(&format!(
                " WHEN MATCHED AND {} THEN DELETE",
                self.expression("delete_condition", condition)?
            ));
        }
        if !op.update_columns().is_empty() {
            let set = op
                .update_columns()
                .iter()
                .enumerate()
                .map(|(i, c)| -> Result<String> {
                    let c = column("update_columns", i, c)?;
                    Ok(format!("target.{c} = source.{c}"))
                })
                .collect::<Result<Vec<_>>>()?;
            sql.push_str(&format!(" WHEN MATCHED THEN UPDATE SET {}", set.join(", ")));
        }
        if !op.insert_columns().is_empty() {
            let cols = op
                .insert_columns()
                .iter()
                .enumerate()
                .map(|(i, c)| column("insert_columns", i, c))
                .collect::<Result<Vec<_>>>()?;
            let values = cols.iter().map(|c| format!("source.{c}")).collect::<Vec<_>>();
            sql.push_str(&format!(
                " WHEN NOT MATCHED THEN INSERT ({}) VALUES ({})",
                cols.join(", "),
                values.join(", ")
            ));
        }
        if op.delete_not_matched_by_source() {
            sql.push_str(" WHEN NOT MATCHED BY SOURCE THEN DELETE");
        }
        // MERGE must be terminated.
        sql.push(';');
        Ok(sql)
    }

    fn copy(&self, op: &CopyOp) -> Result<String> {
        let mut sql = format!(
            "COPY INTO {} FROM {}",
            self.qualified_name(&op.target, FragmentKind::Table)?,
            self.path_literal("source_path", &op.source_path)?
        );
        let mut options = Vec::new();
        if let Some(format) = op.file_format {
            options.push(format!("FILE_TYPE = {}", quote_string(format.as_sql())));
        }
        for (key, value) in &op.options {
            let key = self.identifier(&format!("options.{key}"), key, FragmentKind::OptionKey)?;
            let value = self.render_value(&format!("options.{key}"), value)?;
            options.push(format!("{} = {value}", key.to_ascii_uppercase()));
        }
        if !options.is_empty() {
            sql.push_str(&format!(" WITH ({})", options.join(", ")));
        }
        Ok(sql)
    }
}
