//! Dialect-specific SQL generation.
//!
//! A [`SqlDialect`] turns an [`Operation`] into one statement for a target
//! backend. Every identifier, expression, and query a builder embeds goes
//! through the dialect's [`Validator`] first, and object names go through its
//! [`NamingRules`]. Identifiers are quoted as `[name]` and string literals as
//! `'text'`.

mod external;
mod managed;
mod naming;

pub use external::{ExternalTableDialect, ExternalTableOptions};
pub use managed::{ManagedTableDialect, ManagedTableOptions};
pub use naming::NamingRules;

use std::fmt;

use tracing::trace;

use crate::error::{CompileError, Rejection, Result, ValidationError};
use crate::operation::{
    Assignment, ColumnDefinition, CopyOp, CreateOrAlterViewOp, CreateSchemaOp, CreateStatisticsOp,
    CreateTableOp, DeleteOp, DropSchemaOp, DropTableOp, DropViewOp, ExecuteSqlOp, InsertOp, MergeOp,
    ObjectRef, Operation, OperationKind, Sampling, SelectOp, UpdateOp, Value,
};
use crate::validate::{classify, quote_string, FragmentKind, ValueClass, Validator};

fn field_error(field: &str) -> impl FnOnce(ValidationError) -> CompileError + '_ {
    move |err| CompileError::validation(field, err)
}

/// Trait for dialect-specific SQL generation.
///
/// Implementations hold only read-only configuration, so one instance can be
/// shared across threads and used for any number of compilations.
pub trait SqlDialect: Send + Sync + fmt::Debug {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Returns the object naming rules.
    fn naming(&self) -> &NamingRules;

    /// Returns the validator applied to every embedded fragment.
    fn validator(&self) -> &Validator;

    /// Generates SQL for an operation.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure, or an error if the dialect does
    /// not support the operation or one of its clauses.
    fn compile(&self, operation: &Operation) -> Result<String> {
        let sql = match operation {
            Operation::CreateTable(op) => self.create_table(op),
            Operation::DropTable(op) => self.drop_table(op),
            Operation::CreateSchema(op) => self.create_schema(op),
            Operation::DropSchema(op) => self.drop_schema(op),
            Operation::Select(op) => self.select(op),
            Operation::Insert(op) => self.insert(op),
            Operation::Update(op) => self.update(op),
            Operation::Delete(op) => self.delete(op),
            Operation::Merge(op) => self.merge(op),
            Operation::Copy(op) => self.copy(op),
            Operation::CreateOrAlterView(op) => self.create_or_alter_view(op),
            Operation::DropView(op) => self.drop_view(op),
            Operation::CreateStatistics(op) => self.create_statistics(op),
            Operation::ExecuteSql(op) => self.execute_sql(op),
        }?;
        trace!(dialect = self.name(), operation = %operation.kind(), "compiled operation");
        Ok(sql)
    }

    /// Generates SQL for CREATE TABLE.
    fn create_table(&self, op: &CreateTableOp) -> Result<String>;

    /// Generates SQL for DROP TABLE.
    fn drop_table(&self, op: &DropTableOp) -> Result<String>;

    /// Generates SQL for CREATE SCHEMA.
    fn create_schema(&self, op: &CreateSchemaOp) -> Result<String>;

    /// Generates SQL for DROP SCHEMA.
    fn drop_schema(&self, op: &DropSchemaOp) -> Result<String>;

    /// Generates SQL for INSERT.
    fn insert(&self, op: &InsertOp) -> Result<String>;

    /// Generates SQL for UPDATE.
    fn update(&self, op: &UpdateOp) -> Result<String>;

    /// Generates SQL for DELETE.
    fn delete(&self, op: &DeleteOp) -> Result<String>;

    /// Generates SQL for MERGE.
    fn merge(&self, op: &MergeOp) -> Result<String>;

    /// Generates SQL for a bulk load.
    fn copy(&self, op: &CopyOp) -> Result<String>;

    /// Generates SQL for SELECT.
    ///
    /// The default emits T-SQL paging: `TOP n` for a bare limit, and
    /// `OFFSET ... FETCH NEXT` once an offset is involved.
    fn select(&self, op: &SelectOp) -> Result<String> {
        let mut sql = String::from("SELECT ");
        if op.distinct() {
            sql.push_str("DISTINCT ");
        }
        if let (Some(limit), None) = (op.limit(), op.offset()) {
            sql.push_str(&format!("TOP {limit} "));
        }
        if op.columns().is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.column_list("columns", op.columns())?);
        }
        sql.push_str(" FROM ");
        sql.push_str(&self.qualified_name(op.target(), FragmentKind::Table)?);

        if let Some(join) = op.join_clause() {
            sql.push(' ');
            sql.push_str(&self.query("join_clause", join)?);
        }
        if let Some(condition) = op.where_clause() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.expression("where_clause", condition)?);
        }
        if !op.group_by().is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.column_list("group_by", op.group_by())?);
        }
        if let Some(condition) = op.having_clause() {
            sql.push_str(" HAVING ");
            sql.push_str(&self.expression("having_clause", condition)?);
        }

        let order_by = op
            .order_by()
            .iter()
            .enumerate()
            .map(|(i, term)| self.expression(&format!("order_by[{i}]"), term))
            .collect::<Result<Vec<_>>>()?;
        if !order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order_by.join(", "));
        }
        if let Some(offset) = op.offset() {
            if order_by.is_empty() {
                // OFFSET is only valid after ORDER BY.
                sql.push_str(" ORDER BY (SELECT NULL)");
            }
            sql.push_str(&format!(" OFFSET {offset} ROWS"));
            if let Some(limit) = op.limit() {
                sql.push_str(&format!(" FETCH NEXT {limit} ROWS ONLY"));
            }
        }
        Ok(sql)
    }

    /// Generates SQL for CREATE OR ALTER VIEW.
    fn create_or_alter_view(&self, op: &CreateOrAlterViewOp) -> Result<String> {
        let mut sql = format!(
            "CREATE OR ALTER VIEW {}",
            self.qualified_name(&op.target, FragmentKind::View)?
        );
        if !op.columns.is_empty() {
            sql.push_str(&format!(" ({})", self.column_list("columns", &op.columns)?));
        }
        if op.with_schemabinding {
            sql.push_str(" WITH SCHEMABINDING");
        }
        sql.push_str(" AS ");
        sql.push_str(&self.query("select_query", &op.select_query)?);
        Ok(sql)
    }

    /// Generates SQL for DROP VIEW.
    fn drop_view(&self, op: &DropViewOp) -> Result<String> {
        let name = self.qualified_name(&op.target, FragmentKind::View)?;
        Ok(if op.if_exists {
            format!("DROP VIEW IF EXISTS {name}")
        } else {
            format!("DROP VIEW {name}")
        })
    }

    /// Generates SQL for CREATE STATISTICS.
    ///
    /// Without an explicit name the statistics are named
    /// `stat_<object>_<column>`.
    fn create_statistics(&self, op: &CreateStatisticsOp) -> Result<String> {
        let table = self.qualified_name(op.target(), FragmentKind::Table)?;
        let column = self.identifier("column", op.column(), FragmentKind::Column)?;
        let stats_name = match op.stats_name() {
            Some(name) => self.quote_identifier("stats_name", name, FragmentKind::Statistics)?,
            None => {
                let object =
                    self.identifier("target.object_name", &op.target().object_name, FragmentKind::Table)?;
                self.quote_identifier(
                    "stats_name",
                    &format!("stat_{object}_{column}"),
                    FragmentKind::Statistics,
                )?
            }
        };
        let mut sql = format!("CREATE STATISTICS {stats_name} ON {table} ([{column}])");
        match op.sampling() {
            Sampling::Default => {}
            Sampling::FullScan => sql.push_str(" WITH FULLSCAN"),
            Sampling::Percent(p) => sql.push_str(&format!(" WITH SAMPLE {p} PERCENT")),
        }
        Ok(sql)
    }

    /// Passes caller-supplied SQL through the raw SQL checks.
    ///
    /// A row limit wraps the query as
    /// `SELECT TOP n * FROM (<sql>) AS limited_results`, and the query must
    /// then also pass the embedded query checks.
    fn execute_sql(&self, op: &ExecuteSqlOp) -> Result<String> {
        match op.row_limit() {
            Some(limit) => {
                // A comment here would swallow the closing parenthesis.
                let body = self.query("sql", op.sql())?;
                Ok(format!("SELECT TOP {limit} * FROM ({body}) AS limited_results"))
            }
            None => self
                .validator()
                .validate_raw_sql(op.sql(), op.is_trusted_script())
                .map_err(field_error("sql")),
        }
    }

    /// Error for an operation this dialect has no builder for.
    fn unsupported(&self, operation: OperationKind) -> CompileError {
        CompileError::UnsupportedOperation {
            dialect: self.name(),
            operation,
        }
    }

    /// Error for a clause this dialect cannot express.
    fn unsupported_feature(&self, operation: OperationKind, feature: &'static str) -> CompileError {
        CompileError::UnsupportedFeature {
            dialect: self.name(),
            operation,
            feature,
        }
    }

    /// Validates an identifier and returns it without delimiters.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming `field`.
    fn identifier(&self, field: &str, name: &str, kind: FragmentKind) -> Result<String> {
        self.validator()
            .validate_identifier(name, kind)
            .map_err(field_error(field))
    }

    /// Validates and quotes an identifier as `[name]`.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming `field`.
    fn quote_identifier(&self, field: &str, name: &str, kind: FragmentKind) -> Result<String> {
        Ok(format!("[{}]", self.identifier(field, name, kind)?))
    }

    /// Builds `[schema].[prefixed_object]` for an object reference.
    ///
    /// # Errors
    ///
    /// Returns a validation error if either part, or the prefixed object
    /// name, is not a valid identifier.
    fn qualified_name(&self, target: &ObjectRef, kind: FragmentKind) -> Result<String> {
        let schema = self.identifier("target.schema_name", &target.schema_name, FragmentKind::Schema)?;
        let object = self.identifier("target.object_name", &target.object_name, kind)?;
        let physical = self.naming().physical_name(&schema, &object);
        if physical != object {
            self.identifier("target.object_name", &physical, kind)?;
        }
        Ok(format!("[{schema}].[{physical}]"))
    }

    /// Formats `[a], [b], [c]`.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the offending element.
    fn column_list(&self, field: &str, columns: &[String]) -> Result<String> {
        let quoted = columns
            .iter()
            .enumerate()
            .map(|(i, c)| self.quote_identifier(&format!("{field}[{i}]"), c, FragmentKind::Column))
            .collect::<Result<Vec<_>>>()?;
        Ok(quoted.join(", "))
    }

    /// Formats `[name] TYPE NULL` or `[name] TYPE NOT NULL` for the column at
    /// `index` of a CREATE TABLE column list.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an invalid name or data type.
    fn column_head(&self, index: usize, column: &ColumnDefinition) -> Result<String> {
        let name = self.quote_identifier(
            &format!("columns[{index}].name"),
            &column.name,
            FragmentKind::Column,
        )?;
        let data_type = self
            .validator()
            .validate_data_type(&column.data_type)
            .map_err(|err| CompileError::validation(format!("columns[{index}].data_type"), err))?;
        let nullability = if column.nullable { "NULL" } else { "NOT NULL" };
        Ok(format!("{name} {data_type} {nullability}"))
    }

    /// Validates an expression.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming `field`.
    fn expression(&self, field: &str, expr: &str) -> Result<String> {
        self.validator()
            .validate_expression(expr, FragmentKind::Expression)
            .map_err(field_error(field))
    }

    /// Validates an embedded query.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming `field`.
    fn query(&self, field: &str, sql: &str) -> Result<String> {
        self.validator()
            .validate_query(sql, FragmentKind::Query)
            .map_err(field_error(field))
    }

    /// Validates a storage path and quotes it as a string literal.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming `field`.
    fn path_literal(&self, field: &str, path: &str) -> Result<String> {
        let path = self
            .validator()
            .validate_path(path, FragmentKind::Path)
            .map_err(field_error(field))?;
        Ok(quote_string(&path))
    }

    /// Renders a value as a SQL literal or expression.
    ///
    /// # Errors
    ///
    /// Returns a validation error for non-finite numbers and for text
    /// classified as an expression that fails expression validation.
    fn render_value(&self, field: &str, value: &Value) -> Result<String> {
        match value {
            Value::Null => Ok("NULL".to_string()),
            Value::Bool(b) => Ok(if *b { "1" } else { "0" }.to_string()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Float(f) if f.is_finite() => Ok(f.to_string()),
            Value::Float(f) => Err(CompileError::validation(
                field,
                ValidationError::new(FragmentKind::Expression, f.to_string(), Rejection::InvalidNumber),
            )),
            Value::Text(text) => match classify(text) {
                ValueClass::NumericLiteral(n) => Ok(n),
                ValueClass::Expression(e) => self.expression(field, &e),
                ValueClass::StringLiteral(s) => Ok(s),
            },
            Value::Expression { expression } => self.expression(field, expression),
            Value::Literal { literal } => Ok(quote_string(literal)),
        }
    }

    /// Formats `(v1, v2, ...)` for an INSERT row.
    ///
    /// # Errors
    ///
    /// Returns the first value that fails to render.
    fn value_list(&self, field: &str, values: &[Value]) -> Result<String> {
        let rendered = values
            .iter()
            .enumerate()
            .map(|(i, v)| self.render_value(&format!("{field}[{i}]"), v))
            .collect::<Result<Vec<_>>>()?;
        Ok(format!("({})", rendered.join(", ")))
    }

    /// Formats `[a] = v1, [b] = v2` for an UPDATE.
    ///
    /// # Errors
    ///
    /// Returns the first column or value that fails validation.
    fn set_clause(&self, assignments: &[Assignment]) -> Result<String> {
        let rendered = assignments
            .iter()
            .enumerate()
            .map(|(i, a)| -> Result<String> {
                let column =
                    self.quote_identifier(&format!("assignments[{i}].column"), &a.column, FragmentKind::Column)?;
                let value = self.render_value(&format!("assignments[{i}].value"), &a.value)?;
                Ok(format!("{column} = {value}"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(rendered.join(", "))
    }

    /// `SELECT * FROM <table>`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an invalid table name.
    fn select_all(&self, target: &ObjectRef) -> Result<String> {
        Ok(format!(
            "SELECT * FROM {}",
            self.qualified_name(target, FragmentKind::Table)?
        ))
    }

    /// `SELECT <columns> FROM <table>`, or `*` for no columns.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an invalid table or column name.
    fn select_columns(&self, target: &ObjectRef, columns: &[String]) -> Result<String> {
        if columns.is_empty() {
            return self.select_all(target);
        }
        Ok(format!(
            "SELECT {} FROM {}",
            self.column_list("columns", columns)?,
            self.qualified_name(target, FragmentKind::Table)?
        ))
    }

    /// `SELECT <columns> FROM <table> WHERE <condition>`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an invalid name or condition.
    fn select_where(&self, target: &ObjectRef, columns: &[String], condition: &str) -> Result<String> {
        Ok(format!(
            "{} WHERE {}",
            self.select_columns(target, columns)?,
            self.expression("condition", condition)?
        ))
    }

    /// `SELECT <columns> FROM <table> WHERE NOT (<condition>)`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an invalid name or condition.
    fn select_where_not(
        &self,
        target: &ObjectRef,
        columns: &[String],
        condition: &str,
    ) -> Result<String> {
        Ok(format!(
            "{} WHERE NOT ({})",
            self.select_columns(target, columns)?,
            self.expression("condition", condition)?
        ))
    }
}
