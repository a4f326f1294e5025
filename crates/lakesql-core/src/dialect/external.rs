//! External-table dialect.
//!
//! Tables are external tables over object storage: CREATE emits
//! `CREATE EXTERNAL TABLE ... WITH (DATA_SOURCE, LOCATION, FILE_FORMAT)`
//! and data can only be written by creating a table from a query. Row-level
//! writes, MERGE, and bulk loads are rejected as unsupported.

use serde::Deserialize;

use super::{NamingRules, SqlDialect};
use crate::error::{CompileError, Result};
use crate::operation::{
    ColumnDefinition, CopyOp, CreateSchemaOp, CreateTableOp, DeleteOp, DropBehavior, DropSchemaOp,
    DropTableOp, FileFormat, InsertOp, MergeOp, ObjectRef, OperationKind, TableDefinition,
    UpdateOp,
};
use crate::validate::{quote_string, FragmentKind, Validator};

/// Backend options for the external-table dialect.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalTableOptions {
    /// Named external data source tables are stored in.
    pub data_source: String,
    /// Named file format used for parquet tables.
    pub parquet_file_format: String,
    /// Named file format used for CSV tables.
    #[serde(default)]
    pub csv_file_format: Option<String>,
    /// Path prepended to derived table locations.
    #[serde(default)]
    pub location_prefix: String,
}

impl ExternalTableOptions {
    /// Creates options with a data source and parquet file format.
    #[must_use]
    pub fn new(data_source: impl Into<String>, parquet_file_format: impl Into<String>) -> Self {
        Self {
            data_source: data_source.into(),
            parquet_file_format: parquet_file_format.into(),
            csv_file_format: None,
            location_prefix: String::new(),
        }
    }

    /// Sets the CSV file format.
    #[must_use]
    pub fn with_csv_file_format(mut self, name: impl Into<String>) -> Self {
        self.csv_file_format = Some(name.into());
        self
    }

    /// Sets the location prefix.
    #[must_use]
    pub fn with_location_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.location_prefix = prefix.into();
        self
    }
}

/// External-table dialect.
#[derive(Debug, Clone)]
pub struct ExternalTableDialect {
    naming: NamingRules,
    validator: Validator,
    options: ExternalTableOptions,
}

impl ExternalTableDialect {
    /// Dialect name.
    pub const NAME: &'static str = "external-table";

    /// Creates the dialect with the seeded validator.
    #[must_use]
    pub fn new(naming: NamingRules, options: ExternalTableOptions) -> Self {
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
    pub const fn options(&self) -> &ExternalTableOptions {
        &self.options
    }

    fn file_format_name(&self, format: FileFormat) -> Result<String> {
        let (field, name) = match format {
            FileFormat::Parquet => ("options.parquet_file_format", &self.options.parquet_file_format),
            FileFormat::Csv => match &self.options.csv_file_format {
                Some(name) => ("options.csv_file_format", name),
                None => {
                    return Err(CompileError::InvalidConfig {
                        backend: Self::NAME.to_string(),
                        message: "no CSV file format configured".to_string(),
                    })
                }
            },
        };
        self.identifier(field, name, FragmentKind::FileFormat)
    }

    /// Derives `<prefix>/<object>/`, or `<schema>/<object>/` without a prefix.
    fn location(&self, op: &CreateTableOp) -> Result<String> {
        if let Some(location) = op.location() {
            return self.path_literal("location", location);
        }
        let target = op.target();
        let object = self.identifier("target.object_name", &target.object_name, FragmentKind::Table)?;
        let prefix = self.options.location_prefix.trim();
        let derived = if prefix.is_empty() {
            let schema =
                self.identifier("target.schema_name", &target.schema_name, FragmentKind::Schema)?;
            format!("{schema}/{object}/")
        } else if prefix.ends_with('/') {
            format!("{prefix}{object}/")
        } else {
            format!("{prefix}/{object}/")
        };
        self.path_literal("options.location_prefix", &derived)
    }

    fn column_definition(&self, index: usize, column: &ColumnDefinition) -> Result<String> {
        if column.has_constraints() {
            return Err(self.unsupported_feature(OperationKind::CreateTable, "column constraints"));
        }
        self.column_head(index, column)
    }

    fn exists_check(&self, catalog: &str, target: &ObjectRef) -> Result<String> {
        let name = self.qualified_name(target, FragmentKind::Table)?;
        Ok(format!(
            "IF EXISTS (SELECT * FROM sys.{catalog} WHERE object_id = OBJECT_ID({}))",
            quote_string(&name)
        ))
    }
}

impl SqlDialect for ExternalTableDialect {
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
        let kind = OperationKind::CreateTable;
        if !op.partition_by().is_empty() {
            return Err(self.unsupported_feature(kind, "PARTITIONED BY"));
        }
        if !op.cluster_by().is_empty() {
            return Err(self.unsupported_feature(kind, "CLUSTER BY"));
        }
        if !op.properties().is_empty() {
            return Err(self.unsupported_feature(kind, "table properties"));
        }
        if op.if_not_exists() {
            return Err(self.unsupported_feature(kind, "IF NOT EXISTS"));
        }

        let name = self.qualified_name(op.target(), FragmentKind::Table)?;
        let data_source =
            self.identifier("options.data_source", &self.options.data_source, FragmentKind::DataSource)?;
        let file_format = self.file_format_name(op.file_format())?;
        let location = self.location(op)?;
        let with = format!(
            "WITH (DATA_SOURCE = {data_source}, LOCATION = {location}, FILE_FORMAT = {file_format})"
        );

        match op.definition() {
            TableDefinition::AsSelect(select) => Ok(format!(
                "CREATE EXTERNAL TABLE {name} {with} AS {}",
                self.query("as_select", select)?
            )),
            TableDefinition::Columns(columns) => {
                let defs = columns
                    .iter()
                    .enumerate()
                    .map(|(i, c)| self.column_definition(i, c))
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("CREATE EXTERNAL TABLE {name} ({}) {with}", defs.join(", ")))
            }
        }
    }

    fn drop_table(&self, op: &DropTableOp) -> Result<String> {
        let name = self.qualified_name(&op.target, FragmentKind::Table)?;
        if op.if_exists {
            Ok(format!(
                "{} DROP EXTERNAL TABLE {name}",
                self.exists_check("external_tables", &op.target)?
            ))
        } else {
            Ok(format!("DROP EXTERNAL TABLE {name}"))
        }
    }

    fn create_schema(&self, op: &CreateSchemaOp) -> Result<String> {
        let schema = self.identifier("schema_name", &op.schema_name, FragmentKind::Schema)?;
        let mut create = format!("CREATE SCHEMA [{schema}]");
        if let Some(principal) = &op.authorization {
            create.push_str(" AUTHORIZATION ");
            create.push_str(&self.quote_identifier("authorization", principal, FragmentKind::Principal)?);
        }
        if op.if_not_exists {
            // CREATE SCHEMA must start its own batch, so it runs through EXEC.
            Ok(format!(
                "IF NOT EXISTS (SELECT * FROM sys.schemas WHERE name = {}) EXEC({})",
                quote_string(&schema),
                quote_string(&create)
            ))
        } else {
            Ok(create)
        }
    }

    fn drop_schema(&self, op: &DropSchemaOp) -> Result<String> {
        match op.behavior {
            DropBehavior::Default => {}
            DropBehavior::Cascade => {
                return Err(self.unsupported_feature(OperationKind::DropSchema, "CASCADE"))
            }
            DropBehavior::Restrict => {
                return Err(self.unsupported_feature(OperationKind::DropSchema, "RESTRICT"))
            }
        }
        let schema = self.identifier("schema_name", &op.schema_name, FragmentKind::Schema)?;
        if op.if_exists {
            Ok(format!(
                "IF EXISTS (SELECT * FROM sys.schemas WHERE name = {}) DROP SCHEMA [{schema}]",
                quote_string(&schema)
            ))
        } else {
            Ok(format!("DROP SCHEMA [{schema}]"))
        }
    }

    fn insert(&self, _op: &InsertOp) -> Result<String> {
        Err(self.unsupported(OperationKind::Insert))
    }

    fn update(&self, _op: &UpdateOp) -> Result<String> {
        Err(self.unsupported(OperationKind::Update))
    }

    fn delete(&self, _op: &DeleteOp) -> Result<String> {
        Err(self.unsupported(OperationKind::Delete))
    }

    fn merge(&self, _op: &MergeOp) -> Result<String> {
        Err(self.unsupported(OperationKind::Merge))
    }

    fn copy(&self, _op: &CopyOp) -> Result<String> {
        Err(self.unsupported(OperationKind::Copy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Rejection;
    use crate::operation::{CreateOrAlterViewOp, Operation};

    fn dialect() -> ExternalTableDialect {
        ExternalTableDialect::new(
            NamingRules::new(),
            ExternalTableOptions::new("ProcessedDataSource", "ParquetFileFormat")
                .with_location_prefix("silver/"),
        )
    }

    #[test]
    fn test_create_table_as_select() {
        let op = CreateTableOp::builder("silver", "customers")
            .as_select("SELECT * FROM bronze.raw_customers")
            .build()
            .unwrap();
        assert_eq!(
            dialect().create_table(&op).unwrap(),
            "CREATE EXTERNAL TABLE [silver].[customers] WITH (DATA_SOURCE = ProcessedDataSource, \
             LOCATION = 'silver/customers/', FILE_FORMAT = ParquetFileFormat) \
             AS SELECT * FROM bronze.raw_customers"
        );
    }

    #[test]
    fn test_create_table_columns() {
        let op = CreateTableOp::builder("silver", "events")
            .column(ColumnDefinition::new("id", "BIGINT").not_null())
            .column(ColumnDefinition::new("payload", "NVARCHAR(4000)"))
            .location("events/v2/")
            .build()
            .unwrap();
        assert_eq!(
            dialect().create_table(&op).unwrap(),
            "CREATE EXTERNAL TABLE [silver].[events] ([id] BIGINT NOT NULL, [payload] NVARCHAR(4000) NULL) \
             WITH (DATA_SOURCE = ProcessedDataSource, LOCATION = 'events/v2/', FILE_FORMAT = ParquetFileFormat)"
        );
    }

    #[test]
    fn test_location_without_prefix_uses_schema() {
        let d = ExternalTableDialect::new(
            NamingRules::new(),
            ExternalTableOptions::new("ds", "pq").with_location_prefix("gold"),
        );
        let op = CreateTableOp::builder("silver", "orders")
            .as_select("SELECT 1 AS x")
            .build()
            .unwrap();
        assert!(d.create_table(&op).unwrap().contains("LOCATION = 'gold/orders/'"));

        let d = ExternalTableDialect::new(NamingRules::new(), ExternalTableOptions::new("ds", "pq"));
        assert!(d.create_table(&op).unwrap().contains("LOCATION = 'silver/orders/'"));
    }

    #[test]
    fn test_csv_format() {
        let op = CreateTableOp::builder("raw", "feed")
            .as_select("SELECT 1 AS x")
            .file_format(FileFormat::Csv)
            .build()
            .unwrap();
        let err = dialect().create_table(&op).unwrap_err();
        assert!(matches!(err, CompileError::InvalidConfig { .. }));

        let d = ExternalTableDialect::new(
            NamingRules::new(),
            ExternalTableOptions::new("ds", "pq").with_csv_file_format("CsvFormat"),
        );
        assert!(d.create_table(&op).unwrap().contains("FILE_FORMAT = CsvFormat"));
    }

    #[test]
    fn test_unsupported_features() {
        let base = || CreateTableOp::builder("silver", "t").as_select("SELECT 1 AS x");
        for op in [
            base().partition_by(["year"]).build().unwrap(),
            base().cluster_by(["id"]).build().unwrap(),
            base().property("k", "v").build().unwrap(),
            base().if_not_exists().build().unwrap(),
        ] {
            assert!(matches!(
                dialect().create_table(&op).unwrap_err(),
                CompileError::UnsupportedFeature { dialect: "external-table", .. }
            ));
        }

        let op = CreateTableOp::builder("silver", "t")
            .column(ColumnDefinition::new("id", "INT").primary_key())
            .build()
            .unwrap();
        assert!(matches!(
            dialect().create_table(&op).unwrap_err(),
            CompileError::UnsupportedFeature { feature: "column constraints", .. }
        ));
    }

    #[test]
    fn test_drop_table() {
        let d = dialect();
        assert_eq!(
            d.drop_table(&DropTableOp::new("silver", "customers")).unwrap(),
            "IF EXISTS (SELECT * FROM sys.external_tables WHERE object_id = OBJECT_ID('[silver].[customers]')) \
             DROP EXTERNAL TABLE [silver].[customers]"
        );
        assert_eq!(
            d.drop_table(&DropTableOp::new("silver", "customers").if_exists(false))
                .unwrap(),
            "DROP EXTERNAL TABLE [silver].[customers]"
        );
    }

    #[test]
    fn test_schemas() {
        let d = dialect();
        assert_eq!(
            d.create_schema(&CreateSchemaOp::new("silver").authorization("dbo")).unwrap(),
            "IF NOT EXISTS (SELECT * FROM sys.schemas WHERE name = 'silver') \
             EXEC('CREATE SCHEMA [silver] AUTHORIZATION [dbo]')"
        );
        assert_eq!(
            d.create_schema(&CreateSchemaOp::new("silver").if_not_exists(false)).unwrap(),
            "CREATE SCHEMA [silver]"
        );
        assert_eq!(
            d.drop_schema(&DropSchemaOp::new("silver")).unwrap(),
            "IF EXISTS (SELECT * FROM sys.schemas WHERE name = 'silver') DROP SCHEMA [silver]"
        );
        assert!(matches!(
            d.drop_schema(&DropSchemaOp::new("silver").behavior(DropBehavior::Cascade))
                .unwrap_err(),
            CompileError::UnsupportedFeature { feature: "CASCADE", .. }
        ));
    }

    #[test]
    fn test_writes_are_unsupported() {
        let d = dialect();
        let merge: Operation = MergeOp::builder("silver", "customers", "SELECT * FROM staging.customers")
            .match_keys(["id"])
            .update_columns(["name"])
            .build()
            .unwrap()
            .into();
        let delete: Operation = DeleteOp::new("silver", "customers").into();
        let copy: Operation = CopyOp::new("silver", "customers", "raw/").into();
        for op in [merge, delete, copy] {
            match d.compile(&op).unwrap_err() {
                CompileError::UnsupportedOperation { dialect, operation } => {
                    assert_eq!(dialect, "external-table");
                    assert_eq!(operation, op.kind());
                }
                other => panic!("Expected unsupported operation, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_view_uses_prefix() {
        let d = ExternalTableDialect::new(
            NamingRules::new().with_schema_prefix("gold", "vw_"),
            ExternalTableOptions::new("ds", "pq"),
        );
        let op = CreateOrAlterViewOp::new("gold", "sales", "SELECT * FROM silver.sales");
        assert_eq!(
            d.create_or_alter_view(&op).unwrap(),
            "CREATE OR ALTER VIEW [gold].[vw_sales] AS SELECT * FROM silver.sales"
        );
    }

    #[test]
    fn test_invalid_config_identifier() {
        let d = ExternalTableDialect::new(
            NamingRules::new(),
            ExternalTableOptions::new("ds; DROP DATABASE x", "pq"),
        );
        let op = CreateTableOp::builder("silver", "t").as_select("SELECT 1 AS x").build().unwrap();
        match d.create_table(&op).unwrap_err() {
            CompileError::Validation { field, source } => {
                assert_eq!(field, "options.data_source");
                assert!(matches!(source.reason, Rejection::DangerousPattern(_)));
            }
            other => panic!("Expected validation error, got {other:?}"),
        }
    }
}
