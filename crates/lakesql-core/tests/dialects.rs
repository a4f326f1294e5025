//! Statement shapes per backend, compiled through the selector.

mod common;

use std::num::NonZeroU32;

use common::{compile, compile_err, external_config, managed_config, validation_failure};
use lakesql_core::error::Rejection;
use lakesql_core::operation::{
    ColumnDefinition, CopyOp, CreateOrAlterViewOp, CreateSchemaOp, CreateStatisticsOp,
    CreateTableOp, DeleteOp, DropSchemaOp, DropTableOp, DropViewOp, ExecuteSqlOp, FileFormat,
    InsertOp, MergeOp, Operation, OperationKind, SelectOp, UpdateOp, Value,
};
use lakesql_core::CompileError;

#[test]
fn external_rejects_every_write() {
    let config = external_config();
    let writes: Vec<Operation> = vec![
        InsertOp::builder("silver", "t").query("SELECT 1 AS a").build().unwrap().into(),
        UpdateOp::builder("silver", "t").set("a", 1).build().unwrap().into(),
        DeleteOp::new("silver", "t").into(),
        MergeOp::builder("silver", "t", "SELECT 1 AS id")
            .match_keys(["id"])
            .delete_not_matched_by_source()
            .build()
            .unwrap()
            .into(),
        CopyOp::new("silver", "t", "raw/t/").into(),
    ];
    for op in writes {
        let kind = op.kind();
        match compile_err(op, &config) {
            CompileError::UnsupportedOperation { dialect, operation } => {
                assert_eq!(dialect, "external-table");
                assert_eq!(operation, kind);
            }
            other => panic!("Expected unsupported operation for {kind}, got {other:?}"),
        }
    }
}

#[test]
fn unsupported_check_precedes_validation() {
    let op = DeleteOp::new("silver", "t; DROP TABLE x");
    assert!(matches!(
        compile_err(op, &external_config()),
        CompileError::UnsupportedOperation { operation: OperationKind::Delete, .. }
    ));
}

#[test]
fn both_backends_share_read_and_view_statements() {
    let ops: Vec<Operation> = vec![
        SelectOp::builder("silver", "orders")
            .columns(["id", "total"])
            .filter("total > 100")
            .order_by(["total DESC"])
            .limit(NonZeroU32::new(5).unwrap())
            .offset(10)
            .build()
            .unwrap()
            .into(),
        CreateOrAlterViewOp::new("gold", "big_orders", "SELECT id FROM silver.orders WHERE total > 100")
            .into(),
        DropViewOp::new("gold", "big_orders").into(),
        CreateStatisticsOp::builder("silver", "orders").column("total").build().unwrap().into(),
        ExecuteSqlOp::new("SELECT COUNT(*) FROM silver.orders").into(),
    ];
    for op in ops {
        assert_eq!(
            compile(op.clone(), &external_config()),
            compile(op, &managed_config())
        );
    }
}

#[test]
fn select_paging_shape() {
    let op = SelectOp::builder("silver", "orders")
        .columns(["id", "total"])
        .filter("total > 100")
        .order_by(["total DESC"])
        .limit(NonZeroU32::new(5).unwrap())
        .offset(10)
        .build()
        .unwrap();
    assert_eq!(
        compile(op, &managed_config()),
        "SELECT [id], [total] FROM [silver].[orders] WHERE total > 100 \
         ORDER BY total DESC OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY"
    );
}

#[test]
fn external_schema_statements_are_guarded() {
    let config = external_config();
    assert_eq!(
        compile(CreateSchemaOp::new("silver"), &config),
        "IF NOT EXISTS (SELECT * FROM sys.schemas WHERE name = 'silver') EXEC('CREATE SCHEMA [silver]')"
    );
    assert_eq!(
        compile(DropTableOp::new("silver", "customers"), &config),
        "IF EXISTS (SELECT * FROM sys.external_tables WHERE object_id = OBJECT_ID('[silver].[customers]')) \
         DROP EXTERNAL TABLE [silver].[customers]"
    );
    assert_eq!(
        compile(DropSchemaOp::new("silver"), &config),
        "IF EXISTS (SELECT * FROM sys.schemas WHERE name = 'silver') DROP SCHEMA [silver]"
    );
}

#[test]
fn external_csv_table() {
    let op = CreateTableOp::builder("bronze", "feed")
        .column(ColumnDefinition::new("id", "INT").not_null())
        .column(ColumnDefinition::new("body", "VARCHAR(MAX)"))
        .file_format(FileFormat::Csv)
        .build()
        .unwrap();
    assert_eq!(
        compile(op, &external_config()),
        "CREATE EXTERNAL TABLE [bronze].[feed] ([id] INT NOT NULL, [body] VARCHAR(MAX) NULL) \
         WITH (DATA_SOURCE = ProcessedDataSource, LOCATION = 'silver/feed/', FILE_FORMAT = CsvFileFormat)"
    );
}

#[test]
fn external_partitioning_is_unsupported_feature() {
    let op = CreateTableOp::builder("silver", "t")
        .as_select("SELECT 1 AS x")
        .partition_by(["x"])
        .build()
        .unwrap();
    let err = compile_err(op, &external_config());
    assert!(matches!(
        err,
        CompileError::UnsupportedFeature { feature: "PARTITIONED BY", .. }
    ));
    assert!(err.to_string().contains("PARTITIONED BY"));
}

#[test]
fn managed_full_dml() {
    let config = managed_config();
    let insert = InsertOp::builder("silver", "events")
        .columns(["id", "kind", "at", "score", "flag"])
        .row([
            Value::from(1),
            Value::from("click"),
            Value::expr("CURRENT_TIMESTAMP"),
            Value::from(0.5),
            Value::from(true),
        ])
        .row([Value::from(2), Value::Null, Value::literal("GETDATE()"), Value::from(-1), Value::from(false)])
        .build()
        .unwrap();
    assert_eq!(
        compile(insert, &config),
        "INSERT INTO [silver].[events] ([id], [kind], [at], [score], [flag]) \
         VALUES (1, 'click', CURRENT_TIMESTAMP, 0.5, 1), (2, NULL, 'GETDATE()', -1, 0)"
    );

    let update = UpdateOp::builder("silver", "events")
        .set("kind", "view")
        .from_clause("[silver].[events] e INNER JOIN [silver].[sessions] s ON s.id = e.session_id")
        .filter("s.closed = 1")
        .build()
        .unwrap();
    assert_eq!(
        compile(update, &config),
        "UPDATE [silver].[events] SET [kind] = 'view' \
         FROM [silver].[events] e INNER JOIN [silver].[sessions] s ON s.id = e.session_id \
         WHERE s.closed = 1"
    );

    let copy = CopyOp::new("bronze", "events", "https://lake.example.net/raw/events/*.parquet")
        .file_format(FileFormat::Parquet);
    assert_eq!(
        compile(copy, &config),
        "COPY INTO [bronze].[events] FROM 'https://lake.example.net/raw/events/*.parquet' \
         WITH (FILE_TYPE = 'PARQUET')"
    );
}

#[test]
fn validation_errors_name_the_field() {
    let config = managed_config();

    let op = UpdateOp::builder("silver", "events")
        .set("kind", "x")
        .set("bad column", "y")
        .build()
        .unwrap();
    let (field, reason) = validation_failure(compile_err(op, &config));
    assert_eq!(field, "assignments[1].column");
    assert_eq!(reason, Rejection::InvalidCharacter(' '));

    let op = SelectOp::builder("silver", "events")
        .filter("kind = 'a' OR 1=1")
        .build()
        .unwrap();
    let (field, reason) = validation_failure(compile_err(op, &config));
    assert_eq!(field, "where_clause");
    assert_eq!(reason, Rejection::DangerousPattern("OR 1=1".to_string()));

    let op = CreateOrAlterViewOp::new("gold", "v", "SELECT 1 AS a; DELETE FROM silver.events");
    let (field, reason) = validation_failure(compile_err(op, &config));
    assert_eq!(field, "select_query");
    assert_eq!(reason, Rejection::StatementStacking);

    let op = CopyOp::new("bronze", "events", "../secrets/");
    let (field, _) = validation_failure(compile_err(op, &config));
    assert_eq!(field, "source_path");

    let op = DropTableOp::new("silver", "");
    let (field, reason) = validation_failure(compile_err(op, &config));
    assert_eq!(field, "target.object_name");
    assert_eq!(reason, Rejection::Empty);
}

#[test]
fn bracketed_names_are_not_double_quoted() {
    let op = DropTableOp::new("[silver]", "[customers]");
    assert_eq!(
        compile(op, &managed_config()),
        "DROP TABLE IF EXISTS [silver].[customers]"
    );
}

#[test]
fn execute_sql_checks() {
    let config = managed_config();
    let err = compile_err(ExecuteSqlOp::new("SELECT 1; SELECT 2"), &config);
    assert_eq!(err.rejection(), Some(&Rejection::StatementStacking));

    assert_eq!(
        compile(ExecuteSqlOp::trusted_script("SELECT 1; SELECT 2"), &config),
        "SELECT 1; SELECT 2"
    );

    let err = compile_err(ExecuteSqlOp::trusted_script("EXEC xp_cmdshell 'dir'"), &config);
    assert!(matches!(err.rejection(), Some(Rejection::DangerousPattern(_))));
}

#[test]
fn extra_deny_patterns_from_config() {
    let config = managed_config().with_deny_pattern(r"^tmp_");
    let err = compile_err(DropTableOp::new("silver", "tmp_scratch"), &config);
    assert!(matches!(err.rejection(), Some(Rejection::DangerousPattern(_))));
    assert!(compile_err(
        DropTableOp::new("silver", "scratch"),
        &managed_config().with_deny_pattern("(")
    )
    .to_string()
    .contains("invalid configuration"));
}

#[test]
fn unpaired_double_quote_in_filter() {
    let op = DeleteOp::new("silver", "orders").filter("name = \"x");
    let (field, reason) = validation_failure(compile_err(op, &managed_config()));
    assert_eq!(field, "where_clause");
    assert_eq!(reason, Rejection::Unbalanced('"'));
}

#[test]
fn row_limited_sql_rejects_trailing_comment() {
    let op = ExecuteSqlOp::new("SELECT * FROM silver.customers -- recent")
        .with_row_limit(NonZeroU32::new(5).unwrap())
        .unwrap();
    let (field, reason) = validation_failure(compile_err(op, &managed_config()));
    assert_eq!(field, "sql");
    assert_eq!(reason, Rejection::DangerousPattern("line comment".to_string()));
}
