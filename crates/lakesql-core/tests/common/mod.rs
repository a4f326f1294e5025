#![allow(dead_code)]

use lakesql_core::error::Rejection;
use lakesql_core::{CompileError, DialectConfig, Operation};

pub fn external_config() -> DialectConfig {
    DialectConfig::new("external-table")
        .with_option("data_source", "ProcessedDataSource")
        .with_option("parquet_file_format", "ParquetFileFormat")
        .with_option("csv_file_format", "CsvFileFormat")
        .with_option("location_prefix", "silver/")
}

pub fn managed_config() -> DialectConfig {
    DialectConfig::new("managed-table")
}

pub fn compile(op: impl Into<Operation>, config: &DialectConfig) -> String {
    let op = op.into();
    lakesql_core::compile(&op, config)
        .unwrap_or_else(|e| panic!("Failed to compile {:?}\nError: {e}", op.kind()))
}

pub fn compile_err(op: impl Into<Operation>, config: &DialectConfig) -> CompileError {
    let op = op.into();
    match lakesql_core::compile(&op, config) {
        Ok(sql) => panic!("Expected compile error for {:?}, got: {sql}", op.kind()),
        Err(e) => e,
    }
}

/// Returns the field and rejection of a validation failure.
pub fn validation_failure(err: CompileError) -> (String, Rejection) {
    match err {
        CompileError::Validation { field, source } => (field, source.reason),
        other => panic!("Expected validation error, got {other:?}"),
    }
}
