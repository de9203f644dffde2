use polyquery_common::{TabularResult, NULL_MARKER};
use polyquery_error::{ErrorCode, ErrorContext, PolyQueryError, Result};
use std::collections::HashMap;

/// Column metadata reported by a SQL-cursor driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlColumn {
    pub name: String,
    /// Upper-case database type name, e.g. `VARCHAR` or `UNSIGNED INT`.
    pub type_name: String,
}

impl SqlColumn {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Receives a result set as the driver reads it: columns once, then rows.
///
/// A `None` cell is SQL `NULL`.
pub trait RowSink: Send {
    fn columns(&mut self, columns: Vec<SqlColumn>) -> Result<()>;

    fn row(&mut self, cells: Vec<Option<String>>) -> Result<()>;
}

/// [`RowSink`] that builds a [`TabularResult`].
#[derive(Debug, Default)]
pub struct TabularCollector {
    column_types: HashMap<String, String>,
    column_names: Vec<String>,
    rows: Vec<Vec<String>>,
    width: Option<usize>,
}

impl TabularCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> TabularResult {
        TabularResult {
            column_types: self.column_types,
            column_names: self.column_names,
            rows: self.rows,
        }
    }
}

impl RowSink for TabularCollector {
    fn columns(&mut self, columns: Vec<SqlColumn>) -> Result<()> {
        if self.width.is_some() {
            return Ok(());
        }
        self.width = Some(columns.len());
        for column in columns {
            self.column_types
                .insert(column.name.clone(), column.type_name);
            self.column_names.push(column.name);
        }
        Ok(())
    }

    fn row(&mut self, cells: Vec<Option<String>>) -> Result<()> {
        let row_index = self.rows.len();
        let Some(width) = self.width else {
            return Err(PolyQueryError::new(
                ErrorCode::ScanFailed,
                "Row received before column metadata",
            ));
        };
        if cells.len() != width {
            return Err(PolyQueryError::new(
                ErrorCode::ScanFailed,
                format!(
                    "Row {} has {} values but the result has {} columns",
                    row_index,
                    cells.len(),
                    width
                ),
            )
            .with_context(ErrorContext::Scan {
                row_index,
                expected_columns: width,
                actual_columns: cells.len(),
            }));
        }

        self.rows.push(
            cells
                .into_iter()
                .map(|cell| cell.unwrap_or_else(|| NULL_MARKER.to_string()))
                .collect(),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector() -> TabularCollector {
        let mut collector = TabularCollector::new();
        collector
            .columns(vec![
                SqlColumn::new("id", "BIGINT"),
                SqlColumn::new("email", "VARCHAR"),
            ])
            .unwrap();
        collector
    }

    #[test]
    fn test_collects_rows_in_order() {
        let mut collector = collector();
        collector
            .row(vec![Some("1".into()), Some("a@b.io".into())])
            .unwrap();
        collector.row(vec![Some("2".into()), None]).unwrap();

        let result = collector.finish();
        assert_eq!(result.column_names, vec!["id", "email"]);
        assert_eq!(result.column_types["id"], "BIGINT");
        assert_eq!(result.column_types["email"], "VARCHAR");
        assert_eq!(result.rows[0], vec!["1", "a@b.io"]);
        assert_eq!(result.rows[1], vec!["2", "NIL"]);
    }

    #[test]
    fn test_underscore_columns_are_kept() {
        let mut collector = TabularCollector::new();
        collector
            .columns(vec![SqlColumn::new("_meta", "VARCHAR")])
            .unwrap();
        collector.row(vec![Some("x".into())]).unwrap();
        assert_eq!(collector.finish().column_names, vec!["_meta"]);
    }

    #[test]
    fn test_row_width_mismatch_is_scan_error() {
        let mut collector = collector();
        collector.row(vec![Some("1".into()), None]).unwrap();

        let err = collector.row(vec![Some("2".into())]).unwrap_err();
        assert_eq!(err.code, ErrorCode::ScanFailed);
        match err.context {
            Some(ErrorContext::Scan {
                row_index,
                expected_columns,
                actual_columns,
            }) => {
                assert_eq!(row_index, 1);
                assert_eq!(expected_columns, 2);
                assert_eq!(actual_columns, 1);
            }
            other => panic!("unexpected context: {:?}", other),
        }
    }

    #[test]
    fn test_row_without_columns_is_scan_error() {
        let mut collector = TabularCollector::new();
        let err = collector.row(vec![Some("1".into())]).unwrap_err();
        assert_eq!(err.code, ErrorCode::ScanFailed);
    }

    #[test]
    fn test_later_column_reports_are_ignored() {
        let mut collector = collector();
        collector
            .columns(vec![SqlColumn::new("other", "INT")])
            .unwrap();
        let result = collector.finish();
        assert_eq!(result.column_names, vec!["id", "email"]);
    }

    #[test]
    fn test_empty_result_set() {
        let result = collector().finish();
        assert_eq!(result.column_names.len(), 2);
        assert!(result.rows.is_empty());
    }
}
