use super::client::AthenaColumn;
use polyquery_common::{TabularResult, NULL_MARKER};
use std::collections::HashMap;

/// Athena prefixes synthetic bookkeeping columns with an underscore.
fn is_metadata_column(name: &str) -> bool {
    name.starts_with('_')
}

/// Turn Athena columns and rows into a [`TabularResult`].
///
/// Metadata columns are dropped from names and types, and the same number of
/// leading cells is skipped in every row. The header row Athena returns first
/// is kept.
pub fn normalize(columns: &[AthenaColumn], rows: Vec<Vec<Option<String>>>) -> TabularResult {
    let mut column_types = HashMap::with_capacity(columns.len());
    let mut column_names = Vec::with_capacity(columns.len());
    let mut data_start_index = 0usize;

    for column in columns {
        if is_metadata_column(&column.name) {
            data_start_index += 1;
            continue;
        }
        column_types.insert(column.name.clone(), column.type_name.clone());
        column_names.push(column.name.clone());
    }

    let rows = rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .skip(data_start_index)
                .map(|cell| cell.unwrap_or_else(|| NULL_MARKER.to_string()))
                .collect()
        })
        .collect();

    TabularResult {
        column_types,
        column_names,
        rows,
    }
}
