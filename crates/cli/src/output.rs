//! Structured output handling for CLI commands.

use owo_colors::OwoColorize;
use polyquery_common::TabularResult;
use serde::Serialize;

#[derive(clap::ValueEnum, Clone, Debug, Default, PartialEq, Eq, Copy)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Returns true if the output format is intended for machine consumption
    pub fn is_machine_readable(&self) -> bool {
        match self {
            OutputFormat::Human => false,
            OutputFormat::Json | OutputFormat::Yaml => true,
        }
    }
}

/// Envelope for machine-readable responses
#[derive(Serialize)]
pub struct CommandResponse<T> {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
    #[serde(flatten)]
    pub data: T,
}

impl<T> CommandResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: None,
            exit_code: Some(0),
            error: None,
            data,
        }
    }

    pub fn error(
        message: String,
        exit_code: i32,
        error: Option<serde_json::Value>,
        data: T,
    ) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message),
            exit_code: Some(exit_code),
            error,
            data,
        }
    }
}

/// Print the output to stdout in the requested format
pub fn print_output<T: Serialize>(format: OutputFormat, data: T) -> anyhow::Result<()> {
    match format {
        OutputFormat::Human => {
            // Commands print their own human output
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&data)?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(&data)?;
            println!("{}", yaml);
        }
    }
    Ok(())
}

/// Print a structured success response for machine outputs
pub fn print_success<T: Serialize>(format: OutputFormat, data: T) -> anyhow::Result<()> {
    if format == OutputFormat::Human {
        return Ok(());
    }

    let response = CommandResponse::success(data);
    print_output(format, response)
}

/// Print a structured error response for machine outputs.
///
/// A coded error is included whole under `error`.
pub fn print_error(
    format: OutputFormat,
    err: &anyhow::Error,
    exit_code: i32,
) -> anyhow::Result<()> {
    if format == OutputFormat::Human {
        return Ok(());
    }

    let coded = err
        .downcast_ref::<polyquery_error::PolyQueryError>()
        .map(serde_json::to_value)
        .transpose()?;
    let response = CommandResponse::error(
        format!("{:#}", err),
        exit_code,
        coded,
        serde_json::Map::new(),
    );
    print_output(format, response)
}

#[derive(Debug, Serialize)]
pub struct ColumnOutput {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// Machine-readable form of a query result
#[derive(Debug, Serialize)]
pub struct QueryOutput {
    pub backend: String,
    pub row_count: usize,
    pub columns: Vec<ColumnOutput>,
    pub rows: Vec<Vec<String>>,
}

impl QueryOutput {
    pub fn new(backend: &str, result: TabularResult) -> Self {
        let columns = result
            .column_names
            .iter()
            .map(|name| ColumnOutput {
                name: name.clone(),
                type_name: result.column_types.get(name).cloned().unwrap_or_default(),
            })
            .collect();
        Self {
            backend: backend.to_string(),
            row_count: result.rows.len(),
            columns,
            rows: result.rows,
        }
    }
}

/// Render a result as an aligned text table, without colors.
pub fn render_table(result: &TabularResult) -> String {
    let mut widths: Vec<usize> = result
        .column_names
        .iter()
        .map(|n| n.chars().count())
        .collect();
    for row in &result.rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&line(&result.column_names));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for row in &result.rows {
        out.push_str(&line(row));
        out.push('\n');
    }
    out
}

pub fn print_table(result: &TabularResult) {
    let table = render_table(result);
    let mut lines = table.lines();
    if let Some(header) = lines.next() {
        println!("{}", header.bold());
    }
    for line in lines {
        println!("{}", line);
    }
    let suffix = if result.row_count() == 1 { "" } else { "s" };
    println!(
        "{}",
        format!("({} row{})", result.row_count(), suffix).dimmed()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample() -> TabularResult {
        TabularResult {
            column_types: HashMap::from([
                ("id".to_string(), "BIGINT".to_string()),
                ("name".to_string(), "VARCHAR".to_string()),
            ]),
            column_names: vec!["id".to_string(), "name".to_string()],
            rows: vec![
                vec!["1".to_string(), "alice".to_string()],
                vec!["22".to_string(), "NIL".to_string()],
            ],
        }
    }

    #[test]
    fn test_render_table_aligns_columns() {
        let table = render_table(&sample());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "id | name");
        assert_eq!(lines[1], "---+------");
        assert_eq!(lines[2], "1  | alice");
        assert_eq!(lines[3], "22 | NIL");
    }

    #[test]
    fn test_query_output_keeps_column_order() {
        let output = QueryOutput::new("mysql", sample());
        assert_eq!(output.row_count, 2);
        assert_eq!(output.columns[0].name, "id");
        assert_eq!(output.columns[1].type_name, "VARCHAR");

        let json = serde_json::to_value(CommandResponse::success(output)).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["columns"][0]["type"], "BIGINT");
        assert_eq!(json["rows"][1][1], "NIL");
    }
}
