use crate::cli::OutputFormat;
use colored::Colorize;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

/// A table column: header and the JSON field it shows.
pub type Column<'a> = (&'a str, &'a str);

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}

/// Prints a JSON array as a table, or as JSON.
pub fn print_list(value: &Value, columns: &[Column<'_>], format: OutputFormat, empty: &str) {
    if format == OutputFormat::Json {
        print_json(value);
        return;
    }
    let rows = value.as_array().map(Vec::as_slice).unwrap_or_default();
    if rows.is_empty() {
        println!("{empty}");
        return;
    }
    println!("{}", render_table(rows, columns));
    println!("Total: {}", rows.len());
}

pub fn render_table(rows: &[Value], columns: &[Column<'_>]) -> String {
    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|(header, _)| header.to_string()));
    for row in rows {
        builder.push_record(columns.iter().map(|(_, field)| cell(row, field)));
    }
    builder.build().with(Style::rounded()).to_string()
}

/// Renders one field; nested fields use dots (`feedback.rating`).
pub fn cell(row: &Value, field: &str) -> String {
    let value = field.split('.').try_fold(row, |v, key| v.get(key));
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => other.to_string(),
    }
}
