use anyhow::Result;
use colored::Colorize;
use serde_json::Value;

use crate::cli::{OutputFormat, SearchArgs};
use crate::client::MedimartClient;
use crate::output::{Column, print_json, render_table};

const DOCTOR_COLUMNS: &[Column<'static>] = &[
    ("ID", "id"),
    ("Name", "name"),
    ("Specialization", "specialization"),
];

const PRODUCT_COLUMNS: &[Column<'static>] = &[
    ("ID", "id"),
    ("Name", "name"),
    ("Category", "category"),
    ("Price", "price"),
];

const BLOG_COLUMNS: &[Column<'static>] = &[("ID", "id"), ("Title", "title"), ("Tags", "tags")];

const GROUPS: [(&str, &[Column<'static>]); 3] = [
    ("doctors", DOCTOR_COLUMNS),
    ("products", PRODUCT_COLUMNS),
    ("blogs", BLOG_COLUMNS),
];

pub async fn search(client: &MedimartClient, args: &SearchArgs, format: OutputFormat) -> Result<()> {
    let mut query: Vec<(&str, String)> = vec![("q", args.query.clone())];
    if let Some(kind) = &args.kind {
        query.push(("type", kind.clone()));
    }
    if let Some(limit) = args.limit {
        query.push(("limit", limit.to_string()));
    }
    let results = client.get("search", &query).await?;
    if format == OutputFormat::Json {
        print_json(&results);
        return Ok(());
    }

    let mut any = false;
    for (group, columns) in GROUPS {
        let Some(rows) = results.get(group).and_then(Value::as_array) else {
            continue;
        };
        if rows.is_empty() {
            continue;
        }
        any = true;
        println!("{} ({})", group.cyan().bold(), rows.len());
        println!("{}", render_table(rows, columns));
    }
    if !any {
        println!("Nothing matches \"{}\".", args.query);
    }
    Ok(())
}
