use anyhow::Result;
use colored::Colorize;
use serde_json::Value;

use crate::cli::{DoctorsArgs, OutputFormat, SlotsArgs};
use crate::client::MedimartClient;
use crate::output::{Column, print_json, print_list};

const DOCTOR_COLUMNS: &[Column<'static>] = &[
    ("ID", "id"),
    ("Name", "name"),
    ("Specialization", "specialization"),
    ("Fees", "fees"),
    ("Rating", "rating"),
];

const DIRECTORY_COLUMNS: &[Column<'static>] = &[
    ("ID", "id"),
    ("Name", "name"),
    ("Specialization", "specialization"),
    ("Experience", "experienceYears"),
    ("Source", "source"),
];

pub async fn list(client: &MedimartClient, args: &DoctorsArgs, format: OutputFormat) -> Result<()> {
    if args.all {
        let doctors = client.get("doctors/all-data", &()).await?;
        print_list(&doctors, DIRECTORY_COLUMNS, format, "No doctors found.");
        return Ok(());
    }
    let mut query: Vec<(&str, &str)> = Vec::new();
    if let Some(s) = &args.specialization {
        query.push(("specialization", s.as_str()));
    }
    if let Some(q) = &args.query {
        query.push(("q", q.as_str()));
    }
    let doctors = client.get("doctors", &query).await?;
    print_list(&doctors, DOCTOR_COLUMNS, format, "No doctors found.");
    Ok(())
}

pub async fn slots(client: &MedimartClient, args: &SlotsArgs, format: OutputFormat) -> Result<()> {
    let query: Vec<(&str, &str)> = args.date.iter().map(|d| ("date", d.as_str())).collect();
    let availability = client
        .get(&format!("doctors/{}/slots", args.doctor_id), &query)
        .await?;
    if format == OutputFormat::Json {
        print_json(&availability);
        return Ok(());
    }
    let date = availability.get("date").and_then(Value::as_str).unwrap_or("-");
    let open = string_list(&availability, "slots");
    let booked = string_list(&availability, "booked");
    println!("{} {}", "Date:".cyan(), date);
    if open.is_empty() {
        println!("{}", "No open slots.".yellow());
    } else {
        println!("{} {}", "Open:".green(), open.join("  "));
    }
    if !booked.is_empty() {
        println!("{} {}", "Booked:".red(), booked.join("  "));
    }
    Ok(())
}

fn string_list<'a>(value: &'a Value, key: &str) -> Vec<&'a str> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_slot_lists() {
        let v = json!({"slots": ["09:00", "09:30"], "booked": []});
        assert_eq!(string_list(&v, "slots"), vec!["09:00", "09:30"]);
        assert!(string_list(&v, "booked").is_empty());
        assert!(string_list(&v, "missing").is_empty());
    }
}
