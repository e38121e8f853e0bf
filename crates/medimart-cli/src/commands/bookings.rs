use anyhow::Result;
use serde_json::{Map, Value};

use crate::auth::{StoredCredentials, subject_or};
use crate::cli::{BookArgs, BookingsArgs, OutputFormat};
use crate::client::MedimartClient;
use crate::output::{Column, cell, print_json, print_list, print_success};

const BOOKING_COLUMNS: &[Column<'static>] = &[
    ("ID", "id"),
    ("Date", "date"),
    ("Slot", "timeSlot"),
    ("Doctor", "doctorId"),
    ("Patient", "patientId"),
    ("Status", "status"),
    ("Payment", "paymentStatus"),
    ("Amount", "amount"),
];

pub fn booking_body(args: &BookArgs, patient_id: String) -> Value {
    let mut body = Map::new();
    body.insert("doctorId".into(), args.doctor_id.clone().into());
    body.insert("patientId".into(), patient_id.into());
    body.insert("date".into(), args.date.clone().into());
    body.insert("timeSlot".into(), args.slot.clone().into());
    if let Some(reason) = &args.reason {
        body.insert("reason".into(), reason.clone().into());
    }
    Value::Object(body)
}

pub async fn book(
    client: &MedimartClient,
    args: &BookArgs,
    creds: Option<&StoredCredentials>,
    format: OutputFormat,
) -> Result<()> {
    let patient = subject_or(args.patient.as_deref(), creds, "patient")?;
    let booking = client.post("bookings", &booking_body(args, patient)).await?;
    if format == OutputFormat::Json {
        print_json(&booking);
    } else {
        print_success(&format!(
            "Booked {} {} (booking {}, amount {})",
            cell(&booking, "date"),
            cell(&booking, "timeSlot"),
            cell(&booking, "id"),
            cell(&booking, "amount"),
        ));
    }
    Ok(())
}

pub async fn list(
    client: &MedimartClient,
    args: &BookingsArgs,
    creds: Option<&StoredCredentials>,
    format: OutputFormat,
) -> Result<()> {
    let path = match &args.doctor {
        Some(doctor) => format!("bookings/doctor/{doctor}"),
        None => {
            let patient = subject_or(args.patient.as_deref(), creds, "patient")?;
            format!("bookings/patient/{patient}")
        }
    };
    let query: Vec<(&str, &str)> = args.status.iter().map(|s| ("status", s.as_str())).collect();
    let bookings = client.get(&path, &query).await?;
    print_list(&bookings, BOOKING_COLUMNS, format, "No bookings found.");
    Ok(())
}
