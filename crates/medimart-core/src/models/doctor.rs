//! The two doctor schemas and their merged listing shape.
//!
//! `Doctor` is the bookable profile. `DoctorData` is a second, older profile
//! shape kept for directory listings; the two are never reconciled in
//! storage, only merged on read through [`DoctorSummary`].

use serde::{Deserialize, Serialize};
use time::Time;

use crate::collection::Collection;
use crate::error::Result;
use crate::models::{Meta, impl_document};
use crate::time::parse_slot;
use crate::validation;

/// Working day used when a doctor has not published explicit slots.
pub const DEFAULT_DAY_START: Time = time::macros::time!(09:00);
pub const DEFAULT_DAY_END: Time = time::macros::time!(17:00);
pub const DEFAULT_SLOT_MINUTES: i64 = 30;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    #[serde(flatten)]
    pub meta: Meta,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub specialization: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_years: Option<u32>,
    #[serde(default)]
    pub fees: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hospital: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Daily slot start times (`HH:MM`).
    #[serde(default)]
    pub slots: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default)]
    pub rating_count: u32,
}

impl_document!(Doctor, Collection::Doctors);

impl Doctor {
    pub fn validate(&self) -> Result<()> {
        validation::require("name", &self.name)?;
        validation::require_email("email", &self.email)?;
        validation::require("specialization", &self.specialization)?;
        validation::require_non_negative("fees", self.fees)?;
        for slot in &self.slots {
            parse_slot(slot)?;
        }
        Ok(())
    }

    /// Sorted, de-duplicated daily schedule.
    pub fn schedule(&self) -> Result<Vec<Time>> {
        if self.slots.is_empty() {
            return Ok(default_schedule());
        }
        let mut slots = self
            .slots
            .iter()
            .map(|s| parse_slot(s))
            .collect::<Result<Vec<_>>>()?;
        slots.sort();
        slots.dedup();
        Ok(slots)
    }
}

pub fn default_schedule() -> Vec<Time> {
    let mut slots = Vec::new();
    let mut current = DEFAULT_DAY_START;
    while current < DEFAULT_DAY_END {
        slots.push(current);
        current += time::Duration::minutes(DEFAULT_SLOT_MINUTES);
    }
    slots
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorData {
    #[serde(flatten)]
    pub meta: Meta,
    #[serde(default)]
    pub doctor_name: String,
    #[serde(default)]
    pub speciality: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years_of_experience: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consultation_fee: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinic_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
}

impl_document!(DoctorData, Collection::DoctorData);

impl DoctorData {
    pub fn validate(&self) -> Result<()> {
        validation::require("doctorName", &self.doctor_name)?;
        validation::require("speciality", &self.speciality)?;
        if let Some(fee) = self.consultation_fee {
            validation::require_non_negative("consultationFee", fee)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DoctorSource {
    Doctor,
    DoctorData,
}

/// One listing row regardless of which schema the doctor lives in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorSummary {
    pub id: String,
    pub name: String,
    pub specialization: String,
    pub experience_years: Option<u32>,
    pub fees: Option<f64>,
    pub source: DoctorSource,
}

impl From<&Doctor> for DoctorSummary {
    fn from(d: &Doctor) -> Self {
        Self {
            id: d.meta.id.clone(),
            name: d.name.clone(),
            specialization: d.specialization.clone(),
            experience_years: d.experience_years,
            fees: Some(d.fees),
            source: DoctorSource::Doctor,
        }
    }
}

impl From<&DoctorData> for DoctorSummary {
    fn from(d: &DoctorData) -> Self {
        Self {
            id: d.meta.id.clone(),
            name: d.doctor_name.clone(),
            specialization: d.speciality.clone(),
            experience_years: d.years_of_experience,
            fees: d.consultation_fee,
            source: DoctorSource::DoctorData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::time;

    fn doctor() -> Doctor {
        Doctor {
            name: "Dr. Mehta".into(),
            email: "mehta@clinic.in".into(),
            specialization: "Cardiology".into(),
            fees: 500.0,
            ..Default::default()
        }
    }

    #[test]
    fn default_schedule_covers_working_day() {
        let slots = default_schedule();
        assert_eq!(slots.first(), Some(&time!(09:00)));
        assert_eq!(slots.last(), Some(&time!(16:30)));
        assert_eq!(slots.len(), 16);
    }

    #[test]
    fn explicit_slots_are_sorted_and_deduplicated() {
        let mut d = doctor();
        d.slots = vec!["11:00".into(), "09:30".into(), "11:00".into()];
        assert_eq!(d.schedule().unwrap(), vec![time!(09:30), time!(11:00)]);
    }

    #[test]
    fn rejects_malformed_slot() {
        let mut d = doctor();
        d.slots = vec!["nine".into()];
        assert!(d.validate().is_err());
    }

    #[test]
    fn summaries_from_both_schemas() {
        let mut d = doctor();
        d.meta.id = "d1".into();
        let a = DoctorSummary::from(&d);
        assert_eq!(a.source, DoctorSource::Doctor);
        assert_eq!(a.fees, Some(500.0));

        let dd = DoctorData {
            meta: Meta::with_id("d2"),
            doctor_name: "Dr. Rao".into(),
            speciality: "Dermatology".into(),
            years_of_experience: Some(7),
            ..Default::default()
        };
        let b = DoctorSummary::from(&dd);
        assert_eq!(b.name, "Dr. Rao");
        assert_eq!(b.specialization, "Dermatology");
        assert_eq!(b.fees, None);
        assert_eq!(b.source, DoctorSource::DoctorData);
    }
}
