//! Per-patient medical record: the doctors a patient is connected to and the
//! prescriptions each of them issued.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::collection::Collection;
use crate::error::{CoreError, Result};
use crate::id::generate_id;
use crate::models::{Meta, impl_document};
use crate::validation;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescribedMedicine {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub frequency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: String,
    pub medicines: Vec<PrescribedMedicine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
}

impl Prescription {
    pub fn new(
        medicines: Vec<PrescribedMedicine>,
        notes: Option<String>,
        issued_at: OffsetDateTime,
    ) -> Result<Self> {
        if medicines.is_empty() {
            return Err(CoreError::invalid_field(
                "medicines",
                "a prescription needs at least one medicine",
            ));
        }
        for m in &medicines {
            validation::require("medicines.name", &m.name)?;
            validation::require("medicines.dosage", &m.dosage)?;
        }
        Ok(Self {
            id: generate_id(),
            medicines,
            notes,
            issued_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorConnection {
    pub doctor_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub connected_at: OffsetDateTime,
    #[serde(default)]
    pub prescriptions: Vec<Prescription>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    #[serde(flatten)]
    pub meta: Meta,
    #[serde(default)]
    pub patient_id: String,
    #[serde(default)]
    pub doctors: Vec<DoctorConnection>,
}

impl_document!(PatientRecord, Collection::PatientRecords);

impl PatientRecord {
    pub fn empty(patient_id: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        validation::require("patientId", &self.patient_id)
    }

    pub fn connection(&self, doctor_id: &str) -> Option<&DoctorConnection> {
        self.doctors.iter().find(|c| c.doctor_id == doctor_id)
    }

    /// Returns `true` when a new connection was added.
    pub fn connect(&mut self, doctor_id: &str, now: OffsetDateTime) -> bool {
        if self.connection(doctor_id).is_some() {
            return false;
        }
        self.doctors.push(DoctorConnection {
            doctor_id: doctor_id.to_string(),
            connected_at: now,
            prescriptions: Vec::new(),
        });
        true
    }

    /// Connects the doctor first if needed.
    pub fn add_prescription(&mut self, doctor_id: &str, prescription: Prescription) {
        self.connect(doctor_id, prescription.issued_at);
        if let Some(conn) = self.doctors.iter_mut().find(|c| c.doctor_id == doctor_id) {
            conn.prescriptions.push(prescription);
        }
    }

    /// Every prescription paired with the doctor who issued it, newest first.
    pub fn prescriptions(&self) -> Vec<(&str, &Prescription)> {
        let mut all: Vec<_> = self
            .doctors
            .iter()
            .flat_map(|c| c.prescriptions.iter().map(move |p| (c.doctor_id.as_str(), p)))
            .collect();
        all.sort_by(|a, b| b.1.issued_at.cmp(&a.1.issued_at));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn medicine() -> PrescribedMedicine {
        PrescribedMedicine {
            name: "Amoxicillin".into(),
            dosage: "500mg".into(),
            frequency: "twice daily".into(),
            duration_days: Some(5),
        }
    }

    #[test]
    fn connect_is_idempotent() {
        let mut rec = PatientRecord::empty("p1");
        let now = datetime!(2030-01-01 10:00 UTC);
        assert!(rec.connect("d1", now));
        assert!(!rec.connect("d1", now));
        assert_eq!(rec.doctors.len(), 1);
    }

    #[test]
    fn prescription_connects_doctor() {
        let mut rec = PatientRecord::empty("p1");
        let p = Prescription::new(vec![medicine()], None, datetime!(2030-01-01 10:00 UTC)).unwrap();
        rec.add_prescription("d2", p);
        assert_eq!(rec.connection("d2").unwrap().prescriptions.len(), 1);
    }

    #[test]
    fn empty_prescription_rejected() {
        let res = Prescription::new(vec![], None, datetime!(2030-01-01 10:00 UTC));
        assert!(res.is_err());
    }

    #[test]
    fn prescriptions_newest_first() {
        let mut rec = PatientRecord::empty("p1");
        let old = Prescription::new(vec![medicine()], None, datetime!(2030-01-01 10:00 UTC)).unwrap();
        let new = Prescription::new(vec![medicine()], None, datetime!(2030-02-01 10:00 UTC)).unwrap();
        rec.add_prescription("d1", old);
        rec.add_prescription("d2", new);
        let list = rec.prescriptions();
        assert_eq!(list[0].0, "d2");
        assert_eq!(list[1].0, "d1");
    }
}
