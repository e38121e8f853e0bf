use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Document collections known to the marketplace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Patients,
    Doctors,
    DoctorData,
    Retailers,
    Products,
    Bookings,
    DietYoga,
    Orders,
    PatientRecords,
    Transactions,
    Blogs,
    Notifications,
    Credentials,
}

impl Collection {
    pub const ALL: [Collection; 13] = [
        Collection::Patients,
        Collection::Doctors,
        Collection::DoctorData,
        Collection::Retailers,
        Collection::Products,
        Collection::Bookings,
        Collection::DietYoga,
        Collection::Orders,
        Collection::PatientRecords,
        Collection::Transactions,
        Collection::Blogs,
        Collection::Notifications,
        Collection::Credentials,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Patients => "patients",
            Collection::Doctors => "doctors",
            Collection::DoctorData => "doctor_data",
            Collection::Retailers => "retailers",
            Collection::Products => "products",
            Collection::Bookings => "bookings",
            Collection::DietYoga => "diet_yoga",
            Collection::Orders => "orders",
            Collection::PatientRecords => "patient_records",
            Collection::Transactions => "transactions",
            Collection::Blogs => "blogs",
            Collection::Notifications => "notifications",
            Collection::Credentials => "credentials",
        }
    }

    /// Singular label used in error messages ("Booking 42 not found").
    pub fn label(&self) -> &'static str {
        match self {
            Collection::Patients => "Patient",
            Collection::Doctors => "Doctor",
            Collection::DoctorData => "DoctorData",
            Collection::Retailers => "Retailer",
            Collection::Products => "Product",
            Collection::Bookings => "Booking",
            Collection::DietYoga => "DietYoga",
            Collection::Orders => "Order",
            Collection::PatientRecords => "PatientRecord",
            Collection::Transactions => "Transaction",
            Collection::Blogs => "Blog",
            Collection::Notifications => "Notification",
            Collection::Credentials => "Credential",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CoreError::UnknownCollection(s.to_string()))
    }
}
