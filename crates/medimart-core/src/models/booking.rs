use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::{Date, OffsetDateTime, Time};

use crate::collection::Collection;
use crate::error::{CoreError, Result};
use crate::models::{Meta, impl_document};
use crate::time::{parse_date, parse_slot};
use crate::validation;

/// Appointment lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// pending -> confirmed | cancelled, confirmed -> completed | cancelled.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Completed) | (Confirmed, Cancelled)
        )
    }

    pub fn transition_to(self, next: BookingStatus) -> Result<BookingStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::invalid_transition(self, next))
        }
    }

    /// Whether the booking still occupies its slot.
    pub fn holds_slot(self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "pending"),
            BookingStatus::Confirmed => write!(f, "confirmed"),
            BookingStatus::Completed => write!(f, "completed"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for BookingStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(CoreError::invalid_field(
                "status",
                format!("'{other}' is not a booking status"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Refunded,
}

impl PaymentStatus {
    /// Once paid, a booking can only be refunded. Refunds are final.
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        self == next || matches!((self, next), (Pending, Paid) | (Paid, Refunded))
    }

    pub fn transition_to(self, next: PaymentStatus) -> Result<PaymentStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::invalid_transition(self, next))
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Refunded => write!(f, "refunded"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplement {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Supplement {
    pub fn validate(&self) -> Result<()> {
        validation::require("supplements.name", &self.name)?;
        validation::require("supplements.dosage", &self.dosage)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(flatten)]
    pub meta: Meta,
    #[serde(default)]
    pub doctor_id: String,
    #[serde(default)]
    pub patient_id: String,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub date: String,
    /// `HH:MM`
    #[serde(default)]
    pub time_slot: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub recommended_supplements: Vec<Supplement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub reviewed_at: Option<OffsetDateTime>,
}

impl_document!(Booking, Collection::Bookings);

impl Booking {
    pub fn validate(&self) -> Result<()> {
        validation::require("doctorId", &self.doctor_id)?;
        validation::require("patientId", &self.patient_id)?;
        validation::require("date", &self.date)?;
        validation::require("timeSlot", &self.time_slot)?;
        self.appointment()?;
        validation::require_non_negative("amount", self.amount)?;
        for s in &self.recommended_supplements {
            s.validate()?;
        }
        if let Some(r) = self.rating {
            validation::require_rating(r)?;
        }
        Ok(())
    }

    /// Parsed `(date, slot)` pair.
    pub fn appointment(&self) -> Result<(Date, Time)> {
        Ok((parse_date(&self.date)?, parse_slot(&self.time_slot)?))
    }

    pub fn is_reviewed(&self) -> bool {
        self.rating.is_some()
    }
}
