use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::error::{CoreError, Result};
use crate::models::{Meta, impl_document};
use crate::validation;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlan {
    #[serde(default)]
    pub meal: String,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YogaSession {
    #[serde(default)]
    pub asana: String,
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repetitions: Option<u32>,
}

/// Diet and yoga plan prescribed after a consultation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DietYoga {
    #[serde(flatten)]
    pub meta: Meta,
    #[serde(default)]
    pub booking_id: String,
    #[serde(default)]
    pub patient_id: String,
    #[serde(default)]
    pub doctor_id: String,
    #[serde(default)]
    pub diet_plan: Vec<MealPlan>,
    #[serde(default)]
    pub yoga_plan: Vec<YogaSession>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl_document!(DietYoga, Collection::DietYoga);

impl DietYoga {
    pub fn validate(&self) -> Result<()> {
        validation::require("bookingId", &self.booking_id)?;
        if self.diet_plan.is_empty() && self.yoga_plan.is_empty() {
            return Err(CoreError::invalid_field(
                "dietPlan",
                "a diet plan or a yoga plan is required",
            ));
        }
        for meal in &self.diet_plan {
            validation::require("dietPlan.meal", &meal.meal)?;
        }
        for session in &self.yoga_plan {
            validation::require("yogaPlan.asana", &session.asana)?;
            if session.duration_minutes == 0 {
                return Err(CoreError::invalid_field(
                    "yogaPlan.durationMinutes",
                    "must be greater than zero",
                ));
            }
        }
        Ok(())
    }
}
