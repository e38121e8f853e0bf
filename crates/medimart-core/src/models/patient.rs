use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::error::{CoreError, Result};
use crate::models::{Meta, impl_document};
use crate::validation;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[serde(flatten)]
    pub meta: Meta,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl_document!(Patient, Collection::Patients);

impl Patient {
    pub fn validate(&self) -> Result<()> {
        validation::require("name", &self.name)?;
        validation::require_email("email", &self.email)?;
        if let Some(age) = self.age
            && age > 150
        {
            return Err(CoreError::invalid_field("age", "must be between 0 and 150"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_partial_payload() {
        let p: Patient = serde_json::from_value(json!({
            "name": "Ravi",
            "email": "ravi@example.com",
            "age": 34
        }))
        .unwrap();
        assert_eq!(p.age, Some(34));
        assert!(p.validate().is_ok());
    }

    #[test]
    fn missing_name_is_reported() {
        let p: Patient = serde_json::from_value(json!({ "email": "x@y.io" })).unwrap();
        assert!(matches!(p.validate(), Err(CoreError::MissingField(f)) if f == "name"));
    }

    #[test]
    fn age_bound() {
        let p = Patient {
            name: "Old".into(),
            email: "old@example.com".into(),
            age: Some(200),
            ..Default::default()
        };
        assert!(p.validate().is_err());
    }
}
