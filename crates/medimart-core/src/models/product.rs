use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::error::Result;
use crate::models::{Meta, impl_document};
use crate::validation;

/// A medicine listed by a retailer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(flatten)]
    pub meta: Meta,
    #[serde(default)]
    pub retailer_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub requires_prescription: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl_document!(Product, Collection::Products);

impl Product {
    pub fn validate(&self) -> Result<()> {
        validation::require("retailerId", &self.retailer_id)?;
        validation::require("name", &self.name)?;
        validation::require_positive("price", self.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_must_be_positive() {
        let p = Product {
            retailer_id: "r1".into(),
            name: "Paracetamol 500mg".into(),
            price: 0.0,
            ..Default::default()
        };
        assert!(p.validate().is_err());
        let p = Product { price: 25.5, ..p };
        assert!(p.validate().is_ok());
    }
}
