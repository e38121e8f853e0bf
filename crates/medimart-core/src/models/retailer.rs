use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::error::Result;
use crate::models::{Meta, impl_document};
use crate::validation;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Retailer {
    #[serde(flatten)]
    pub meta: Meta,
    #[serde(default)]
    pub shop_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl_document!(Retailer, Collection::Retailers);

impl Retailer {
    pub fn validate(&self) -> Result<()> {
        validation::require("shopName", &self.shop_name)?;
        validation::require_email("email", &self.email)
    }
}
