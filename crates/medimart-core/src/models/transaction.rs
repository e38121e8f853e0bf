use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::error::Result;
use crate::models::{Meta, impl_document};
use crate::validation;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionPurpose {
    #[default]
    Booking,
    Order,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

/// A recorded payment. No gateway is involved; this is the ledger entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(flatten)]
    pub meta: Meta,
    #[serde(default)]
    pub payer_id: String,
    #[serde(default)]
    pub payee_id: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub purpose: TransactionPurpose,
    #[serde(default)]
    pub reference_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default)]
    pub status: TransactionStatus,
}

impl_document!(Transaction, Collection::Transactions);

impl Transaction {
    pub fn settled(
        purpose: TransactionPurpose,
        payer_id: impl Into<String>,
        payee_id: impl Into<String>,
        reference_id: impl Into<String>,
        amount: f64,
        method: Option<String>,
    ) -> Self {
        Self {
            payer_id: payer_id.into(),
            payee_id: payee_id.into(),
            reference_id: reference_id.into(),
            amount,
            purpose,
            method,
            status: TransactionStatus::Success,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        validation::require("payerId", &self.payer_id)?;
        validation::require("payeeId", &self.payee_id)?;
        validation::require("referenceId", &self.reference_id)?;
        validation::require_positive("amount", self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settled_is_successful() {
        let t = Transaction::settled(TransactionPurpose::Order, "p1", "r1", "o1", 40.0, None);
        assert_eq!(t.status, TransactionStatus::Success);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn amount_must_be_positive() {
        let t = Transaction::settled(TransactionPurpose::Booking, "p1", "d1", "b1", 0.0, None);
        assert!(t.validate().is_err());
    }
}
