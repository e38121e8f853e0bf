use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::error::Result;
use crate::models::{Meta, Role, impl_document};
use crate::validation;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Booking,
    Order,
    Payment,
    Prescription,
    #[default]
    System,
}

/// In-app notification addressed to one account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(flatten)]
    pub meta: Meta,
    #[serde(default)]
    pub recipient_id: String,
    #[serde(default)]
    pub recipient_role: Role,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub kind: NotificationKind,
    #[serde(default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl_document!(Notification, Collection::Notifications);

impl Notification {
    pub fn new(
        recipient_id: impl Into<String>,
        recipient_role: Role,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            recipient_role,
            kind,
            title: title.into(),
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        validation::require("recipientId", &self.recipient_id)?;
        validation::require("title", &self.title)?;
        validation::require("message", &self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_notification_is_unread() {
        let n = Notification::new("d1", Role::Doctor, NotificationKind::Booking, "New booking", "x")
            .with_link("/bookings/b1");
        assert!(!n.read);
        assert!(n.validate().is_ok());
        let v = serde_json::to_value(&n).unwrap();
        assert_eq!(v["recipientRole"], "doctor");
        assert_eq!(v["kind"], "booking");
        assert_eq!(v["link"], "/bookings/b1");
    }
}
