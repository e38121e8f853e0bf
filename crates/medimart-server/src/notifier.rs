//! In-app notifications written as a side effect of other operations.
//!
//! A failed notification never fails the request that triggered it.

use medimart_core::models::{Notification, NotificationKind, Role};
use medimart_storage::{DocumentStorage, Repository};

pub async fn notify(
    storage: &dyn DocumentStorage,
    recipient_id: &str,
    role: Role,
    kind: NotificationKind,
    title: &str,
    message: String,
    link: Option<String>,
) {
    let mut notification = Notification::new(recipient_id, role, kind, title, message);
    if let Some(link) = link {
        notification = notification.with_link(link);
    }
    if let Err(e) = Repository::<Notification>::new(storage)
        .create(&notification)
        .await
    {
        tracing::warn!(
            recipient = recipient_id,
            role = %role,
            error = %e,
            "failed to store notification"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medimart_db_memory::InMemoryStorage;
    use medimart_storage::FindQuery;
    use tokio_test::block_on;

    #[test]
    fn stores_unread_notification_with_link() {
        let storage = InMemoryStorage::new();
        block_on(notify(
            &storage,
            "pat-1",
            Role::Patient,
            NotificationKind::Booking,
            "Booking confirmed",
            "Your consultation is confirmed".into(),
            Some("/bookings/b1".into()),
        ));

        let stored = block_on(
            Repository::<Notification>::new(&storage)
                .find(&FindQuery::new().eq("recipientId", "pat-1")),
        )
        .unwrap();
        assert_eq!(stored.len(), 1);
        assert!(!stored[0].read);
        assert_eq!(stored[0].kind, NotificationKind::Booking);
        assert_eq!(stored[0].link.as_deref(), Some("/bookings/b1"));
    }
}
