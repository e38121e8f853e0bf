//! In-process keyed mutexes.
//!
//! Check-then-write sequences (slot booking, stock updates, registration)
//! take the lock for their key so two requests on one instance cannot
//! interleave. Separate instances are not coordinated.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for and holds the lock for `key` until the guard is dropped.
    pub async fn lock(&self, key: impl Into<String>) -> KeyGuard<'_> {
        let key = key.into();
        let mutex = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        // The map shard guard is released above, before awaiting.
        let guard = mutex.lock_owned().await;
        KeyGuard {
            locks: self,
            key,
            guard: Some(guard),
        }
    }

    /// Drops the entry for `key` unless another task still holds or awaits it.
    fn release(&self, key: &str) {
        self.locks
            .remove_if(key, |_, mutex| Arc::strong_count(mutex) == 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Holds a keyed lock. The map entry is removed on drop once unused.
#[derive(Debug)]
pub struct KeyGuard<'a> {
    locks: &'a KeyedLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(&self.key);
    }
}

pub fn doctor_key(doctor_id: &str) -> String {
    format!("doctor:{doctor_id}")
}

pub fn retailer_key(retailer_id: &str) -> String {
    format!("retailer:{retailer_id}")
}

pub fn patient_key(patient_id: &str) -> String {
    format!("patient:{patient_id}")
}

pub fn booking_key(booking_id: &str) -> String {
    format!("booking:{booking_id}")
}

pub fn order_key(order_id: &str) -> String {
    format!("order:{order_id}")
}

pub fn account_key(role: &str, email: &str) -> String {
    format!("account:{role}:{email}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::new());
        let guard = locks.lock(doctor_key("d1")).await;

        let l2 = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = l2.lock(doctor_key("d1")).await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.lock(doctor_key("d1")).await;
        let _b = tokio::time::timeout(Duration::from_secs(1), locks.lock(doctor_key("d2")))
            .await
            .unwrap();
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn entries_are_removed_when_released() {
        let locks = KeyedLocks::new();
        {
            let _a = locks.lock(order_key("o1")).await;
            let _b = locks.lock(account_key("patient", "asha@mail.in")).await;
            assert_eq!(locks.len(), 2);
        }
        assert!(locks.is_empty());

        for i in 0..100 {
            let _g = locks.lock(booking_key(&format!("missing-{i}"))).await;
        }
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn entry_survives_while_a_waiter_is_queued() {
        let locks = Arc::new(KeyedLocks::new());
        let guard = locks.lock(doctor_key("d1")).await;

        let l2 = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = l2.lock(doctor_key("d1")).await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(guard);
        assert_eq!(locks.len(), 1);

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(locks.is_empty());
    }
}
