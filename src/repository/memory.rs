//! In-process repository used by service and route tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::{
    models::subscriber::{
        NewSubscriber, Subscriber, SubscriberChanges, SubscriberType, SubscriberTypeName,
        TypesUpdate,
    },
    repository::SubscriberRepository,
};

#[derive(Default)]
struct Inner {
    next_id: i32,
    next_type_id: i32,
    subscribers: BTreeMap<i32, Subscriber>,
    writes: usize,
    fail: bool,
}

impl Inner {
    fn check(&self) -> Result<(), sqlx::Error> {
        if self.fail {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(())
    }

    fn build_types(&mut self, subscriber_id: i32, names: &[SubscriberTypeName]) -> Vec<SubscriberType> {
        names
            .iter()
            .map(|name| {
                self.next_type_id += 1;
                let now = Utc::now();
                SubscriberType {
                    id: self.next_type_id,
                    subscriber_id,
                    name: *name,
                    created_at: now,
                    updated_at: now,
                }
            })
            .collect()
    }
}

#[derive(Default)]
pub struct MemoryRepository {
    inner: Mutex<Inner>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful mutations so far.
    pub fn writes(&self) -> usize {
        self.inner.lock().unwrap().writes
    }

    pub fn fail_all(&self) {
        self.inner.lock().unwrap().fail = true;
    }
}

#[async_trait]
impl SubscriberRepository for MemoryRepository {
    async fn insert(&self, subscriber: NewSubscriber) -> Result<Subscriber, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.check()?;

        inner.next_id += 1;
        let id = inner.next_id;
        let now = Utc::now();
        let subscriber_types = inner.build_types(id, &subscriber.subscriber_types);
        let stored = Subscriber {
            id,
            email: subscriber.email,
            name: subscriber.name,
            subscriber_types,
            created_at: now,
            updated_at: now,
        };

        inner.subscribers.insert(id, stored.clone());
        inner.writes += 1;
        Ok(stored)
    }

    async fn find(&self, id: i32) -> Result<Option<Subscriber>, sqlx::Error> {
        let inner = self.inner.lock().unwrap();
        inner.check()?;
        Ok(inner.subscribers.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Subscriber>, sqlx::Error> {
        let inner = self.inner.lock().unwrap();
        inner.check()?;
        Ok(inner.subscribers.values().cloned().collect())
    }

    async fn update(
        &self,
        id: i32,
        changes: SubscriberChanges,
    ) -> Result<Option<Subscriber>, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.check()?;

        if !inner.subscribers.contains_key(&id) {
            return Ok(None);
        }

        let replacement = match &changes.subscriber_types {
            TypesUpdate::Keep => None,
            TypesUpdate::Replace(names) => Some(inner.build_types(id, names)),
        };

        let Some(existing) = inner.subscribers.get_mut(&id) else {
            return Ok(None);
        };
        existing.email = changes.email;
        existing.name = changes.name;
        existing.updated_at = Utc::now();
        if let Some(types) = replacement {
            existing.subscriber_types = types;
        }
        let updated = existing.clone();

        inner.writes += 1;
        Ok(Some(updated))
    }

    async fn delete(&self, id: i32) -> Result<bool, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.check()?;

        let removed = inner.subscribers.remove(&id).is_some();
        if removed {
            inner.writes += 1;
        }
        Ok(removed)
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        self.inner.lock().unwrap().check()
    }
}
