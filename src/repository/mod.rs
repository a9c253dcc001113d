//! Persistence for the subscriber aggregate.
//!
//! Every mutation touches a subscriber and its types together, so each
//! method is one unit of work: an implementation must apply it fully or not at all.

use async_trait::async_trait;

use crate::models::subscriber::{NewSubscriber, Subscriber, SubscriberChanges};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgSubscriberRepository;

#[async_trait]
pub trait SubscriberRepository: Send + Sync {
    /// Insert a subscriber and its types, returning the stored aggregate.
    async fn insert(&self, subscriber: NewSubscriber) -> Result<Subscriber, sqlx::Error>;

    async fn find(&self, id: i32) -> Result<Option<Subscriber>, sqlx::Error>;

    /// All subscribers, ordered by id.
    async fn list(&self) -> Result<Vec<Subscriber>, sqlx::Error>;

    /// Overwrite base fields and apply the types change. `None` if `id` does not exist.
    async fn update(
        &self,
        id: i32,
        changes: SubscriberChanges,
    ) -> Result<Option<Subscriber>, sqlx::Error>;

    /// Delete a subscriber and its types. `false` if `id` does not exist.
    async fn delete(&self, id: i32) -> Result<bool, sqlx::Error>;

    async fn ping(&self) -> Result<(), sqlx::Error>;
}
