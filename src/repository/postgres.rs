//! PostgreSQL subscriber repository.
//!
//! # Atomicity Guarantees
//!
//! Inserts, updates and deletes run inside a single PostgreSQL transaction,
//! so a subscriber and its types are never observed half-written.

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use std::collections::HashMap;

use crate::{
    db::DbPool,
    models::subscriber::{
        NewSubscriber, Subscriber, SubscriberChanges, SubscriberRow, SubscriberType,
        SubscriberTypeName, TypesUpdate,
    },
    repository::SubscriberRepository,
};

#[derive(Debug, Clone)]
pub struct PgSubscriberRepository {
    pool: DbPool,
}

impl PgSubscriberRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

async fn insert_types(
    tx: &mut Transaction<'_, Postgres>,
    subscriber_id: i32,
    names: &[SubscriberTypeName],
) -> Result<(), sqlx::Error> {
    for name in names {
        sqlx::query("INSERT INTO subscriber_types (subscriber_id, name) VALUES ($1, $2)")
            .bind(subscriber_id)
            .bind(name)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

async fn types_for(
    tx: &mut Transaction<'_, Postgres>,
    subscriber_id: i32,
) -> Result<Vec<SubscriberType>, sqlx::Error> {
    sqlx::query_as::<_, SubscriberType>(
        r#"
        SELECT id, subscriber_id, name, created_at, updated_at
        FROM subscriber_types
        WHERE subscriber_id = $1
        ORDER BY id
        "#,
    )
    .bind(subscriber_id)
    .fetch_all(&mut **tx)
    .await
}

#[async_trait]
impl SubscriberRepository for PgSubscriberRepository {
    async fn insert(&self, subscriber: NewSubscriber) -> Result<Subscriber, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, SubscriberRow>(
            r#"
            INSERT INTO subscribers (email, name)
            VALUES ($1, $2)
            RETURNING id, email, name, created_at, updated_at
            "#,
        )
        .bind(&subscriber.email)
        .bind(&subscriber.name)
        .fetch_one(&mut *tx)
        .await?;

        insert_types(&mut tx, row.id, &subscriber.subscriber_types).await?;
        let types = types_for(&mut tx, row.id).await?;

        tx.commit().await?;

        Ok(Subscriber::from_row(row, types))
    }

    async fn find(&self, id: i32) -> Result<Option<Subscriber>, sqlx::Error> {
        // Read both tables in one snapshot
        let mut tx = self.pool.begin().await?;

        let Some(row) = sqlx::query_as::<_, SubscriberRow>(
            "SELECT id, email, name, created_at, updated_at FROM subscribers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };

        let types = types_for(&mut tx, id).await?;
        tx.commit().await?;

        Ok(Some(Subscriber::from_row(row, types)))
    }

    async fn list(&self) -> Result<Vec<Subscriber>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query_as::<_, SubscriberRow>(
            "SELECT id, email, name, created_at, updated_at FROM subscribers ORDER BY id",
        )
        .fetch_all(&mut *tx)
        .await?;

        let types = sqlx::query_as::<_, SubscriberType>(
            "SELECT id, subscriber_id, name, created_at, updated_at FROM subscriber_types ORDER BY id",
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        // Group types under their owning subscriber
        let mut by_subscriber: HashMap<i32, Vec<SubscriberType>> = HashMap::new();
        for subscriber_type in types {
            by_subscriber
                .entry(subscriber_type.subscriber_id)
                .or_default()
                .push(subscriber_type);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let types = by_subscriber.remove(&row.id).unwrap_or_default();
                Subscriber::from_row(row, types)
            })
            .collect())
    }

    async fn update(
        &self,
        id: i32,
        changes: SubscriberChanges,
    ) -> Result<Option<Subscriber>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let Some(row) = sqlx::query_as::<_, SubscriberRow>(
            r#"
            UPDATE subscribers
            SET email = $1,
                name = $2,
                updated_at = NOW()
            WHERE id = $3
            RETURNING id, email, name, created_at, updated_at
            "#,
        )
        .bind(&changes.email)
        .bind(&changes.name)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        if let TypesUpdate::Replace(names) = &changes.subscriber_types {
            sqlx::query("DELETE FROM subscriber_types WHERE subscriber_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            insert_types(&mut tx, id, names).await?;
        }

        let types = types_for(&mut tx, id).await?;

        tx.commit().await?;

        Ok(Some(Subscriber::from_row(row, types)))
    }

    async fn delete(&self, id: i32) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // Children first, then the parent row
        sqlx::query("DELETE FROM subscriber_types WHERE subscriber_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM subscribers WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
