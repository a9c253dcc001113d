//! Subscriber aggregate models and API request types.
//!
//! This module defines:
//! - `Subscriber`: a subscriber together with its owned subscriber types
//! - `SubscriberType`: one row of the `subscriber_types` table
//! - `SubscriberRequest`: request body for create and update
//! - `NewSubscriber` / `SubscriberChanges`: validated writes handed to the repository

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of subscriber kinds, mirrored by the `subscriber_type` Postgres enum.
///
/// Adding a kind requires a migration that extends the enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "subscriber_type", rename_all = "lowercase")]
pub enum SubscriberTypeName {
    Shopper,
    Business,
    Driver,
    Champion,
    Donor,
    Developer,
}

/// Represents a subscriber record from the `subscribers` table, without its types.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubscriberRow {
    pub id: i32,
    pub email: String,
    /// Nullable in the schema; always written non-blank by this service.
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A type tag owned by one subscriber.
///
/// # Database Table
///
/// Maps to `subscriber_types`. Rows are created only as part of a subscriber
/// create/update and are removed when the parent's types are replaced or the
/// parent is deleted.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct SubscriberType {
    pub id: i32,
    pub subscriber_id: i32,
    pub name: SubscriberTypeName,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A subscriber with its types attached, as returned by every endpoint.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": 7,
///   "email": "jane@example.com",
///   "name": "Jane",
///   "subscriber_types": [
///     {"id": 12, "subscriber_id": 7, "name": "shopper", "created_at": "...", "updated_at": "..."}
///   ],
///   "created_at": "2025-12-20T10:00:00Z",
///   "updated_at": "2025-12-20T10:00:00Z"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscriber {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub subscriber_types: Vec<SubscriberType>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscriber {
    pub fn from_row(row: SubscriberRow, subscriber_types: Vec<SubscriberType>) -> Self {
        Self {
            id: row.id,
            email: row.email,
            name: row.name.unwrap_or_default(),
            subscriber_types,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// One entry of `subscriber_types` in a request. Other fields (ids, timestamps) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriberTypeInput {
    pub name: SubscriberTypeName,
}

/// Request body for creating or updating a subscriber.
///
/// # JSON Example
///
/// ```json
/// {
///   "email": "jane@example.com",
///   "name": "Jane",
///   "subscriber_types": [{"name": "shopper"}, {"name": "donor"}]
/// }
/// ```
///
/// `subscriber_types` is three-way on update: absent (or `null`) keeps the
/// existing types, `[]` removes them all, a non-empty list replaces them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriberRequest {
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub subscriber_types: Option<Vec<SubscriberTypeInput>>,
}

impl SubscriberRequest {
    pub fn type_names(&self) -> Option<Vec<SubscriberTypeName>> {
        self.subscriber_types
            .as_ref()
            .map(|types| types.iter().map(|t| t.name).collect())
    }
}

/// Validated insert for a new aggregate.
#[derive(Debug, Clone)]
pub struct NewSubscriber {
    pub email: String,
    pub name: String,
    pub subscriber_types: Vec<SubscriberTypeName>,
}

/// What an update does to the owned types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypesUpdate {
    /// Leave existing types untouched.
    Keep,
    /// Delete every existing type, then insert these (possibly none).
    Replace(Vec<SubscriberTypeName>),
}

/// Validated update for an existing aggregate.
#[derive(Debug, Clone)]
pub struct SubscriberChanges {
    pub email: String,
    pub name: String,
    pub subscriber_types: TypesUpdate,
}
