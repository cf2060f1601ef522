//! Entity projections: the current state of each aggregate.
//!
//! These are read models. They are never written directly; the store keeps
//! them in sync with the event tables, and [`crate::fold`] can always
//! recompute them from the events alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a user may do beyond the per-resource permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  #[default]
  User,
  /// Holds every permission on every resource and manages users.
  Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:            Uuid,
  pub creation_date: DateTime<Utc>,
  pub name:          String,
  pub role:          Role,
  /// PHC string produced by argon2.
  pub password_hash: String,
}

impl User {
  pub fn is_admin(&self) -> bool { self.role == Role::Admin }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
  pub id:            Uuid,
  pub owner_id:      Uuid,
  pub creation_date: DateTime<Utc>,
  pub name:          String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
  pub id:            Uuid,
  pub owner_id:      Uuid,
  pub upload_date:   DateTime<Utc>,
  /// SHA-256 hex digest of the raw upload; unique per owner.
  pub hash:          String,
  pub content_type:  String,
  pub shooting_date: Option<DateTime<Utc>>,
  /// Starts at 1 and grows with every applied transform.
  pub version:       i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
  pub id:            Uuid,
  pub creation_date: DateTime<Utc>,
  pub last_name:     String,
  pub first_name:    String,
}
