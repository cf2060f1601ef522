//! Event types, the source of truth of the Shutter store.
//!
//! An event is an immutable record of one change to one aggregate (a user, an
//! album, a photo or a person). Events are never updated or deleted; the
//! current state of an aggregate is the fold of its event stream, see
//! [`crate::fold`].

use std::{collections::BTreeSet, net::IpAddr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{
  Error, Result, entity::Role, permission::SubjectPermissions,
};

// ─── Source ──────────────────────────────────────────────────────────────────

/// Who caused an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventSource {
  /// An authenticated user acting through the API.
  User {
    id: Uuid,
    /// Remote address of the request, when the transport exposes it.
    ip: Option<IpAddr>,
  },
  /// The server itself, e.g. when bootstrapping the root user.
  System,
}

// ─── Envelope ────────────────────────────────────────────────────────────────

/// A persisted event. `date` and `number` are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event<K> {
  pub date:       DateTime<Utc>,
  /// The aggregate this event belongs to.
  pub subject_id: Uuid,
  /// Position in the aggregate's stream; 1 for the first event.
  pub number:     i64,
  pub source:     EventSource,
  pub content:    K,
}

/// Input to the `append_*_event` methods of [`crate::store::Store`].
#[derive(Debug, Clone)]
pub struct NewEvent<K> {
  pub subject_id: Uuid,
  pub source:     EventSource,
  pub content:    K,
}

impl<K> NewEvent<K> {
  pub fn new(subject_id: Uuid, source: EventSource, content: K) -> Self {
    Self { subject_id, source, content }
  }
}

// ─── Content encoding ────────────────────────────────────────────────────────

/// Shared encoding for every event kind enum.
///
/// Implementors derive serde with `tag = "type", content = "data"` so the
/// variant name doubles as the `kind` column and the payload is stored on its
/// own in the `content` column.
pub trait EventContent:
  Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
  /// Every discriminant this kind can produce.
  const KINDS: &'static [&'static str];

  /// The discriminant string stored in the `kind` column.
  fn discriminant(&self) -> &'static str;

  /// Serialise the payload (without the type tag).
  fn to_json(&self) -> Result<serde_json::Value> {
    let full = serde_json::to_value(self)?;
    Ok(full.get("data").cloned().unwrap_or(serde_json::Value::Null))
  }

  /// Rebuild from the discriminant and payload stored in the database.
  fn from_parts(discriminant: &str, data: serde_json::Value) -> Result<Self> {
    if !Self::KINDS.contains(&discriminant) {
      return Err(Error::UnknownEventKind(discriminant.to_owned()));
    }
    let wrapped = if data.is_null() {
      serde_json::json!({ "type": discriminant })
    } else {
      serde_json::json!({ "type": discriminant, "data": data })
    };
    Ok(serde_json::from_value(wrapped)?)
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum UserEvent {
  Created {
    name:          String,
    role:          Role,
    password_hash: String,
  },
  PasswordUpdated {
    password_hash: String,
  },
  Deleted,
}

impl EventContent for UserEvent {
  const KINDS: &'static [&'static str] =
    &["created", "password_updated", "deleted"];

  fn discriminant(&self) -> &'static str {
    match self {
      Self::Created { .. } => "created",
      Self::PasswordUpdated { .. } => "password_updated",
      Self::Deleted => "deleted",
    }
  }
}

// ─── Albums ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum AlbumEvent {
  Created {
    owner_id: Uuid,
    name:     String,
  },
  Updated {
    name: String,
  },
  Deleted,
  PhotosAdded {
    photos_ids: BTreeSet<Uuid>,
  },
  PhotosRemoved {
    photos_ids: BTreeSet<Uuid>,
  },
  PermissionsUpdated {
    permissions_to_add:    Vec<SubjectPermissions>,
    permissions_to_remove: Vec<SubjectPermissions>,
  },
}

impl EventContent for AlbumEvent {
  const KINDS: &'static [&'static str] = &[
    "created",
    "updated",
    "deleted",
    "photos_added",
    "photos_removed",
    "permissions_updated",
  ];

  fn discriminant(&self) -> &'static str {
    match self {
      Self::Created { .. } => "created",
      Self::Updated { .. } => "updated",
      Self::Deleted => "deleted",
      Self::PhotosAdded { .. } => "photos_added",
      Self::PhotosRemoved { .. } => "photos_removed",
      Self::PermissionsUpdated { .. } => "permissions_updated",
    }
  }
}

// ─── Photos ──────────────────────────────────────────────────────────────────

/// An image transformation applied to both stored copies of a photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Transform {
  /// Clockwise rotation; always 90, 180 or 270.
  Rotation { degrees: u16 },
}

impl Transform {
  /// Normalise `degrees` (which may be negative or exceed a full turn) to a
  /// clockwise quarter turn.
  pub fn rotation(degrees: i32) -> Result<Self> {
    if degrees % 90 != 0 {
      return Err(Error::InvalidRotation(degrees));
    }
    match degrees.rem_euclid(360) {
      0 => Err(Error::InvalidRotation(degrees)),
      normalized => Ok(Self::Rotation { degrees: normalized as u16 }),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PhotoEvent {
  Uploaded {
    owner_id:     Uuid,
    /// SHA-256 hex digest of the raw bytes.
    hash:         String,
    content_type: String,
  },
  Updated {
    shooting_date: Option<DateTime<Utc>>,
  },
  Transformed {
    transform: Transform,
  },
  Deleted,
  PeopleUpdated {
    people_to_add:    BTreeSet<Uuid>,
    people_to_remove: BTreeSet<Uuid>,
  },
  PermissionsUpdated {
    permissions_to_add:    Vec<SubjectPermissions>,
    permissions_to_remove: Vec<SubjectPermissions>,
  },
}

impl EventContent for PhotoEvent {
  const KINDS: &'static [&'static str] = &[
    "uploaded",
    "updated",
    "transformed",
    "deleted",
    "people_updated",
    "permissions_updated",
  ];

  fn discriminant(&self) -> &'static str {
    match self {
      Self::Uploaded { .. } => "uploaded",
      Self::Updated { .. } => "updated",
      Self::Transformed { .. } => "transformed",
      Self::Deleted => "deleted",
      Self::PeopleUpdated { .. } => "people_updated",
      Self::PermissionsUpdated { .. } => "permissions_updated",
    }
  }
}

// ─── People ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PersonEvent {
  Created {
    last_name:  String,
    first_name: String,
  },
  Updated {
    last_name:  String,
    first_name: String,
  },
  Deleted,
}

impl EventContent for PersonEvent {
  const KINDS: &'static [&'static str] = &["created", "updated", "deleted"];

  fn discriminant(&self) -> &'static str {
    match self {
      Self::Created { .. } => "created",
      Self::Updated { .. } => "updated",
      Self::Deleted => "deleted",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::permission::Permission;

  #[test]
  fn payload_excludes_type_tag() {
    let event = PersonEvent::Created {
      last_name:  "Doe".into(),
      first_name: "Jane".into(),
    };
    let json = event.to_json().unwrap();
    assert_eq!(json["last_name"], "Doe");
    assert!(json.get("type").is_none());
    assert_eq!(event.discriminant(), "created");
  }

  #[test]
  fn unit_variant_survives_storage_encoding() {
    let json = AlbumEvent::Deleted.to_json().unwrap();
    assert!(json.is_null());
    let back = AlbumEvent::from_parts("deleted", json).unwrap();
    assert_eq!(back, AlbumEvent::Deleted);
  }

  #[test]
  fn nested_permissions_survive_storage_encoding() {
    let subject_id = Uuid::new_v4();
    let event = PhotoEvent::PermissionsUpdated {
      permissions_to_add:    vec![SubjectPermissions::new(subject_id, [
        Permission::Read,
        Permission::Update,
      ])],
      permissions_to_remove: vec![],
    };
    let back =
      PhotoEvent::from_parts(event.discriminant(), event.to_json().unwrap())
        .unwrap();
    assert_eq!(back, event);
  }

  #[test]
  fn unknown_discriminant_is_rejected() {
    let err = UserEvent::from_parts("renamed", serde_json::Value::Null)
      .unwrap_err();
    assert!(matches!(err, Error::UnknownEventKind(k) if k == "renamed"));
  }

  #[test]
  fn rotation_is_normalised_to_a_quarter_turn() {
    assert_eq!(
      Transform::rotation(-90).unwrap(),
      Transform::Rotation { degrees: 270 }
    );
    assert_eq!(
      Transform::rotation(450).unwrap(),
      Transform::Rotation { degrees: 90 }
    );
    assert!(matches!(
      Transform::rotation(45),
      Err(Error::InvalidRotation(45))
    ));
    assert!(matches!(
      Transform::rotation(360),
      Err(Error::InvalidRotation(360))
    ));
  }
}
