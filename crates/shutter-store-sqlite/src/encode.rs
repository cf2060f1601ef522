//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings with microsecond precision,
//! so they sort lexically. Event sources and payloads are stored as compact
//! JSON. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use shutter_core::{
  entity::{Album, Person, Photo, Role, User},
  event::{Event, EventContent, EventSource},
  permission::{PermissionFlags, SubjectPermissions},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

/// The current time at the precision the store keeps.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Role ─────────────────────────────────────────────────────────────────────

pub fn encode_role(role: Role) -> &'static str {
  match role {
    Role::User => "user",
    Role::Admin => "admin",
  }
}

pub fn decode_role(s: &str) -> Result<Role> {
  match s {
    "user" => Ok(Role::User),
    "admin" => Ok(Role::Admin),
    other => Err(Error::UnknownRole(other.to_owned())),
  }
}

// ─── EventSource ──────────────────────────────────────────────────────────────

pub fn encode_source(source: &EventSource) -> Result<String> {
  Ok(serde_json::to_string(source)?)
}

pub fn decode_source(s: &str) -> Result<EventSource> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list shared by every event table query, in [`RawEvent`] order.
pub const EVENT_COLUMNS: &str = "subject_id, number, date, source, kind, content";

/// Raw strings read directly from an `*_event` row.
pub struct RawEvent {
  pub subject_id: String,
  pub number:     i64,
  pub date:       String,
  pub source:     String,
  pub kind:       String,
  pub content:    String,
}

impl RawEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subject_id: row.get(0)?,
      number:     row.get(1)?,
      date:       row.get(2)?,
      source:     row.get(3)?,
      kind:       row.get(4)?,
      content:    row.get(5)?,
    })
  }

  pub fn into_event<K: EventContent>(self) -> Result<Event<K>> {
    let content: serde_json::Value = serde_json::from_str(&self.content)?;
    Ok(Event {
      date:       decode_dt(&self.date)?,
      subject_id: decode_uuid(&self.subject_id)?,
      number:     self.number,
      source:     decode_source(&self.source)?,
      content:    K::from_parts(&self.kind, content)?,
    })
  }
}

pub const USER_COLUMNS: &str = "id, creation_date, name, role, password_hash";

pub struct RawUser {
  pub id:            String,
  pub creation_date: String,
  pub name:          String,
  pub role:          String,
  pub password_hash: String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      creation_date: row.get(1)?,
      name:          row.get(2)?,
      role:          row.get(3)?,
      password_hash: row.get(4)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:            decode_uuid(&self.id)?,
      creation_date: decode_dt(&self.creation_date)?,
      name:          self.name,
      role:          decode_role(&self.role)?,
      password_hash: self.password_hash,
    })
  }
}

pub const ALBUM_COLUMNS: &str = "a.id, a.owner_id, a.creation_date, a.name";

pub struct RawAlbum {
  pub id:            String,
  pub owner_id:      String,
  pub creation_date: String,
  pub name:          String,
}

impl RawAlbum {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      owner_id:      row.get(1)?,
      creation_date: row.get(2)?,
      name:          row.get(3)?,
    })
  }

  pub fn into_album(self) -> Result<Album> {
    Ok(Album {
      id:            decode_uuid(&self.id)?,
      owner_id:      decode_uuid(&self.owner_id)?,
      creation_date: decode_dt(&self.creation_date)?,
      name:          self.name,
    })
  }
}

pub const PHOTO_COLUMNS: &str = "p.id, p.owner_id, p.upload_date, p.hash, \
                                 p.content_type, p.shooting_date, p.version";

pub struct RawPhoto {
  pub id:            String,
  pub owner_id:      String,
  pub upload_date:   String,
  pub hash:          String,
  pub content_type:  String,
  pub shooting_date: Option<String>,
  pub version:       i64,
}

impl RawPhoto {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      owner_id:      row.get(1)?,
      upload_date:   row.get(2)?,
      hash:          row.get(3)?,
      content_type:  row.get(4)?,
      shooting_date: row.get(5)?,
      version:       row.get(6)?,
    })
  }

  pub fn into_photo(self) -> Result<Photo> {
    Ok(Photo {
      id:            decode_uuid(&self.id)?,
      owner_id:      decode_uuid(&self.owner_id)?,
      upload_date:   decode_dt(&self.upload_date)?,
      hash:          self.hash,
      content_type:  self.content_type,
      shooting_date: self.shooting_date.as_deref().map(decode_dt).transpose()?,
      version:       self.version,
    })
  }
}

pub const PERSON_COLUMNS: &str =
  "pe.id, pe.creation_date, pe.last_name, pe.first_name";

pub struct RawPerson {
  pub id:            String,
  pub creation_date: String,
  pub last_name:     String,
  pub first_name:    String,
}

impl RawPerson {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      creation_date: row.get(1)?,
      last_name:     row.get(2)?,
      first_name:    row.get(3)?,
    })
  }

  pub fn into_person(self) -> Result<Person> {
    Ok(Person {
      id:            decode_uuid(&self.id)?,
      creation_date: decode_dt(&self.creation_date)?,
      last_name:     self.last_name,
      first_name:    self.first_name,
    })
  }
}

/// Column list of an authorization table, in [`RawAuthorization`] order.
pub const AUTHORIZATION_COLUMNS: &str =
  "subject_id, \"read\", \"update\", \"delete\", update_permissions";

/// One row of `album_authorization` or `photo_authorization`.
pub struct RawAuthorization {
  pub subject_id: String,
  pub flags:      PermissionFlags,
}

impl RawAuthorization {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subject_id: row.get(0)?,
      flags:      PermissionFlags {
        read:               row.get(1)?,
        update:             row.get(2)?,
        delete:             row.get(3)?,
        update_permissions: row.get(4)?,
      },
    })
  }

  pub fn into_subject_permissions(self) -> Result<SubjectPermissions> {
    Ok(SubjectPermissions {
      subject_id:  decode_uuid(&self.subject_id)?,
      permissions: self.flags.to_set(),
    })
  }
}
