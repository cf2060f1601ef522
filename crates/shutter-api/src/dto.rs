//! Request and response bodies. All of them are camelCase on the wire.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shutter_core::{
  entity::{Album, Person, Photo, Role, User},
  permission::SubjectPermissions,
};
use uuid::Uuid;

// ─── Responses ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
  pub id:            Uuid,
  pub creation_date: DateTime<Utc>,
  pub name:          String,
  pub role:          Role,
}

impl From<User> for UserDto {
  fn from(user: User) -> Self {
    Self {
      id:            user.id,
      creation_date: user.creation_date,
      name:          user.name,
      role:          user.role,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumDto {
  pub id:            Uuid,
  pub owner_id:      Uuid,
  pub creation_date: DateTime<Utc>,
  pub name:          String,
}

impl From<Album> for AlbumDto {
  fn from(album: Album) -> Self {
    Self {
      id:            album.id,
      owner_id:      album.owner_id,
      creation_date: album.creation_date,
      name:          album.name,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoDto {
  pub id:            Uuid,
  pub owner_id:      Uuid,
  pub upload_date:   DateTime<Utc>,
  pub hash:          String,
  pub content_type:  String,
  pub shooting_date: Option<DateTime<Utc>>,
  pub version:       i64,
}

impl From<Photo> for PhotoDto {
  fn from(photo: Photo) -> Self {
    Self {
      id:            photo.id,
      owner_id:      photo.owner_id,
      upload_date:   photo.upload_date,
      hash:          photo.hash,
      content_type:  photo.content_type,
      shooting_date: photo.shooting_date,
      version:       photo.version,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonDto {
  pub id:            Uuid,
  pub creation_date: DateTime<Utc>,
  pub last_name:     String,
  pub first_name:    String,
}

impl From<Person> for PersonDto {
  fn from(person: Person) -> Self {
    Self {
      id:            person.id,
      creation_date: person.creation_date,
      last_name:     person.last_name,
      first_name:    person.first_name,
    }
  }
}

// ─── Requests ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub name:     String,
  pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserBody {
  pub name:     String,
  pub password: String,
  #[serde(default)]
  pub role:     Role,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordBody {
  pub current_password: String,
  pub new_password:     String,
}

#[derive(Debug, Deserialize)]
pub struct AlbumBody {
  pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotosIdsBody {
  pub photos_ids: BTreeSet<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoBody {
  pub shooting_date: Option<DateTime<Utc>>,
}

/// `{"type":"rotation","degrees":-90}`
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformBody {
  Rotation { degrees: i32 },
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeopleBody {
  #[serde(default)]
  pub people_to_add:    BTreeSet<Uuid>,
  #[serde(default)]
  pub people_to_remove: BTreeSet<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionsBody {
  #[serde(default)]
  pub permissions_to_add:    Vec<SubjectPermissions>,
  #[serde(default)]
  pub permissions_to_remove: Vec<SubjectPermissions>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonBody {
  pub last_name:  String,
  pub first_name: String,
}
