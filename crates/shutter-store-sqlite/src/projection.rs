//! Projection side effects of each event kind.
//!
//! Every function here runs inside the transaction that inserts the event, so
//! a projection never lags behind its stream. They are also replayed verbatim
//! by `rebuild_projections`.

use rusqlite::{Connection, params};
use shutter_core::{
  event::{AlbumEvent, Event, PersonEvent, PhotoEvent, UserEvent},
  permission::{PermissionFlags, SubjectPermissions},
};

use crate::encode::{encode_dt, encode_role, encode_uuid};

pub fn project_user(
  conn: &Connection,
  event: &Event<UserEvent>,
) -> rusqlite::Result<()> {
  let id = encode_uuid(event.subject_id);
  match &event.content {
    UserEvent::Created { name, role, password_hash } => {
      conn.execute(
        "INSERT INTO \"user\" (id, creation_date, name, role, password_hash)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, encode_dt(event.date), name, encode_role(*role), password_hash],
      )?;
    }
    UserEvent::PasswordUpdated { password_hash } => {
      conn.execute(
        "UPDATE \"user\" SET password_hash = ?2 WHERE id = ?1",
        params![id, password_hash],
      )?;
    }
    UserEvent::Deleted => {
      conn.execute("DELETE FROM \"user\" WHERE id = ?1", params![id])?;
    }
  }
  Ok(())
}

pub fn project_album(
  conn: &Connection,
  event: &Event<AlbumEvent>,
) -> rusqlite::Result<()> {
  let id = encode_uuid(event.subject_id);
  match &event.content {
    AlbumEvent::Created { owner_id, name } => {
      conn.execute(
        "INSERT INTO album (id, owner_id, creation_date, name)
         VALUES (?1, ?2, ?3, ?4)",
        params![id, encode_uuid(*owner_id), encode_dt(event.date), name],
      )?;
      update_acl(conn, Resource::Album, &id, &[SubjectPermissions::all(*owner_id)], &[])?;
    }
    AlbumEvent::Updated { name } => {
      conn.execute("UPDATE album SET name = ?2 WHERE id = ?1", params![id, name])?;
    }
    AlbumEvent::Deleted => {
      conn.execute("DELETE FROM album_photo WHERE album_id = ?1", params![id])?;
      conn.execute(
        "DELETE FROM album_authorization WHERE album_id = ?1",
        params![id],
      )?;
      conn.execute("DELETE FROM album WHERE id = ?1", params![id])?;
    }
    AlbumEvent::PhotosAdded { photos_ids } => {
      let mut stmt = conn.prepare_cached(
        "INSERT OR IGNORE INTO album_photo (album_id, photo_id) VALUES (?1, ?2)",
      )?;
      for photo_id in photos_ids {
        stmt.execute(params![id, encode_uuid(*photo_id)])?;
      }
    }
    AlbumEvent::PhotosRemoved { photos_ids } => {
      let mut stmt = conn.prepare_cached(
        "DELETE FROM album_photo WHERE album_id = ?1 AND photo_id = ?2",
      )?;
      for photo_id in photos_ids {
        stmt.execute(params![id, encode_uuid(*photo_id)])?;
      }
    }
    AlbumEvent::PermissionsUpdated { permissions_to_add, permissions_to_remove } => {
      update_acl(conn, Resource::Album, &id, permissions_to_add, permissions_to_remove)?;
    }
  }
  Ok(())
}

pub fn project_photo(
  conn: &Connection,
  event: &Event<PhotoEvent>,
) -> rusqlite::Result<()> {
  let id = encode_uuid(event.subject_id);
  match &event.content {
    PhotoEvent::Uploaded { owner_id, hash, content_type } => {
      conn.execute(
        "INSERT INTO photo (id, owner_id, upload_date, hash, content_type, version)
         VALUES (?1, ?2, ?3, ?4, ?5, 1)",
        params![id, encode_uuid(*owner_id), encode_dt(event.date), hash, content_type],
      )?;
      update_acl(conn, Resource::Photo, &id, &[SubjectPermissions::all(*owner_id)], &[])?;
    }
    PhotoEvent::Updated { shooting_date } => {
      conn.execute(
        "UPDATE photo SET shooting_date = ?2 WHERE id = ?1",
        params![id, shooting_date.map(encode_dt)],
      )?;
    }
    PhotoEvent::Transformed { .. } => {
      conn.execute(
        "UPDATE photo SET version = version + 1 WHERE id = ?1",
        params![id],
      )?;
    }
    PhotoEvent::Deleted => {
      conn.execute("DELETE FROM photo_person WHERE photo_id = ?1", params![id])?;
      conn.execute(
        "DELETE FROM photo_authorization WHERE photo_id = ?1",
        params![id],
      )?;
      conn.execute("DELETE FROM photo WHERE id = ?1", params![id])?;
    }
    PhotoEvent::PeopleUpdated { people_to_add, people_to_remove } => {
      let mut insert = conn.prepare_cached(
        "INSERT OR IGNORE INTO photo_person (photo_id, person_id) VALUES (?1, ?2)",
      )?;
      for person_id in people_to_add {
        insert.execute(params![id, encode_uuid(*person_id)])?;
      }
      let mut delete = conn.prepare_cached(
        "DELETE FROM photo_person WHERE photo_id = ?1 AND person_id = ?2",
      )?;
      for person_id in people_to_remove {
        delete.execute(params![id, encode_uuid(*person_id)])?;
      }
    }
    PhotoEvent::PermissionsUpdated { permissions_to_add, permissions_to_remove } => {
      update_acl(conn, Resource::Photo, &id, permissions_to_add, permissions_to_remove)?;
    }
  }
  Ok(())
}

pub fn project_person(
  conn: &Connection,
  event: &Event<PersonEvent>,
) -> rusqlite::Result<()> {
  let id = encode_uuid(event.subject_id);
  match &event.content {
    PersonEvent::Created { last_name, first_name } => {
      conn.execute(
        "INSERT INTO person (id, creation_date, last_name, first_name)
         VALUES (?1, ?2, ?3, ?4)",
        params![id, encode_dt(event.date), last_name, first_name],
      )?;
    }
    PersonEvent::Updated { last_name, first_name } => {
      conn.execute(
        "UPDATE person SET last_name = ?2, first_name = ?3 WHERE id = ?1",
        params![id, last_name, first_name],
      )?;
    }
    PersonEvent::Deleted => {
      conn.execute("DELETE FROM person WHERE id = ?1", params![id])?;
    }
  }
  Ok(())
}

// ─── Authorizations ──────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Resource {
  Album,
  Photo,
}

impl Resource {
  fn table(self) -> &'static str {
    match self {
      Resource::Album => "album_authorization",
      Resource::Photo => "photo_authorization",
    }
  }

  fn column(self) -> &'static str {
    match self {
      Resource::Album => "album_id",
      Resource::Photo => "photo_id",
    }
  }
}

/// Grant `to_add`, then revoke `to_remove`, then drop rows left empty.
fn update_acl(
  conn: &Connection,
  resource: Resource,
  resource_id: &str,
  to_add: &[SubjectPermissions],
  to_remove: &[SubjectPermissions],
) -> rusqlite::Result<()> {
  let (table, column) = (resource.table(), resource.column());

  let mut grant = conn.prepare_cached(&format!(
    "INSERT INTO {table}
       (subject_id, {column}, \"read\", \"update\", \"delete\", update_permissions)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
     ON CONFLICT (subject_id, {column}) DO UPDATE SET
       \"read\"             = \"read\" OR excluded.\"read\",
       \"update\"           = \"update\" OR excluded.\"update\",
       \"delete\"           = \"delete\" OR excluded.\"delete\",
       update_permissions = update_permissions OR excluded.update_permissions"
  ))?;
  for sp in to_add {
    let flags: PermissionFlags = sp.permissions.iter().collect();
    if flags.is_empty() {
      continue;
    }
    grant.execute(params![
      encode_uuid(sp.subject_id),
      resource_id,
      flags.read,
      flags.update,
      flags.delete,
      flags.update_permissions,
    ])?;
  }

  let mut revoke = conn.prepare_cached(&format!(
    "UPDATE {table} SET
       \"read\"             = \"read\" AND NOT ?3,
       \"update\"           = \"update\" AND NOT ?4,
       \"delete\"           = \"delete\" AND NOT ?5,
       update_permissions = update_permissions AND NOT ?6
     WHERE subject_id = ?1 AND {column} = ?2"
  ))?;
  for sp in to_remove {
    let flags: PermissionFlags = sp.permissions.iter().collect();
    revoke.execute(params![
      encode_uuid(sp.subject_id),
      resource_id,
      flags.read,
      flags.update,
      flags.delete,
      flags.update_permissions,
    ])?;
  }

  if !to_remove.is_empty() {
    conn.execute(
      &format!(
        "DELETE FROM {table}
         WHERE {column} = ?1
           AND NOT (\"read\" OR \"update\" OR \"delete\" OR update_permissions)"
      ),
      params![resource_id],
    )?;
  }
  Ok(())
}

