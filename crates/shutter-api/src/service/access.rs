//! Permission evaluation shared by the album and photo services.
//!
//! A missing resource is `EntityNotFound`; an existing one the caller holds no
//! matching permission on is `Forbidden`. Admins hold every permission.

use std::collections::BTreeSet;

use shutter_core::{
  entity::{Album, Photo},
  permission::{Permission, SubjectPermissions},
  store::Store,
};
use uuid::Uuid;

use crate::{auth::CurrentUser, error::ApiError};

pub(crate) async fn album_with<S: Store>(
  store: &S,
  actor: &CurrentUser,
  album_id: Uuid,
  permission: Permission,
) -> Result<Album, ApiError> {
  let album = store
    .album_by_id(album_id)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::EntityNotFound(album_id))?;
  if actor.is_admin() {
    return Ok(album);
  }

  let granted = store
    .subject_album_permissions(actor.id(), album_id)
    .await
    .map_err(ApiError::store)?;
  if granted.contains(&permission) {
    Ok(album)
  } else {
    Err(ApiError::Forbidden)
  }
}

pub(crate) async fn photo_with<S: Store>(
  store: &S,
  actor: &CurrentUser,
  photo_id: Uuid,
  permission: Permission,
) -> Result<Photo, ApiError> {
  let photo = store
    .photo_by_id(photo_id)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::EntityNotFound(photo_id))?;
  if actor.is_admin() {
    return Ok(photo);
  }

  let granted = store
    .subject_photo_permissions(actor.id(), photo_id)
    .await
    .map_err(ApiError::store)?;
  if granted.contains(&permission) {
    Ok(photo)
  } else {
    Err(ApiError::Forbidden)
  }
}

/// Every grant names at least one permission, for an existing user.
pub(crate) async fn check_grantees<S: Store>(
  store: &S,
  to_add: &[SubjectPermissions],
) -> Result<(), ApiError> {
  if let Some(sp) = to_add.iter().find(|sp| sp.permissions.is_empty()) {
    return Err(ApiError::BadRequest(format!(
      "no permission granted to {}",
      sp.subject_id
    )));
  }

  let mut missing = BTreeSet::new();
  for sp in to_add {
    if store
      .user_by_id(sp.subject_id)
      .await
      .map_err(ApiError::store)?
      .is_none()
    {
      missing.insert(sp.subject_id);
    }
  }
  if missing.is_empty() {
    Ok(())
  } else {
    Err(ApiError::ResourcesNotFound(missing))
  }
}

/// The owner always keeps every permission on what they own.
pub(crate) fn check_owner_kept(
  owner_id: Uuid,
  to_remove: &[SubjectPermissions],
) -> Result<(), ApiError> {
  let touches_owner = to_remove
    .iter()
    .any(|sp| sp.subject_id == owner_id && !sp.permissions.is_empty());
  if touches_owner {
    Err(ApiError::BadRequest("the owner's permissions cannot be revoked".into()))
  } else {
    Ok(())
  }
}

/// Trim `value`, rejecting it when nothing is left.
pub(crate) fn non_blank(field: &str, value: &str) -> Result<String, ApiError> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    Err(ApiError::BadRequest(format!("{field} must not be blank")))
  } else {
    Ok(trimmed.to_owned())
  }
}
