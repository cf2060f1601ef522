use std::collections::BTreeSet;

use chrono::{DateTime, SubsecRound as _, Utc};
use shutter_core::{
  entity::{Person, Photo},
  event::{NewEvent, PhotoEvent, Transform},
  page::{Page, PageRequest},
  permission::{Permission, SubjectPermissions},
  store::Store,
};
use shutter_media::MediaStore;
use uuid::Uuid;

use super::access::{check_grantees, check_owner_kept, photo_with};
use crate::{auth::CurrentUser, error::ApiError};

pub struct PhotoService<'a, S> {
  store: &'a S,
  media: &'a MediaStore,
}

impl<'a, S: Store> PhotoService<'a, S> {
  pub fn new(store: &'a S, media: &'a MediaStore) -> Self { Self { store, media } }

  /// Store an upload and record it. The same file can be uploaded once per
  /// owner.
  pub async fn upload(&self, actor: &CurrentUser, bytes: Vec<u8>) -> Result<Photo, ApiError> {
    let probe = shutter_media::probe(&bytes)?;
    if let Some(existing) = self
      .store
      .photo_by_owner_and_hash(actor.id(), &probe.hash)
      .await
      .map_err(ApiError::store)?
    {
      return Err(ApiError::PhotoAlreadyUploaded(existing.id));
    }

    let id = Uuid::new_v4();
    self.media.save(id, bytes).await?;

    let appended = self
      .store
      .append_photo_event(NewEvent::new(id, actor.source(), PhotoEvent::Uploaded {
        owner_id:     actor.id(),
        hash:         probe.hash.clone(),
        content_type: probe.content_type.to_owned(),
      }))
      .await;
    if let Err(e) = appended {
      if let Err(cleanup) = self.media.delete(id).await {
        tracing::warn!(photo_id = %id, error = %cleanup, "orphaned photo files");
      }
      // A concurrent upload of the same file wins the unique index.
      if let Some(existing) = self
        .store
        .photo_by_owner_and_hash(actor.id(), &probe.hash)
        .await
        .map_err(ApiError::store)?
      {
        return Err(ApiError::PhotoAlreadyUploaded(existing.id));
      }
      return Err(ApiError::store(e));
    }

    tracing::info!(photo_id = %id, owner_id = %actor.id(), "uploaded photo");
    self.fetch(id).await
  }

  async fn fetch(&self, id: Uuid) -> Result<Photo, ApiError> {
    self
      .store
      .photo_by_id(id)
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::EntityNotFound(id))
  }

  pub async fn get(&self, actor: &CurrentUser, id: Uuid) -> Result<Photo, ApiError> {
    photo_with(self.store, actor, id, Permission::Read).await
  }

  /// Photos the caller can read; every photo for admins.
  pub async fn list(
    &self,
    actor: &CurrentUser,
    page: PageRequest,
  ) -> Result<Page<Photo>, ApiError> {
    let readable_by = (!actor.is_admin()).then(|| actor.id());
    self.store.photos(readable_by, page).await.map_err(ApiError::store)
  }

  pub async fn update(
    &self,
    actor: &CurrentUser,
    id: Uuid,
    shooting_date: Option<DateTime<Utc>>,
  ) -> Result<Photo, ApiError> {
    photo_with(self.store, actor, id, Permission::Update).await?;
    let shooting_date = shooting_date.map(|date| date.trunc_subsecs(6));
    self
      .store
      .append_photo_event(NewEvent::new(id, actor.source(), PhotoEvent::Updated {
        shooting_date,
      }))
      .await
      .map_err(ApiError::store)?;
    self.fetch(id).await
  }

  /// Rotate both stored copies clockwise by `degrees`, a multiple of 90.
  pub async fn rotate(
    &self,
    actor: &CurrentUser,
    id: Uuid,
    degrees: i32,
  ) -> Result<Photo, ApiError> {
    let transform = Transform::rotation(degrees)?;
    photo_with(self.store, actor, id, Permission::Update).await?;

    self.media.transform(id, transform).await?;
    self
      .store
      .append_photo_event(NewEvent::new(id, actor.source(), PhotoEvent::Transformed {
        transform,
      }))
      .await
      .map_err(ApiError::store)?;
    self.fetch(id).await
  }

  pub async fn delete(&self, actor: &CurrentUser, id: Uuid) -> Result<(), ApiError> {
    photo_with(self.store, actor, id, Permission::Delete).await?;
    self
      .store
      .append_photo_event(NewEvent::new(id, actor.source(), PhotoEvent::Deleted))
      .await
      .map_err(ApiError::store)?;
    if let Err(e) = self.media.delete(id).await {
      tracing::error!(photo_id = %id, error = %e, "failed to remove photo files");
    }
    tracing::info!(photo_id = %id, "deleted photo");
    Ok(())
  }

  /// The uploaded file as is.
  pub async fn raw(&self, actor: &CurrentUser, id: Uuid) -> Result<(Photo, Vec<u8>), ApiError> {
    let photo = photo_with(self.store, actor, id, Permission::Read).await?;
    let bytes = self.media.read_raw(id).await?;
    Ok((photo, bytes))
  }

  /// The bounded JPEG copy.
  pub async fn compressed(
    &self,
    actor: &CurrentUser,
    id: Uuid,
  ) -> Result<(Photo, Vec<u8>), ApiError> {
    let photo = photo_with(self.store, actor, id, Permission::Read).await?;
    let bytes = self.media.read_compressed(id).await?;
    Ok((photo, bytes))
  }

  pub async fn people(&self, actor: &CurrentUser, id: Uuid) -> Result<Vec<Person>, ApiError> {
    photo_with(self.store, actor, id, Permission::Read).await?;
    self.store.photo_people(id).await.map_err(ApiError::store)
  }

  /// Tag and untag people. Every person to tag must exist.
  pub async fn update_people(
    &self,
    actor: &CurrentUser,
    id: Uuid,
    people_to_add: BTreeSet<Uuid>,
    people_to_remove: BTreeSet<Uuid>,
  ) -> Result<Vec<Person>, ApiError> {
    photo_with(self.store, actor, id, Permission::Update).await?;

    let existing = self
      .store
      .existing_person_ids(people_to_add.clone())
      .await
      .map_err(ApiError::store)?;
    let missing: BTreeSet<Uuid> = people_to_add.difference(&existing).copied().collect();
    if !missing.is_empty() {
      return Err(ApiError::ResourcesNotFound(missing));
    }

    if !people_to_add.is_empty() || !people_to_remove.is_empty() {
      self
        .store
        .append_photo_event(NewEvent::new(id, actor.source(), PhotoEvent::PeopleUpdated {
          people_to_add,
          people_to_remove,
        }))
        .await
        .map_err(ApiError::store)?;
    }
    self.store.photo_people(id).await.map_err(ApiError::store)
  }

  pub async fn permissions(
    &self,
    actor: &CurrentUser,
    id: Uuid,
  ) -> Result<Vec<SubjectPermissions>, ApiError> {
    photo_with(self.store, actor, id, Permission::Read).await?;
    self.store.photo_permissions(id).await.map_err(ApiError::store)
  }

  pub async fn update_permissions(
    &self,
    actor: &CurrentUser,
    id: Uuid,
    permissions_to_add: Vec<SubjectPermissions>,
    permissions_to_remove: Vec<SubjectPermissions>,
  ) -> Result<Vec<SubjectPermissions>, ApiError> {
    let photo = photo_with(self.store, actor, id, Permission::UpdatePermissions).await?;
    check_owner_kept(photo.owner_id, &permissions_to_remove)?;
    check_grantees(self.store, &permissions_to_add).await?;

    self
      .store
      .append_photo_event(NewEvent::new(id, actor.source(), PhotoEvent::PermissionsUpdated {
        permissions_to_add,
        permissions_to_remove,
      }))
      .await
      .map_err(ApiError::store)?;
    self.store.photo_permissions(id).await.map_err(ApiError::store)
  }
}
