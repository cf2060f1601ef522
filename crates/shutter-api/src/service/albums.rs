use std::collections::BTreeSet;

use shutter_core::{
  entity::{Album, Photo},
  event::{AlbumEvent, NewEvent},
  page::{Page, PageRequest},
  permission::{Permission, SubjectPermissions},
  store::Store,
};
use uuid::Uuid;

use super::access::{album_with, check_grantees, check_owner_kept, non_blank};
use crate::{auth::CurrentUser, error::ApiError};

pub struct AlbumService<'a, S> {
  store: &'a S,
}

impl<'a, S: Store> AlbumService<'a, S> {
  pub fn new(store: &'a S) -> Self { Self { store } }

  pub async fn create(&self, actor: &CurrentUser, name: &str) -> Result<Album, ApiError> {
    let name = non_blank("name", name)?;
    let id = Uuid::new_v4();
    self
      .store
      .append_album_event(NewEvent::new(id, actor.source(), AlbumEvent::Created {
        owner_id: actor.id(),
        name,
      }))
      .await
      .map_err(ApiError::store)?;
    tracing::info!(album_id = %id, owner_id = %actor.id(), "created album");
    self.fetch(id).await
  }

  async fn fetch(&self, id: Uuid) -> Result<Album, ApiError> {
    self
      .store
      .album_by_id(id)
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::EntityNotFound(id))
  }

  pub async fn get(&self, actor: &CurrentUser, id: Uuid) -> Result<Album, ApiError> {
    album_with(self.store, actor, id, Permission::Read).await
  }

  /// Albums the caller can read; every album for admins.
  pub async fn list(
    &self,
    actor: &CurrentUser,
    page: PageRequest,
  ) -> Result<Page<Album>, ApiError> {
    let readable_by = (!actor.is_admin()).then(|| actor.id());
    self.store.albums(readable_by, page).await.map_err(ApiError::store)
  }

  pub async fn rename(
    &self,
    actor: &CurrentUser,
    id: Uuid,
    name: &str,
  ) -> Result<Album, ApiError> {
    let name = non_blank("name", name)?;
    album_with(self.store, actor, id, Permission::Update).await?;
    self
      .store
      .append_album_event(NewEvent::new(id, actor.source(), AlbumEvent::Updated { name }))
      .await
      .map_err(ApiError::store)?;
    self.fetch(id).await
  }

  pub async fn delete(&self, actor: &CurrentUser, id: Uuid) -> Result<(), ApiError> {
    album_with(self.store, actor, id, Permission::Delete).await?;
    self
      .store
      .append_album_event(NewEvent::new(id, actor.source(), AlbumEvent::Deleted))
      .await
      .map_err(ApiError::store)?;
    tracing::info!(album_id = %id, "deleted album");
    Ok(())
  }

  pub async fn photos(
    &self,
    actor: &CurrentUser,
    id: Uuid,
    page: PageRequest,
  ) -> Result<Page<Photo>, ApiError> {
    album_with(self.store, actor, id, Permission::Read).await?;
    self.store.album_photos(id, page).await.map_err(ApiError::store)
  }

  /// Add photos the caller can read. Unknown ids fail the whole request.
  pub async fn add_photos(
    &self,
    actor: &CurrentUser,
    id: Uuid,
    photos_ids: BTreeSet<Uuid>,
  ) -> Result<(), ApiError> {
    album_with(self.store, actor, id, Permission::Update).await?;
    if photos_ids.is_empty() {
      return Ok(());
    }

    let existing = self
      .store
      .existing_photo_ids(photos_ids.clone())
      .await
      .map_err(ApiError::store)?;
    let missing: BTreeSet<Uuid> = photos_ids.difference(&existing).copied().collect();
    if !missing.is_empty() {
      return Err(ApiError::ResourcesNotFound(missing));
    }
    if !actor.is_admin() {
      for photo_id in &photos_ids {
        let granted = self
          .store
          .subject_photo_permissions(actor.id(), *photo_id)
          .await
          .map_err(ApiError::store)?;
        if !granted.contains(&Permission::Read) {
          return Err(ApiError::Forbidden);
        }
      }
    }

    self
      .store
      .append_album_event(NewEvent::new(id, actor.source(), AlbumEvent::PhotosAdded {
        photos_ids,
      }))
      .await
      .map_err(ApiError::store)?;
    Ok(())
  }

  pub async fn remove_photos(
    &self,
    actor: &CurrentUser,
    id: Uuid,
    photos_ids: BTreeSet<Uuid>,
  ) -> Result<(), ApiError> {
    album_with(self.store, actor, id, Permission::Update).await?;
    if photos_ids.is_empty() {
      return Ok(());
    }
    self
      .store
      .append_album_event(NewEvent::new(id, actor.source(), AlbumEvent::PhotosRemoved {
        photos_ids,
      }))
      .await
      .map_err(ApiError::store)?;
    Ok(())
  }

  pub async fn permissions(
    &self,
    actor: &CurrentUser,
    id: Uuid,
  ) -> Result<Vec<SubjectPermissions>, ApiError> {
    album_with(self.store, actor, id, Permission::Read).await?;
    self.store.album_permissions(id).await.map_err(ApiError::store)
  }

  pub async fn update_permissions(
    &self,
    actor: &CurrentUser,
    id: Uuid,
    permissions_to_add: Vec<SubjectPermissions>,
    permissions_to_remove: Vec<SubjectPermissions>,
  ) -> Result<Vec<SubjectPermissions>, ApiError> {
    let album = album_with(self.store, actor, id, Permission::UpdatePermissions).await?;
    check_owner_kept(album.owner_id, &permissions_to_remove)?;
    check_grantees(self.store, &permissions_to_add).await?;

    self
      .store
      .append_album_event(NewEvent::new(id, actor.source(), AlbumEvent::PermissionsUpdated {
        permissions_to_add,
        permissions_to_remove,
      }))
      .await
      .map_err(ApiError::store)?;
    self.store.album_permissions(id).await.map_err(ApiError::store)
  }
}
