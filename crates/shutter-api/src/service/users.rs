use shutter_core::{
  entity::{Role, User},
  event::{EventSource, NewEvent, UserEvent},
  page::{Page, PageRequest},
  store::Store,
};
use uuid::Uuid;

use super::access::non_blank;
use crate::{
  auth::{CurrentUser, hash_password, verify_password, verify_unknown_user},
  error::ApiError,
};

pub struct UserService<'a, S> {
  store: &'a S,
}

impl<'a, S: Store> UserService<'a, S> {
  pub fn new(store: &'a S) -> Self { Self { store } }

  /// Check a name and password pair.
  pub async fn authenticate(&self, name: &str, password: &str) -> Result<User, ApiError> {
    match self.store.user_by_name(name).await.map_err(ApiError::store)? {
      Some(user) if verify_password(password, &user.password_hash) => Ok(user),
      Some(_) => Err(ApiError::BadCredentials),
      None => {
        verify_unknown_user(password);
        Err(ApiError::BadCredentials)
      }
    }
  }

  pub async fn create(
    &self,
    actor: &CurrentUser,
    name: &str,
    password: &str,
    role: Role,
  ) -> Result<User, ApiError> {
    if !actor.is_admin() {
      return Err(ApiError::Forbidden);
    }
    self.insert(actor.source(), name, password, role).await
  }

  /// Create the first administrator when the store has no user at all.
  ///
  /// Returns `None` when users already exist.
  pub async fn bootstrap_root(
    &self,
    name: &str,
    password: &str,
  ) -> Result<Option<User>, ApiError> {
    if self.store.count_users().await.map_err(ApiError::store)? > 0 {
      return Ok(None);
    }
    let root = self.insert(EventSource::System, name, password, Role::Admin).await?;
    tracing::info!(name = %root.name, "created root user");
    Ok(Some(root))
  }

  async fn insert(
    &self,
    source: EventSource,
    name: &str,
    password: &str,
    role: Role,
  ) -> Result<User, ApiError> {
    let name = non_blank("name", name)?;
    if password.is_empty() {
      return Err(ApiError::BadRequest("password must not be empty".into()));
    }
    if let Some(existing) = self.store.user_by_name(&name).await.map_err(ApiError::store)? {
      return Err(ApiError::UserAlreadyExists(existing.id));
    }

    let id = Uuid::new_v4();
    let password_hash = hash_password(password)?;
    let appended = self
      .store
      .append_user_event(NewEvent::new(id, source, UserEvent::Created {
        name: name.clone(),
        role,
        password_hash,
      }))
      .await;
    if let Err(e) = appended {
      // A concurrent request may have taken the name.
      if let Some(existing) = self.store.user_by_name(&name).await.map_err(ApiError::store)? {
        return Err(ApiError::UserAlreadyExists(existing.id));
      }
      return Err(ApiError::store(e));
    }
    self.get(id).await
  }

  pub async fn get(&self, id: Uuid) -> Result<User, ApiError> {
    self
      .store
      .user_by_id(id)
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::EntityNotFound(id))
  }

  pub async fn list(&self, page: PageRequest) -> Result<Page<User>, ApiError> {
    self.store.users(page).await.map_err(ApiError::store)
  }

  pub async fn delete(&self, actor: &CurrentUser, id: Uuid) -> Result<(), ApiError> {
    if !actor.is_admin() {
      return Err(ApiError::Forbidden);
    }
    if actor.id() == id {
      return Err(ApiError::BadRequest("users cannot delete themselves".into()));
    }
    self.get(id).await?;
    self
      .store
      .append_user_event(NewEvent::new(id, actor.source(), UserEvent::Deleted))
      .await
      .map_err(ApiError::store)?;
    Ok(())
  }

  /// Change the caller's own password after checking the current one.
  pub async fn update_password(
    &self,
    actor: &CurrentUser,
    current_password: &str,
    new_password: &str,
  ) -> Result<(), ApiError> {
    if !verify_password(current_password, &actor.user.password_hash) {
      return Err(ApiError::BadCredentials);
    }
    if new_password.is_empty() {
      return Err(ApiError::BadRequest("password must not be empty".into()));
    }
    let password_hash = hash_password(new_password)?;
    self
      .store
      .append_user_event(NewEvent::new(
        actor.id(),
        actor.source(),
        UserEvent::PasswordUpdated { password_hash },
      ))
      .await
      .map_err(ApiError::store)?;
    Ok(())
  }
}
