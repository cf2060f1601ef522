use shutter_core::{
  entity::Person,
  event::{NewEvent, PersonEvent},
  page::{Page, PageRequest},
  store::Store,
};
use uuid::Uuid;

use super::access::non_blank;
use crate::{auth::CurrentUser, error::ApiError};

/// People are shared by every user; only admins delete them.
pub struct PersonService<'a, S> {
  store: &'a S,
}

impl<'a, S: Store> PersonService<'a, S> {
  pub fn new(store: &'a S) -> Self { Self { store } }

  pub async fn create(
    &self,
    actor: &CurrentUser,
    last_name: &str,
    first_name: &str,
  ) -> Result<Person, ApiError> {
    let last_name = non_blank("lastName", last_name)?;
    let first_name = non_blank("firstName", first_name)?;
    self.check_unique(&last_name, &first_name, None).await?;

    let id = Uuid::new_v4();
    let appended = self
      .store
      .append_person_event(NewEvent::new(id, actor.source(), PersonEvent::Created {
        last_name:  last_name.clone(),
        first_name: first_name.clone(),
      }))
      .await;
    self.settle(appended, &last_name, &first_name, None).await?;
    self.get(id).await
  }

  /// Turn a failed append into a conflict when a concurrent request took the
  /// name in the meantime.
  async fn settle<T, E>(
    &self,
    appended: Result<T, E>,
    last_name: &str,
    first_name: &str,
    except: Option<Uuid>,
  ) -> Result<T, ApiError>
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    match appended {
      Ok(value) => Ok(value),
      Err(e) => {
        self.check_unique(last_name, first_name, except).await?;
        Err(ApiError::store(e))
      }
    }
  }

  async fn check_unique(
    &self,
    last_name: &str,
    first_name: &str,
    except: Option<Uuid>,
  ) -> Result<(), ApiError> {
    match self
      .store
      .person_by_name(last_name, first_name)
      .await
      .map_err(ApiError::store)?
    {
      Some(existing) if Some(existing.id) != except => {
        Err(ApiError::PersonAlreadyExists(existing.id))
      }
      _ => Ok(()),
    }
  }

  pub async fn get(&self, id: Uuid) -> Result<Person, ApiError> {
    self
      .store
      .person_by_id(id)
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::EntityNotFound(id))
  }

  pub async fn list(&self, page: PageRequest) -> Result<Page<Person>, ApiError> {
    self.store.people(page).await.map_err(ApiError::store)
  }

  pub async fn update(
    &self,
    actor: &CurrentUser,
    id: Uuid,
    last_name: &str,
    first_name: &str,
  ) -> Result<Person, ApiError> {
    let last_name = non_blank("lastName", last_name)?;
    let first_name = non_blank("firstName", first_name)?;
    self.get(id).await?;
    self.check_unique(&last_name, &first_name, Some(id)).await?;

    let appended = self
      .store
      .append_person_event(NewEvent::new(id, actor.source(), PersonEvent::Updated {
        last_name:  last_name.clone(),
        first_name: first_name.clone(),
      }))
      .await;
    self.settle(appended, &last_name, &first_name, Some(id)).await?;
    self.get(id).await
  }

  pub async fn delete(&self, actor: &CurrentUser, id: Uuid) -> Result<(), ApiError> {
    if !actor.is_admin() {
      return Err(ApiError::Forbidden);
    }
    self.get(id).await?;
    self
      .store
      .append_person_event(NewEvent::new(id, actor.source(), PersonEvent::Deleted))
      .await
      .map_err(ApiError::store)?;
    Ok(())
  }
}
