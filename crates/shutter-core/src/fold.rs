//! Pure projection: the current state of an aggregate as a fold of its
//! events.
//!
//! The store maintains its projection tables incrementally, but these folds
//! define what those tables must contain. A stream that is empty or ends in a
//! `Deleted` event folds to `None`.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::{
  entity::{Album, Person, Photo, User},
  event::{
    AlbumEvent, Event, EventContent, PersonEvent, PhotoEvent, Transform,
    UserEvent,
  },
  permission::{Acl, SubjectPermissions, apply_update},
};

/// State that can be rebuilt by folding a stream of events.
pub trait Aggregate: Sized {
  type Event: EventContent;

  /// Apply one event to the state left by the previous ones.
  fn apply(state: Option<Self>, event: &Event<Self::Event>) -> Option<Self>;

  /// Fold a whole stream, in insertion order.
  fn fold<'a>(
    events: impl IntoIterator<Item = &'a Event<Self::Event>>,
  ) -> Option<Self>
  where
    Self::Event: 'a,
  {
    events.into_iter().fold(None, Self::apply)
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

impl Aggregate for User {
  type Event = UserEvent;

  fn apply(state: Option<Self>, event: &Event<UserEvent>) -> Option<Self> {
    match (&event.content, state) {
      (UserEvent::Created { name, role, password_hash }, _) => Some(User {
        id:            event.subject_id,
        creation_date: event.date,
        name:          name.clone(),
        role:          *role,
        password_hash: password_hash.clone(),
      }),
      (UserEvent::PasswordUpdated { password_hash }, Some(user)) => {
        Some(User { password_hash: password_hash.clone(), ..user })
      }
      (UserEvent::Deleted, _) | (_, None) => None,
    }
  }
}

// ─── Albums ──────────────────────────────────────────────────────────────────

/// An album together with its photo membership and ACL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumState {
  pub album:      Album,
  pub photos_ids: BTreeSet<Uuid>,
  pub acl:        Acl,
}

impl AlbumState {
  pub fn permissions(&self) -> Vec<SubjectPermissions> {
    crate::permission::to_subject_permissions(&self.acl)
  }
}

impl Aggregate for AlbumState {
  type Event = AlbumEvent;

  fn apply(state: Option<Self>, event: &Event<AlbumEvent>) -> Option<Self> {
    if let AlbumEvent::Created { owner_id, name } = &event.content {
      let owner = SubjectPermissions::all(*owner_id);
      return Some(AlbumState {
        album:      Album {
          id:            event.subject_id,
          owner_id:      *owner_id,
          creation_date: event.date,
          name:          name.clone(),
        },
        photos_ids: BTreeSet::new(),
        acl:        Acl::from([(owner.subject_id, owner.permissions)]),
      });
    }

    if let AlbumEvent::Deleted = event.content {
      return None;
    }

    let mut state = state?;
    match &event.content {
      AlbumEvent::Created { .. } | AlbumEvent::Deleted => {}
      AlbumEvent::Updated { name } => state.album.name = name.clone(),
      AlbumEvent::PhotosAdded { photos_ids } => {
        state.photos_ids.extend(photos_ids.iter().copied());
      }
      AlbumEvent::PhotosRemoved { photos_ids } => {
        state.photos_ids.retain(|id| !photos_ids.contains(id));
      }
      AlbumEvent::PermissionsUpdated {
        permissions_to_add,
        permissions_to_remove,
      } => apply_update(&mut state.acl, permissions_to_add, permissions_to_remove),
    }
    Some(state)
  }
}

// ─── Photos ──────────────────────────────────────────────────────────────────

/// A photo together with its tagged people and ACL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoState {
  pub photo:      Photo,
  pub people_ids: BTreeSet<Uuid>,
  pub acl:        Acl,
  /// Every transform applied so far, oldest first.
  pub transforms: Vec<Transform>,
}

impl PhotoState {
  pub fn permissions(&self) -> Vec<SubjectPermissions> {
    crate::permission::to_subject_permissions(&self.acl)
  }
}

impl Aggregate for PhotoState {
  type Event = PhotoEvent;

  fn apply(state: Option<Self>, event: &Event<PhotoEvent>) -> Option<Self> {
    if let PhotoEvent::Uploaded { owner_id, hash, content_type } = &event.content
    {
      let owner = SubjectPermissions::all(*owner_id);
      return Some(PhotoState {
        photo:      Photo {
          id:            event.subject_id,
          owner_id:      *owner_id,
          upload_date:   event.date,
          hash:          hash.clone(),
          content_type:  content_type.clone(),
          shooting_date: None,
          version:       1,
        },
        people_ids: BTreeSet::new(),
        acl:        Acl::from([(owner.subject_id, owner.permissions)]),
        transforms: Vec::new(),
      });
    }

    if let PhotoEvent::Deleted = event.content {
      return None;
    }

    let mut state = state?;
    match &event.content {
      PhotoEvent::Uploaded { .. } | PhotoEvent::Deleted => {}
      PhotoEvent::Updated { shooting_date } => {
        state.photo.shooting_date = *shooting_date;
      }
      PhotoEvent::Transformed { transform } => {
        state.photo.version += 1;
        state.transforms.push(*transform);
      }
      PhotoEvent::PeopleUpdated { people_to_add, people_to_remove } => {
        state.people_ids.extend(people_to_add.iter().copied());
        state.people_ids.retain(|id| !people_to_remove.contains(id));
      }
      PhotoEvent::PermissionsUpdated {
        permissions_to_add,
        permissions_to_remove,
      } => apply_update(&mut state.acl, permissions_to_add, permissions_to_remove),
    }
    Some(state)
  }
}

// ─── People ──────────────────────────────────────────────────────────────────

impl Aggregate for Person {
  type Event = PersonEvent;

  fn apply(state: Option<Self>, event: &Event<PersonEvent>) -> Option<Self> {
    match (&event.content, state) {
      (PersonEvent::Created { last_name, first_name }, _) => Some(Person {
        id:            event.subject_id,
        creation_date: event.date,
        last_name:     last_name.clone(),
        first_name:    first_name.clone(),
      }),
      (PersonEvent::Updated { last_name, first_name }, Some(person)) => {
        Some(Person {
          last_name: last_name.clone(),
          first_name: first_name.clone(),
          ..person
        })
      }
      (PersonEvent::Deleted, _) | (_, None) => None,
    }
  }
}
