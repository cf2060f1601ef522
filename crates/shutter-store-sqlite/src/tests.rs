//! Integration tests for `SqliteStore` against an in-memory database.

use std::collections::BTreeSet;

use shutter_core::{
  entity::{Person, Role, User},
  event::{
    AlbumEvent, EventSource, NewEvent, PersonEvent, PhotoEvent, Transform,
    UserEvent,
  },
  fold::{Aggregate, AlbumState, PhotoState},
  page::PageRequest,
  permission::{Permission, SubjectPermissions},
  store::Store,
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn by(id: Uuid) -> EventSource { EventSource::User { id, ip: None } }

async fn create_user(s: &SqliteStore, name: &str) -> Uuid {
  let id = Uuid::new_v4();
  s.append_user_event(NewEvent::new(id, EventSource::System, UserEvent::Created {
    name:          name.into(),
    role:          Role::User,
    password_hash: "hash".into(),
  }))
  .await
  .unwrap();
  id
}

async fn create_album(s: &SqliteStore, owner_id: Uuid, name: &str) -> Uuid {
  let id = Uuid::new_v4();
  s.append_album_event(NewEvent::new(id, by(owner_id), AlbumEvent::Created {
    owner_id,
    name: name.into(),
  }))
  .await
  .unwrap();
  id
}

async fn upload_photo(s: &SqliteStore, owner_id: Uuid, hash: &str) -> Uuid {
  let id = Uuid::new_v4();
  s.append_photo_event(NewEvent::new(id, by(owner_id), PhotoEvent::Uploaded {
    owner_id,
    hash: hash.into(),
    content_type: "image/jpeg".into(),
  }))
  .await
  .unwrap();
  id
}

async fn create_person(s: &SqliteStore, last: &str, first: &str) -> Uuid {
  let id = Uuid::new_v4();
  s.append_person_event(NewEvent::new(id, EventSource::System, PersonEvent::Created {
    last_name:  last.into(),
    first_name: first.into(),
  }))
  .await
  .unwrap();
  id
}

fn page(number: u32, size: u32) -> PageRequest { PageRequest::new(number, size).unwrap() }

// ─── Event streams ───────────────────────────────────────────────────────────

#[tokio::test]
async fn event_numbers_start_at_one_and_increase() {
  let s = store().await;
  let id = create_user(&s, "alice").await;
  for hash in ["h2", "h3"] {
    s.append_user_event(NewEvent::new(id, by(id), UserEvent::PasswordUpdated {
      password_hash: hash.into(),
    }))
    .await
    .unwrap();
  }

  let events = s.user_events(id).await.unwrap();
  let numbers: Vec<i64> = events.iter().map(|e| e.number).collect();
  assert_eq!(numbers, vec![1, 2, 3]);
}

#[tokio::test]
async fn numbering_is_per_subject() {
  let s = store().await;
  let a = create_user(&s, "a").await;
  let b = create_user(&s, "b").await;
  assert_eq!(s.user_events(a).await.unwrap()[0].number, 1);
  assert_eq!(s.user_events(b).await.unwrap()[0].number, 1);
}

#[tokio::test]
async fn appended_event_equals_stored_event() {
  let s = store().await;
  let owner = create_user(&s, "owner").await;
  let id = Uuid::new_v4();
  let appended = s
    .append_album_event(NewEvent::new(
      id,
      EventSource::User { id: owner, ip: Some("127.0.0.1".parse().unwrap()) },
      AlbumEvent::Created { owner_id: owner, name: "Holidays".into() },
    ))
    .await
    .unwrap();

  let stored = s.album_events(id).await.unwrap();
  assert_eq!(stored, vec![appended]);
}

#[tokio::test]
async fn unknown_subject_has_no_events() {
  let s = store().await;
  assert!(s.photo_events(Uuid::new_v4()).await.unwrap().is_empty());
}

// ─── Projections ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn user_projection_follows_the_stream() {
  let s = store().await;
  let id = create_user(&s, "alice").await;
  s.append_user_event(NewEvent::new(id, by(id), UserEvent::PasswordUpdated {
    password_hash: "new".into(),
  }))
  .await
  .unwrap();

  let events = s.user_events(id).await.unwrap();
  let projected = s.user_by_id(id).await.unwrap();
  assert_eq!(projected, User::fold(&events));
  assert_eq!(projected.unwrap().password_hash, "new");

  let by_name = s.user_by_name("alice").await.unwrap().unwrap();
  assert_eq!(by_name.id, id);
  assert_eq!(s.count_users().await.unwrap(), 1);

  s.append_user_event(NewEvent::new(id, EventSource::System, UserEvent::Deleted))
    .await
    .unwrap();
  assert!(s.user_by_id(id).await.unwrap().is_none());
  assert_eq!(s.count_users().await.unwrap(), 0);
}

#[tokio::test]
async fn album_projection_equals_fold() {
  let s = store().await;
  let owner = create_user(&s, "owner").await;
  let friend = create_user(&s, "friend").await;
  let album_id = create_album(&s, owner, "Draft").await;
  let photo_id = upload_photo(&s, owner, "abc").await;

  for content in [
    AlbumEvent::Updated { name: "Holidays".into() },
    AlbumEvent::PhotosAdded { photos_ids: BTreeSet::from([photo_id]) },
    AlbumEvent::PermissionsUpdated {
      permissions_to_add:    vec![SubjectPermissions::new(friend, [
        Permission::Read,
        Permission::Update,
      ])],
      permissions_to_remove: vec![SubjectPermissions::new(friend, [
        Permission::Update,
      ])],
    },
  ] {
    s.append_album_event(NewEvent::new(album_id, by(owner), content))
      .await
      .unwrap();
  }

  let state = AlbumState::fold(&s.album_events(album_id).await.unwrap()).unwrap();
  assert_eq!(s.album_by_id(album_id).await.unwrap(), Some(state.album.clone()));
  assert_eq!(s.album_permissions(album_id).await.unwrap(), state.permissions());

  let photos = s.album_photos(album_id, page(1, 10)).await.unwrap();
  let ids: BTreeSet<Uuid> = photos.items.iter().map(|p| p.id).collect();
  assert_eq!(ids, state.photos_ids);

  assert_eq!(
    s.subject_album_permissions(friend, album_id).await.unwrap(),
    BTreeSet::from([Permission::Read])
  );
  assert_eq!(
    s.subject_album_permissions(owner, album_id).await.unwrap(),
    BTreeSet::from(Permission::ALL)
  );
}

#[tokio::test]
async fn photo_projection_equals_fold() {
  let s = store().await;
  let owner = create_user(&s, "owner").await;
  let photo_id = upload_photo(&s, owner, "abc").await;
  let person_id = create_person(&s, "Doe", "Jane").await;
  let shooting_date = chrono::DateTime::from_timestamp(1_600_000_000, 0);

  for content in [
    PhotoEvent::Updated { shooting_date },
    PhotoEvent::Transformed { transform: Transform::Rotation { degrees: 90 } },
    PhotoEvent::PeopleUpdated {
      people_to_add:    BTreeSet::from([person_id]),
      people_to_remove: BTreeSet::new(),
    },
  ] {
    s.append_photo_event(NewEvent::new(photo_id, by(owner), content))
      .await
      .unwrap();
  }

  let state = PhotoState::fold(&s.photo_events(photo_id).await.unwrap()).unwrap();
  let projected = s.photo_by_id(photo_id).await.unwrap().unwrap();
  assert_eq!(projected, state.photo);
  assert_eq!(projected.version, 2);
  assert_eq!(projected.shooting_date, shooting_date);

  let people = s.photo_people(photo_id).await.unwrap();
  let ids: BTreeSet<Uuid> = people.iter().map(|p| p.id).collect();
  assert_eq!(ids, state.people_ids);
  assert_eq!(s.photo_permissions(photo_id).await.unwrap(), state.permissions());

  let by_hash = s.photo_by_owner_and_hash(owner, "abc").await.unwrap();
  assert_eq!(by_hash.map(|p| p.id), Some(photo_id));
}

#[tokio::test]
async fn person_projection_follows_the_stream() {
  let s = store().await;
  let id = create_person(&s, "Doe", "Jane").await;
  s.append_person_event(NewEvent::new(id, EventSource::System, PersonEvent::Updated {
    last_name:  "Roe".into(),
    first_name: "Jane".into(),
  }))
  .await
  .unwrap();

  let events = s.person_events(id).await.unwrap();
  assert_eq!(s.person_by_id(id).await.unwrap(), Person::fold(&events));
  assert!(s.person_by_name("Doe", "Jane").await.unwrap().is_none());
  assert!(s.person_by_name("Roe", "Jane").await.unwrap().is_some());
}

// ─── Permissions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_authorization_row_means_no_permission() {
  let s = store().await;
  let owner = create_user(&s, "owner").await;
  let album_id = create_album(&s, owner, "Mine").await;
  let stranger = Uuid::new_v4();

  assert!(
    s.subject_album_permissions(stranger, album_id)
      .await
      .unwrap()
      .is_empty()
  );
}

#[tokio::test]
async fn removing_every_permission_deletes_the_row() {
  let s = store().await;
  let owner = create_user(&s, "owner").await;
  let friend = Uuid::new_v4();
  let photo_id = upload_photo(&s, owner, "abc").await;

  s.append_photo_event(NewEvent::new(photo_id, by(owner), PhotoEvent::PermissionsUpdated {
    permissions_to_add:    vec![SubjectPermissions::new(friend, [Permission::Read])],
    permissions_to_remove: vec![],
  }))
  .await
  .unwrap();
  assert_eq!(s.photo_permissions(photo_id).await.unwrap().len(), 2);

  s.append_photo_event(NewEvent::new(photo_id, by(owner), PhotoEvent::PermissionsUpdated {
    permissions_to_add:    vec![],
    permissions_to_remove: vec![SubjectPermissions::all(friend)],
  }))
  .await
  .unwrap();

  let remaining = s.photo_permissions(photo_id).await.unwrap();
  assert_eq!(remaining, vec![SubjectPermissions::all(owner)]);
}

#[tokio::test]
async fn empty_grant_matches_fold() {
  let s = store().await;
  let owner = create_user(&s, "owner").await;
  let friend = create_user(&s, "friend").await;
  let photo_id = upload_photo(&s, owner, "abc").await;

  s.append_photo_event(NewEvent::new(photo_id, by(owner), PhotoEvent::PermissionsUpdated {
    permissions_to_add:    vec![SubjectPermissions::new(friend, [])],
    permissions_to_remove: vec![],
  }))
  .await
  .unwrap();

  let state = PhotoState::fold(&s.photo_events(photo_id).await.unwrap()).unwrap();
  let projected = s.photo_permissions(photo_id).await.unwrap();
  assert_eq!(projected, state.permissions());
  assert_eq!(projected, vec![SubjectPermissions::all(owner)]);
}

// ─── Listing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn albums_are_paginated_newest_first() {
  let s = store().await;
  let owner = create_user(&s, "owner").await;
  let mut ids = Vec::new();
  for name in ["one", "two", "three"] {
    ids.push(create_album(&s, owner, name).await);
  }

  let first = s.albums(None, page(1, 2)).await.unwrap();
  assert_eq!(first.total_items, 3);
  assert_eq!(first.total_pages, 2);
  assert_eq!(first.items.len(), 2);
  assert_eq!(first.items[0].id, ids[2]);

  let second = s.albums(None, page(2, 2)).await.unwrap();
  assert_eq!(second.items.len(), 1);
  assert_eq!(second.items[0].id, ids[0]);

  let beyond = s.albums(None, page(5, 2)).await.unwrap();
  assert!(beyond.items.is_empty());
  assert_eq!(beyond.total_items, 3);
}

#[tokio::test]
async fn readable_filter_only_returns_granted_resources() {
  let s = store().await;
  let alice = create_user(&s, "alice").await;
  let bob = create_user(&s, "bob").await;
  let shared = upload_photo(&s, alice, "shared").await;
  upload_photo(&s, alice, "private").await;
  upload_photo(&s, bob, "bobs").await;

  s.append_photo_event(NewEvent::new(shared, by(alice), PhotoEvent::PermissionsUpdated {
    permissions_to_add:    vec![SubjectPermissions::new(bob, [Permission::Read])],
    permissions_to_remove: vec![],
  }))
  .await
  .unwrap();

  assert_eq!(s.photos(None, page(1, 10)).await.unwrap().total_items, 3);
  assert_eq!(s.photos(Some(alice), page(1, 10)).await.unwrap().total_items, 2);
  let bobs = s.photos(Some(bob), page(1, 10)).await.unwrap();
  assert_eq!(bobs.total_items, 2);
  assert!(bobs.items.iter().any(|p| p.id == shared));
}

#[tokio::test]
async fn people_are_sorted_by_last_then_first_name() {
  let s = store().await;
  create_person(&s, "Smith", "Bob").await;
  create_person(&s, "Doe", "John").await;
  create_person(&s, "Doe", "Jane").await;

  let people = s.people(page(1, 10)).await.unwrap();
  let names: Vec<(&str, &str)> = people
    .items
    .iter()
    .map(|p| (p.last_name.as_str(), p.first_name.as_str()))
    .collect();
  assert_eq!(names, vec![("Doe", "Jane"), ("Doe", "John"), ("Smith", "Bob")]);
}

#[tokio::test]
async fn users_are_sorted_by_name() {
  let s = store().await;
  create_user(&s, "carol").await;
  create_user(&s, "alice").await;
  let users = s.users(page(1, 10)).await.unwrap();
  assert_eq!(users.items[0].name, "alice");
  assert_eq!(users.items[1].name, "carol");
}

#[tokio::test]
async fn existing_ids_filters_unknown_ones() {
  let s = store().await;
  let owner = create_user(&s, "owner").await;
  let photo = upload_photo(&s, owner, "abc").await;
  let person = create_person(&s, "Doe", "Jane").await;
  let unknown = Uuid::new_v4();

  assert_eq!(
    s.existing_photo_ids(BTreeSet::from([photo, unknown])).await.unwrap(),
    BTreeSet::from([photo])
  );
  assert_eq!(
    s.existing_person_ids(BTreeSet::from([person, unknown])).await.unwrap(),
    BTreeSet::from([person])
  );
  assert!(s.existing_photo_ids(BTreeSet::new()).await.unwrap().is_empty());
}

// ─── Deletion ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn deleted_photo_disappears_from_album_listing() {
  let s = store().await;
  let owner = create_user(&s, "owner").await;
  let album_id = create_album(&s, owner, "Album").await;
  let kept = upload_photo(&s, owner, "kept").await;
  let gone = upload_photo(&s, owner, "gone").await;
  s.append_album_event(NewEvent::new(album_id, by(owner), AlbumEvent::PhotosAdded {
    photos_ids: BTreeSet::from([kept, gone]),
  }))
  .await
  .unwrap();

  s.append_photo_event(NewEvent::new(gone, by(owner), PhotoEvent::Deleted))
    .await
    .unwrap();

  let photos = s.album_photos(album_id, page(1, 10)).await.unwrap();
  assert_eq!(photos.total_items, 1);
  assert_eq!(photos.items[0].id, kept);
  assert!(s.photo_permissions(gone).await.unwrap().is_empty());
}

#[tokio::test]
async fn deleted_person_disappears_from_photo_people() {
  let s = store().await;
  let owner = create_user(&s, "owner").await;
  let photo_id = upload_photo(&s, owner, "abc").await;
  let person_id = create_person(&s, "Doe", "Jane").await;
  s.append_photo_event(NewEvent::new(photo_id, by(owner), PhotoEvent::PeopleUpdated {
    people_to_add:    BTreeSet::from([person_id]),
    people_to_remove: BTreeSet::new(),
  }))
  .await
  .unwrap();

  s.append_person_event(NewEvent::new(person_id, EventSource::System, PersonEvent::Deleted))
    .await
    .unwrap();

  assert!(s.photo_people(photo_id).await.unwrap().is_empty());
}

// ─── Maintenance ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn rebuild_reproduces_the_projections() {
  let s = store().await;
  let owner = create_user(&s, "owner").await;
  let friend = create_user(&s, "friend").await;
  let album_id = create_album(&s, owner, "Album").await;
  let photo_id = upload_photo(&s, owner, "abc").await;
  let person_id = create_person(&s, "Doe", "Jane").await;
  s.append_album_event(NewEvent::new(album_id, by(owner), AlbumEvent::PhotosAdded {
    photos_ids: BTreeSet::from([photo_id]),
  }))
  .await
  .unwrap();
  s.append_album_event(NewEvent::new(album_id, by(owner), AlbumEvent::PermissionsUpdated {
    permissions_to_add:    vec![SubjectPermissions::new(friend, [Permission::Read])],
    permissions_to_remove: vec![],
  }))
  .await
  .unwrap();
  s.append_photo_event(NewEvent::new(photo_id, by(owner), PhotoEvent::PeopleUpdated {
    people_to_add:    BTreeSet::from([person_id]),
    people_to_remove: BTreeSet::new(),
  }))
  .await
  .unwrap();

  let users_before = s.users(page(1, 10)).await.unwrap();
  let albums_before = s.albums(Some(friend), page(1, 10)).await.unwrap();
  let album_photos_before = s.album_photos(album_id, page(1, 10)).await.unwrap();
  let acl_before = s.album_permissions(album_id).await.unwrap();
  let people_before = s.photo_people(photo_id).await.unwrap();

  s.rebuild_projections().await.unwrap();

  assert_eq!(s.users(page(1, 10)).await.unwrap(), users_before);
  assert_eq!(s.albums(Some(friend), page(1, 10)).await.unwrap(), albums_before);
  assert_eq!(
    s.album_photos(album_id, page(1, 10)).await.unwrap(),
    album_photos_before
  );
  assert_eq!(s.album_permissions(album_id).await.unwrap(), acl_before);
  assert_eq!(s.photo_people(photo_id).await.unwrap(), people_before);
}

#[tokio::test]
async fn store_reopens_from_file() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("shutter.db");

  let id = {
    let s = SqliteStore::open(&path).await.unwrap();
    create_user(&s, "alice").await
  };

  let s = SqliteStore::open(&path).await.unwrap();
  assert_eq!(s.user_by_id(id).await.unwrap().unwrap().name, "alice");
}
