//! The `Store` trait.
//!
//! The trait is implemented by storage backends (e.g. `shutter-store-sqlite`).
//! Higher layers (`shutter-api`, `shutter-server`) depend on this abstraction,
//! not on any concrete backend.

use std::{collections::BTreeSet, future::Future};

use uuid::Uuid;

use crate::{
  entity::{Album, Person, Photo, User},
  event::{AlbumEvent, Event, NewEvent, PersonEvent, PhotoEvent, UserEvent},
  page::{Page, PageRequest},
  permission::{Permission, SubjectPermissions},
};

/// Abstraction over a Shutter store backend.
///
/// Every write is an event append. Implementations must update the
/// projections read by the query methods in the same transaction as the
/// append, so that a projection always equals the fold of its stream (see
/// [`crate::fold`]).
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait Store: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Append a user event and return it with its assigned date and number.
  fn append_user_event(
    &self,
    event: NewEvent<UserEvent>,
  ) -> impl Future<Output = Result<Event<UserEvent>, Self::Error>> + Send + '_;

  /// The full stream of a user, in insertion order.
  fn user_events(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Vec<Event<UserEvent>>, Self::Error>> + Send + '_;

  fn user_by_id(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn user_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Users ordered by name.
  fn users(
    &self,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<User>, Self::Error>> + Send + '_;

  fn count_users(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Albums ────────────────────────────────────────────────────────────

  fn append_album_event(
    &self,
    event: NewEvent<AlbumEvent>,
  ) -> impl Future<Output = Result<Event<AlbumEvent>, Self::Error>> + Send + '_;

  fn album_events(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Vec<Event<AlbumEvent>>, Self::Error>> + Send + '_;

  fn album_by_id(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Album>, Self::Error>> + Send + '_;

  /// Albums ordered by creation date, newest first.
  ///
  /// With `readable_by`, only albums on which that subject holds
  /// [`Permission::Read`] are returned.
  fn albums(
    &self,
    readable_by: Option<Uuid>,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<Album>, Self::Error>> + Send + '_;

  /// Photos of an album ordered by upload date, newest first.
  fn album_photos(
    &self,
    album_id: Uuid,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<Photo>, Self::Error>> + Send + '_;

  fn album_permissions(
    &self,
    album_id: Uuid,
  ) -> impl Future<Output = Result<Vec<SubjectPermissions>, Self::Error>> + Send + '_;

  /// The permissions of one subject on one album; empty when it has no row.
  fn subject_album_permissions(
    &self,
    subject_id: Uuid,
    album_id: Uuid,
  ) -> impl Future<Output = Result<BTreeSet<Permission>, Self::Error>> + Send + '_;

  // ── Photos ────────────────────────────────────────────────────────────

  fn append_photo_event(
    &self,
    event: NewEvent<PhotoEvent>,
  ) -> impl Future<Output = Result<Event<PhotoEvent>, Self::Error>> + Send + '_;

  fn photo_events(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Vec<Event<PhotoEvent>>, Self::Error>> + Send + '_;

  fn photo_by_id(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Photo>, Self::Error>> + Send + '_;

  fn photo_by_owner_and_hash<'a>(
    &'a self,
    owner_id: Uuid,
    hash: &'a str,
  ) -> impl Future<Output = Result<Option<Photo>, Self::Error>> + Send + 'a;

  /// Photos ordered by upload date, newest first. `readable_by` filters as
  /// in [`Store::albums`].
  fn photos(
    &self,
    readable_by: Option<Uuid>,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<Photo>, Self::Error>> + Send + '_;

  /// People tagged on a photo, ordered by last then first name.
  fn photo_people(
    &self,
    photo_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send + '_;

  fn photo_permissions(
    &self,
    photo_id: Uuid,
  ) -> impl Future<Output = Result<Vec<SubjectPermissions>, Self::Error>> + Send + '_;

  fn subject_photo_permissions(
    &self,
    subject_id: Uuid,
    photo_id: Uuid,
  ) -> impl Future<Output = Result<BTreeSet<Permission>, Self::Error>> + Send + '_;

  /// The subset of `ids` that name existing photos.
  fn existing_photo_ids(
    &self,
    ids: BTreeSet<Uuid>,
  ) -> impl Future<Output = Result<BTreeSet<Uuid>, Self::Error>> + Send + '_;

  // ── People ────────────────────────────────────────────────────────────

  fn append_person_event(
    &self,
    event: NewEvent<PersonEvent>,
  ) -> impl Future<Output = Result<Event<PersonEvent>, Self::Error>> + Send + '_;

  fn person_events(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Vec<Event<PersonEvent>>, Self::Error>> + Send + '_;

  fn person_by_id(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  fn person_by_name<'a>(
    &'a self,
    last_name: &'a str,
    first_name: &'a str,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + 'a;

  /// People ordered by last then first name.
  fn people(
    &self,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<Person>, Self::Error>> + Send + '_;

  /// The subset of `ids` that name existing people.
  fn existing_person_ids(
    &self,
    ids: BTreeSet<Uuid>,
  ) -> impl Future<Output = Result<BTreeSet<Uuid>, Self::Error>> + Send + '_;

  // ── Maintenance ───────────────────────────────────────────────────────

  /// Discard every projection row and re-apply all events in insertion order.
  fn rebuild_projections(
    &self,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
