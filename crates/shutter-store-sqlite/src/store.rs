//! [`SqliteStore`], the SQLite implementation of [`Store`].

use std::{collections::BTreeSet, path::Path};

use rusqlite::{
  Connection, OptionalExtension as _, Row, params, params_from_iter,
  types::Type,
};
use uuid::Uuid;

use shutter_core::{
  entity::{Album, Person, Photo, User},
  event::{
    AlbumEvent, Event, EventContent, NewEvent, PersonEvent, PhotoEvent,
    UserEvent,
  },
  page::{Page, PageRequest},
  permission::{Permission, SubjectPermissions},
  store::Store,
};

use crate::{
  Result,
  encode::{
    ALBUM_COLUMNS, AUTHORIZATION_COLUMNS, EVENT_COLUMNS, PERSON_COLUMNS,
    PHOTO_COLUMNS, RawAlbum, RawAuthorization, RawEvent, RawPerson, RawPhoto,
    RawUser, USER_COLUMNS, decode_uuid, encode_dt, encode_source, encode_uuid,
    now,
  },
  projection::{project_album, project_person, project_photo, project_user},
  schema::{PROJECTION_TABLES, SCHEMA},
};

/// Applies one event to the projection tables.
type Projector<K> = fn(&Connection, &Event<K>) -> rusqlite::Result<()>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Shutter store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert `event` at the end of its stream and apply `project` in the same
  /// transaction.
  async fn append<K: EventContent>(
    &self,
    table: &'static str,
    event: NewEvent<K>,
    project: Projector<K>,
  ) -> Result<Event<K>> {
    let kind = event.content.discriminant();
    let content = event.content.to_json()?.to_string();
    let source = encode_source(&event.source)?;
    let date = now();

    let appended = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let subject_id = encode_uuid(event.subject_id);

        let number: i64 = tx.query_row(
          &format!(
            "SELECT COALESCE(MAX(number), 0) + 1 FROM {table} WHERE subject_id = ?1"
          ),
          params![subject_id],
          |r| r.get(0),
        )?;
        tx.execute(
          &format!(
            "INSERT INTO {table} ({EVENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
          ),
          params![subject_id, number, encode_dt(date), source, kind, content],
        )?;

        let appended = Event {
          date,
          subject_id: event.subject_id,
          number,
          source: event.source,
          content: event.content,
        };
        project(&tx, &appended)?;
        tx.commit()?;
        Ok(appended)
      })
      .await?;

    tracing::debug!(
      table,
      kind,
      subject_id = %appended.subject_id,
      number = appended.number,
      "appended event"
    );
    Ok(appended)
  }

  async fn events<K: EventContent>(
    &self,
    table: &'static str,
    subject_id: Uuid,
  ) -> Result<Vec<Event<K>>> {
    let id_str = encode_uuid(subject_id);

    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {EVENT_COLUMNS} FROM {table} WHERE subject_id = ?1 ORDER BY number"
        ))?;
        let rows = stmt
          .query_map(params![id_str], RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  async fn authorizations(
    &self,
    table: &'static str,
    column: &'static str,
    resource_id: Uuid,
  ) -> Result<Vec<SubjectPermissions>> {
    let id_str = encode_uuid(resource_id);

    let raws: Vec<RawAuthorization> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {AUTHORIZATION_COLUMNS} FROM {table}
           WHERE {column} = ?1 ORDER BY subject_id"
        ))?;
        let rows = stmt
          .query_map(params![id_str], RawAuthorization::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawAuthorization::into_subject_permissions)
      .collect()
  }

  async fn subject_authorization(
    &self,
    table: &'static str,
    column: &'static str,
    subject_id: Uuid,
    resource_id: Uuid,
  ) -> Result<BTreeSet<Permission>> {
    let subject_str = encode_uuid(subject_id);
    let resource_str = encode_uuid(resource_id);

    let raw: Option<RawAuthorization> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {AUTHORIZATION_COLUMNS} FROM {table}
                 WHERE subject_id = ?1 AND {column} = ?2"
              ),
              params![subject_str, resource_str],
              RawAuthorization::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    Ok(raw.map(|r| r.flags).unwrap_or_default().to_set())
  }

  async fn existing_ids(
    &self,
    table: &'static str,
    ids: BTreeSet<Uuid>,
  ) -> Result<BTreeSet<Uuid>> {
    if ids.is_empty() {
      return Ok(BTreeSet::new());
    }
    let args: Vec<String> = ids.into_iter().map(encode_uuid).collect();

    let found: Vec<String> = self
      .conn
      .call(move |conn| {
        let placeholders = vec!["?"; args.len()].join(", ");
        let mut stmt = conn.prepare(&format!(
          "SELECT id FROM {table} WHERE id IN ({placeholders})"
        ))?;
        let rows = stmt
          .query_map(params_from_iter(args.iter()), |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    found.iter().map(|s| decode_uuid(s)).collect()
  }
}

// ─── Query helpers ───────────────────────────────────────────────────────────

/// Run the count and the windowed select of one page.
///
/// `from` holds the `FROM ... WHERE ...` clause; `args` bind its positional
/// parameters in both queries.
fn query_page<R>(
  conn: &Connection,
  columns: &str,
  from: &str,
  order: &str,
  args: &[String],
  page: PageRequest,
  map: fn(&Row<'_>) -> rusqlite::Result<R>,
) -> rusqlite::Result<(Vec<R>, u64)> {
  let total: i64 = conn.query_row(
    &format!("SELECT COUNT(*) {from}"),
    params_from_iter(args.iter()),
    |r| r.get(0),
  )?;
  let mut stmt = conn.prepare(&format!(
    "SELECT {columns} {from} ORDER BY {order} LIMIT {} OFFSET {}",
    page.limit(),
    page.offset()
  ))?;
  let items = stmt
    .query_map(params_from_iter(args.iter()), map)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok((items, u64::try_from(total).unwrap_or_default()))
}

/// Re-apply every event of `table`, in insertion order.
fn replay<K: EventContent>(
  conn: &Connection,
  table: &str,
  project: Projector<K>,
) -> rusqlite::Result<usize> {
  let mut stmt = conn
    .prepare(&format!("SELECT {EVENT_COLUMNS} FROM {table} ORDER BY rowid"))?;
  let raws = stmt
    .query_map([], RawEvent::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  let count = raws.len();
  for raw in raws {
    let event = raw.into_event::<K>().map_err(|e| {
      rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
    })?;
    project(conn, &event)?;
  }
  Ok(count)
}

fn decode_page<R, T>(
  (raws, total): (Vec<R>, u64),
  page: PageRequest,
  decode: fn(R) -> Result<T>,
) -> Result<Page<T>> {
  let items = raws.into_iter().map(decode).collect::<Result<Vec<_>>>()?;
  Ok(Page::new(items, page, total))
}

// ─── Store impl ──────────────────────────────────────────────────────────────

impl Store for SqliteStore {
  type Error = crate::Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn append_user_event(
    &self,
    event: NewEvent<UserEvent>,
  ) -> Result<Event<UserEvent>> {
    self.append("user_event", event, project_user).await
  }

  async fn user_events(&self, id: Uuid) -> Result<Vec<Event<UserEvent>>> {
    self.events("user_event", id).await
  }

  async fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM \"user\" WHERE id = ?1"),
              params![id_str],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn user_by_name<'a>(&'a self, name: &'a str) -> Result<Option<User>> {
    let name = name.to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM \"user\" WHERE name = ?1"),
              params![name],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn users(&self, page: PageRequest) -> Result<Page<User>> {
    let rows = self
      .conn
      .call(move |conn| {
        Ok(query_page(
          conn,
          USER_COLUMNS,
          "FROM \"user\"",
          "name",
          &[],
          page,
          RawUser::from_row,
        )?)
      })
      .await?;

    decode_page(rows, page, RawUser::into_user)
  }

  async fn count_users(&self) -> Result<u64> {
    let count: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM \"user\"", [], |r| r.get(0))?)
      })
      .await?;
    Ok(u64::try_from(count).unwrap_or_default())
  }

  // ── Albums ────────────────────────────────────────────────────────────────

  async fn append_album_event(
    &self,
    event: NewEvent<AlbumEvent>,
  ) -> Result<Event<AlbumEvent>> {
    self.append("album_event", event, project_album).await
  }

  async fn album_events(&self, id: Uuid) -> Result<Vec<Event<AlbumEvent>>> {
    self.events("album_event", id).await
  }

  async fn album_by_id(&self, id: Uuid) -> Result<Option<Album>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawAlbum> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ALBUM_COLUMNS} FROM album a WHERE a.id = ?1"),
              params![id_str],
              RawAlbum::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAlbum::into_album).transpose()
  }

  async fn albums(
    &self,
    readable_by: Option<Uuid>,
    page: PageRequest,
  ) -> Result<Page<Album>> {
    let (from, args) = match readable_by {
      Some(subject_id) => (
        "FROM album a
         JOIN album_authorization au ON au.album_id = a.id
         WHERE au.subject_id = ?1 AND au.\"read\"",
        vec![encode_uuid(subject_id)],
      ),
      None => ("FROM album a", vec![]),
    };

    let rows = self
      .conn
      .call(move |conn| {
        Ok(query_page(
          conn,
          ALBUM_COLUMNS,
          from,
          "a.creation_date DESC, a.id",
          &args,
          page,
          RawAlbum::from_row,
        )?)
      })
      .await?;

    decode_page(rows, page, RawAlbum::into_album)
  }

  async fn album_photos(
    &self,
    album_id: Uuid,
    page: PageRequest,
  ) -> Result<Page<Photo>> {
    let args = vec![encode_uuid(album_id)];

    let rows = self
      .conn
      .call(move |conn| {
        Ok(query_page(
          conn,
          PHOTO_COLUMNS,
          "FROM album_photo ap
           JOIN photo p ON p.id = ap.photo_id
           WHERE ap.album_id = ?1",
          "p.upload_date DESC, p.id",
          &args,
          page,
          RawPhoto::from_row,
        )?)
      })
      .await?;

    decode_page(rows, page, RawPhoto::into_photo)
  }

  async fn album_permissions(
    &self,
    album_id: Uuid,
  ) -> Result<Vec<SubjectPermissions>> {
    self
      .authorizations("album_authorization", "album_id", album_id)
      .await
  }

  async fn subject_album_permissions(
    &self,
    subject_id: Uuid,
    album_id: Uuid,
  ) -> Result<BTreeSet<Permission>> {
    self
      .subject_authorization("album_authorization", "album_id", subject_id, album_id)
      .await
  }

  // ── Photos ────────────────────────────────────────────────────────────────

  async fn append_photo_event(
    &self,
    event: NewEvent<PhotoEvent>,
  ) -> Result<Event<PhotoEvent>> {
    self.append("photo_event", event, project_photo).await
  }

  async fn photo_events(&self, id: Uuid) -> Result<Vec<Event<PhotoEvent>>> {
    self.events("photo_event", id).await
  }

  async fn photo_by_id(&self, id: Uuid) -> Result<Option<Photo>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawPhoto> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {PHOTO_COLUMNS} FROM photo p WHERE p.id = ?1"),
              params![id_str],
              RawPhoto::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPhoto::into_photo).transpose()
  }

  async fn photo_by_owner_and_hash<'a>(
    &'a self,
    owner_id: Uuid,
    hash: &'a str,
  ) -> Result<Option<Photo>> {
    let owner_str = encode_uuid(owner_id);
    let hash = hash.to_owned();

    let raw: Option<RawPhoto> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {PHOTO_COLUMNS} FROM photo p
                 WHERE p.owner_id = ?1 AND p.hash = ?2"
              ),
              params![owner_str, hash],
              RawPhoto::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPhoto::into_photo).transpose()
  }

  async fn photos(
    &self,
    readable_by: Option<Uuid>,
    page: PageRequest,
  ) -> Result<Page<Photo>> {
    let (from, args) = match readable_by {
      Some(subject_id) => (
        "FROM photo p
         JOIN photo_authorization pa ON pa.photo_id = p.id
         WHERE pa.subject_id = ?1 AND pa.\"read\"",
        vec![encode_uuid(subject_id)],
      ),
      None => ("FROM photo p", vec![]),
    };

    let rows = self
      .conn
      .call(move |conn| {
        Ok(query_page(
          conn,
          PHOTO_COLUMNS,
          from,
          "p.upload_date DESC, p.id",
          &args,
          page,
          RawPhoto::from_row,
        )?)
      })
      .await?;

    decode_page(rows, page, RawPhoto::into_photo)
  }

  async fn photo_people(&self, photo_id: Uuid) -> Result<Vec<Person>> {
    let id_str = encode_uuid(photo_id);

    let raws: Vec<RawPerson> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PERSON_COLUMNS} FROM photo_person pp
           JOIN person pe ON pe.id = pp.person_id
           WHERE pp.photo_id = ?1
           ORDER BY pe.last_name, pe.first_name, pe.id"
        ))?;
        let rows = stmt
          .query_map(params![id_str], RawPerson::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPerson::into_person).collect()
  }

  async fn photo_permissions(
    &self,
    photo_id: Uuid,
  ) -> Result<Vec<SubjectPermissions>> {
    self
      .authorizations("photo_authorization", "photo_id", photo_id)
      .await
  }

  async fn subject_photo_permissions(
    &self,
    subject_id: Uuid,
    photo_id: Uuid,
  ) -> Result<BTreeSet<Permission>> {
    self
      .subject_authorization("photo_authorization", "photo_id", subject_id, photo_id)
      .await
  }

  async fn existing_photo_ids(&self, ids: BTreeSet<Uuid>) -> Result<BTreeSet<Uuid>> {
    self.existing_ids("photo", ids).await
  }

  // ── People ────────────────────────────────────────────────────────────────

  async fn append_person_event(
    &self,
    event: NewEvent<PersonEvent>,
  ) -> Result<Event<PersonEvent>> {
    self.append("person_event", event, project_person).await
  }

  async fn person_events(&self, id: Uuid) -> Result<Vec<Event<PersonEvent>>> {
    self.events("person_event", id).await
  }

  async fn person_by_id(&self, id: Uuid) -> Result<Option<Person>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawPerson> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {PERSON_COLUMNS} FROM person pe WHERE pe.id = ?1"),
              params![id_str],
              RawPerson::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPerson::into_person).transpose()
  }

  async fn person_by_name<'a>(
    &'a self,
    last_name: &'a str,
    first_name: &'a str,
  ) -> Result<Option<Person>> {
    let last_name = last_name.to_owned();
    let first_name = first_name.to_owned();

    let raw: Option<RawPerson> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {PERSON_COLUMNS} FROM person pe
                 WHERE pe.last_name = ?1 AND pe.first_name = ?2"
              ),
              params![last_name, first_name],
              RawPerson::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPerson::into_person).transpose()
  }

  async fn people(&self, page: PageRequest) -> Result<Page<Person>> {
    let rows = self
      .conn
      .call(move |conn| {
        Ok(query_page(
          conn,
          PERSON_COLUMNS,
          "FROM person pe",
          "pe.last_name, pe.first_name, pe.id",
          &[],
          page,
          RawPerson::from_row,
        )?)
      })
      .await?;

    decode_page(rows, page, RawPerson::into_person)
  }

  async fn existing_person_ids(
    &self,
    ids: BTreeSet<Uuid>,
  ) -> Result<BTreeSet<Uuid>> {
    self.existing_ids("person", ids).await
  }

  // ── Maintenance ───────────────────────────────────────────────────────────

  async fn rebuild_projections(&self) -> Result<()> {
    let replayed = self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        for table in PROJECTION_TABLES {
          tx.execute(&format!("DELETE FROM {table}"), [])?;
        }
        let replayed = replay::<UserEvent>(&tx, "user_event", project_user)?
          + replay::<PersonEvent>(&tx, "person_event", project_person)?
          + replay::<PhotoEvent>(&tx, "photo_event", project_photo)?
          + replay::<AlbumEvent>(&tx, "album_event", project_album)?;
        tx.commit()?;
        Ok(replayed)
      })
      .await?;

    tracing::info!(events = replayed, "rebuilt projections");
    Ok(())
  }
}

