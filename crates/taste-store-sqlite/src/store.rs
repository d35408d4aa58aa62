//! [`SqliteStore`], the SQLite implementation of [`JournalStore`].

use std::{path::Path, time::Duration};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use taste_core::{
  model::{Companion, JournalEntry, Restaurant},
  store::{JournalStore, LoggedVisit, VisitQuery},
  submission::{NewRestaurant, NewVisit, normalize_companions, normalize_name},
};

use crate::{
  encode::{
    COMPANION_COLUMNS, MENU_ITEM_COLUMNS, RESTAURANT_COLUMNS, RawCompanion,
    RawJournalEntry, RawMenuItem, RawRestaurant, RawVisit, VISIT_COLUMN_COUNT,
    VISIT_COLUMNS, encode_date, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
  Result,
};

const DEFAULT_LIST_LIMIT: usize = 100;

/// How long a writer waits for another connection's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Store ───────────────────────────────────────────────────────────────────

/// A dining journal backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
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

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  #[cfg(test)]
  pub(crate) fn connection(&self) -> &tokio_rusqlite::Connection { &self.conn }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Statement helpers ───────────────────────────────────────────────────────
//
// These run on the connection thread and take a `&Connection` so they work
// equally on a plain connection or inside a transaction.

/// Insert the restaurant unless its name is taken, then return the stored
/// row and whether this call created it.
fn upsert_restaurant(
  conn: &Connection,
  restaurant: &NewRestaurant,
  restaurant_id: &str,
  now: &str,
) -> rusqlite::Result<(RawRestaurant, bool)> {
  let inserted = conn.execute(
    "INSERT INTO restaurants (
       restaurant_id, name, cuisine, address, latitude, longitude, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
     ON CONFLICT (name) DO NOTHING",
    rusqlite::params![
      restaurant_id,
      restaurant.name,
      restaurant.cuisine,
      restaurant.address,
      restaurant.latitude,
      restaurant.longitude,
      now,
    ],
  )?;

  let row = conn.query_row(
    &format!("SELECT {RESTAURANT_COLUMNS} FROM restaurants r WHERE r.name = ?1"),
    rusqlite::params![restaurant.name],
    RawRestaurant::read,
  )?;

  Ok((row, inserted == 1))
}

/// Find or create one companion per name, in order. Returns the stored rows
/// and how many were created.
fn upsert_companions(
  conn: &Connection,
  names: &[String],
  now: &str,
) -> rusqlite::Result<(Vec<RawCompanion>, usize)> {
  let mut insert = conn.prepare_cached(
    "INSERT INTO companions (companion_id, name, created_at)
     VALUES (?1, ?2, ?3)
     ON CONFLICT (name) DO NOTHING",
  )?;
  let mut select = conn.prepare_cached(&format!(
    "SELECT {COMPANION_COLUMNS} FROM companions c WHERE c.name = ?1"
  ))?;

  let mut rows = Vec::with_capacity(names.len());
  let mut created = 0;
  for name in names {
    let id = encode_uuid(Uuid::new_v4());
    created += insert.execute(rusqlite::params![id, name, now])?;
    rows.push(select.query_row(rusqlite::params![name], RawCompanion::read)?);
  }
  Ok((rows, created))
}

/// Load a visit's companions (in link order) and menu items (in position
/// order).
fn attach_children(
  conn: &Connection,
  visit: RawVisit,
  restaurant: RawRestaurant,
) -> rusqlite::Result<RawJournalEntry> {
  let companions = conn
    .prepare_cached(&format!(
      "SELECT {COMPANION_COLUMNS}
       FROM visit_companions vc
       JOIN companions c ON c.companion_id = vc.companion_id
       WHERE vc.visit_id = ?1
       ORDER BY vc.position"
    ))?
    .query_map(rusqlite::params![visit.visit_id], RawCompanion::read)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let menu_items = conn
    .prepare_cached(&format!(
      "SELECT {MENU_ITEM_COLUMNS}
       FROM menu_items m
       WHERE m.visit_id = ?1
       ORDER BY m.position"
    ))?
    .query_map(rusqlite::params![visit.visit_id], RawMenuItem::read)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok(RawJournalEntry { visit, restaurant, companions, menu_items })
}

fn read_visit_and_restaurant(
  row: &rusqlite::Row<'_>,
) -> rusqlite::Result<(RawVisit, RawRestaurant)> {
  Ok((RawVisit::read(row)?, RawRestaurant::read_at(row, VISIT_COLUMN_COUNT)?))
}

fn load_entry(
  conn: &Connection,
  visit_id: &str,
) -> rusqlite::Result<Option<RawJournalEntry>> {
  let head = conn
    .query_row(
      &format!(
        "SELECT {VISIT_COLUMNS}, {RESTAURANT_COLUMNS}
         FROM visits v
         JOIN restaurants r ON r.restaurant_id = v.restaurant_id
         WHERE v.visit_id = ?1"
      ),
      rusqlite::params![visit_id],
      read_visit_and_restaurant,
    )
    .optional()?;

  head
    .map(|(visit, restaurant)| attach_children(conn, visit, restaurant))
    .transpose()
}

// ─── JournalStore impl ───────────────────────────────────────────────────────

impl JournalStore for SqliteStore {
  type Error = crate::Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn log_visit(&self, mut input: NewVisit) -> Result<LoggedVisit> {
    input.restaurant.name = normalize_name(&input.restaurant.name)
      .ok_or(taste_core::Error::BlankName("restaurant"))?;
    input.companions = normalize_companions(input.companions)?;

    let now           = encode_dt(Utc::now());
    let visit_id      = encode_uuid(Uuid::new_v4());
    let restaurant_id = encode_uuid(Uuid::new_v4());
    let item_ids: Vec<String> = input
      .menu_items
      .iter()
      .map(|_| encode_uuid(Uuid::new_v4()))
      .collect();

    let (entry, restaurant_created, companions_created) = self
      .conn
      .call(move |conn| {
        // IMMEDIATE: the write lock is held from the name lookups onward.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (restaurant, restaurant_created) =
          upsert_restaurant(&tx, &input.restaurant, &restaurant_id, &now)?;
        let (companions, companions_created) =
          upsert_companions(&tx, &input.companions, &now)?;

        tx.execute(
          "INSERT INTO visits (visit_id, restaurant_id, visit_date, rating, recorded_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            visit_id,
            restaurant.restaurant_id,
            encode_date(input.date),
            i64::from(input.rating),
            now,
          ],
        )?;

        {
          let mut link = tx.prepare_cached(
            "INSERT OR IGNORE INTO visit_companions (visit_id, companion_id, position)
             VALUES (?1, ?2, ?3)",
          )?;
          for (position, companion) in companions.iter().enumerate() {
            link.execute(rusqlite::params![
              visit_id,
              companion.companion_id,
              position as i64,
            ])?;
          }

          let mut item = tx.prepare_cached(
            "INSERT INTO menu_items (menu_item_id, visit_id, position, name, category, price)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          )?;
          for (position, (menu_item, id)) in
            input.menu_items.iter().zip(&item_ids).enumerate()
          {
            item.execute(rusqlite::params![
              id,
              visit_id,
              position as i64,
              menu_item.name,
              menu_item.category.as_str(),
              menu_item.price,
            ])?;
          }
        }

        let raw = load_entry(&tx, &visit_id)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        // Decode before committing; dropping `tx` on error rolls back.
        let entry = match raw.into_entry() {
          Ok(entry) => entry,
          Err(e) => return Ok(Err(e)),
        };
        tx.commit()?;

        Ok(Ok((entry, restaurant_created, companions_created)))
      })
      .await??;

    Ok(LoggedVisit { entry, restaurant_created, companions_created })
  }

  async fn resolve_companions(&self, names: Vec<String>) -> Result<Vec<Companion>> {
    let names = normalize_companions(names)?;
    let now = encode_dt(Utc::now());

    let raws: Vec<RawCompanion> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let (rows, _created) = upsert_companions(&tx, &names, &now)?;
        tx.commit()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCompanion::into_companion).collect()
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_visit(&self, visit_id: Uuid) -> Result<Option<JournalEntry>> {
    let id_str = encode_uuid(visit_id);

    let raw: Option<RawJournalEntry> = self
      .conn
      .call(move |conn| Ok(load_entry(conn, &id_str)?))
      .await?;

    raw.map(RawJournalEntry::into_entry).transpose()
  }

  async fn list_visits(&self, query: &VisitQuery) -> Result<Vec<JournalEntry>> {
    let restaurant_id = query.restaurant_id.map(encode_uuid);
    let companion     = query.companion.clone();
    let from          = query.from.map(encode_date);
    let to            = query.to.map(encode_date);
    let limit_val     = query.limit.unwrap_or(DEFAULT_LIST_LIMIT) as i64;
    let offset_val    = query.offset.unwrap_or(0) as i64;

    let raws: Vec<RawJournalEntry> = self
      .conn
      .call(move |conn| {
        let conn: &Connection = conn;
        let mut stmt = conn.prepare(&format!(
          "SELECT {VISIT_COLUMNS}, {RESTAURANT_COLUMNS}
           FROM visits v
           JOIN restaurants r ON r.restaurant_id = v.restaurant_id
           WHERE (?1 IS NULL OR v.restaurant_id = ?1)
             AND (?2 IS NULL OR EXISTS (
                   SELECT 1 FROM visit_companions vc
                   JOIN companions c ON c.companion_id = vc.companion_id
                   WHERE vc.visit_id = v.visit_id AND c.name = ?2))
             AND (?3 IS NULL OR v.visit_date >= ?3)
             AND (?4 IS NULL OR v.visit_date <= ?4)
           ORDER BY v.visit_date DESC, v.recorded_at DESC, v.rowid DESC
           LIMIT ?5 OFFSET ?6"
        ))?;

        let heads = stmt
          .query_map(
            rusqlite::params![
              restaurant_id.as_deref(),
              companion.as_deref(),
              from.as_deref(),
              to.as_deref(),
              limit_val,
              offset_val,
            ],
            read_visit_and_restaurant,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let entries = heads
          .into_iter()
          .map(|(visit, restaurant)| attach_children(conn, visit, restaurant))
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
      })
      .await?;

    raws.into_iter().map(RawJournalEntry::into_entry).collect()
  }

  async fn find_restaurant(&self, name: String) -> Result<Option<Restaurant>> {
    let raw: Option<RawRestaurant> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {RESTAURANT_COLUMNS} FROM restaurants r WHERE r.name = ?1"),
            rusqlite::params![name],
            RawRestaurant::read,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawRestaurant::into_restaurant).transpose()
  }

  async fn list_restaurants(&self) -> Result<Vec<Restaurant>> {
    let raws: Vec<RawRestaurant> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RESTAURANT_COLUMNS} FROM restaurants r ORDER BY r.name"
        ))?;
        let rows = stmt
          .query_map([], RawRestaurant::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRestaurant::into_restaurant).collect()
  }

  async fn find_companion(&self, name: String) -> Result<Option<Companion>> {
    let raw: Option<RawCompanion> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {COMPANION_COLUMNS} FROM companions c WHERE c.name = ?1"),
            rusqlite::params![name],
            RawCompanion::read,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawCompanion::into_companion).transpose()
  }

  async fn list_companions(&self) -> Result<Vec<Companion>> {
    let raws: Vec<RawCompanion> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {COMPANION_COLUMNS} FROM companions c ORDER BY c.name"
        ))?;
        let rows = stmt
          .query_map([], RawCompanion::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCompanion::into_companion).collect()
  }
}
