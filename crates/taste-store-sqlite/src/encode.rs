//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with microsecond precision so
//! they sort lexically. Visit dates are `YYYY-MM-DD`. UUIDs are stored as
//! hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use taste_core::model::{
  Companion, JournalEntry, MenuCategory, MenuItem, Rating, Restaurant, Visit,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Small scalars ───────────────────────────────────────────────────────────

fn decode_position(column: &'static str, raw: i64) -> Result<u32> {
  u32::try_from(raw).map_err(|_| Error::Decode { column, value: raw.to_string() })
}

// ─── Row types ───────────────────────────────────────────────────────────────

// Each `read_at` reads its columns starting at `offset`, in the order given by
// the matching `*_COLUMNS` constant, so joined rows can be split without
// extra queries.

pub const RESTAURANT_COLUMNS: &str =
  "r.restaurant_id, r.name, r.cuisine, r.address, r.latitude, r.longitude, r.created_at";

/// Raw values read directly from a `restaurants` row.
pub struct RawRestaurant {
  pub restaurant_id: String,
  pub name:          String,
  pub cuisine:       Option<String>,
  pub address:       Option<String>,
  pub latitude:      Option<f64>,
  pub longitude:     Option<f64>,
  pub created_at:    String,
}

impl RawRestaurant {
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> { Self::read_at(row, 0) }

  pub fn read_at(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      restaurant_id: row.get(offset)?,
      name:          row.get(offset + 1)?,
      cuisine:       row.get(offset + 2)?,
      address:       row.get(offset + 3)?,
      latitude:      row.get(offset + 4)?,
      longitude:     row.get(offset + 5)?,
      created_at:    row.get(offset + 6)?,
    })
  }

  pub fn into_restaurant(self) -> Result<Restaurant> {
    Ok(Restaurant {
      restaurant_id: decode_uuid(&self.restaurant_id)?,
      name:          self.name,
      cuisine:       self.cuisine,
      address:       self.address,
      latitude:      self.latitude,
      longitude:     self.longitude,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub const COMPANION_COLUMNS: &str = "c.companion_id, c.name, c.created_at";

/// Raw values read directly from a `companions` row.
pub struct RawCompanion {
  pub companion_id: String,
  pub name:         String,
  pub created_at:   String,
}

impl RawCompanion {
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      companion_id: row.get(0)?,
      name:         row.get(1)?,
      created_at:   row.get(2)?,
    })
  }

  pub fn into_companion(self) -> Result<Companion> {
    Ok(Companion {
      companion_id: decode_uuid(&self.companion_id)?,
      name:         self.name,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

pub const VISIT_COLUMNS: &str =
  "v.visit_id, v.restaurant_id, v.visit_date, v.rating, v.recorded_at";

/// Number of columns in [`VISIT_COLUMNS`].
pub const VISIT_COLUMN_COUNT: usize = 5;

/// Raw values read directly from a `visits` row.
pub struct RawVisit {
  pub visit_id:      String,
  pub restaurant_id: String,
  pub visit_date:    String,
  pub rating:        i64,
  pub recorded_at:   String,
}

impl RawVisit {
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      visit_id:      row.get(0)?,
      restaurant_id: row.get(1)?,
      visit_date:    row.get(2)?,
      rating:        row.get(3)?,
      recorded_at:   row.get(4)?,
    })
  }

  pub fn into_visit(self) -> Result<Visit> {
    Ok(Visit {
      visit_id:      decode_uuid(&self.visit_id)?,
      restaurant_id: decode_uuid(&self.restaurant_id)?,
      date:          decode_date(&self.visit_date)?,
      rating:        Rating::try_from(self.rating)?,
      recorded_at:   decode_dt(&self.recorded_at)?,
    })
  }
}

pub const MENU_ITEM_COLUMNS: &str =
  "m.menu_item_id, m.visit_id, m.position, m.name, m.category, m.price";

/// Raw values read directly from a `menu_items` row.
pub struct RawMenuItem {
  pub menu_item_id: String,
  pub visit_id:     String,
  pub position:     i64,
  pub name:         String,
  pub category:     String,
  pub price:        Option<f64>,
}

impl RawMenuItem {
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      menu_item_id: row.get(0)?,
      visit_id:     row.get(1)?,
      position:     row.get(2)?,
      name:         row.get(3)?,
      category:     row.get(4)?,
      price:        row.get(5)?,
    })
  }

  pub fn into_menu_item(self) -> Result<MenuItem> {
    Ok(MenuItem {
      menu_item_id: decode_uuid(&self.menu_item_id)?,
      visit_id:     decode_uuid(&self.visit_id)?,
      position:     decode_position("menu_items.position", self.position)?,
      name:         self.name,
      category:     MenuCategory::parse(&self.category)?,
      price:        self.price,
    })
  }
}

/// A visit row with everything it links to, still undecoded.
pub struct RawJournalEntry {
  pub visit:      RawVisit,
  pub restaurant: RawRestaurant,
  pub companions: Vec<RawCompanion>,
  pub menu_items: Vec<RawMenuItem>,
}

impl RawJournalEntry {
  pub fn into_entry(self) -> Result<JournalEntry> {
    Ok(JournalEntry {
      visit:      self.visit.into_visit()?,
      restaurant: self.restaurant.into_restaurant()?,
      companions: self
        .companions
        .into_iter()
        .map(RawCompanion::into_companion)
        .collect::<Result<_>>()?,
      menu_items: self
        .menu_items
        .into_iter()
        .map(RawMenuItem::into_menu_item)
        .collect::<Result<_>>()?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let a = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let b = Utc.timestamp_opt(1_700_000_000, 500_000).unwrap();
    let (ea, eb) = (encode_dt(a), encode_dt(b));
    assert!(ea < eb, "{ea} vs {eb}");
    assert_eq!(decode_dt(&ea).unwrap(), a);
    assert_eq!(decode_dt(&eb).unwrap(), b);
  }

  #[test]
  fn dates_use_iso_format() {
    let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    assert_eq!(encode_date(d), "2024-01-01");
    assert_eq!(decode_date("2024-01-01").unwrap(), d);
    assert!(matches!(decode_date("01/01/2024"), Err(Error::DateParse(_))));
  }

  #[test]
  fn negative_position_is_a_decode_error() {
    assert!(matches!(
      decode_position("menu_items.position", -1),
      Err(Error::Decode { column: "menu_items.position", .. })
    ));
  }
}
