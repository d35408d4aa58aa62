//! Journal entities: restaurants, companions, visits and their menu items.
//!
//! Restaurants and companions are find-or-create reference records; visits
//! and menu items are written once per logged submission and never updated.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr, VariantNames};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Rating ──────────────────────────────────────────────────────────────────

/// A visit rating, always within `1..=5`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rating(u8);

impl Rating {
  pub const MIN: u8 = 1;
  pub const MAX: u8 = 5;

  pub fn get(self) -> u8 { self.0 }
}

impl TryFrom<i64> for Rating {
  type Error = Error;

  fn try_from(value: i64) -> Result<Self> {
    if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
      // Range-checked above, the cast cannot truncate.
      Ok(Self(value as u8))
    } else {
      Err(Error::RatingOutOfRange(value))
    }
  }
}

impl From<Rating> for i64 {
  fn from(r: Rating) -> Self { i64::from(r.0) }
}

// ─── Menu categories ─────────────────────────────────────────────────────────

/// Course a menu item belongs to. The upper-case names double as the wire
/// and column representation.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
  VariantNames,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MenuCategory {
  Starter,
  Main,
  Dessert,
  Drink,
}

impl MenuCategory {
  pub fn as_str(self) -> &'static str { self.into() }

  /// Parse the exact upper-case name, e.g. `"STARTER"`.
  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::UnknownCategory(s.to_owned()))
  }
}

// ─── Reference records ───────────────────────────────────────────────────────

/// A restaurant, identified by its unique name.
///
/// The descriptor fields are whatever the first submission naming this
/// restaurant supplied; later visits never change them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
  pub restaurant_id: Uuid,
  pub name:          String,
  pub cuisine:       Option<String>,
  pub address:       Option<String>,
  pub latitude:      Option<f64>,
  pub longitude:     Option<f64>,
  pub created_at:    DateTime<Utc>,
}

/// Someone who shared a visit, identified by their unique name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Companion {
  pub companion_id: Uuid,
  pub name:         String,
  pub created_at:   DateTime<Utc>,
}

// ─── Visits ──────────────────────────────────────────────────────────────────

/// One dish or drink ordered on a visit. Owned by exactly one visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
  pub menu_item_id: Uuid,
  pub visit_id:     Uuid,
  /// Zero-based index in the submitted list.
  pub position:     u32,
  pub name:         String,
  pub category:     MenuCategory,
  pub price:        Option<f64>,
}

/// A logged visit. `recorded_at` is server-assigned; `date` is when the meal
/// happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
  pub visit_id:      Uuid,
  pub restaurant_id: Uuid,
  pub date:          NaiveDate,
  pub rating:        Rating,
  pub recorded_at:   DateTime<Utc>,
}

/// The read model for one journal line: a visit with everything it links
/// to. Never stored, always assembled on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
  pub visit:      Visit,
  pub restaurant: Restaurant,
  /// In the order they were named on the submission.
  pub companions: Vec<Companion>,
  /// Ordered by [`MenuItem::position`].
  pub menu_items: Vec<MenuItem>,
}
