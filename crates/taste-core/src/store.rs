//! The `JournalStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `taste-store-sqlite`).
//! Higher layers (`taste-api`, `taste-server`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  model::{Companion, JournalEntry, Restaurant},
  submission::NewVisit,
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`JournalStore::list_visits`].
#[derive(Debug, Clone, Default)]
pub struct VisitQuery {
  pub restaurant_id: Option<Uuid>,
  /// Only visits shared with the companion of this exact name.
  pub companion:     Option<String>,
  /// Inclusive lower bound on the visit date.
  pub from:          Option<NaiveDate>,
  /// Inclusive upper bound on the visit date.
  pub to:            Option<NaiveDate>,
  pub limit:         Option<usize>,
  pub offset:        Option<usize>,
}

// ─── Write result ────────────────────────────────────────────────────────────

/// What [`JournalStore::log_visit`] persisted.
#[derive(Debug, Clone)]
pub struct LoggedVisit {
  pub entry:              JournalEntry,
  /// `false` when the visit was linked to an existing restaurant.
  pub restaurant_created: bool,
  /// How many of the entry's companions did not exist before.
  pub companions_created: usize,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a dining-journal backend.
///
/// Restaurants and companions are find-or-create by exact name and never
/// updated. Visits and their menu items are append-only.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait JournalStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Reconcile and persist one visit as a single atomic unit.
  ///
  /// The restaurant is looked up by name and created with the submitted
  /// descriptor only if absent; an existing restaurant is linked as-is.
  /// Each companion name is resolved the same way. The visit, its companion
  /// links and its menu items are then inserted. If any step fails nothing
  /// from this call remains in the store.
  fn log_visit(
    &self,
    visit: NewVisit,
  ) -> impl Future<Output = Result<LoggedVisit, Self::Error>> + Send + '_;

  /// Find or create a companion for each name, in order, in one
  /// transaction. Repeating the call with the same names creates nothing.
  fn resolve_companions(
    &self,
    names: Vec<String>,
  ) -> impl Future<Output = Result<Vec<Companion>, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Retrieve one journal entry. Returns `None` if the visit is unknown.
  fn get_visit(
    &self,
    visit_id: Uuid,
  ) -> impl Future<Output = Result<Option<JournalEntry>, Self::Error>> + Send + '_;

  /// List journal entries, most recent visit first.
  fn list_visits<'a>(
    &'a self,
    query: &'a VisitQuery,
  ) -> impl Future<Output = Result<Vec<JournalEntry>, Self::Error>> + Send + 'a;

  /// Exact-name restaurant lookup.
  fn find_restaurant(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Option<Restaurant>, Self::Error>> + Send + '_;

  /// All restaurants, ordered by name.
  fn list_restaurants(
    &self,
  ) -> impl Future<Output = Result<Vec<Restaurant>, Self::Error>> + Send + '_;

  /// Exact-name companion lookup.
  fn find_companion(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Option<Companion>, Self::Error>> + Send + '_;

  /// All companions, ordered by name.
  fn list_companions(
    &self,
  ) -> impl Future<Output = Result<Vec<Companion>, Self::Error>> + Send + '_;
}
