//! ETag computation for journal listings.
//!
//! Visits are immutable once logged, so a listing is fully identified by its
//! sorted (visit_id, recorded_at) pairs; the ETag is a SHA-256 over them.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use taste_core::model::JournalEntry;
use uuid::Uuid;

/// Compute a strong ETag for a list of entries, independent of their order.
pub fn compute_etag(entries: &[JournalEntry]) -> String {
  let mut pairs: Vec<(Uuid, DateTime<Utc>)> = entries
    .iter()
    .map(|e| (e.visit.visit_id, e.visit.recorded_at))
    .collect();
  pairs.sort_by_key(|(id, _)| *id);

  let mut hasher = Sha256::new();
  for (id, ts) in &pairs {
    hasher.update(id.as_bytes());
    hasher.update(ts.timestamp_micros().to_le_bytes());
  }
  format!("\"{}\"", hex::encode(hasher.finalize()))
}

/// Whether an `If-None-Match` header value matches `etag`.
///
/// Accepts `*`, comma-separated lists, weak (`W/`) validators and bare
/// values without the surrounding quotes.
pub fn if_none_match(header: &str, etag: &str) -> bool {
  let wanted = strip_etag(etag);
  header.split(',').map(str::trim).any(|candidate| {
    candidate == "*" || strip_etag(candidate) == wanted
  })
}

fn strip_etag(s: &str) -> &str {
  s.strip_prefix("W/").unwrap_or(s).trim_matches('"')
}
