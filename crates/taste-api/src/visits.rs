//! Handlers for `/visits` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/visits` | Body: a [`VisitSubmission`]; 201, 400 or 500 |
//! | `GET`  | `/visits` | Optional `?restaurant_id=&companion=&from=&to=&limit=&offset=` |
//! | `GET`  | `/visits/:id` | 404 if not found |

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, QueryRejection},
  },
  http::{HeaderMap, HeaderName, StatusCode, header},
  response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use taste_core::{
  ValidationErrors, VisitSubmission,
  model::JournalEntry,
  store::{JournalStore, VisitQuery},
};
use uuid::Uuid;

use crate::{
  ApiState,
  error::ApiError,
  etag::{compute_etag, if_none_match},
};

pub const REVISION_HEADER: HeaderName = HeaderName::from_static("x-journal-revision");

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /visits`
///
/// Validates the submission, reconciles it against existing restaurants and
/// companions, and persists it in one transaction. On success the journal
/// revision is bumped.
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  body: Result<Json<VisitSubmission>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: JournalStore,
{
  let Json(submission) =
    body.map_err(|e| ApiError::Validation(ValidationErrors::form(e.body_text())))?;
  let new_visit = submission.validate().map_err(ApiError::Validation)?;

  let logged = state.store.log_visit(new_visit).await.map_err(ApiError::store)?;
  let revision = state.invalidation.invalidate();

  tracing::info!(
    visit_id = %logged.entry.visit.visit_id,
    restaurant = %logged.entry.restaurant.name,
    restaurant_created = logged.restaurant_created,
    companions_created = logged.companions_created,
    revision,
    "visit logged"
  );

  Ok((
    StatusCode::CREATED,
    Json(json!({ "success": true, "visit": logged.entry })),
  ))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub restaurant_id: Option<Uuid>,
  pub companion:     Option<String>,
  pub from:          Option<NaiveDate>,
  pub to:            Option<NaiveDate>,
  pub limit:         Option<usize>,
  pub offset:        Option<usize>,
}

impl From<ListParams> for VisitQuery {
  fn from(p: ListParams) -> Self {
    VisitQuery {
      restaurant_id: p.restaurant_id,
      companion:     p.companion.map(|c| c.trim().to_owned()).filter(|c| !c.is_empty()),
      from:          p.from,
      to:            p.to,
      limit:         p.limit,
      offset:        p.offset,
    }
  }
}

/// `GET /visits[?restaurant_id=..&companion=..&from=..&to=..&limit=..&offset=..]`
///
/// Carries the journal revision and a content ETag; a matching
/// `If-None-Match` yields `304 Not Modified`.
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  headers: HeaderMap,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Response, ApiError>
where
  S: JournalStore,
{
  let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let query = VisitQuery::from(params);

  let revision = state.invalidation.revision().to_string();
  let entries: Vec<JournalEntry> =
    state.store.list_visits(&query).await.map_err(ApiError::store)?;
  let etag = compute_etag(&entries);

  let not_modified = headers
    .get(header::IF_NONE_MATCH)
    .and_then(|v| v.to_str().ok())
    .is_some_and(|v| if_none_match(v, &etag));

  let response_headers = [(header::ETAG, etag), (REVISION_HEADER, revision)];
  if not_modified {
    return Ok((StatusCode::NOT_MODIFIED, response_headers).into_response());
  }
  Ok((response_headers, Json(entries)).into_response())
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /visits/:id`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<JournalEntry>, ApiError>
where
  S: JournalStore,
{
  let entry = state
    .store
    .get_visit(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("visit {id} not found")))?;
  Ok(Json(entry))
}
