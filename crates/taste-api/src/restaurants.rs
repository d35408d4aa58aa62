//! Handlers for `/restaurants`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/restaurants` | Optional `?name=`; exact lookup, 404 if absent |

use axum::{
  Json,
  extract::{Query, State},
  response::{IntoResponse, Response},
};
use serde::Deserialize;
use taste_core::store::JournalStore;

use crate::{ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub name: Option<String>,
}

/// `GET /restaurants[?name=<name>]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Response, ApiError>
where
  S: JournalStore,
{
  if let Some(name) = params.name.map(|n| n.trim().to_owned()) {
    let restaurant = state
      .store
      .find_restaurant(name.clone())
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| ApiError::NotFound(format!("restaurant {name:?} not found")))?;
    return Ok(Json(restaurant).into_response());
  }

  let restaurants = state.store.list_restaurants().await.map_err(ApiError::store)?;
  Ok(Json(restaurants).into_response())
}
