//! Handlers for `/companions`.

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

/// `GET /companions[?name=<name>]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Response, ApiError>
where
  S: JournalStore,
{
  match params.name.map(|n| n.trim().to_owned()) {
    Some(name) => {
      let companion = state
        .store
        .find_companion(name.clone())
        .await
        .map_err(ApiError::store)?
        .ok_or_else(|| ApiError::NotFound(format!("companion {name:?} not found")))?;
      Ok(Json(companion).into_response())
    }
    None => {
      let companions = state.store.list_companions().await.map_err(ApiError::store)?;
      Ok(Json(companions).into_response())
    }
  }
}
