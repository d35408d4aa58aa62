//! HTTP server for Taste Tracker.
//!
//! Mounts the JSON API from [`taste_api`] under `/api`, behind optional HTTP
//! Basic auth, alongside an unauthenticated `/health` probe.

pub mod auth;
pub mod error;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, middleware, routing::get};
use serde::Deserialize;
use taste_api::Invalidation;
use taste_core::store::JournalStore;
use tower_http::trace::TraceLayer;

use auth::{AuthConfig, require_auth};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `TASTE_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  pub auth_username:      Option<String>,
  pub auth_password_hash: Option<String>,
}

impl ServerConfig {
  /// The configured credentials, or `None` to serve the API unauthenticated.
  pub fn auth(&self) -> Result<Option<AuthConfig>, Error> {
    match (&self.auth_username, &self.auth_password_hash) {
      (Some(username), Some(password_hash)) => Ok(Some(AuthConfig {
        username:      username.clone(),
        password_hash: password_hash.clone(),
      })),
      (None, None) => Ok(None),
      _ => Err(Error::IncompleteAuthConfig),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Everything the router needs.
pub struct AppState<S> {
  pub store:        Arc<S>,
  pub invalidation: Invalidation,
  pub auth:         Option<Arc<AuthConfig>>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the server's axum [`Router`].
pub fn router<S>(state: AppState<S>) -> Router
where
  S: JournalStore + 'static,
{
  let mut api = taste_api::api_router(state.store, state.invalidation);
  if let Some(auth) = state.auth {
    api = api.layer(middleware::from_fn_with_state(auth, require_auth));
  }

  Router::new()
    .route("/health", get(health))
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str { "ok" }

// ─── Integration tests ────────────────────────────────────────────────────────
