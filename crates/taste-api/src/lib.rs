//! JSON REST API for Taste Tracker.
//!
//! Exposes an axum [`Router`] backed by any
//! [`taste_core::store::JournalStore`]. Auth, TLS, and transport concerns are
//! the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let invalidation = taste_api::Invalidation::new();
//! .nest("/api", taste_api::api_router(store.clone(), invalidation.clone()))
//! ```

pub mod companions;
pub mod error;
pub mod etag;
pub mod invalidation;
pub mod restaurants;
pub mod visits;

use std::sync::Arc;

use axum::{Router, routing::get};
use taste_core::store::JournalStore;

pub use error::ApiError;
pub use invalidation::Invalidation;

/// Shared handler state.
pub struct ApiState<S> {
  pub store:        Arc<S>,
  pub invalidation: Invalidation,
}

// Derived `Clone` would require `S: Clone`.
impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:        Arc::clone(&self.store),
      invalidation: self.invalidation.clone(),
    }
  }
}

/// Build a fully-materialised API router for `store`.
///
/// `invalidation` is bumped after every successful write; pass a clone of the
/// same handle to anything that watches the journal.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, invalidation: Invalidation) -> Router<()>
where
  S: JournalStore + 'static,
{
  Router::new()
    // Visits
    .route("/visits", get(visits::list::<S>).post(visits::create::<S>))
    .route("/visits/{id}", get(visits::get_one::<S>))
    // Lookups
    .route("/restaurants", get(restaurants::list::<S>))
    .route("/companions", get(companions::list::<S>))
    .with_state(ApiState { store, invalidation })
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use serde_json::{Value, json};
  use taste_core::{
    NewVisit,
    model::{Companion, JournalEntry, Restaurant},
    store::{LoggedVisit, VisitQuery},
  };
  use taste_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;
  use uuid::Uuid;

  use super::*;

  async fn setup() -> (Router, Arc<SqliteStore>, Invalidation) {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let invalidation = Invalidation::new();
    let router = api_router(store.clone(), invalidation.clone());
    (router, store, invalidation)
  }

  async fn send(
    router:  &Router,
    method:  &str,
    uri:     &str,
    headers: Vec<(header::HeaderName, &str)>,
    body:    &str,
  ) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    for (k, v) in headers {
      builder = builder.header(k, v);
    }
    let req = builder.body(Body::from(body.to_string())).unwrap();
    router.clone().oneshot(req).await.unwrap()
  }

  async fn post_visit(router: &Router, body: &Value) -> Response {
    send(
      router,
      "POST",
      "/visits",
      vec![(header::CONTENT_TYPE, "application/json")],
      &body.to_string(),
    )
    .await
  }

  async fn json_body(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  fn test_resto() -> Value {
    json!({
      "restaurant": { "name": "Test Resto", "cuisine": "Test" },
      "visit": {
        "date": "2024-01-01",
        "rating": 5,
        "menuItems": [
          { "name": "Soup", "category": "STARTER", "price": 5.50 },
          { "name": "Steak", "category": "MAIN", "price": 25.00 }
        ],
        "companions": ["Alice"]
      }
    })
  }

  // ── POST /visits ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn valid_submission_returns_201_with_entry() {
    let (router, _store, _) = setup().await;
    let resp = post_visit(&router, &test_resto()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body = json_body(resp).await;
    assert_eq!(body["success"], json!(true));
    let visit = &body["visit"];
    assert_eq!(visit["restaurant"]["name"], "Test Resto");
    assert_eq!(visit["restaurant"]["cuisine"], "Test");
    assert_eq!(visit["visit"]["rating"], 5);
    assert_eq!(visit["visit"]["date"], "2024-01-01");
    assert_eq!(visit["companions"][0]["name"], "Alice");
    assert_eq!(visit["menuItems"][0]["name"], "Soup");
    assert_eq!(visit["menuItems"][0]["category"], "STARTER");
    assert_eq!(visit["menuItems"][1]["price"], 25.0);
  }

  #[tokio::test]
  async fn out_of_range_rating_is_rejected_and_nothing_is_written() {
    let (router, store, invalidation) = setup().await;

    for rating in [0, 6] {
      let mut body = test_resto();
      body["visit"]["rating"] = json!(rating);
      let resp = post_visit(&router, &body).await;
      assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

      let body = json_body(resp).await;
      assert_eq!(body["success"], json!(false));
      assert_eq!(
        body["error"]["fieldErrors"]["visit.rating"][0],
        "Rating must be between 1 and 5"
      );
    }

    assert!(store.list_restaurants().await.unwrap().is_empty());
    assert!(store.list_companions().await.unwrap().is_empty());
    assert!(store.list_visits(&VisitQuery::default()).await.unwrap().is_empty());
    assert_eq!(invalidation.revision(), 0);
  }

  #[tokio::test]
  async fn blank_restaurant_name_is_a_field_error() {
    let (router, store, _) = setup().await;
    let mut body = test_resto();
    body["restaurant"]["name"] = json!("   ");

    let resp = post_visit(&router, &body).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert_eq!(
      body["error"]["fieldErrors"]["restaurant.name"][0],
      "Restaurant name is required"
    );
    assert!(store.list_restaurants().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn malformed_json_is_a_form_error() {
    let (router, _, _) = setup().await;
    let resp = send(
      &router,
      "POST",
      "/visits",
      vec![(header::CONTENT_TYPE, "application/json")],
      "{ not json",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = json_body(resp).await;
    assert_eq!(body["success"], json!(false));
    assert!(!body["error"]["formErrors"].as_array().unwrap().is_empty());
    assert!(body["error"]["fieldErrors"].as_object().unwrap().is_empty());
  }

  #[tokio::test]
  async fn repeated_submission_reuses_restaurant_and_companion() {
    let (router, store, _) = setup().await;

    let first = json_body(post_visit(&router, &test_resto()).await).await;
    let second = json_body(post_visit(&router, &test_resto()).await).await;

    assert_eq!(
      first["visit"]["restaurant"]["restaurantId"],
      second["visit"]["restaurant"]["restaurantId"]
    );
    assert_eq!(
      first["visit"]["companions"][0]["companionId"],
      second["visit"]["companions"][0]["companionId"]
    );
    assert_ne!(first["visit"]["visit"]["visitId"], second["visit"]["visit"]["visitId"]);

    assert_eq!(store.list_restaurants().await.unwrap().len(), 1);
    assert_eq!(store.list_companions().await.unwrap().len(), 1);
    assert_eq!(store.list_visits(&VisitQuery::default()).await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn legacy_course_fields_become_menu_items() {
    let (router, _, _) = setup().await;
    let body = json!({
      "restaurant": { "name": "Old Form Bistro" },
      "visit": {
        "date": "2023-06-01",
        "rating": 4,
        "mainCourse": "Duck confit",
        "drinks": "House red"
      }
    });

    let resp = post_visit(&router, &body).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    let items = body["visit"]["menuItems"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["name"], "Duck confit");
    assert_eq!(items[0]["category"], "MAIN");
    assert_eq!(items[1]["category"], "DRINK");
    assert_eq!(items[1]["price"], Value::Null);
  }

  #[tokio::test]
  async fn only_successful_writes_bump_the_revision() {
    let (router, _, invalidation) = setup().await;
    let mut rx = invalidation.subscribe();

    let mut bad = test_resto();
    bad["visit"]["rating"] = json!(9);
    post_visit(&router, &bad).await;
    assert!(!rx.has_changed().unwrap());

    post_visit(&router, &test_resto()).await;
    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), 1);
  }

  // ── GET /visits ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn list_etag_round_trip_and_change_after_write() {
    let (router, _, _) = setup().await;
    post_visit(&router, &test_resto()).await;

    let resp = send(&router, "GET", "/visits", vec![], "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let etag = resp.headers()[header::ETAG].to_str().unwrap().to_owned();
    assert_eq!(resp.headers()[visits::REVISION_HEADER], "1");
    let body = json_body(resp).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let resp =
      send(&router, "GET", "/visits", vec![(header::IF_NONE_MATCH, etag.as_str())], "").await;
    assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);

    post_visit(&router, &test_resto()).await;
    let resp =
      send(&router, "GET", "/visits", vec![(header::IF_NONE_MATCH, etag.as_str())], "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_ne!(resp.headers()[header::ETAG].to_str().unwrap(), etag);
    assert_eq!(resp.headers()[visits::REVISION_HEADER], "2");
  }

  #[tokio::test]
  async fn list_filters_by_companion() {
    let (router, _, _) = setup().await;
    post_visit(&router, &test_resto()).await;
    let mut solo = test_resto();
    solo["visit"]["companions"] = json!([]);
    post_visit(&router, &solo).await;

    let resp = send(&router, "GET", "/visits?companion=Alice", vec![], "").await;
    let body = json_body(resp).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn bad_query_is_400() {
    let (router, _, _) = setup().await;
    let resp = send(&router, "GET", "/visits?from=yesterday", vec![], "").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["success"], json!(false));
  }

  #[tokio::test]
  async fn get_one_round_trip_and_404() {
    let (router, _, _) = setup().await;
    let created = json_body(post_visit(&router, &test_resto()).await).await;
    let id = created["visit"]["visit"]["visitId"].as_str().unwrap();

    let resp = send(&router, "GET", &format!("/visits/{id}"), vec![], "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["restaurant"]["name"], "Test Resto");

    let resp =
      send(&router, "GET", &format!("/visits/{}", Uuid::new_v4()), vec![], "").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(resp).await["success"], json!(false));
  }

  // ── Lookups ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn restaurant_and_companion_lookup_by_name() {
    let (router, _, _) = setup().await;
    post_visit(&router, &test_resto()).await;

    let resp = send(&router, "GET", "/restaurants?name=Test%20Resto", vec![], "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["cuisine"], "Test");

    let resp = send(&router, "GET", "/restaurants?name=Nowhere", vec![], "").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(&router, "GET", "/companions?name=Alice", vec![], "").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(&router, "GET", "/companions", vec![], "").await;
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 1);
  }

  // ── Storage failure ─────────────────────────────────────────────────────────

  struct FailingStore;

  fn unavailable() -> std::io::Error {
    std::io::Error::other("database is locked")
  }

  impl JournalStore for FailingStore {
    type Error = std::io::Error;

    async fn log_visit(&self, _: NewVisit) -> Result<LoggedVisit, Self::Error> {
      Err(unavailable())
    }

    async fn resolve_companions(
      &self,
      _: Vec<String>,
    ) -> Result<Vec<Companion>, Self::Error> {
      Err(unavailable())
    }

    async fn get_visit(&self, _: Uuid) -> Result<Option<JournalEntry>, Self::Error> {
      Err(unavailable())
    }

    async fn list_visits<'a>(
      &'a self,
      _: &'a VisitQuery,
    ) -> Result<Vec<JournalEntry>, Self::Error> {
      Err(unavailable())
    }

    async fn find_restaurant(&self, _: String) -> Result<Option<Restaurant>, Self::Error> {
      Err(unavailable())
    }

    async fn list_restaurants(&self) -> Result<Vec<Restaurant>, Self::Error> {
      Err(unavailable())
    }

    async fn find_companion(&self, _: String) -> Result<Option<Companion>, Self::Error> {
      Err(unavailable())
    }

    async fn list_companions(&self) -> Result<Vec<Companion>, Self::Error> {
      Err(unavailable())
    }
  }

  #[tokio::test]
  async fn storage_failure_is_an_opaque_500() {
    let invalidation = Invalidation::new();
    let router = api_router(Arc::new(FailingStore), invalidation.clone());

    let resp = post_visit(&router, &test_resto()).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
      json_body(resp).await,
      json!({ "success": false, "error": "Database error" })
    );
    assert_eq!(invalidation.revision(), 0);
  }
}
