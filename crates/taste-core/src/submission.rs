//! The visit submission payload and its validation.
//!
//! [`VisitSubmission`] is the loosely-typed shape posted by the form: every
//! field is optional so that a missing or malformed value can be reported
//! against its path instead of failing deserialisation outright.
//! [`VisitSubmission::validate`] turns it into a [`NewVisit`] or a
//! [`ValidationErrors`] listing every problem found.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::VariantNames;

use crate::{
  Error,
  model::{MenuCategory, Rating},
};

/// Visits logged before this year are rejected.
const EARLIEST_VISIT_YEAR: i32 = 1900;

/// How far past the server's UTC date a visit date may fall. Calendar dates
/// are chosen in the submitter's zone, which can be up to UTC+14.
const FUTURE_DATE_SLACK_DAYS: u64 = 1;

// ─── Payload ─────────────────────────────────────────────────────────────────

/// A visit as submitted, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitSubmission {
  #[serde(default)]
  pub restaurant: RestaurantSubmission,
  #[serde(default)]
  pub visit:      VisitDetails,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantSubmission {
  pub name:      Option<String>,
  pub cuisine:   Option<String>,
  pub address:   Option<String>,
  pub latitude:  Option<f64>,
  pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitDetails {
  /// `YYYY-MM-DD` or an RFC 3339 timestamp.
  pub date:        Option<String>,
  pub rating:      Option<serde_json::Number>,
  pub menu_items:  Option<Vec<MenuItemSubmission>>,
  pub companions:  Option<Vec<String>>,

  // Free-text course notes from the earlier form. Each non-blank field is
  // folded into one structured menu item.
  pub starters:    Option<String>,
  pub main_course: Option<String>,
  pub desserts:    Option<String>,
  pub drinks:      Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemSubmission {
  pub name:     Option<String>,
  pub category: Option<String>,
  pub price:    Option<f64>,
}

// ─── Validated input ─────────────────────────────────────────────────────────

/// Restaurant descriptor as it will be stored if the name is new.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRestaurant {
  pub name:      String,
  pub cuisine:   Option<String>,
  pub address:   Option<String>,
  pub latitude:  Option<f64>,
  pub longitude: Option<f64>,
}

impl NewRestaurant {
  /// A restaurant with only a name.
  pub fn named(name: impl Into<String>) -> Self {
    Self {
      name:      name.into(),
      cuisine:   None,
      address:   None,
      latitude:  None,
      longitude: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMenuItem {
  pub name:     String,
  pub category: MenuCategory,
  pub price:    Option<f64>,
}

/// Input to [`crate::store::JournalStore::log_visit`].
///
/// Produced by [`VisitSubmission::validate`]; names are trimmed and
/// companions are de-duplicated in submission order.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVisit {
  pub restaurant: NewRestaurant,
  pub date:       NaiveDate,
  pub rating:     Rating,
  pub companions: Vec<String>,
  pub menu_items: Vec<NewMenuItem>,
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Every validation failure found in a submission, keyed by dotted field
/// path (`restaurant.name`, `visit.menuItems.1.category`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationErrors {
  /// Problems not attributable to one field, such as a malformed body.
  pub form_errors:  Vec<String>,
  pub field_errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
  /// A single form-level error.
  pub fn form(message: impl Into<String>) -> Self {
    Self {
      form_errors:  vec![message.into()],
      field_errors: BTreeMap::new(),
    }
  }

  pub fn add(&mut self, path: impl Into<String>, message: impl Into<String>) {
    self
      .field_errors
      .entry(path.into())
      .or_default()
      .push(message.into());
  }

  pub fn is_empty(&self) -> bool {
    self.form_errors.is_empty() && self.field_errors.is_empty()
  }

  /// Messages recorded against `path`, if any.
  pub fn field(&self, path: &str) -> Option<&[String]> {
    self.field_errors.get(path).map(Vec::as_slice)
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "invalid submission")?;
    let mut sep = ": ";
    for message in &self.form_errors {
      write!(f, "{sep}{message}")?;
      sep = "; ";
    }
    for (path, messages) in &self.field_errors {
      write!(f, "{sep}{path}: {}", messages.join(", "))?;
      sep = "; ";
    }
    Ok(())
  }
}

impl std::error::Error for ValidationErrors {}

// ─── Validation ──────────────────────────────────────────────────────────────

impl VisitSubmission {
  /// Validate against today's UTC date.
  pub fn validate(self) -> Result<NewVisit, ValidationErrors> {
    self.validate_on(Utc::now().date_naive())
  }

  /// Validate, treating `today` (plus one day for zones ahead of UTC) as the
  /// latest acceptable visit date.
  pub fn validate_on(self, today: NaiveDate) -> Result<NewVisit, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let restaurant = validate_restaurant(self.restaurant, &mut errors);
    let date = validate_date(self.visit.date.as_deref(), today, &mut errors);
    let rating = validate_rating(self.visit.rating.as_ref(), &mut errors);
    let companions =
      validate_companions(self.visit.companions.unwrap_or_default(), &mut errors);

    let mut menu_items =
      validate_menu_items(self.visit.menu_items.unwrap_or_default(), &mut errors);
    let legacy = [
      (self.visit.starters, MenuCategory::Starter),
      (self.visit.main_course, MenuCategory::Main),
      (self.visit.desserts, MenuCategory::Dessert),
      (self.visit.drinks, MenuCategory::Drink),
    ];
    menu_items.extend(legacy.into_iter().filter_map(|(text, category)| {
      non_blank(text).map(|name| NewMenuItem { name, category, price: None })
    }));

    match (restaurant, date, rating) {
      (Some(restaurant), Some(date), Some(rating)) if errors.is_empty() => {
        Ok(NewVisit { restaurant, date, rating, companions, menu_items })
      }
      _ => Err(errors),
    }
  }
}

/// Trim, mapping blank strings to `None`.
fn non_blank(s: Option<String>) -> Option<String> {
  s.as_deref().and_then(normalize_name)
}

// ─── Names ───────────────────────────────────────────────────────────────────

/// The stored form of a restaurant or companion name: trimmed, never empty.
pub fn normalize_name(raw: &str) -> Option<String> {
  let name = raw.trim();
  (!name.is_empty()).then(|| name.to_owned())
}

/// Normalize companion names and drop repeats, keeping first occurrence.
///
/// Fails with [`Error::BlankName`] if any name is blank.
pub fn normalize_companions(
  names: impl IntoIterator<Item = String>,
) -> crate::Result<Vec<String>> {
  let mut out: Vec<String> = Vec::new();
  for raw in names {
    let name = normalize_name(&raw).ok_or(Error::BlankName("companion"))?;
    if !out.contains(&name) {
      out.push(name);
    }
  }
  Ok(out)
}

fn validate_restaurant(
  r: RestaurantSubmission,
  errors: &mut ValidationErrors,
) -> Option<NewRestaurant> {
  let name = non_blank(r.name);
  if name.is_none() {
    errors.add("restaurant.name", "Restaurant name is required");
  }
  if let Some(lat) = r.latitude
    && !(-90.0..=90.0).contains(&lat)
  {
    errors.add("restaurant.latitude", "Latitude must be between -90 and 90");
  }
  if let Some(lng) = r.longitude
    && !(-180.0..=180.0).contains(&lng)
  {
    errors.add("restaurant.longitude", "Longitude must be between -180 and 180");
  }

  Some(NewRestaurant {
    name:      name?,
    cuisine:   non_blank(r.cuisine),
    address:   non_blank(r.address),
    latitude:  r.latitude,
    longitude: r.longitude,
  })
}

fn parse_visit_date(raw: &str) -> Option<NaiveDate> {
  let raw = raw.trim();
  NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
    // The calendar date in the submitter's own offset.
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive())
  })
}

fn validate_date(
  raw: Option<&str>,
  today: NaiveDate,
  errors: &mut ValidationErrors,
) -> Option<NaiveDate> {
  let Some(raw) = raw else {
    errors.add("visit.date", "Date is required");
    return None;
  };
  let Some(date) = parse_visit_date(raw) else {
    errors.add("visit.date", "Invalid date");
    return None;
  };
  if date.year() < EARLIEST_VISIT_YEAR {
    errors.add("visit.date", "Date must not be before 1900-01-01");
    return None;
  }
  let latest = today
    .checked_add_days(Days::new(FUTURE_DATE_SLACK_DAYS))
    .unwrap_or(today);
  if date > latest {
    errors.add("visit.date", "Date must not be in the future");
    return None;
  }
  Some(date)
}

/// Accepts integers and integral floats (`4.0`).
fn integral(n: &serde_json::Number) -> Option<i64> {
  n.as_i64().or_else(|| {
    n.as_f64()
      .filter(|f| f.fract() == 0.0 && f.abs() <= i64::MAX as f64)
      .map(|f| f as i64)
  })
}

fn validate_rating(
  raw: Option<&serde_json::Number>,
  errors: &mut ValidationErrors,
) -> Option<Rating> {
  let Some(raw) = raw else {
    errors.add("visit.rating", "Rating is required");
    return None;
  };
  let Some(value) = integral(raw) else {
    errors.add("visit.rating", "Rating must be a whole number");
    return None;
  };
  match Rating::try_from(value) {
    Ok(rating) => Some(rating),
    Err(_) => {
      errors.add("visit.rating", "Rating must be between 1 and 5");
      None
    }
  }
}

fn validate_companions(
  names: Vec<String>,
  errors: &mut ValidationErrors,
) -> Vec<String> {
  let mut out: Vec<String> = Vec::with_capacity(names.len());
  for (i, name) in names.into_iter().enumerate() {
    match non_blank(Some(name)) {
      None => errors.add(
        format!("visit.companions.{i}"),
        "Companion name must not be empty",
      ),
      Some(name) if !out.contains(&name) => out.push(name),
      Some(_) => {}
    }
  }
  out
}

fn validate_menu_items(
  items: Vec<MenuItemSubmission>,
  errors: &mut ValidationErrors,
) -> Vec<NewMenuItem> {
  let mut out = Vec::with_capacity(items.len());
  for (i, item) in items.into_iter().enumerate() {
    let path = format!("visit.menuItems.{i}");

    let name = non_blank(item.name);
    if name.is_none() {
      errors.add(format!("{path}.name"), "Menu item name is required");
    }

    let category = match item.category.as_deref() {
      None => {
        errors.add(format!("{path}.category"), "Category is required");
        None
      }
      Some(raw) => match MenuCategory::parse(raw) {
        Ok(c) => Some(c),
        Err(_) => {
          errors.add(
            format!("{path}.category"),
            format!(
              "Invalid category {raw:?}, expected one of {}",
              MenuCategory::VARIANTS.join(" | ")
            ),
          );
          None
        }
      },
    };

    let price = match item.price {
      Some(p) if !p.is_finite() || p < 0.0 => {
        errors.add(format!("{path}.price"), "Price must not be negative");
        None
      }
      other => other,
    };

    if let (Some(name), Some(category)) = (name, category) {
      out.push(NewMenuItem { name, category, price });
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 6, 1).unwrap() }

  fn submission(value: serde_json::Value) -> VisitSubmission {
    serde_json::from_value(value).expect("payload shape")
  }

  fn minimal() -> serde_json::Value {
    json!({
      "restaurant": { "name": "Test Resto" },
      "visit": { "date": "2024-01-01", "rating": 5 }
    })
  }

  fn errors_of(value: serde_json::Value) -> ValidationErrors {
    submission(value).validate_on(today()).unwrap_err()
  }

  #[test]
  fn minimal_submission_is_valid() {
    let visit = submission(minimal()).validate_on(today()).unwrap();
    assert_eq!(visit.restaurant, NewRestaurant::named("Test Resto"));
    assert_eq!(visit.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    assert_eq!(visit.rating.get(), 5);
    assert!(visit.companions.is_empty());
    assert!(visit.menu_items.is_empty());
  }

  #[test]
  fn full_submission_is_valid() {
    let visit = submission(json!({
      "restaurant": {
        "name": "  Test Resto ",
        "cuisine": "Test",
        "address": "",
        "latitude": 51.5,
        "longitude": -0.09
      },
      "visit": {
        "date": "2024-01-01",
        "rating": 5,
        "menuItems": [
          { "name": "Soup", "category": "STARTER", "price": 5.50 },
          { "name": "Steak", "category": "MAIN", "price": 25.00 }
        ],
        "companions": ["Alice"]
      }
    }))
    .validate_on(today())
    .unwrap();

    assert_eq!(visit.restaurant.name, "Test Resto");
    assert_eq!(visit.restaurant.cuisine.as_deref(), Some("Test"));
    assert_eq!(visit.restaurant.address, None);
    assert_eq!(visit.restaurant.latitude, Some(51.5));
    assert_eq!(visit.companions, vec!["Alice".to_owned()]);
    assert_eq!(visit.menu_items.len(), 2);
    assert_eq!(visit.menu_items[0].category, MenuCategory::Starter);
    assert_eq!(visit.menu_items[1].price, Some(25.0));
  }

  #[test]
  fn rating_out_of_range_is_rejected() {
    for rating in [0, 6] {
      let mut payload = minimal();
      payload["visit"]["rating"] = json!(rating);
      let errors = errors_of(payload);
      assert!(errors.field("visit.rating").is_some(), "rating {rating}");
    }
  }

  #[test]
  fn fractional_rating_is_rejected_but_integral_float_accepted() {
    let mut payload = minimal();
    payload["visit"]["rating"] = json!(4.5);
    assert!(errors_of(payload).field("visit.rating").is_some());

    let mut payload = minimal();
    payload["visit"]["rating"] = json!(4.0);
    let visit = submission(payload).validate_on(today()).unwrap();
    assert_eq!(visit.rating.get(), 4);
  }

  #[test]
  fn empty_restaurant_name_is_rejected() {
    for name in [json!(""), json!("   "), json!(null)] {
      let mut payload = minimal();
      payload["restaurant"]["name"] = name;
      let errors = errors_of(payload);
      assert_eq!(
        errors.field("restaurant.name"),
        Some(&["Restaurant name is required".to_owned()][..])
      );
    }
  }

  #[test]
  fn missing_sections_report_every_required_field() {
    let errors = errors_of(json!({}));
    assert!(errors.field("restaurant.name").is_some());
    assert!(errors.field("visit.date").is_some());
    assert!(errors.field("visit.rating").is_some());
    assert!(errors.form_errors.is_empty());
  }

  #[test]
  fn dates_are_parsed_and_bounded() {
    let mut payload = minimal();
    payload["visit"]["date"] = json!("2024-01-01T19:30:00.000Z");
    let visit = submission(payload).validate_on(today()).unwrap();
    assert_eq!(visit.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

    for bad in ["yesterday", "2024-13-01", "1899-12-31", "2024-06-03"] {
      let mut payload = minimal();
      payload["visit"]["date"] = json!(bad);
      assert!(errors_of(payload).field("visit.date").is_some(), "date {bad}");
    }
  }

  #[test]
  fn offset_timestamp_keeps_the_submitters_calendar_date() {
    let mut payload = minimal();
    payload["visit"]["date"] = json!("2024-06-02T08:00:00+10:00");
    let visit = submission(payload).validate_on(today()).unwrap();
    assert_eq!(visit.date, NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());

    let mut payload = minimal();
    payload["visit"]["date"] = json!("2024-05-31T20:00:00-07:00");
    let visit = submission(payload).validate_on(today()).unwrap();
    assert_eq!(visit.date, NaiveDate::from_ymd_opt(2024, 5, 31).unwrap());
  }

  #[test]
  fn tomorrow_in_utc_is_accepted_for_zones_ahead() {
    let mut payload = minimal();
    payload["visit"]["date"] = json!("2024-06-02");
    let visit = submission(payload).validate_on(today()).unwrap();
    assert_eq!(visit.date, NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());

    let mut payload = minimal();
    payload["visit"]["date"] = json!("2024-06-03");
    assert_eq!(
      errors_of(payload).field("visit.date"),
      Some(&["Date must not be in the future".to_owned()][..])
    );
  }

  #[test]
  fn normalize_companions_trims_dedups_and_rejects_blank() {
    let names = ["Alice", " Alice ", "Bob"].map(str::to_owned);
    assert_eq!(normalize_companions(names).unwrap(), ["Alice", "Bob"]);

    let names = ["", " Alice", "Alice"].map(str::to_owned);
    assert!(matches!(
      normalize_companions(names),
      Err(Error::BlankName("companion"))
    ));
  }

  #[test]
  fn companions_are_trimmed_and_deduplicated() {
    let mut payload = minimal();
    payload["visit"]["companions"] = json!(["Alice", " Bob ", "Alice", "Bob"]);
    let visit = submission(payload).validate_on(today()).unwrap();
    assert_eq!(visit.companions, vec!["Alice".to_owned(), "Bob".to_owned()]);
  }

  #[test]
  fn blank_companion_is_rejected_by_index() {
    let mut payload = minimal();
    payload["visit"]["companions"] = json!(["Alice", " "]);
    let errors = errors_of(payload);
    assert!(errors.field("visit.companions.1").is_some());
    assert!(errors.field("visit.companions.0").is_none());
  }

  #[test]
  fn menu_item_errors_are_keyed_by_index() {
    let mut payload = minimal();
    payload["visit"]["menuItems"] = json!([
      { "name": "Soup", "category": "STARTER" },
      { "name": "", "category": "SNACK", "price": -1.0 }
    ]);
    let errors = errors_of(payload);
    assert!(errors.field("visit.menuItems.0.name").is_none());
    assert!(errors.field("visit.menuItems.1.name").is_some());
    assert!(errors.field("visit.menuItems.1.category").is_some());
    assert!(errors.field("visit.menuItems.1.price").is_some());
  }

  #[test]
  fn coordinates_out_of_range_are_rejected() {
    let mut payload = minimal();
    payload["restaurant"]["latitude"] = json!(91.0);
    payload["restaurant"]["longitude"] = json!(-181.0);
    let errors = errors_of(payload);
    assert!(errors.field("restaurant.latitude").is_some());
    assert!(errors.field("restaurant.longitude").is_some());
  }

  #[test]
  fn legacy_course_notes_become_menu_items() {
    let mut payload = minimal();
    payload["visit"]["menuItems"] = json!([{ "name": "Bread", "category": "STARTER" }]);
    payload["visit"]["mainCourse"] = json!(" Risotto ");
    payload["visit"]["drinks"] = json!("Negroni");
    payload["visit"]["desserts"] = json!("");
    let visit = submission(payload).validate_on(today()).unwrap();

    let items: Vec<_> = visit
      .menu_items
      .iter()
      .map(|i| (i.name.as_str(), i.category))
      .collect();
    assert_eq!(
      items,
      vec![
        ("Bread", MenuCategory::Starter),
        ("Risotto", MenuCategory::Main),
        ("Negroni", MenuCategory::Drink),
      ]
    );
  }

  #[test]
  fn display_lists_field_paths() {
    let errors = errors_of(json!({ "visit": { "date": "2024-01-01", "rating": 3 } }));
    assert_eq!(
      errors.to_string(),
      "invalid submission: restaurant.name: Restaurant name is required"
    );
  }

  #[test]
  fn errors_serialize_flattened() {
    let errors = errors_of(json!({ "visit": { "date": "2024-01-01", "rating": 3 } }));
    assert_eq!(
      serde_json::to_value(&errors).unwrap(),
      json!({
        "formErrors": [],
        "fieldErrors": { "restaurant.name": ["Restaurant name is required"] }
      })
    );
  }
}
