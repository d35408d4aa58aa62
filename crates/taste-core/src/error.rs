//! Error types for `taste-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("rating {0} is outside 1..=5")]
  RatingOutOfRange(i64),

  #[error("unknown menu category: {0:?}")]
  UnknownCategory(String),

  #[error("{0} name must not be blank")]
  BlankName(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
