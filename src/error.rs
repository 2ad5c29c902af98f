use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};

use crate::{entity::InvoiceStatus, sv::policy::Action};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("{field}: {message}")]
  Validation { field: &'static str, message: String },

  #[error("{0}")]
  Conflict(String),

  #[error("{entity} #{id} not found")]
  NotFound { entity: &'static str, id: String },

  #[error("access denied: {0:?}")]
  Forbidden(Action),

  #[error("invalid credentials")]
  Unauthorized,

  #[error("invoice cannot move from {} to {}", from.as_str(), to.as_str())]
  InvalidTransition { from: InvoiceStatus, to: InvoiceStatus },

  #[error("database error: {0}")]
  Db(#[from] DbErr),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("{0}")]
  Internal(String),
}

impl Error {
  pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
    Error::Validation { field, message: message.into() }
  }

  pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
    Error::NotFound { entity, id: id.to_string() }
  }

  /// Maps a unique-index violation onto a conflict, keeping every other
  /// database error as is.
  pub fn unique_or(err: DbErr, conflict: impl Into<String>) -> Self {
    match err.sql_err() {
      Some(SqlErr::UniqueConstraintViolation(_)) => {
        Error::Conflict(conflict.into())
      }
      _ => Error::Db(err),
    }
  }

  fn kind(&self) -> &'static str {
    match self {
      Error::Validation { .. } => "validation",
      Error::Conflict(_) => "conflict",
      Error::NotFound { .. } => "not_found",
      Error::Forbidden(_) => "forbidden",
      Error::Unauthorized => "unauthorized",
      Error::InvalidTransition { .. } => "invalid_transition",
      Error::Db(_) | Error::Io(_) | Error::Csv(_) | Error::Internal(_) => {
        "internal"
      }
    }
  }

  fn status(&self) -> StatusCode {
    match self {
      Error::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
      Error::Conflict(_) | Error::InvalidTransition { .. } => {
        StatusCode::CONFLICT
      }
      Error::NotFound { .. } => StatusCode::NOT_FOUND,
      Error::Forbidden(_) => StatusCode::FORBIDDEN,
      Error::Unauthorized => StatusCode::UNAUTHORIZED,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status();

    if status.is_server_error() {
      tracing::error!("request failed: {self}");
    }

    let message = if status.is_server_error() {
      "internal server error".to_string()
    } else {
      self.to_string()
    };

    let field = match &self {
      Error::Validation { field, .. } => Some(*field),
      _ => None,
    };

    let body = json::json!({
      "success": false,
      "error": self.kind(),
      "field": field,
      "message": message,
    });

    (status, Json(body)).into_response()
  }
}
