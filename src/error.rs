use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use std::fmt::Debug;

pub enum AppError {
  BadRequest(String),
  Unauthorized,
  Forbidden,
  NotFound(String),
  Internal(anyhow::Error),
}

// 允许直接使用 ? 转换各种错误
impl<E> From<E> for AppError
where
  E: Into<anyhow::Error>,
{
  fn from(err: E) -> Self {
    Self::Internal(err.into())
  }
}

impl AppError {
  pub fn bad_request(msg: impl Into<String>) -> Self {
    Self::BadRequest(msg.into())
  }

  pub fn not_found(msg: impl Into<String>) -> Self {
    Self::NotFound(msg.into())
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let (status, message) = match self {
      Self::BadRequest(msg) => {
        tracing::warn!("rejected input: {}", msg);
        (StatusCode::BAD_REQUEST, msg)
      }
      Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Please log in first.".to_string()),
      Self::Forbidden => (StatusCode::FORBIDDEN, "Not your game.".to_string()),
      Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
      Self::Internal(err) => {
        tracing::error!("Application error: {:#}", err);

        #[cfg(debug_assertions)]
        let message = format!("Something went wrong: {:#}", err);

        #[cfg(not(debug_assertions))]
        let message = "Something went wrong".to_string();

        (StatusCode::INTERNAL_SERVER_ERROR, message)
      }
    };
    (status, Json(serde_json::json!({ "error": message }))).into_response()
  }
}

impl Debug for AppError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::BadRequest(msg) => write!(f, "BadRequest({})", msg),
      Self::Unauthorized => write!(f, "Unauthorized"),
      Self::Forbidden => write!(f, "Forbidden"),
      Self::NotFound(msg) => write!(f, "NotFound({})", msg),
      Self::Internal(err) => write!(f, "{:?}", err),
    }
  }
}
