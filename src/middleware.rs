use crate::state::AppState;
use axum::{
  extract::{Request, State},
  middleware::Next,
  response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower_cookies::Cookies;

use crate::error::AppError;

pub const TOKEN_COOKIE: &str = "token";

// Resolve the token cookie into a fresh `Profile` extension.
pub async fn auth_middleware(
  State(state): State<Arc<AppState>>,
  cookies: Cookies,
  mut req: Request,
  next: Next,
) -> Response {
  let claims = cookies
    .get(TOKEN_COOKIE)
    .and_then(|c| state.token_manager.parse_token(c.value()));

  let Some(claims) = claims else {
    if cookies.get(TOKEN_COOKIE).is_some() {
      cookies.remove(tower_cookies::Cookie::new(TOKEN_COOKIE, ""));
    }
    return AppError::Unauthorized.into_response();
  };

  match state.store.load(&claims.sub).await {
    Ok(Some(profile)) if profile.id == claims.uid => {
      req.extensions_mut().insert(profile);
      next.run(req).await
    }
    Ok(_) => {
      cookies.remove(tower_cookies::Cookie::new(TOKEN_COOKIE, ""));
      AppError::Unauthorized.into_response()
    }
    Err(e) => AppError::from(e).into_response(),
  }
}
