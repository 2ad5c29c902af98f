use axum::{
  extract::FromRequestParts,
  http::{header::AUTHORIZATION, request::Parts},
};

use crate::{
  prelude::*,
  state::AppState,
  sv::{auth, policy::Actor},
};

/// Caller identity taken from `Authorization: Bearer <token>`.
pub struct Session(pub Actor);

impl FromRequestParts<Arc<AppState>> for Session {
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    app: &Arc<AppState>,
  ) -> Result<Self> {
    let token = parts
      .headers
      .get(AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.strip_prefix("Bearer "))
      .ok_or(Error::Unauthorized)?;

    let secret = app
      .config
      .secret
      .as_deref()
      .ok_or_else(|| Error::Internal("SERVER_SECRET is not configured".into()))?;

    let claims = auth::verify_token(secret, token.trim())?;
    Ok(Session(claims.actor()))
  }
}

pub fn issue(app: &AppState, actor: Actor) -> Result<String> {
  let secret = app
    .config
    .secret
    .as_deref()
    .ok_or_else(|| Error::Internal("SERVER_SECRET is not configured".into()))?;
  auth::issue_token(secret, actor, app.config.session_ttl)
}
