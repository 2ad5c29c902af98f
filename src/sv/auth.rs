//! Password digests and stateless session tokens, both keyed HMAC-SHA256.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::{
  prelude::*,
  sv::policy::{Actor, Role},
};

type HmacSha256 = Hmac<Sha256>;

pub const MIN_PASSWORD_LEN: usize = 8;

/// `<salt>$<hex digest>`
pub fn hash_password(password: &str) -> String {
  let salt = Uuid::new_v4().simple().to_string();
  let digest = digest(&salt, password);
  format!("{salt}${digest}")
}

pub fn verify_password(password: &str, stored: &str) -> bool {
  let Some((salt, expected)) = stored.split_once('$') else {
    return false;
  };
  let Ok(expected) = hex::decode(expected) else {
    return false;
  };

  let mut mac = mac(salt.as_bytes());
  mac.update(password.as_bytes());
  mac.verify_slice(&expected).is_ok()
}

fn digest(salt: &str, password: &str) -> String {
  let mut mac = mac(salt.as_bytes());
  mac.update(password.as_bytes());
  hex::encode(mac.finalize().into_bytes())
}

fn mac(key: &[u8]) -> HmacSha256 {
  HmacSha256::new_from_slice(key).expect("HMAC can take key of any size")
}

pub fn validate_new_password(password: &str, confirmation: &str) -> Result<()> {
  if password.chars().count() < MIN_PASSWORD_LEN {
    return Err(Error::validation(
      "password",
      format!("must be at least {MIN_PASSWORD_LEN} characters"),
    ));
  }
  if password != confirmation {
    return Err(Error::validation("password", "confirmation does not match"));
  }
  Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
  pub sub: i32,
  pub role: Role,
  pub exp: i64,
}

impl Claims {
  pub fn actor(&self) -> Actor {
    Actor::new(self.sub, self.role)
  }
}

/// Issues `<base64 claims>.<hex mac>`.
pub fn issue_token(secret: &str, actor: Actor, ttl: Duration) -> Result<String> {
  let ttl = TimeDelta::from_std(ttl)
    .map_err(|e| Error::Internal(format!("Invalid session ttl: {e}")))?;
  let claims = Claims {
    sub: actor.id,
    role: actor.role,
    exp: (Utc::now() + ttl).timestamp(),
  };

  let payload = json::to_vec(&claims)
    .map_err(|e| Error::Internal(format!("Failed to encode claims: {e}")))?;
  let payload = URL_SAFE_NO_PAD.encode(payload);

  let mut mac = mac(secret.as_bytes());
  mac.update(payload.as_bytes());
  let signature = hex::encode(mac.finalize().into_bytes());

  Ok(format!("{payload}.{signature}"))
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims> {
  let (payload, signature) =
    token.split_once('.').ok_or(Error::Unauthorized)?;
  let signature = hex::decode(signature).map_err(|_| Error::Unauthorized)?;

  let mut mac = mac(secret.as_bytes());
  mac.update(payload.as_bytes());
  mac.verify_slice(&signature).map_err(|_| Error::Unauthorized)?;

  let raw = URL_SAFE_NO_PAD.decode(payload).map_err(|_| Error::Unauthorized)?;
  let claims: Claims =
    json::from_slice(&raw).map_err(|_| Error::Unauthorized)?;

  if claims.exp < Utc::now().timestamp() {
    debug!("Expired session for #{}", claims.sub);
    return Err(Error::Unauthorized);
  }

  Ok(claims)
}
