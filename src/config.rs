use std::{env, path::PathBuf};

use crate::prelude::*;

#[derive(Debug, Clone)]
pub struct Config {
  pub database_url: String,
  pub secret: Option<String>,
  pub port: u16,
  pub proof_dir: PathBuf,
  pub asset_base_url: String,
  pub session_ttl: Duration,
  pub min_year: i32,
  pub max_year: i32,
  pub admin_email: Option<String>,
  pub admin_password: Option<String>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      database_url: "sqlite:petirpay.db?mode=rwc".into(),
      secret: None,
      port: 3000,
      proof_dir: PathBuf::from("storage/proofs"),
      asset_base_url: "http://localhost:3000".into(),
      session_ttl: Duration::from_secs(12 * 3600),
      min_year: 2024,
      max_year: 2030,
      admin_email: None,
      admin_password: None,
    }
  }
}

impl Config {
  pub fn from_env() -> anyhow::Result<Self> {
    let defaults = Self::default();

    let session_ttl = match env::var("SESSION_TTL") {
      Ok(raw) => humantime::parse_duration(&raw).map_err(|e| {
        anyhow::anyhow!("Invalid SESSION_TTL '{raw}': {e}")
      })?,
      Err(_) => defaults.session_ttl,
    };

    let config = Self {
      database_url: env::var("DATABASE_URL")
        .unwrap_or(defaults.database_url),
      secret: env::var("SERVER_SECRET").ok().filter(|s| !s.is_empty()),
      port: parsed("PORT").unwrap_or(defaults.port),
      proof_dir: env::var("PROOF_DIR")
        .map(PathBuf::from)
        .unwrap_or(defaults.proof_dir),
      asset_base_url: env::var("ASSET_BASE_URL")
        .unwrap_or(defaults.asset_base_url),
      session_ttl,
      min_year: parsed("MIN_YEAR").unwrap_or(defaults.min_year),
      max_year: parsed("MAX_YEAR").unwrap_or(defaults.max_year),
      admin_email: env::var("ADMIN_EMAIL").ok(),
      admin_password: env::var("ADMIN_PASSWORD").ok(),
    };

    if config.min_year > config.max_year {
      anyhow::bail!(
        "MIN_YEAR ({}) is after MAX_YEAR ({})",
        config.min_year,
        config.max_year
      );
    }

    Ok(config)
  }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
  env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
