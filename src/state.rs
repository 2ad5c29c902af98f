use migration::{Migrator, MigratorTrait};

use crate::{config::Config, prelude::*, sv};

pub struct AppState {
  pub db: DatabaseConnection,
  pub config: Config,
}

/// Borrowed service handles, one per table family.
pub struct Services<'a> {
  pub tariff: sv::Tariff<'a>,
  pub customer: sv::Customer<'a>,
  pub staff: sv::Staff<'a>,
  pub usage: sv::Usage<'a>,
  pub invoice: sv::Invoice<'a>,
  pub method: sv::PaymentMethod<'a>,
  pub payment: sv::Payment<'a>,
  pub report: sv::Report<'a>,
  pub export: sv::Export<'a>,
}

impl AppState {
  pub async fn new(config: Config) -> anyhow::Result<Self> {
    let db = Database::connect(&config.database_url).await?;
    Migrator::up(&db, None).await?;
    info!("Database ready at {}", config.database_url);

    Ok(Self { db, config })
  }

  pub fn sv(&self) -> Services<'_> {
    let db = &self.db;
    let config = &self.config;

    Services {
      tariff: sv::Tariff::new(db),
      customer: sv::Customer::new(db),
      staff: sv::Staff::new(db),
      usage: sv::Usage::new(db),
      invoice: sv::Invoice::new(db, config),
      method: sv::PaymentMethod::new(db),
      payment: sv::Payment::new(db, config),
      report: sv::Report::new(db, config),
      export: sv::Export::new(db),
    }
  }
}
