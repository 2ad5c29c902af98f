//! Shared test utilities for database setup

#[cfg(test)]
pub mod test_db {
  use migration::{Migrator, MigratorTrait};
  use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};

  use crate::{
    config::Config,
    entity::*,
    sv::{auth, policy::Actor},
    utils,
  };

  /// Creates an in-memory SQLite database with the real schema
  pub async fn setup() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
  }

  pub fn config() -> Config {
    Config { secret: Some("test-secret".into()), ..Config::default() }
  }

  pub async fn tariff(
    db: &DatabaseConnection,
    power_va: i32,
    price_per_kwh: i64,
  ) -> tariff::Model {
    let now = utils::now();
    tariff::ActiveModel {
      power_va: Set(power_va),
      price_per_kwh: Set(price_per_kwh),
      description: Set(Some(format!("R1/TR {power_va} VA"))),
      created_at: Set(now),
      updated_at: Set(now),
      ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
  }

  pub async fn customer(
    db: &DatabaseConnection,
    tariff_id: i32,
    name: &str,
    meter_number: &str,
  ) -> customer::Model {
    let now = utils::now();
    customer::ActiveModel {
      name: Set(name.into()),
      email: Set(format!("{meter_number}@test.com")),
      password_hash: Set(auth::hash_password("password123")),
      meter_number: Set(meter_number.into()),
      address: Set("Jl. Test No. 123".into()),
      tariff_id: Set(tariff_id),
      created_at: Set(now),
      updated_at: Set(now),
      ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
  }

  pub async fn method(
    db: &DatabaseConnection,
    code: &str,
    admin_fee: i64,
  ) -> payment_method::Model {
    let now = utils::now();
    payment_method::ActiveModel {
      name: Set(format!("Bank {code}")),
      code: Set(code.into()),
      account_holder: Set("PT. Petir Pay Indonesia".into()),
      account_number: Set(Some("1234567890".into())),
      admin_fee: Set(admin_fee),
      description: Set(None),
      logo: Set(None),
      is_active: Set(true),
      created_at: Set(now),
      updated_at: Set(now),
      ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
  }

  pub async fn staff(
    db: &DatabaseConnection,
    email: &str,
    role: StaffRole,
  ) -> (user::Model, Actor) {
    let now = utils::now();
    let user = user::ActiveModel {
      name: Set(email.split('@').next().unwrap_or(email).into()),
      email: Set(email.into()),
      password_hash: Set(auth::hash_password("password123")),
      role: Set(role),
      created_at: Set(now),
      updated_at: Set(now),
      ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();

    let actor = Actor::new(user.id, role.into());
    (user, actor)
  }
}
