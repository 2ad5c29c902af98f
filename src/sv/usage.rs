use serde::Serialize;

use crate::{
  entity::{customer, usage},
  prelude::*,
  sv::{
    billing::Period,
    policy::{Action, Actor},
  },
  utils,
};

pub struct Usage<'a> {
  db: &'a DatabaseConnection,
}

/// Answer to "what did the meter read last period?".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviousReading {
  pub meter_end: i64,
  pub period: Period,
  pub period_name: String,
  pub has_previous: bool,
}

/// End reading of the period right before `period`, or zero for a first bill.
pub async fn previous_reading<C: ConnectionTrait>(
  conn: &C,
  customer_id: i32,
  period: Period,
) -> Result<PreviousReading> {
  let previous = period.previous();
  let found = usage::Entity::find()
    .filter(usage::Column::CustomerId.eq(customer_id))
    .filter(usage::Column::Month.eq(previous.month))
    .filter(usage::Column::Year.eq(previous.year))
    .one(conn)
    .await?;

  Ok(PreviousReading {
    meter_end: found.as_ref().map_or(0, |u| u.meter_end),
    period: previous,
    period_name: previous.to_string(),
    has_previous: found.is_some(),
  })
}

/// Inserts a usage row; callers run this inside their transaction.
pub async fn record<C: ConnectionTrait>(
  conn: &C,
  customer_id: i32,
  period: Period,
  meter_start: i64,
  meter_end: i64,
) -> Result<usage::Model> {
  if meter_end < meter_start {
    return Err(Error::validation(
      "meter_end",
      format!("must not be below the start reading {meter_start}"),
    ));
  }

  let usage = usage::ActiveModel {
    id: NotSet,
    customer_id: Set(customer_id),
    month: Set(period.month),
    year: Set(period.year),
    meter_start: Set(meter_start),
    meter_end: Set(meter_end),
    created_at: Set(utils::now()),
  }
  .insert(conn)
  .await
  .map_err(|e| {
    Error::unique_or(e, format!("Usage for {period} is already recorded"))
  })?;

  debug!(
    "Usage #{} recorded for customer #{customer_id}: {meter_start} -> {meter_end}",
    usage.id
  );
  Ok(usage)
}

impl<'a> Usage<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn previous_reading(
    &self,
    actor: &Actor,
    customer_id: i32,
    period: Period,
  ) -> Result<PreviousReading> {
    actor.ensure(Action::ManageInvoices)?;

    customer::Entity::find_by_id(customer_id)
      .one(self.db)
      .await?
      .ok_or_else(|| Error::not_found("customer", customer_id))?;

    previous_reading(self.db, customer_id, period).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{entity::StaffRole, sv::test_utils::test_db};

  #[tokio::test]
  async fn test_first_period_has_no_previous() {
    let db = test_db::setup().await;
    let (_, officer) =
      test_db::staff(&db, "officer@petir.id", StaffRole::Officer).await;
    let tariff = test_db::tariff(&db, 900, 60_500).await;
    let customer = test_db::customer(&db, tariff.id, "Budi", "111").await;

    let prev = Usage::new(&db)
      .previous_reading(&officer, customer.id, Period::new(7, 2025))
      .await
      .unwrap();

    assert_eq!(prev.meter_end, 0);
    assert!(!prev.has_previous);
    assert_eq!(prev.period, Period::new(6, 2025));
    assert_eq!(prev.period_name, "Juni 2025");
  }

  #[tokio::test]
  async fn test_january_looks_at_december() {
    let db = test_db::setup().await;
    let tariff = test_db::tariff(&db, 900, 60_500).await;
    let customer = test_db::customer(&db, tariff.id, "Budi", "111").await;

    record(&db, customer.id, Period::new(12, 2024), 1000, 1250).await.unwrap();

    let prev = previous_reading(&db, customer.id, Period::new(1, 2025))
      .await
      .unwrap();
    assert!(prev.has_previous);
    assert_eq!(prev.meter_end, 1250);
  }

  #[tokio::test]
  async fn test_duplicate_period_conflicts() {
    let db = test_db::setup().await;
    let tariff = test_db::tariff(&db, 900, 60_500).await;
    let customer = test_db::customer(&db, tariff.id, "Budi", "111").await;
    let period = Period::new(7, 2025);

    record(&db, customer.id, period, 0, 10).await.unwrap();
    assert!(matches!(
      record(&db, customer.id, period, 10, 20).await,
      Err(Error::Conflict(_))
    ));
    assert_eq!(usage::Entity::find().count(&db).await.unwrap(), 1);
  }

  #[tokio::test]
  async fn test_unknown_customer() {
    let db = test_db::setup().await;
    let (_, officer) =
      test_db::staff(&db, "officer@petir.id", StaffRole::Officer).await;

    let result = Usage::new(&db)
      .previous_reading(&officer, 42, Period::new(7, 2025))
      .await;
    assert!(matches!(result, Err(Error::NotFound { entity: "customer", .. })));
  }
}
