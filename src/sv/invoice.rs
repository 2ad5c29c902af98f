use sea_orm::Condition;
use serde::{Deserialize, Serialize};

use crate::{
  config::Config,
  entity::{InvoiceStatus, customer, invoice, tariff, usage},
  prelude::*,
  sv::{
    billing::{self, MeterInput, Period},
    paging::{Page, PageQuery},
    policy::{Action, Actor},
    usage as recorder,
  },
  utils,
};

pub struct Invoice<'a> {
  db: &'a DatabaseConnection,
  config: &'a Config,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewInvoice {
  pub customer_id: i32,
  pub month: i32,
  pub year: i32,
  pub reading: MeterInput,
}

#[derive(Debug, Clone, Serialize)]
pub struct Created {
  pub invoice: invoice::Model,
  pub usage: usage::Model,
  pub has_previous: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceFilter {
  pub search: Option<String>,
  pub status: Option<InvoiceStatus>,
  pub page: Option<u64>,
  pub per_page: Option<u64>,
}

impl InvoiceFilter {
  pub fn paging(&self) -> PageQuery {
    PageQuery { page: self.page, per_page: self.per_page }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceRow {
  #[serde(flatten)]
  pub invoice: invoice::Model,
  pub period_name: String,
  pub customer: Option<customer::Model>,
  pub tariff: Option<tariff::Model>,
  /// kWh × tariff price in sen, before admin fee.
  pub energy_cost: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
  pub total: u64,
  pub unpaid: u64,
  pub pending_confirmation: u64,
  pub paid: u64,
}

impl StatusCounts {
  pub fn get(&self, status: InvoiceStatus) -> u64 {
    match status {
      InvoiceStatus::Unpaid => self.unpaid,
      InvoiceStatus::PendingConfirmation => self.pending_confirmation,
      InvoiceStatus::Paid => self.paid,
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceList {
  #[serde(flatten)]
  pub page: Page<InvoiceRow>,
  pub stats: StatusCounts,
}

pub async fn status_counts<C: ConnectionTrait>(conn: &C) -> Result<StatusCounts> {
  let count = |status: InvoiceStatus| {
    invoice::Entity::find()
      .filter(invoice::Column::Status.eq(status))
      .count(conn)
  };

  let unpaid = count(InvoiceStatus::Unpaid).await?;
  let pending_confirmation = count(InvoiceStatus::PendingConfirmation).await?;
  let paid = count(InvoiceStatus::Paid).await?;

  Ok(StatusCounts {
    total: unpaid + pending_confirmation + paid,
    unpaid,
    pending_confirmation,
    paid,
  })
}

/// Attaches customers and tariffs to a batch of invoices.
pub async fn rows<C: ConnectionTrait>(
  conn: &C,
  invoices: Vec<invoice::Model>,
) -> Result<Vec<InvoiceRow>> {
  let customer_ids: HashSet<i32> =
    invoices.iter().map(|i| i.customer_id).collect();
  let customers: HashMap<i32, customer::Model> = customer::Entity::find()
    .filter(customer::Column::Id.is_in(customer_ids))
    .all(conn)
    .await?
    .into_iter()
    .map(|c| (c.id, c))
    .collect();

  let tariff_ids: HashSet<i32> = customers.values().map(|c| c.tariff_id).collect();
  let tariffs: HashMap<i32, tariff::Model> = tariff::Entity::find()
    .filter(tariff::Column::Id.is_in(tariff_ids))
    .all(conn)
    .await?
    .into_iter()
    .map(|t| (t.id, t))
    .collect();

  Ok(
    invoices
      .into_iter()
      .map(|invoice| {
        let customer = customers.get(&invoice.customer_id).cloned();
        let tariff =
          customer.as_ref().and_then(|c| tariffs.get(&c.tariff_id)).cloned();
        let energy_cost = tariff
          .as_ref()
          .and_then(|t| billing::energy(invoice.kwh, t.price_per_kwh));

        InvoiceRow {
          period_name: Period::new(invoice.month, invoice.year).to_string(),
          invoice,
          customer,
          tariff,
          energy_cost,
        }
      })
      .collect(),
  )
}

impl<'a> Invoice<'a> {
  pub fn new(db: &'a DatabaseConnection, config: &'a Config) -> Self {
    Self { db, config }
  }

  pub async fn by_id(&self, id: i32) -> Result<invoice::Model> {
    invoice::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or_else(|| Error::not_found("invoice", id))
  }

  /// Records the period's usage and derives an unpaid invoice from it.
  pub async fn create(&self, actor: &Actor, form: NewInvoice) -> Result<Created> {
    actor.ensure(Action::ManageInvoices)?;

    let period = Period::new(form.month, form.year);
    period.validate(self.config.min_year, self.config.max_year)?;

    let customer = customer::Entity::find_by_id(form.customer_id)
      .one(self.db)
      .await?
      .ok_or_else(|| Error::not_found("customer", form.customer_id))?;

    let txn = self.db.begin().await?;

    let existing = invoice::Entity::find()
      .filter(invoice::Column::CustomerId.eq(customer.id))
      .filter(invoice::Column::Month.eq(period.month))
      .filter(invoice::Column::Year.eq(period.year))
      .count(&txn)
      .await?;
    if existing > 0 {
      warn!("Duplicate invoice for {} in {period}", customer.meter_number);
      return Err(duplicate(&customer, period));
    }

    let previous = recorder::previous_reading(&txn, customer.id, period).await?;
    let meter_end = form.reading.end_reading(previous.meter_end)?;

    let usage =
      recorder::record(&txn, customer.id, period, previous.meter_end, meter_end)
        .await
        .map_err(|e| match e {
          Error::Conflict(_) => duplicate(&customer, period),
          other => other,
        })?;

    let now = utils::now();
    let invoice = invoice::ActiveModel {
      id: NotSet,
      usage_id: Set(usage.id),
      customer_id: Set(customer.id),
      month: Set(period.month),
      year: Set(period.year),
      kwh: Set(usage.consumption()),
      status: Set(InvoiceStatus::Unpaid),
      paid_at: Set(None),
      created_at: Set(now),
      updated_at: Set(now),
    }
    .insert(&txn)
    .await
    .map_err(|e| match Error::unique_or(e, "") {
      Error::Conflict(_) => duplicate(&customer, period),
      other => other,
    })?;

    txn.commit().await?;

    info!(
      "Invoice #{} for {} ({period}): {} kWh",
      invoice.id, customer.meter_number, invoice.kwh
    );
    Ok(Created { invoice, usage, has_previous: previous.has_previous })
  }

  pub async fn list(
    &self,
    actor: &Actor,
    filter: InvoiceFilter,
  ) -> Result<InvoiceList> {
    actor.ensure(Action::ManageInvoices)?;

    let mut condition = Condition::all();
    if let Some(status) = filter.status {
      condition = condition.add(invoice::Column::Status.eq(status));
    }
    if let Some(term) =
      filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty())
    {
      let ids: Vec<i32> = customer::Entity::find()
        .select_only()
        .column(customer::Column::Id)
        .filter(
          Condition::any()
            .add(customer::Column::Name.contains(term))
            .add(customer::Column::MeterNumber.contains(term)),
        )
        .into_tuple()
        .all(self.db)
        .await?;
      condition = condition.add(invoice::Column::CustomerId.is_in(ids));
    }

    let paging = filter.paging();
    let query = invoice::Entity::find().filter(condition);
    let total = query.clone().count(self.db).await?;
    let invoices = query
      .order_by_desc(invoice::Column::CreatedAt)
      .order_by_desc(invoice::Column::Id)
      .offset(paging.offset())
      .limit(paging.per_page())
      .all(self.db)
      .await?;

    let items = rows(self.db, invoices).await?;
    Ok(InvoiceList {
      page: Page::new(items, paging, total),
      stats: status_counts(self.db).await?,
    })
  }

  pub async fn detail(&self, actor: &Actor, id: i32) -> Result<InvoiceRow> {
    actor.ensure(Action::ManageInvoices)?;
    let invoice = self.by_id(id).await?;

    rows(self.db, vec![invoice])
      .await?
      .pop()
      .ok_or_else(|| Error::not_found("invoice", id))
  }

  /// Newest first, for the customer's own bill list.
  pub async fn for_customer(
    &self,
    customer_id: i32,
    limit: u64,
  ) -> Result<Vec<invoice::Model>> {
    Ok(
      invoice::Entity::find()
        .filter(invoice::Column::CustomerId.eq(customer_id))
        .order_by_desc(invoice::Column::Year)
        .order_by_desc(invoice::Column::Month)
        .limit(limit)
        .all(self.db)
        .await?,
    )
  }
}

fn duplicate(customer: &customer::Model, period: Period) -> Error {
  Error::Conflict(format!(
    "Invoice for {} in {period} already exists",
    customer.meter_number
  ))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{entity::StaffRole, sv::test_utils::test_db};

  fn form(customer_id: i32, month: i32, reading: MeterInput) -> NewInvoice {
    NewInvoice { customer_id, month, year: 2025, reading }
  }

  #[tokio::test]
  async fn test_first_invoice_starts_from_zero() {
    let db = test_db::setup().await;
    let config = test_db::config();
    let (_, officer) =
      test_db::staff(&db, "officer@petir.id", StaffRole::Officer).await;
    let tariff = test_db::tariff(&db, 1300, 146_728).await;
    let customer = test_db::customer(&db, tariff.id, "Budi", "111").await;

    let created = Invoice::new(&db, &config)
      .create(&officer, form(customer.id, 6, MeterInput::EndReading(1250)))
      .await
      .unwrap();

    assert!(!created.has_previous);
    assert_eq!(created.usage.meter_start, 0);
    assert_eq!(created.invoice.kwh, 1250);
    assert_eq!(created.invoice.status, InvoiceStatus::Unpaid);
  }

  #[tokio::test]
  async fn test_consumption_follows_previous_reading() {
    let db = test_db::setup().await;
    let config = test_db::config();
    let (_, officer) =
      test_db::staff(&db, "officer@petir.id", StaffRole::Officer).await;
    let tariff = test_db::tariff(&db, 1300, 146_728).await;
    let customer = test_db::customer(&db, tariff.id, "Budi", "111").await;
    let sv = Invoice::new(&db, &config);

    sv.create(&officer, form(customer.id, 6, MeterInput::EndReading(1250)))
      .await
      .unwrap();
    let july = sv
      .create(&officer, form(customer.id, 7, MeterInput::EndReading(1395)))
      .await
      .unwrap();
    assert!(july.has_previous);
    assert_eq!(july.invoice.kwh, 145);

    let august = sv
      .create(&officer, form(customer.id, 8, MeterInput::Consumption(100)))
      .await
      .unwrap();
    assert_eq!(august.usage.meter_start, 1395);
    assert_eq!(august.usage.meter_end, 1495);
    assert_eq!(august.invoice.kwh, 100);
  }

  #[tokio::test]
  async fn test_duplicate_period_is_conflict_without_new_rows() {
    let db = test_db::setup().await;
    let config = test_db::config();
    let (_, officer) =
      test_db::staff(&db, "officer@petir.id", StaffRole::Officer).await;
    let tariff = test_db::tariff(&db, 900, 60_500).await;
    let customer = test_db::customer(&db, tariff.id, "Budi", "111").await;
    let sv = Invoice::new(&db, &config);

    sv.create(&officer, form(customer.id, 7, MeterInput::Consumption(50)))
      .await
      .unwrap();
    let result = sv
      .create(&officer, form(customer.id, 7, MeterInput::Consumption(80)))
      .await;

    assert!(matches!(result, Err(Error::Conflict(_))));
    assert_eq!(invoice::Entity::find().count(&db).await.unwrap(), 1);
    assert_eq!(usage::Entity::find().count(&db).await.unwrap(), 1);
  }

  #[tokio::test]
  async fn test_invalid_month_writes_nothing() {
    let db = test_db::setup().await;
    let config = test_db::config();
    let (_, officer) =
      test_db::staff(&db, "officer@petir.id", StaffRole::Officer).await;
    let tariff = test_db::tariff(&db, 900, 60_500).await;
    let customer = test_db::customer(&db, tariff.id, "Budi", "111").await;

    let result = Invoice::new(&db, &config)
      .create(&officer, form(customer.id, 13, MeterInput::Consumption(50)))
      .await;

    assert!(matches!(result, Err(Error::Validation { field: "month", .. })));
    assert_eq!(invoice::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(usage::Entity::find().count(&db).await.unwrap(), 0);
  }

  #[tokio::test]
  async fn test_recorded_usage_without_invoice_is_conflict() {
    let db = test_db::setup().await;
    let config = test_db::config();
    let (_, officer) =
      test_db::staff(&db, "officer@petir.id", StaffRole::Officer).await;
    let tariff = test_db::tariff(&db, 900, 60_500).await;
    let customer = test_db::customer(&db, tariff.id, "Budi", "111").await;

    recorder::record(&db, customer.id, Period::new(7, 2025), 0, 50)
      .await
      .unwrap();

    let result = Invoice::new(&db, &config)
      .create(&officer, form(customer.id, 7, MeterInput::Consumption(80)))
      .await;

    assert!(matches!(result, Err(Error::Conflict(ref m)) if m.contains("111")));
    assert_eq!(invoice::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(usage::Entity::find().count(&db).await.unwrap(), 1);
  }

  #[tokio::test]
  async fn test_oversized_reading_writes_nothing() {
    let db = test_db::setup().await;
    let config = test_db::config();
    let (_, officer) =
      test_db::staff(&db, "officer@petir.id", StaffRole::Officer).await;
    let tariff = test_db::tariff(&db, 1300, 146_728).await;
    let customer = test_db::customer(&db, tariff.id, "Budi", "111").await;
    let sv = Invoice::new(&db, &config);

    let result = sv
      .create(
        &officer,
        form(customer.id, 7, MeterInput::EndReading(100_000_000_000_000)),
      )
      .await;
    assert!(matches!(
      result,
      Err(Error::Validation { field: "meter_end", .. })
    ));
    assert_eq!(invoice::Entity::find().count(&db).await.unwrap(), 0);

    let list = sv.list(&officer, InvoiceFilter::default()).await.unwrap();
    assert_eq!(list.page.total, 0);
  }

  #[tokio::test]
  async fn test_end_below_previous_is_rejected() {
    let db = test_db::setup().await;
    let config = test_db::config();
    let (_, officer) =
      test_db::staff(&db, "officer@petir.id", StaffRole::Officer).await;
    let tariff = test_db::tariff(&db, 900, 60_500).await;
    let customer = test_db::customer(&db, tariff.id, "Budi", "111").await;
    let sv = Invoice::new(&db, &config);

    sv.create(&officer, form(customer.id, 6, MeterInput::EndReading(500)))
      .await
      .unwrap();
    let result = sv
      .create(&officer, form(customer.id, 7, MeterInput::EndReading(400)))
      .await;

    assert!(matches!(result, Err(Error::Validation { field: "meter_end", .. })));
    assert_eq!(usage::Entity::find().count(&db).await.unwrap(), 1);
  }

  #[tokio::test]
  async fn test_unknown_customer_is_not_found() {
    let db = test_db::setup().await;
    let config = test_db::config();
    let (_, officer) =
      test_db::staff(&db, "officer@petir.id", StaffRole::Officer).await;

    let result = Invoice::new(&db, &config)
      .create(&officer, form(999, 7, MeterInput::Consumption(1)))
      .await;

    assert!(matches!(
      result,
      Err(Error::NotFound { entity: "customer", ref id }) if id == "999"
    ));
  }

  #[tokio::test]
  async fn test_list_filters_and_counts() {
    let db = test_db::setup().await;
    let config = test_db::config();
    let (_, officer) =
      test_db::staff(&db, "officer@petir.id", StaffRole::Officer).await;
    let tariff = test_db::tariff(&db, 900, 60_500).await;
    let budi = test_db::customer(&db, tariff.id, "Budi", "111").await;
    let siti = test_db::customer(&db, tariff.id, "Siti", "222").await;
    let sv = Invoice::new(&db, &config);

    for month in 1..=3 {
      sv.create(&officer, form(budi.id, month, MeterInput::Consumption(10)))
        .await
        .unwrap();
    }
    sv.create(&officer, form(siti.id, 1, MeterInput::Consumption(20)))
      .await
      .unwrap();

    let all = sv.list(&officer, InvoiceFilter::default()).await.unwrap();
    assert_eq!(all.page.total, 4);
    assert_eq!(all.stats.unpaid, 4);
    assert_eq!(all.stats.paid, 0);

    let siti_only = sv
      .list(
        &officer,
        InvoiceFilter { search: Some("222".into()), ..Default::default() },
      )
      .await
      .unwrap();
    assert_eq!(siti_only.page.total, 1);
    let row = &siti_only.page.items[0];
    assert_eq!(row.customer.as_ref().map(|c| c.id), Some(siti.id));
    assert_eq!(row.energy_cost, Some(20 * 60_500));

    let paid = sv
      .list(
        &officer,
        InvoiceFilter { status: Some(InvoiceStatus::Paid), ..Default::default() },
      )
      .await
      .unwrap();
    assert_eq!(paid.page.total, 0);
  }
}
