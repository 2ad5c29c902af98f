//! Read-only aggregates behind the staff dashboard, the customer dashboard
//! and `petirpay status`.

use sea_orm::sea_query::Expr;
use serde::Serialize;

use crate::{
  config::Config,
  entity::*,
  prelude::*,
  sv::{
    self,
    billing::{self, Period},
    customer::CustomerWithTariff,
    invoice::{InvoiceRow, StatusCounts, rows, status_counts},
    payment::PaymentRow,
    payment_method::MethodView,
    policy::{Action, Actor},
  },
};

/// Monthly revenue target shown next to the six-month chart.
pub const MONTHLY_TARGET: i64 = 10_000_000 * billing::SEN_PER_RUPIAH;

pub struct Report<'a> {
  db: &'a DatabaseConnection,
  config: &'a Config,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
  pub users: u64,
  pub tariffs: u64,
  pub customers: u64,
  pub usages: u64,
  pub invoices: u64,
  pub payment_methods: u64,
  pub payments: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusShare {
  pub status: InvoiceStatus,
  pub count: u64,
  /// One decimal place.
  pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TariffShare {
  pub tariff_id: i32,
  pub power_va: i32,
  pub price_per_kwh: i64,
  pub customers: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodRevenue {
  pub method_id: i32,
  pub name: String,
  pub total: i64,
  pub count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Revenue {
  pub amount: i64,
  /// Estimated from paid invoices because no payment rows exist.
  pub fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthRevenue {
  pub period: Period,
  pub label: String,
  pub revenue: i64,
  pub target: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AwaitingInvoice {
  #[serde(flatten)]
  pub row: InvoiceRow,
  pub estimated_total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
  pub customers: u64,
  pub staff: u64,
  pub invoices: StatusCounts,
  pub revenue_this_month: i64,
  pub revenue_today: i64,
  pub monthly: Vec<MonthRevenue>,
  pub awaiting_confirmation: Vec<AwaitingInvoice>,
  pub newest_customers: Vec<CustomerWithTariff>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BillRow {
  #[serde(flatten)]
  pub row: InvoiceRow,
  pub paid_on: Option<Date>,
  pub method_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerDashboard {
  pub customer: CustomerWithTariff,
  pub current_bill: Option<InvoiceRow>,
  pub invoices: Vec<BillRow>,
  pub payments: Vec<PaymentRow>,
  pub methods: Vec<MethodView>,
  pub status: InvoiceStatus,
}

/// Counts and shares per status; an empty table yields zero percentages.
pub fn shares(counts: &StatusCounts) -> Vec<StatusShare> {
  [
    InvoiceStatus::Unpaid,
    InvoiceStatus::PendingConfirmation,
    InvoiceStatus::Paid,
  ]
  .into_iter()
  .map(|status| {
    let count = counts.get(status);
    let percentage = if counts.total == 0 {
      0.0
    } else {
      (count as f64 * 1000.0 / counts.total as f64).round() / 10.0
    };
    StatusShare { status, count, percentage }
  })
  .collect()
}

impl<'a> Report<'a> {
  pub fn new(db: &'a DatabaseConnection, config: &'a Config) -> Self {
    Self { db, config }
  }

  pub async fn counts(&self) -> Result<EntityCounts> {
    let db = self.db;
    Ok(EntityCounts {
      users: user::Entity::find().count(db).await?,
      tariffs: tariff::Entity::find().count(db).await?,
      customers: customer::Entity::find().count(db).await?,
      usages: usage::Entity::find().count(db).await?,
      invoices: invoice::Entity::find().count(db).await?,
      payment_methods: payment_method::Entity::find().count(db).await?,
      payments: payment::Entity::find().count(db).await?,
    })
  }

  pub async fn status_breakdown(&self) -> Result<Vec<StatusShare>> {
    Ok(shares(&status_counts(self.db).await?))
  }

  pub async fn tariff_breakdown(&self) -> Result<Vec<TariffShare>> {
    let per_tariff: HashMap<i32, i64> = customer::Entity::find()
      .select_only()
      .column(customer::Column::TariffId)
      .column_as(Expr::col(customer::Column::Id).count(), "customers")
      .group_by(customer::Column::TariffId)
      .into_tuple::<(i32, i64)>()
      .all(self.db)
      .await?
      .into_iter()
      .collect();

    let tariffs = tariff::Entity::find()
      .order_by_asc(tariff::Column::PowerVa)
      .all(self.db)
      .await?;

    Ok(
      tariffs
        .into_iter()
        .map(|t| TariffShare {
          tariff_id: t.id,
          power_va: t.power_va,
          price_per_kwh: t.price_per_kwh,
          customers: per_tariff.get(&t.id).copied().unwrap_or(0) as u64,
        })
        .collect(),
    )
  }

  /// Every payment counts, whatever its verification state.
  pub async fn revenue_by_method(&self) -> Result<Vec<MethodRevenue>> {
    let grouped: Vec<(i32, Option<i64>, i64)> = payment::Entity::find()
      .select_only()
      .column(payment::Column::MethodId)
      .column_as(Expr::col(payment::Column::Amount).sum(), "total")
      .column_as(Expr::col(payment::Column::Id).count(), "count")
      .group_by(payment::Column::MethodId)
      .into_tuple()
      .all(self.db)
      .await?;

    let names: HashMap<i32, String> = payment_method::Entity::find()
      .all(self.db)
      .await?
      .into_iter()
      .map(|m| (m.id, m.name))
      .collect();

    let mut out: Vec<MethodRevenue> = grouped
      .into_iter()
      .map(|(method_id, total, count)| MethodRevenue {
        method_id,
        name: names.get(&method_id).cloned().unwrap_or_else(|| "-".into()),
        total: total.unwrap_or(0),
        count,
      })
      .collect();
    out.sort_by(|a, b| b.total.cmp(&a.total).then(a.name.cmp(&b.name)));
    Ok(out)
  }

  async fn payment_sum(&self, range: Option<(Date, Date)>) -> Result<i64> {
    let mut query = payment::Entity::find()
      .select_only()
      .column_as(Expr::col(payment::Column::Amount).sum(), "total");
    if let Some((from, until)) = range {
      query = query
        .filter(payment::Column::PaymentDate.gte(from))
        .filter(payment::Column::PaymentDate.lt(until));
    }

    let total: Option<Option<i64>> = query.into_tuple().one(self.db).await?;
    Ok(total.flatten().unwrap_or(0))
  }

  /// Sum of payments, or an estimate from paid invoices when there are none.
  pub async fn total_revenue(&self) -> Result<Revenue> {
    let amount = self.payment_sum(None).await?;
    if amount != 0 {
      return Ok(Revenue { amount, fallback: false });
    }

    let paid = invoice::Entity::find()
      .filter(invoice::Column::Status.eq(InvoiceStatus::Paid))
      .all(self.db)
      .await?;
    if paid.is_empty() {
      return Ok(Revenue { amount: 0, fallback: false });
    }

    let amount = rows(self.db, paid)
      .await?
      .iter()
      .map(|row| row.energy_cost.unwrap_or(0))
      .map(|energy| energy.saturating_add(billing::FALLBACK_ADMIN_FEE))
      .fold(0i64, i64::saturating_add);

    debug!("No payments recorded, revenue estimated from paid invoices");
    Ok(Revenue { amount, fallback: true })
  }

  pub async fn revenue_in(&self, period: Period) -> Result<i64> {
    let range = period
      .date_range()
      .ok_or_else(|| Error::validation("month", "must be between 1 and 12"))?;
    self.payment_sum(Some(range)).await
  }

  pub async fn revenue_on(&self, day: Date) -> Result<i64> {
    let next = day.succ_opt().unwrap_or(day);
    self.payment_sum(Some((day, next))).await
  }

  /// Revenue of the `months` periods ending with the current one, oldest first.
  pub async fn monthly_revenue(&self, months: usize) -> Result<Vec<MonthRevenue>> {
    let mut period = Period::of(crate::utils::today());
    let mut periods = Vec::with_capacity(months);
    for _ in 0..months {
      periods.push(period);
      period = period.previous();
    }
    periods.reverse();

    let mut out = Vec::with_capacity(months);
    for period in periods {
      out.push(MonthRevenue {
        label: period.to_string(),
        revenue: self.revenue_in(period).await?,
        target: MONTHLY_TARGET,
        period,
      });
    }
    Ok(out)
  }

  pub async fn recent_invoices(&self, limit: u64) -> Result<Vec<InvoiceRow>> {
    let invoices = invoice::Entity::find()
      .order_by_desc(invoice::Column::CreatedAt)
      .order_by_desc(invoice::Column::Id)
      .limit(limit)
      .all(self.db)
      .await?;
    rows(self.db, invoices).await
  }

  pub async fn dashboard(&self, actor: &Actor) -> Result<Dashboard> {
    actor.ensure(Action::ViewDashboard)?;

    let today = crate::utils::today();
    let fee = sv::PaymentMethod::new(self.db)
      .cheapest_fee()
      .await?
      .unwrap_or(billing::DEFAULT_ADMIN_FEE);

    let awaiting = invoice::Entity::find()
      .filter(invoice::Column::Status.eq(InvoiceStatus::PendingConfirmation))
      .order_by_desc(invoice::Column::CreatedAt)
      .order_by_desc(invoice::Column::Id)
      .limit(5)
      .all(self.db)
      .await?;
    let awaiting_confirmation = rows(self.db, awaiting)
      .await?
      .into_iter()
      .map(|row| AwaitingInvoice {
        estimated_total: row.energy_cost.unwrap_or(0).saturating_add(fee),
        row,
      })
      .collect();

    let newest_customers = customer::Entity::find()
      .find_also_related(tariff::Entity)
      .order_by_desc(customer::Column::CreatedAt)
      .order_by_desc(customer::Column::Id)
      .limit(5)
      .all(self.db)
      .await?
      .into_iter()
      .map(|(customer, tariff)| CustomerWithTariff { customer, tariff })
      .collect();

    Ok(Dashboard {
      customers: customer::Entity::find().count(self.db).await?,
      staff: user::Entity::find().count(self.db).await?,
      invoices: status_counts(self.db).await?,
      revenue_this_month: self.revenue_in(Period::of(today)).await?,
      revenue_today: self.revenue_on(today).await?,
      monthly: self.monthly_revenue(6).await?,
      awaiting_confirmation,
      newest_customers,
    })
  }

  pub async fn customer_dashboard(
    &self,
    actor: &Actor,
  ) -> Result<CustomerDashboard> {
    actor.ensure(Action::ViewOwnBills)?;
    let customer = sv::Customer::new(self.db).with_tariff(actor.id).await?;

    let current = invoice::Entity::find()
      .filter(invoice::Column::CustomerId.eq(actor.id))
      .filter(invoice::Column::Status.eq(InvoiceStatus::Unpaid))
      .order_by_desc(invoice::Column::Year)
      .order_by_desc(invoice::Column::Month)
      .one(self.db)
      .await?;
    let current_bill = match current {
      Some(invoice) => rows(self.db, vec![invoice]).await?.pop(),
      None => None,
    };

    let invoices = sv::Invoice::new(self.db, self.config)
      .for_customer(actor.id, 10)
      .await?;
    let status = invoices
      .first()
      .map(|latest| match latest.status {
        InvoiceStatus::Paid => InvoiceStatus::Paid,
        _ => InvoiceStatus::Unpaid,
      })
      .unwrap_or_default();

    let invoice_ids: Vec<i32> = invoices.iter().map(|i| i.id).collect();
    let mut first_payment: HashMap<i32, payment::Model> = HashMap::new();
    for payment in payment::Entity::find()
      .filter(payment::Column::InvoiceId.is_in(invoice_ids))
      .order_by_asc(payment::Column::Id)
      .all(self.db)
      .await?
    {
      first_payment.entry(payment.invoice_id).or_insert(payment);
    }

    let methods = sv::PaymentMethod::new(self.db).active().await?;
    let method_names: HashMap<i32, String> = payment_method::Entity::find()
      .all(self.db)
      .await?
      .into_iter()
      .map(|m| (m.id, m.name))
      .collect();

    let invoices = rows(self.db, invoices)
      .await?
      .into_iter()
      .map(|row| {
        let payment = first_payment.get(&row.invoice.id);
        BillRow {
          paid_on: payment.map(|p| p.payment_date),
          method_name: payment
            .and_then(|p| method_names.get(&p.method_id))
            .cloned(),
          row,
        }
      })
      .collect();

    let payments = sv::Payment::new(self.db, self.config)
      .for_customer(actor.id, 10)
      .await?;

    Ok(CustomerDashboard {
      customer,
      current_bill,
      invoices,
      payments,
      methods: methods
        .into_iter()
        .map(|m| MethodView::new(m, self.config))
        .collect(),
      status,
    })
  }
}
