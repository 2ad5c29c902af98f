use crate::{
  entity::{customer, tariff},
  prelude::*,
  sv::policy::{Action, Actor},
  utils,
};

pub const HEADERS: [&str; 8] = [
  "No",
  "Nama",
  "Email",
  "Nomor Meter",
  "Alamat",
  "Daya (VA)",
  "Tarif/kWh",
  "Tanggal Daftar",
];

/// Parses `1,2,3` into ids; blanks are skipped.
pub fn parse_ids(raw: &str) -> Result<Vec<i32>> {
  raw
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|s| {
      s.parse()
        .map_err(|_| Error::validation("ids", format!("invalid id '{s}'")))
    })
    .collect()
}

pub struct Export<'a> {
  db: &'a DatabaseConnection,
}

fn record(
  no: usize,
  customer: &customer::Model,
  tariff: Option<&tariff::Model>,
) -> [String; 8] {
  [
    no.to_string(),
    customer.name.clone(),
    customer.email.clone(),
    customer.meter_number.clone(),
    customer.address.clone(),
    tariff.map_or_else(|| "-".into(), |t| format!("{} VA", t.power_va)),
    tariff.map_or_else(|| "-".into(), |t| utils::format_rupiah_whole(t.price_per_kwh)),
    utils::format_date(customer.created_at),
  ]
}

impl<'a> Export<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// CSV of all customers, or of `ids` only when the list is non-empty.
  pub async fn customers_csv(
    &self,
    actor: &Actor,
    ids: Option<&[i32]>,
  ) -> Result<Vec<u8>> {
    actor.ensure(Action::ExportCustomers)?;

    let mut query = customer::Entity::find().find_also_related(tariff::Entity);
    if let Some(ids) = ids.filter(|ids| !ids.is_empty()) {
      query = query.filter(customer::Column::Id.is_in(ids.iter().copied()));
    }
    let customers = query
      .order_by_asc(customer::Column::CreatedAt)
      .order_by_asc(customer::Column::Id)
      .all(self.db)
      .await?;

    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(HEADERS)?;
    for (idx, (customer, tariff)) in customers.iter().enumerate() {
      wtr.write_record(record(idx + 1, customer, tariff.as_ref()))?;
    }

    let bytes = wtr
      .into_inner()
      .map_err(|e| Error::Internal(format!("Failed to flush csv: {e}")))?;

    info!("Exported {} customer(s) for #{}", customers.len(), actor.id);
    Ok(bytes)
  }
}
