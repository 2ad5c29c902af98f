use serde::Deserialize;

use crate::{
  entity::{customer, tariff},
  prelude::*,
  sv::policy::{Action, Actor},
  utils,
};

pub struct Tariff<'a> {
  db: &'a DatabaseConnection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TariffForm {
  pub power_va: i32,
  /// Sen per kWh.
  pub price_per_kwh: i64,
  pub description: Option<String>,
}

impl TariffForm {
  fn validate(&self) -> Result<()> {
    if self.power_va < 1 {
      return Err(Error::validation("power_va", "must be at least 1 VA"));
    }
    if self.price_per_kwh <= 0 {
      return Err(Error::validation("price_per_kwh", "must be positive"));
    }
    if let Some(desc) = &self.description
      && desc.chars().count() > 255
    {
      return Err(Error::validation("description", "max 255 characters"));
    }
    Ok(())
  }
}

impl<'a> Tariff<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn all(&self) -> Result<Vec<tariff::Model>> {
    Ok(
      tariff::Entity::find()
        .order_by_asc(tariff::Column::PowerVa)
        .all(self.db)
        .await?,
    )
  }

  pub async fn by_id(&self, id: i32) -> Result<tariff::Model> {
    tariff::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or_else(|| Error::not_found("tariff", id))
  }

  pub async fn create(
    &self,
    actor: &Actor,
    form: TariffForm,
  ) -> Result<tariff::Model> {
    actor.ensure(Action::ManageTariffs)?;
    form.validate()?;

    let now = utils::now();
    let tariff = tariff::ActiveModel {
      id: NotSet,
      power_va: Set(form.power_va),
      price_per_kwh: Set(form.price_per_kwh),
      description: Set(form.description),
      created_at: Set(now),
      updated_at: Set(now),
    }
    .insert(self.db)
    .await?;

    info!("Tariff {} VA created by #{}", tariff.power_va, actor.id);
    Ok(tariff)
  }

  pub async fn update(
    &self,
    actor: &Actor,
    id: i32,
    form: TariffForm,
  ) -> Result<tariff::Model> {
    actor.ensure(Action::ManageTariffs)?;
    form.validate()?;

    let tariff = self.by_id(id).await?;
    let tariff = tariff::ActiveModel {
      power_va: Set(form.power_va),
      price_per_kwh: Set(form.price_per_kwh),
      description: Set(form.description),
      updated_at: Set(utils::now()),
      ..tariff.into()
    }
    .update(self.db)
    .await?;

    Ok(tariff)
  }

  /// Refused while customers are on this tariff; deleting would cascade
  /// into their invoices.
  pub async fn delete(&self, actor: &Actor, id: i32) -> Result<()> {
    actor.ensure(Action::ManageTariffs)?;

    let tariff = self.by_id(id).await?;
    let in_use = customer::Entity::find()
      .filter(customer::Column::TariffId.eq(tariff.id))
      .count(self.db)
      .await?;

    if in_use > 0 {
      return Err(Error::Conflict(format!(
        "Tariff {} VA is used by {in_use} customer(s)",
        tariff.power_va
      )));
    }

    tariff::Entity::delete_by_id(tariff.id).exec(self.db).await?;
    info!("Tariff {} VA deleted by #{}", tariff.power_va, actor.id);
    Ok(())
  }
}
