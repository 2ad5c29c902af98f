use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{invoice, payment, tariff, usage};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customers")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub name: String,
  #[sea_orm(unique)]
  pub email: String,
  #[serde(skip_serializing)]
  pub password_hash: String,
  #[sea_orm(unique)]
  pub meter_number: String,
  pub address: String,
  pub tariff_id: i32,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "tariff::Entity",
    from = "Column::TariffId",
    to = "tariff::Column::Id",
    on_delete = "Cascade"
  )]
  Tariff,
  #[sea_orm(has_many = "usage::Entity")]
  Usages,
  #[sea_orm(has_many = "invoice::Entity")]
  Invoices,
  #[sea_orm(has_many = "payment::Entity")]
  Payments,
}

impl Related<tariff::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Tariff.def()
  }
}

impl Related<usage::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Usages.def()
  }
}

impl Related<invoice::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Invoices.def()
  }
}

impl Related<payment::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Payments.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
