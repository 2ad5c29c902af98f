use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::customer;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tariffs")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub power_va: i32,
  /// Price of one kWh in sen.
  pub price_per_kwh: i64,
  pub description: Option<String>,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "customer::Entity")]
  Customers,
}

impl Related<customer::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Customers.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
