use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{customer, invoice};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "usages")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub customer_id: i32,
  pub month: i32,
  pub year: i32,
  pub meter_start: i64,
  pub meter_end: i64,
  pub created_at: DateTime,
}

impl Model {
  pub fn consumption(&self) -> i64 {
    crate::sv::billing::consumption(self.meter_start, self.meter_end)
  }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "customer::Entity",
    from = "Column::CustomerId",
    to = "customer::Column::Id",
    on_delete = "Cascade"
  )]
  Customer,
  #[sea_orm(has_one = "invoice::Entity")]
  Invoice,
}

impl Related<customer::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Customer.def()
  }
}

impl Related<invoice::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Invoice.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
