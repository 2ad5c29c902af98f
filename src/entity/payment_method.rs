use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::payment;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_methods")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub name: String,
  #[sea_orm(unique)]
  pub code: String,
  pub account_holder: String,
  pub account_number: Option<String>,
  /// Flat fee in sen added to every payment made with this method.
  pub admin_fee: i64,
  pub description: Option<String>,
  pub logo: Option<String>,
  pub is_active: bool,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "payment::Entity")]
  Payments,
}

impl Related<payment::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Payments.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
