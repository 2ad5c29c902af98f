use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::payment;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
  #[sea_orm(string_value = "administrator")]
  Administrator,
  #[sea_orm(string_value = "officer")]
  #[default]
  Officer,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub name: String,
  #[sea_orm(unique)]
  pub email: String,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub role: StaffRole,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "payment::Entity")]
  VerifiedPayments,
}

impl Related<payment::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::VerifiedPayments.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
