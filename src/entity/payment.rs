use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{customer, invoice, payment_method, user};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum Verification {
  #[sea_orm(string_value = "pending")]
  #[default]
  Pending,
  #[sea_orm(string_value = "approved")]
  Approved,
  #[sea_orm(string_value = "rejected")]
  Rejected,
}

impl Verification {
  /// Status wording shown on the customer dashboard.
  pub fn customer_label(self) -> &'static str {
    match self {
      Verification::Pending => "waiting_verification",
      Verification::Approved => "succeeded",
      Verification::Rejected => "failed",
    }
  }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub invoice_id: i32,
  pub customer_id: i32,
  pub method_id: i32,
  pub payment_date: Date,
  pub billed_month: i32,
  /// Total in sen, adjustment included.
  pub amount: i64,
  pub adjustment: i64,
  pub proof: Option<String>,
  pub verification: Verification,
  pub verification_note: Option<String>,
  pub verified_at: Option<DateTime>,
  pub verifier_id: Option<i32>,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

impl Model {
  pub fn reference(&self) -> String {
    format!("REF{:010}", self.id)
  }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "invoice::Entity",
    from = "Column::InvoiceId",
    to = "invoice::Column::Id",
    on_delete = "Cascade"
  )]
  Invoice,
  #[sea_orm(
    belongs_to = "customer::Entity",
    from = "Column::CustomerId",
    to = "customer::Column::Id",
    on_delete = "Cascade"
  )]
  Customer,
  #[sea_orm(
    belongs_to = "payment_method::Entity",
    from = "Column::MethodId",
    to = "payment_method::Column::Id",
    on_delete = "Cascade"
  )]
  Method,
  #[sea_orm(
    belongs_to = "user::Entity",
    from = "Column::VerifierId",
    to = "user::Column::Id",
    on_delete = "SetNull"
  )]
  Verifier,
}

impl Related<invoice::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Invoice.def()
  }
}

impl Related<customer::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Customer.def()
  }
}

impl Related<payment_method::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Method.def()
  }
}

impl Related<user::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Verifier.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
