use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{customer, payment, usage};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
  #[sea_orm(string_value = "unpaid")]
  #[default]
  Unpaid,
  #[sea_orm(string_value = "pending_confirmation")]
  PendingConfirmation,
  #[sea_orm(string_value = "paid")]
  Paid,
}

impl InvoiceStatus {
  /// `Paid` is terminal; rejection sends a pending invoice back to `Unpaid`.
  pub fn can_become(self, next: InvoiceStatus) -> bool {
    use InvoiceStatus::*;

    matches!(
      (self, next),
      (Unpaid, PendingConfirmation)
        | (PendingConfirmation, Paid)
        | (PendingConfirmation, Unpaid)
    )
  }

  pub fn as_str(self) -> &'static str {
    match self {
      InvoiceStatus::Unpaid => "unpaid",
      InvoiceStatus::PendingConfirmation => "pending_confirmation",
      InvoiceStatus::Paid => "paid",
    }
  }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  #[sea_orm(unique)]
  pub usage_id: i32,
  pub customer_id: i32,
  pub month: i32,
  pub year: i32,
  pub kwh: i64,
  pub status: InvoiceStatus,
  pub paid_at: Option<Date>,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "usage::Entity",
    from = "Column::UsageId",
    to = "usage::Column::Id",
    on_delete = "Cascade"
  )]
  Usage,
  #[sea_orm(
    belongs_to = "customer::Entity",
    from = "Column::CustomerId",
    to = "customer::Column::Id",
    on_delete = "Cascade"
  )]
  Customer,
  #[sea_orm(has_many = "payment::Entity")]
  Payments,
}

impl Related<usage::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Usage.def()
  }
}

impl Related<customer::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Customer.def()
  }
}

impl Related<payment::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Payments.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
  use super::InvoiceStatus::*;

  #[test]
  fn test_allowed_transitions() {
    assert!(Unpaid.can_become(PendingConfirmation));
    assert!(PendingConfirmation.can_become(Paid));
    assert!(PendingConfirmation.can_become(Unpaid));
  }

  #[test]
  fn test_paid_is_terminal_and_no_skipping() {
    assert!(!Unpaid.can_become(Paid));
    assert!(!Paid.can_become(Unpaid));
    assert!(!Paid.can_become(PendingConfirmation));
    assert!(!Unpaid.can_become(Unpaid));
  }
}
