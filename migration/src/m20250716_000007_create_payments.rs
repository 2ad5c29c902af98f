use sea_orm_migration::prelude::*;

use super::{
  m20250713_000001_create_users::Users,
  m20250713_000003_create_customers::Customers,
  m20250713_000005_create_payment_methods::PaymentMethods,
  m20250713_000006_create_invoices::Invoices,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Payments::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Payments::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Payments::InvoiceId).integer().not_null())
          .col(ColumnDef::new(Payments::CustomerId).integer().not_null())
          .col(ColumnDef::new(Payments::MethodId).integer().not_null())
          .col(ColumnDef::new(Payments::PaymentDate).date().not_null())
          .col(ColumnDef::new(Payments::BilledMonth).integer().not_null())
          .col(ColumnDef::new(Payments::Amount).big_integer().not_null())
          .col(
            ColumnDef::new(Payments::Adjustment)
              .big_integer()
              .not_null()
              .default(0),
          )
          .col(ColumnDef::new(Payments::Proof).string().null())
          .col(
            ColumnDef::new(Payments::Verification)
              .string()
              .not_null()
              .default("pending"),
          )
          .col(ColumnDef::new(Payments::VerificationNote).text().null())
          .col(ColumnDef::new(Payments::VerifiedAt).date_time().null())
          .col(ColumnDef::new(Payments::VerifierId).integer().null())
          .col(ColumnDef::new(Payments::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Payments::UpdatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_payments_invoice")
              .from(Payments::Table, Payments::InvoiceId)
              .to(Invoices::Table, Invoices::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_payments_customer")
              .from(Payments::Table, Payments::CustomerId)
              .to(Customers::Table, Customers::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_payments_method")
              .from(Payments::Table, Payments::MethodId)
              .to(PaymentMethods::Table, PaymentMethods::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_payments_verifier")
              .from(Payments::Table, Payments::VerifierId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::SetNull),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_payments_invoice")
          .table(Payments::Table)
          .col(Payments::InvoiceId)
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_payments_verification")
          .table(Payments::Table)
          .col(Payments::Verification)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Payments::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Payments {
  Table,
  Id,
  InvoiceId,
  CustomerId,
  MethodId,
  PaymentDate,
  BilledMonth,
  Amount,
  Adjustment,
  Proof,
  Verification,
  VerificationNote,
  VerifiedAt,
  VerifierId,
  CreatedAt,
  UpdatedAt,
}
