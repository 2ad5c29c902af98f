use sea_orm_migration::prelude::*;

use super::{
  m20250713_000003_create_customers::Customers,
  m20250713_000004_create_usages::Usages,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Invoices::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Invoices::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(
            ColumnDef::new(Invoices::UsageId)
              .integer()
              .not_null()
              .unique_key(),
          )
          .col(ColumnDef::new(Invoices::CustomerId).integer().not_null())
          .col(ColumnDef::new(Invoices::Month).integer().not_null())
          .col(ColumnDef::new(Invoices::Year).integer().not_null())
          .col(ColumnDef::new(Invoices::Kwh).big_integer().not_null())
          .col(
            ColumnDef::new(Invoices::Status)
              .string()
              .not_null()
              .default("unpaid"),
          )
          .col(ColumnDef::new(Invoices::PaidAt).date().null())
          .col(ColumnDef::new(Invoices::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Invoices::UpdatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_invoices_usage")
              .from(Invoices::Table, Invoices::UsageId)
              .to(Usages::Table, Usages::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_invoices_customer")
              .from(Invoices::Table, Invoices::CustomerId)
              .to(Customers::Table, Customers::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_invoices_customer_period")
          .table(Invoices::Table)
          .col(Invoices::CustomerId)
          .col(Invoices::Month)
          .col(Invoices::Year)
          .unique()
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_invoices_status")
          .table(Invoices::Table)
          .col(Invoices::Status)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Invoices::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Invoices {
  Table,
  Id,
  UsageId,
  CustomerId,
  Month,
  Year,
  Kwh,
  Status,
  PaidAt,
  CreatedAt,
  UpdatedAt,
}
