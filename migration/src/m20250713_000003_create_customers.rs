use sea_orm_migration::prelude::*;

use super::m20250713_000002_create_tariffs::Tariffs;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Customers::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Customers::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Customers::Name).string().not_null())
          .col(
            ColumnDef::new(Customers::Email).string().not_null().unique_key(),
          )
          .col(ColumnDef::new(Customers::PasswordHash).string().not_null())
          .col(
            ColumnDef::new(Customers::MeterNumber)
              .string_len(20)
              .not_null()
              .unique_key(),
          )
          .col(ColumnDef::new(Customers::Address).text().not_null())
          .col(ColumnDef::new(Customers::TariffId).integer().not_null())
          .col(ColumnDef::new(Customers::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Customers::UpdatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_customers_tariff")
              .from(Customers::Table, Customers::TariffId)
              .to(Tariffs::Table, Tariffs::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_customers_tariff")
          .table(Customers::Table)
          .col(Customers::TariffId)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Customers::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Customers {
  Table,
  Id,
  Name,
  Email,
  PasswordHash,
  MeterNumber,
  Address,
  TariffId,
  CreatedAt,
  UpdatedAt,
}
