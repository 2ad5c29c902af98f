use sea_orm_migration::prelude::*;

use super::m20250713_000003_create_customers::Customers;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Usages::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Usages::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Usages::CustomerId).integer().not_null())
          .col(ColumnDef::new(Usages::Month).integer().not_null())
          .col(ColumnDef::new(Usages::Year).integer().not_null())
          .col(ColumnDef::new(Usages::MeterStart).big_integer().not_null())
          .col(ColumnDef::new(Usages::MeterEnd).big_integer().not_null())
          .col(ColumnDef::new(Usages::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_usages_customer")
              .from(Usages::Table, Usages::CustomerId)
              .to(Customers::Table, Customers::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_usages_customer_period")
          .table(Usages::Table)
          .col(Usages::CustomerId)
          .col(Usages::Month)
          .col(Usages::Year)
          .unique()
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Usages::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Usages {
  Table,
  Id,
  CustomerId,
  Month,
  Year,
  MeterStart,
  MeterEnd,
  CreatedAt,
}
