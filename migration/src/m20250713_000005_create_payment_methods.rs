use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(PaymentMethods::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(PaymentMethods::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(PaymentMethods::Name).string().not_null())
          .col(
            ColumnDef::new(PaymentMethods::Code)
              .string_len(50)
              .not_null()
              .unique_key(),
          )
          .col(ColumnDef::new(PaymentMethods::AccountHolder).string().not_null())
          .col(ColumnDef::new(PaymentMethods::AccountNumber).string().null())
          .col(
            ColumnDef::new(PaymentMethods::AdminFee)
              .big_integer()
              .not_null()
              .default(0),
          )
          .col(ColumnDef::new(PaymentMethods::Description).text().null())
          .col(ColumnDef::new(PaymentMethods::Logo).string().null())
          .col(
            ColumnDef::new(PaymentMethods::IsActive)
              .boolean()
              .not_null()
              .default(true),
          )
          .col(ColumnDef::new(PaymentMethods::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(PaymentMethods::UpdatedAt).date_time().not_null())
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(PaymentMethods::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum PaymentMethods {
  Table,
  Id,
  Name,
  Code,
  AccountHolder,
  AccountNumber,
  AdminFee,
  Description,
  Logo,
  IsActive,
  CreatedAt,
  UpdatedAt,
}
