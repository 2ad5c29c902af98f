pub use sea_orm_migration::prelude::*;

mod m20250713_000001_create_users;
mod m20250713_000002_create_tariffs;
mod m20250713_000003_create_customers;
mod m20250713_000004_create_usages;
mod m20250713_000005_create_payment_methods;
mod m20250713_000006_create_invoices;
mod m20250716_000007_create_payments;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
  fn migrations() -> Vec<Box<dyn MigrationTrait>> {
    vec![
      Box::new(m20250713_000001_create_users::Migration),
      Box::new(m20250713_000002_create_tariffs::Migration),
      Box::new(m20250713_000003_create_customers::Migration),
      Box::new(m20250713_000004_create_usages::Migration),
      Box::new(m20250713_000005_create_payment_methods::Migration),
      Box::new(m20250713_000006_create_invoices::Migration),
      Box::new(m20250716_000007_create_payments::Migration),
    ]
  }
}
