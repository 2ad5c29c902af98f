use sea_orm::Condition;
use serde::{Deserialize, Serialize};

use crate::{
  entity::{customer, invoice, payment, tariff, usage},
  prelude::*,
  sv::{
    auth,
    paging::{Page, PageQuery},
    policy::{Action, Actor},
  },
  utils,
};

pub struct Customer<'a> {
  db: &'a DatabaseConnection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
  pub name: String,
  pub email: String,
  pub password: String,
  pub password_confirmation: String,
  pub meter_number: String,
  pub address: String,
  pub tariff_id: i32,
}

/// Staff-side edit; the password is only changed when provided.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerUpdate {
  pub name: String,
  pub email: String,
  pub password: Option<String>,
  pub password_confirmation: Option<String>,
  pub meter_number: String,
  pub address: String,
  pub tariff_id: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerWithTariff {
  #[serde(flatten)]
  pub customer: customer::Model,
  pub tariff: Option<tariff::Model>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerDetail {
  #[serde(flatten)]
  pub customer: customer::Model,
  pub tariff: Option<tariff::Model>,
  pub usages: Vec<usage::Model>,
  pub invoices: Vec<(invoice::Model, Vec<payment::Model>)>,
}

pub(crate) fn validate_email(email: &str) -> Result<()> {
  let valid = email.len() <= 255
    && !email.chars().any(char::is_whitespace)
    && email
      .split_once('@')
      .is_some_and(|(user, host)| !user.is_empty() && host.contains('.'));

  if valid {
    Ok(())
  } else {
    Err(Error::validation("email", "invalid email address"))
  }
}

fn validate_profile(
  name: &str,
  email: &str,
  meter_number: &str,
  address: &str,
) -> Result<()> {
  if name.trim().is_empty() || name.chars().count() > 255 {
    return Err(Error::validation("name", "required, max 255 characters"));
  }
  validate_email(email)?;
  if meter_number.trim().is_empty() || meter_number.chars().count() > 20 {
    return Err(Error::validation(
      "meter_number",
      "required, max 20 characters",
    ));
  }
  if address.trim().is_empty() || address.chars().count() > 500 {
    return Err(Error::validation("address", "required, max 500 characters"));
  }
  Ok(())
}

impl<'a> Customer<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn by_id(&self, id: i32) -> Result<customer::Model> {
    customer::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or_else(|| Error::not_found("customer", id))
  }

  pub async fn with_tariff(&self, id: i32) -> Result<CustomerWithTariff> {
    let (customer, tariff) = customer::Entity::find_by_id(id)
      .find_also_related(tariff::Entity)
      .one(self.db)
      .await?
      .ok_or_else(|| Error::not_found("customer", id))?;

    Ok(CustomerWithTariff { customer, tariff })
  }

  /// Self-service sign-up.
  pub async fn register(&self, form: Registration) -> Result<customer::Model> {
    auth::validate_new_password(&form.password, &form.password_confirmation)?;
    self.insert(form).await
  }

  pub async fn create(
    &self,
    actor: &Actor,
    form: Registration,
  ) -> Result<customer::Model> {
    actor.ensure(Action::ManageCustomers)?;
    auth::validate_new_password(&form.password, &form.password_confirmation)?;
    self.insert(form).await
  }

  async fn insert(&self, form: Registration) -> Result<customer::Model> {
    validate_profile(
      &form.name,
      &form.email,
      &form.meter_number,
      &form.address,
    )?;
    self.ensure_unique(&form.email, &form.meter_number, None).await?;
    self.ensure_tariff(form.tariff_id).await?;

    let now = utils::now();
    let customer = customer::ActiveModel {
      id: NotSet,
      name: Set(form.name.trim().to_string()),
      email: Set(form.email.trim().to_lowercase()),
      password_hash: Set(auth::hash_password(&form.password)),
      meter_number: Set(form.meter_number.trim().to_string()),
      address: Set(form.address.trim().to_string()),
      tariff_id: Set(form.tariff_id),
      created_at: Set(now),
      updated_at: Set(now),
    }
    .insert(self.db)
    .await
    .map_err(|e| {
      Error::unique_or(e, "Email or meter number is already registered")
    })?;

    info!("Customer {} registered", customer.meter_number);
    Ok(customer)
  }

  pub async fn update(
    &self,
    actor: &Actor,
    id: i32,
    form: CustomerUpdate,
  ) -> Result<customer::Model> {
    actor.ensure(Action::ManageCustomers)?;
    validate_profile(
      &form.name,
      &form.email,
      &form.meter_number,
      &form.address,
    )?;

    let customer = self.by_id(id).await?;
    self.ensure_unique(&form.email, &form.meter_number, Some(id)).await?;
    self.ensure_tariff(form.tariff_id).await?;

    let mut model = customer::ActiveModel {
      name: Set(form.name.trim().to_string()),
      email: Set(form.email.trim().to_lowercase()),
      meter_number: Set(form.meter_number.trim().to_string()),
      address: Set(form.address.trim().to_string()),
      tariff_id: Set(form.tariff_id),
      updated_at: Set(utils::now()),
      ..customer.into()
    };

    if let Some(password) = form.password.filter(|p| !p.is_empty()) {
      let confirmation = form.password_confirmation.unwrap_or_default();
      auth::validate_new_password(&password, &confirmation)?;
      model.password_hash = Set(auth::hash_password(&password));
    }

    Ok(model.update(self.db).await.map_err(|e| {
      Error::unique_or(e, "Email or meter number is already registered")
    })?)
  }

  /// Refused once the customer has billing history.
  pub async fn delete(&self, actor: &Actor, id: i32) -> Result<()> {
    actor.ensure(Action::ManageCustomers)?;
    let customer = self.by_id(id).await?;

    let usages = usage::Entity::find()
      .filter(usage::Column::CustomerId.eq(id))
      .count(self.db)
      .await?;
    let invoices = invoice::Entity::find()
      .filter(invoice::Column::CustomerId.eq(id))
      .count(self.db)
      .await?;

    if usages > 0 || invoices > 0 {
      return Err(Error::Conflict(
        "Customer has usage or invoice records and cannot be deleted".into(),
      ));
    }

    customer::Entity::delete_by_id(id).exec(self.db).await?;
    info!("Customer {} deleted by #{}", customer.meter_number, actor.id);
    Ok(())
  }

  pub async fn login(
    &self,
    email: &str,
    password: &str,
  ) -> Result<customer::Model> {
    let customer = customer::Entity::find()
      .filter(customer::Column::Email.eq(email.trim().to_lowercase()))
      .one(self.db)
      .await?
      .ok_or(Error::Unauthorized)?;

    if !auth::verify_password(password, &customer.password_hash) {
      warn!("Failed customer login for {}", customer.email);
      return Err(Error::Unauthorized);
    }

    Ok(customer)
  }

  /// Quick lookup used by the invoice form: at most 10 rows.
  pub async fn search(
    &self,
    actor: &Actor,
    term: &str,
  ) -> Result<Vec<CustomerWithTariff>> {
    actor.ensure(Action::ManageInvoices)?;

    let mut query =
      customer::Entity::find().find_also_related(tariff::Entity);
    if !term.trim().is_empty() {
      let term = term.trim();
      query = query.filter(
        Condition::any()
          .add(customer::Column::Name.contains(term))
          .add(customer::Column::MeterNumber.contains(term))
          .add(customer::Column::Email.contains(term)),
      );
    }

    let rows = query
      .order_by_asc(customer::Column::Name)
      .limit(10)
      .all(self.db)
      .await?;

    Ok(
      rows
        .into_iter()
        .map(|(customer, tariff)| CustomerWithTariff { customer, tariff })
        .collect(),
    )
  }

  pub async fn list(
    &self,
    actor: &Actor,
    term: Option<&str>,
    paging: PageQuery,
  ) -> Result<Page<CustomerWithTariff>> {
    actor.ensure(Action::ManageCustomers)?;

    let mut condition = Condition::all();
    if let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) {
      condition = condition.add(
        Condition::any()
          .add(customer::Column::Name.contains(term))
          .add(customer::Column::Email.contains(term))
          .add(customer::Column::MeterNumber.contains(term))
          .add(customer::Column::Address.contains(term)),
      );
    }

    let total = customer::Entity::find()
      .filter(condition.clone())
      .count(self.db)
      .await?;

    let rows = customer::Entity::find()
      .filter(condition)
      .find_also_related(tariff::Entity)
      .order_by_desc(customer::Column::CreatedAt)
      .order_by_desc(customer::Column::Id)
      .offset(paging.offset())
      .limit(paging.per_page())
      .all(self.db)
      .await?;

    let items = rows
      .into_iter()
      .map(|(customer, tariff)| CustomerWithTariff { customer, tariff })
      .collect();

    Ok(Page::new(items, paging, total))
  }

  /// Customer with the last twelve usages and invoices.
  pub async fn detail(&self, actor: &Actor, id: i32) -> Result<CustomerDetail> {
    actor.ensure(Action::ManageCustomers)?;
    let CustomerWithTariff { customer, tariff } = self.with_tariff(id).await?;

    let usages = usage::Entity::find()
      .filter(usage::Column::CustomerId.eq(id))
      .order_by_desc(usage::Column::Year)
      .order_by_desc(usage::Column::Month)
      .limit(12)
      .all(self.db)
      .await?;

    let invoices = invoice::Entity::find()
      .filter(invoice::Column::CustomerId.eq(id))
      .order_by_desc(invoice::Column::Year)
      .order_by_desc(invoice::Column::Month)
      .limit(12)
      .all(self.db)
      .await?;

    let mut payments: HashMap<i32, Vec<payment::Model>> = HashMap::new();
    for payment in payment::Entity::find()
      .filter(
        payment::Column::InvoiceId.is_in(invoices.iter().map(|i| i.id)),
      )
      .order_by_desc(payment::Column::CreatedAt)
      .all(self.db)
      .await?
    {
      payments.entry(payment.invoice_id).or_default().push(payment);
    }

    let invoices = invoices
      .into_iter()
      .map(|invoice| {
        let paid = payments.remove(&invoice.id).unwrap_or_default();
        (invoice, paid)
      })
      .collect();

    Ok(CustomerDetail { customer, tariff, usages, invoices })
  }

  async fn ensure_unique(
    &self,
    email: &str,
    meter_number: &str,
    except: Option<i32>,
  ) -> Result<()> {
    let mut email_query = customer::Entity::find()
      .filter(customer::Column::Email.eq(email.trim().to_lowercase()));
    let mut meter_query = customer::Entity::find()
      .filter(customer::Column::MeterNumber.eq(meter_number.trim()));

    if let Some(id) = except {
      email_query = email_query.filter(customer::Column::Id.ne(id));
      meter_query = meter_query.filter(customer::Column::Id.ne(id));
    }

    if email_query.count(self.db).await? > 0 {
      return Err(Error::validation("email", "already registered"));
    }
    if meter_query.count(self.db).await? > 0 {
      return Err(Error::validation("meter_number", "already registered"));
    }
    Ok(())
  }

  async fn ensure_tariff(&self, tariff_id: i32) -> Result<()> {
    tariff::Entity::find_by_id(tariff_id)
      .one(self.db)
      .await?
      .map(|_| ())
      .ok_or_else(|| Error::validation("tariff_id", "unknown tariff"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{entity::StaffRole, sv::test_utils::test_db};

  fn registration(tariff_id: i32, email: &str, meter: &str) -> Registration {
    Registration {
      name: "Budi Santoso".into(),
      email: email.into(),
      password: "password123".into(),
      password_confirmation: "password123".into(),
      meter_number: meter.into(),
      address: "Jl. Merdeka No. 1".into(),
      tariff_id,
    }
  }

  #[tokio::test]
  async fn test_register_and_login() {
    let db = test_db::setup().await;
    let tariff = test_db::tariff(&db, 900, 60_500).await;
    let sv = Customer::new(&db);

    let customer = sv
      .register(registration(tariff.id, "Budi@Test.com", "1234567890"))
      .await
      .unwrap();
    assert_eq!(customer.email, "budi@test.com");

    let logged = sv.login("budi@test.com", "password123").await.unwrap();
    assert_eq!(logged.id, customer.id);
    assert!(matches!(
      sv.login("budi@test.com", "wrong-pass").await,
      Err(Error::Unauthorized)
    ));
  }

  #[tokio::test]
  async fn test_meter_number_is_unique() {
    let db = test_db::setup().await;
    let tariff = test_db::tariff(&db, 900, 60_500).await;
    let sv = Customer::new(&db);

    sv.register(registration(tariff.id, "a@test.com", "111")).await.unwrap();
    let result =
      sv.register(registration(tariff.id, "b@test.com", "111")).await;

    assert!(matches!(
      result,
      Err(Error::Validation { field: "meter_number", .. })
    ));
  }

  #[tokio::test]
  async fn test_register_rejects_unknown_tariff_and_bad_email() {
    let db = test_db::setup().await;
    let sv = Customer::new(&db);

    assert!(matches!(
      sv.register(registration(99, "a@test.com", "111")).await,
      Err(Error::Validation { field: "tariff_id", .. })
    ));
    assert!(matches!(
      sv.register(registration(99, "not-an-email", "111")).await,
      Err(Error::Validation { field: "email", .. })
    ));
  }

  #[tokio::test]
  async fn test_search_limits_and_matches() {
    let db = test_db::setup().await;
    let (_, officer) =
      test_db::staff(&db, "officer@petir.id", StaffRole::Officer).await;
    let tariff = test_db::tariff(&db, 900, 60_500).await;
    for i in 0..12 {
      test_db::customer(&db, tariff.id, &format!("Warga {i}"), &format!("M{i:03}"))
        .await;
    }
    test_db::customer(&db, tariff.id, "Siti", "S001").await;

    let sv = Customer::new(&db);
    assert_eq!(sv.search(&officer, "Warga").await.unwrap().len(), 10);

    let found = sv.search(&officer, "S001").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].customer.name, "Siti");
    assert_eq!(found[0].tariff.as_ref().map(|t| t.power_va), Some(900));
  }

  #[tokio::test]
  async fn test_list_paginates() {
    let db = test_db::setup().await;
    let (_, officer) =
      test_db::staff(&db, "officer@petir.id", StaffRole::Officer).await;
    let tariff = test_db::tariff(&db, 900, 60_500).await;
    for i in 0..15 {
      test_db::customer(&db, tariff.id, &format!("Warga {i}"), &format!("M{i:03}"))
        .await;
    }

    let page = Customer::new(&db)
      .list(&officer, None, PageQuery { page: Some(2), per_page: Some(10) })
      .await
      .unwrap();

    assert_eq!(page.total, 15);
    assert_eq!(page.pages, 2);
    assert_eq!(page.items.len(), 5);
  }

  #[tokio::test]
  async fn test_update_keeps_password_when_blank() {
    let db = test_db::setup().await;
    let (_, officer) =
      test_db::staff(&db, "officer@petir.id", StaffRole::Officer).await;
    let tariff = test_db::tariff(&db, 900, 60_500).await;
    let customer = test_db::customer(&db, tariff.id, "Budi", "111").await;

    let sv = Customer::new(&db);
    let updated = sv
      .update(
        &officer,
        customer.id,
        CustomerUpdate {
          name: "Budi Baru".into(),
          email: customer.email.clone(),
          password: Some(String::new()),
          password_confirmation: None,
          meter_number: "111".into(),
          address: "Jl. Baru".into(),
          tariff_id: tariff.id,
        },
      )
      .await
      .unwrap();

    assert_eq!(updated.name, "Budi Baru");
    assert_eq!(updated.password_hash, customer.password_hash);
  }
}
