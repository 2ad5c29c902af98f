use serde::{Deserialize, Serialize};

use crate::{
  config::Config,
  entity::{payment, payment_method},
  prelude::*,
  sv::policy::{Action, Actor},
  utils,
};

pub struct PaymentMethod<'a> {
  db: &'a DatabaseConnection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MethodForm {
  pub name: String,
  pub code: String,
  pub account_holder: String,
  pub account_number: Option<String>,
  /// Sen.
  pub admin_fee: i64,
  pub description: Option<String>,
  pub logo: Option<String>,
  #[serde(default = "active")]
  pub is_active: bool,
}

fn active() -> bool {
  true
}

impl MethodForm {
  fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() || self.name.chars().count() > 255 {
      return Err(Error::validation("name", "required, max 255 characters"));
    }
    let code = self.code.trim();
    if code.is_empty() || code.chars().count() > 50 {
      return Err(Error::validation("code", "required, max 50 characters"));
    }
    if self.account_holder.trim().is_empty() {
      return Err(Error::validation("account_holder", "required"));
    }
    if self.admin_fee < 0 {
      return Err(Error::validation("admin_fee", "must not be negative"));
    }
    Ok(())
  }
}

/// Method as shown to customers, with its logo resolved to a URL.
#[derive(Debug, Clone, Serialize)]
pub struct MethodView {
  #[serde(flatten)]
  pub method: payment_method::Model,
  pub logo_url: Option<String>,
}

impl MethodView {
  pub fn new(method: payment_method::Model, config: &Config) -> Self {
    let logo_url =
      utils::storage_url(&config.asset_base_url, "logos", method.logo.as_deref());
    Self { method, logo_url }
  }
}

impl<'a> PaymentMethod<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn by_id(&self, id: i32) -> Result<payment_method::Model> {
    payment_method::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or_else(|| Error::not_found("payment method", id))
  }

  pub async fn all(&self, actor: &Actor) -> Result<Vec<payment_method::Model>> {
    actor.ensure(Action::ManagePaymentMethods)?;
    Ok(
      payment_method::Entity::find()
        .order_by_asc(payment_method::Column::Name)
        .all(self.db)
        .await?,
    )
  }

  pub async fn active(&self) -> Result<Vec<payment_method::Model>> {
    Ok(
      payment_method::Entity::find()
        .filter(payment_method::Column::IsActive.eq(true))
        .order_by_asc(payment_method::Column::AdminFee)
        .order_by_asc(payment_method::Column::Name)
        .all(self.db)
        .await?,
    )
  }

  /// Lowest fee among active methods, if any is active.
  pub async fn cheapest_fee(&self) -> Result<Option<i64>> {
    Ok(
      payment_method::Entity::find()
        .filter(payment_method::Column::IsActive.eq(true))
        .order_by_asc(payment_method::Column::AdminFee)
        .one(self.db)
        .await?
        .map(|m| m.admin_fee),
    )
  }

  pub async fn create(
    &self,
    actor: &Actor,
    form: MethodForm,
  ) -> Result<payment_method::Model> {
    actor.ensure(Action::ManagePaymentMethods)?;
    form.validate()?;

    let code = form.code.trim().to_uppercase();
    self.ensure_unique_code(&code, None).await?;

    let now = utils::now();
    let method = payment_method::ActiveModel {
      id: NotSet,
      name: Set(form.name.trim().to_string()),
      code: Set(code),
      account_holder: Set(form.account_holder.trim().to_string()),
      account_number: Set(form.account_number),
      admin_fee: Set(form.admin_fee),
      description: Set(form.description),
      logo: Set(form.logo),
      is_active: Set(form.is_active),
      created_at: Set(now),
      updated_at: Set(now),
    }
    .insert(self.db)
    .await
    .map_err(|e| Error::unique_or(e, "Payment method code already exists"))?;

    info!("Payment method {} created by #{}", method.code, actor.id);
    Ok(method)
  }

  pub async fn update(
    &self,
    actor: &Actor,
    id: i32,
    form: MethodForm,
  ) -> Result<payment_method::Model> {
    actor.ensure(Action::ManagePaymentMethods)?;
    form.validate()?;

    let method = self.by_id(id).await?;
    let code = form.code.trim().to_uppercase();
    self.ensure_unique_code(&code, Some(id)).await?;

    let logo = form.logo.or_else(|| method.logo.clone());
    Ok(
      payment_method::ActiveModel {
        name: Set(form.name.trim().to_string()),
        code: Set(code),
        account_holder: Set(form.account_holder.trim().to_string()),
        account_number: Set(form.account_number),
        admin_fee: Set(form.admin_fee),
        description: Set(form.description),
        logo: Set(logo),
        is_active: Set(form.is_active),
        updated_at: Set(utils::now()),
        ..method.into()
      }
      .update(self.db)
      .await
      .map_err(|e| Error::unique_or(e, "Payment method code already exists"))?,
    )
  }

  pub async fn toggle(
    &self,
    actor: &Actor,
    id: i32,
  ) -> Result<payment_method::Model> {
    actor.ensure(Action::ManagePaymentMethods)?;
    let method = self.by_id(id).await?;
    let is_active = !method.is_active;

    let method = payment_method::ActiveModel {
      is_active: Set(is_active),
      updated_at: Set(utils::now()),
      ..method.into()
    }
    .update(self.db)
    .await?;

    info!(
      "Payment method {} {}",
      method.code,
      if is_active { "activated" } else { "deactivated" }
    );
    Ok(method)
  }

  pub async fn delete(&self, actor: &Actor, id: i32) -> Result<()> {
    actor.ensure(Action::ManagePaymentMethods)?;
    let method = self.by_id(id).await?;

    let used = payment::Entity::find()
      .filter(payment::Column::MethodId.eq(id))
      .count(self.db)
      .await?;
    if used > 0 {
      return Err(Error::Conflict(format!(
        "Payment method {} has {used} payment(s) and cannot be deleted",
        method.code
      )));
    }

    payment_method::Entity::delete_by_id(id).exec(self.db).await?;
    info!("Payment method {} deleted by #{}", method.code, actor.id);
    Ok(())
  }

  async fn ensure_unique_code(&self, code: &str, except: Option<i32>) -> Result<()> {
    let mut query = payment_method::Entity::find()
      .filter(payment_method::Column::Code.eq(code));
    if let Some(id) = except {
      query = query.filter(payment_method::Column::Id.ne(id));
    }

    if query.count(self.db).await? > 0 {
      return Err(Error::validation("code", "already in use"));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{entity::StaffRole, sv::test_utils::test_db};

  fn form(code: &str, admin_fee: i64) -> MethodForm {
    MethodForm {
      name: format!("Bank {code}"),
      code: code.into(),
      account_holder: "PT. Petir Pay Indonesia".into(),
      account_number: Some("1234567890".into()),
      admin_fee,
      description: None,
      logo: Some("bca.png".into()),
      is_active: true,
    }
  }

  #[tokio::test]
  async fn test_code_is_uppercased_and_unique() {
    let db = test_db::setup().await;
    let (_, admin) =
      test_db::staff(&db, "admin@petir.id", StaffRole::Administrator).await;
    let sv = PaymentMethod::new(&db);

    let method = sv.create(&admin, form("bca", 250_000)).await.unwrap();
    assert_eq!(method.code, "BCA");

    assert!(matches!(
      sv.create(&admin, form("BCA", 100)).await,
      Err(Error::Validation { field: "code", .. })
    ));
  }

  #[tokio::test]
  async fn test_toggle_and_cheapest_fee() {
    let db = test_db::setup().await;
    let (_, admin) =
      test_db::staff(&db, "admin@petir.id", StaffRole::Administrator).await;
    let sv = PaymentMethod::new(&db);

    assert_eq!(sv.cheapest_fee().await.unwrap(), None);

    let ovo = sv.create(&admin, form("OVO", 150_000)).await.unwrap();
    sv.create(&admin, form("BCA", 250_000)).await.unwrap();
    assert_eq!(sv.cheapest_fee().await.unwrap(), Some(150_000));

    let ovo = sv.toggle(&admin, ovo.id).await.unwrap();
    assert!(!ovo.is_active);
    assert_eq!(sv.cheapest_fee().await.unwrap(), Some(250_000));
    assert_eq!(sv.active().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_negative_fee_rejected() {
    let db = test_db::setup().await;
    let (_, admin) =
      test_db::staff(&db, "admin@petir.id", StaffRole::Administrator).await;

    let result = PaymentMethod::new(&db).create(&admin, form("BRI", -1)).await;
    assert!(matches!(result, Err(Error::Validation { field: "admin_fee", .. })));
  }

  #[test]
  fn test_logo_url() {
    let config = test_db::config();
    let method = payment_method::Model {
      id: 1,
      name: "Bank BCA".into(),
      code: "BCA".into(),
      account_holder: "PT. Petir Pay Indonesia".into(),
      account_number: None,
      admin_fee: 250_000,
      description: None,
      logo: Some("bca.png".into()),
      is_active: true,
      created_at: utils::now(),
      updated_at: utils::now(),
    };

    let view = MethodView::new(method, &config);
    assert_eq!(
      view.logo_url.as_deref(),
      Some("http://localhost:3000/storage/logos/bca.png")
    );
  }
}
