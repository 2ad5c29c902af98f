use sea_orm::Condition;
use serde::Deserialize;

use crate::{
  entity::{StaffRole, user},
  prelude::*,
  sv::{
    auth,
    customer::validate_email,
    paging::{Page, PageQuery},
    policy::{Action, Actor},
  },
  utils,
};

pub struct Staff<'a> {
  db: &'a DatabaseConnection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OfficerForm {
  pub name: String,
  pub email: String,
  pub password: Option<String>,
  pub password_confirmation: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileForm {
  pub name: String,
  pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChange {
  pub current_password: String,
  pub password: String,
  pub password_confirmation: String,
}

fn validate_profile(name: &str, email: &str) -> Result<()> {
  if name.trim().is_empty() || name.chars().count() > 255 {
    return Err(Error::validation("name", "required, max 255 characters"));
  }
  validate_email(email)
}

impl<'a> Staff<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn by_id(&self, id: i32) -> Result<user::Model> {
    user::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or_else(|| Error::not_found("user", id))
  }

  pub async fn login(&self, email: &str, password: &str) -> Result<user::Model> {
    let user = user::Entity::find()
      .filter(user::Column::Email.eq(email.trim().to_lowercase()))
      .one(self.db)
      .await?
      .ok_or(Error::Unauthorized)?;

    if !auth::verify_password(password, &user.password_hash) {
      warn!("Failed staff login for {}", user.email);
      return Err(Error::Unauthorized);
    }

    info!("{:?} {} logged in", user.role, user.email);
    Ok(user)
  }

  pub async fn list(
    &self,
    actor: &Actor,
    term: Option<&str>,
    paging: PageQuery,
  ) -> Result<Page<user::Model>> {
    actor.ensure(Action::ManageStaff)?;

    let mut condition = Condition::all();
    if let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) {
      condition = condition.add(
        Condition::any()
          .add(user::Column::Name.contains(term))
          .add(user::Column::Email.contains(term)),
      );
    }

    let query = user::Entity::find().filter(condition);
    let total = query.clone().count(self.db).await?;
    let items = query
      .order_by_desc(user::Column::CreatedAt)
      .order_by_desc(user::Column::Id)
      .offset(paging.offset())
      .limit(paging.per_page())
      .all(self.db)
      .await?;

    Ok(Page::new(items, paging, total))
  }

  /// Creates an administrator outside of the access policy; used by seeding.
  pub async fn bootstrap_admin(
    &self,
    name: &str,
    email: &str,
    password: &str,
  ) -> Result<user::Model> {
    let email = email.trim().to_lowercase();
    if let Some(existing) = user::Entity::find()
      .filter(user::Column::Email.eq(&email))
      .one(self.db)
      .await?
    {
      return Ok(existing);
    }

    self.insert(name, &email, password, StaffRole::Administrator).await
  }

  /// Only officers are created through staff management.
  pub async fn create_officer(
    &self,
    actor: &Actor,
    form: OfficerForm,
  ) -> Result<user::Model> {
    actor.ensure(Action::ManageStaff)?;
    validate_profile(&form.name, &form.email)?;

    let password = form.password.unwrap_or_default();
    auth::validate_new_password(
      &password,
      form.password_confirmation.as_deref().unwrap_or_default(),
    )?;
    self.ensure_unique_email(&form.email, None).await?;

    let user =
      self.insert(&form.name, &form.email, &password, StaffRole::Officer).await?;
    info!("Officer {} created by #{}", user.email, actor.id);
    Ok(user)
  }

  async fn insert(
    &self,
    name: &str,
    email: &str,
    password: &str,
    role: StaffRole,
  ) -> Result<user::Model> {
    let now = utils::now();
    user::ActiveModel {
      id: NotSet,
      name: Set(name.trim().to_string()),
      email: Set(email.trim().to_lowercase()),
      password_hash: Set(auth::hash_password(password)),
      role: Set(role),
      created_at: Set(now),
      updated_at: Set(now),
    }
    .insert(self.db)
    .await
    .map_err(|e| Error::unique_or(e, "Email is already registered"))
  }

  pub async fn update_officer(
    &self,
    actor: &Actor,
    id: i32,
    form: OfficerForm,
  ) -> Result<user::Model> {
    actor.ensure(Action::ManageStaff)?;
    let user = self.by_id(id).await?;
    if user.role != StaffRole::Officer {
      return Err(Error::Conflict("Only officer accounts can be edited".into()));
    }

    validate_profile(&form.name, &form.email)?;
    self.ensure_unique_email(&form.email, Some(id)).await?;

    let mut model = user::ActiveModel {
      name: Set(form.name.trim().to_string()),
      email: Set(form.email.trim().to_lowercase()),
      updated_at: Set(utils::now()),
      ..user.into()
    };

    if let Some(password) = form.password.filter(|p| !p.is_empty()) {
      auth::validate_new_password(
        &password,
        form.password_confirmation.as_deref().unwrap_or_default(),
      )?;
      model.password_hash = Set(auth::hash_password(&password));
    }

    Ok(model.update(self.db).await?)
  }

  pub async fn delete(&self, actor: &Actor, id: i32) -> Result<()> {
    actor.ensure(Action::ManageStaff)?;
    if actor.id == id {
      return Err(Error::Conflict("You cannot delete your own account".into()));
    }

    let user = self.by_id(id).await?;
    if user.role == StaffRole::Administrator {
      return Err(Error::Conflict(
        "Administrator accounts cannot be deleted".into(),
      ));
    }

    user::Entity::delete_by_id(id).exec(self.db).await?;
    info!("Officer {} deleted by #{}", user.email, actor.id);
    Ok(())
  }

  pub async fn update_profile(
    &self,
    actor: &Actor,
    form: ProfileForm,
  ) -> Result<user::Model> {
    actor.ensure(Action::ManageOwnAccount)?;
    validate_profile(&form.name, &form.email)?;

    let user = self.by_id(actor.id).await?;
    self.ensure_unique_email(&form.email, Some(user.id)).await?;

    Ok(
      user::ActiveModel {
        name: Set(form.name.trim().to_string()),
        email: Set(form.email.trim().to_lowercase()),
        updated_at: Set(utils::now()),
        ..user.into()
      }
      .update(self.db)
      .await?,
    )
  }

  pub async fn change_password(
    &self,
    actor: &Actor,
    form: PasswordChange,
  ) -> Result<()> {
    actor.ensure(Action::ManageOwnAccount)?;
    let user = self.by_id(actor.id).await?;

    if !auth::verify_password(&form.current_password, &user.password_hash) {
      return Err(Error::validation("current_password", "is incorrect"));
    }
    auth::validate_new_password(&form.password, &form.password_confirmation)?;

    user::ActiveModel {
      password_hash: Set(auth::hash_password(&form.password)),
      updated_at: Set(utils::now()),
      ..user.into()
    }
    .update(self.db)
    .await?;

    info!("Staff #{} changed password", actor.id);
    Ok(())
  }

  async fn ensure_unique_email(
    &self,
    email: &str,
    except: Option<i32>,
  ) -> Result<()> {
    let mut query = user::Entity::find()
      .filter(user::Column::Email.eq(email.trim().to_lowercase()));
    if let Some(id) = except {
      query = query.filter(user::Column::Id.ne(id));
    }

    if query.count(self.db).await? > 0 {
      return Err(Error::validation("email", "already registered"));
    }
    Ok(())
  }
}
