use crate::{
  config::Config,
  entity::{payment_method, tariff},
  prelude::*,
  sv::Staff,
  utils,
};

/// (power VA, rupiah per kWh)
const TARIFFS: [(i32, f64); 4] =
  [(450, 415.0), (900, 605.0), (1300, 1_467.28), (2200, 1_467.28)];

struct MethodSeed {
  name: &'static str,
  code: &'static str,
  holder: &'static str,
  account: &'static str,
  /// Rupiah.
  fee: f64,
  logo: &'static str,
}

const METHODS: [MethodSeed; 6] = [
  MethodSeed {
    name: "Bank BCA",
    code: "BCA",
    holder: "PT. Petir Pay Indonesia",
    account: "1234567890",
    fee: 2_500.0,
    logo: "bca-logo.svg",
  },
  MethodSeed {
    name: "Bank Mandiri",
    code: "MANDIRI",
    holder: "PT. Petir Pay Indonesia",
    account: "9876543210",
    fee: 3_000.0,
    logo: "mandiri-logo.svg",
  },
  MethodSeed {
    name: "Bank BRI",
    code: "BRI",
    holder: "PT. Petir Pay Indonesia",
    account: "5555666677",
    fee: 2_000.0,
    logo: "bri-logo.svg",
  },
  MethodSeed {
    name: "OVO",
    code: "OVO",
    holder: "PetirPay Official",
    account: "081234567890",
    fee: 1_500.0,
    logo: "ovo-logo.svg",
  },
  MethodSeed {
    name: "GoPay",
    code: "GOPAY",
    holder: "PetirPay Official",
    account: "081987654321",
    fee: 1_000.0,
    logo: "gopay-logo.svg",
  },
  MethodSeed {
    name: "DANA",
    code: "DANA",
    holder: "PetirPay Official",
    account: "081555444333",
    fee: 1_200.0,
    logo: "dana-logo.svg",
  },
];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Seeded {
  pub tariffs: usize,
  pub methods: usize,
  pub admin: bool,
}

/// Inserts the default tariffs, payment methods and administrator.
/// Rows that already exist are left alone.
pub async fn run(db: &DatabaseConnection, config: &Config) -> Result<Seeded> {
  let mut seeded = Seeded::default();
  let now = utils::now();

  for (power_va, rupiah) in TARIFFS {
    let exists = tariff::Entity::find()
      .filter(tariff::Column::PowerVa.eq(power_va))
      .count(db)
      .await?;
    if exists > 0 {
      continue;
    }

    tariff::ActiveModel {
      id: NotSet,
      power_va: Set(power_va),
      price_per_kwh: Set(utils::rupiah_to_sen(rupiah)),
      description: Set(Some(format!(
        "Tarif untuk pelanggan dengan daya {power_va} VA."
      ))),
      created_at: Set(now),
      updated_at: Set(now),
    }
    .insert(db)
    .await?;
    seeded.tariffs += 1;
  }

  for method in METHODS {
    let exists = payment_method::Entity::find()
      .filter(payment_method::Column::Code.eq(method.code))
      .count(db)
      .await?;
    if exists > 0 {
      continue;
    }

    payment_method::ActiveModel {
      id: NotSet,
      name: Set(method.name.into()),
      code: Set(method.code.into()),
      account_holder: Set(method.holder.into()),
      account_number: Set(Some(method.account.into())),
      admin_fee: Set(utils::rupiah_to_sen(method.fee)),
      description: Set(Some(format!("Pembayaran melalui {}", method.name))),
      logo: Set(Some(method.logo.into())),
      is_active: Set(true),
      created_at: Set(now),
      updated_at: Set(now),
    }
    .insert(db)
    .await?;
    seeded.methods += 1;
  }

  match (&config.admin_email, &config.admin_password) {
    (Some(email), Some(password)) => {
      Staff::new(db).bootstrap_admin("Administrator", email, password).await?;
      seeded.admin = true;
    }
    _ => warn!("ADMIN_EMAIL or ADMIN_PASSWORD not set, skipping admin seed"),
  }

  info!(
    "Seeded {} tariff(s), {} payment method(s)",
    seeded.tariffs, seeded.methods
  );
  Ok(seeded)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{entity::user, sv::test_utils::test_db};

  #[tokio::test]
  async fn test_seed_is_idempotent() {
    let db = test_db::setup().await;
    let config = Config {
      admin_email: Some("admin@petirpay.id".into()),
      admin_password: Some("password123".into()),
      ..test_db::config()
    };

    let first = run(&db, &config).await.unwrap();
    assert_eq!(first, Seeded { tariffs: 4, methods: 6, admin: true });

    let second = run(&db, &config).await.unwrap();
    assert_eq!(second.tariffs, 0);
    assert_eq!(second.methods, 0);
    assert_eq!(user::Entity::find().count(&db).await.unwrap(), 1);

    let t1300 = tariff::Entity::find()
      .filter(tariff::Column::PowerVa.eq(1300))
      .one(&db)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(t1300.price_per_kwh, 146_728);
  }

  #[tokio::test]
  async fn test_seed_without_admin_credentials() {
    let db = test_db::setup().await;
    let seeded = run(&db, &test_db::config()).await.unwrap();

    assert!(!seeded.admin);
    assert_eq!(user::Entity::find().count(&db).await.unwrap(), 0);
  }
}
