use std::path::{Path, PathBuf};

use base64::{Engine, engine::general_purpose::STANDARD};
use sea_orm::{Condition, sea_query::Expr};
use serde::{Deserialize, Serialize};

use crate::{
  config::Config,
  entity::{
    InvoiceStatus, Verification, customer, invoice, payment, payment_method,
    tariff, user,
  },
  prelude::*,
  sv::{
    billing::{Breakdown, Period},
    paging::{Page, PageQuery},
    policy::{Action, Actor, Role},
  },
  utils,
};

pub const MAX_PROOF_BYTES: usize = 5 * 1024 * 1024;
pub const PROOF_EXTENSIONS: [&str; 3] = ["jpeg", "jpg", "png"];
const MAX_NOTE_LEN: usize = 500;

pub struct Payment<'a> {
  db: &'a DatabaseConnection,
  config: &'a Config,
}

/// Transfer receipt as sent by the client, base64 encoded.
#[derive(Debug, Clone, Deserialize)]
pub struct ProofUpload {
  pub name: String,
  pub data: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitPayment {
  pub invoice_id: i32,
  pub method_id: i32,
  #[serde(default)]
  pub adjustment: i64,
  pub proof: Option<ProofUpload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentFilter {
  pub search: Option<String>,
  /// `pending` when absent, `all` disables the filter.
  pub status: Option<String>,
  pub page: Option<u64>,
  pub per_page: Option<u64>,
}

impl PaymentFilter {
  fn verification(&self) -> Result<Option<Verification>> {
    match self.status.as_deref().map(str::trim) {
      None | Some("") | Some("pending") => Ok(Some(Verification::Pending)),
      Some("all") => Ok(None),
      Some("approved") => Ok(Some(Verification::Approved)),
      Some("rejected") => Ok(Some(Verification::Rejected)),
      Some(other) => Err(Error::validation(
        "status",
        format!("unknown verification status '{other}'"),
      )),
    }
  }

  fn paging(&self) -> PageQuery {
    PageQuery { page: self.page, per_page: self.per_page }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentRow {
  #[serde(flatten)]
  pub payment: payment::Model,
  pub reference: String,
  pub status_label: &'static str,
  pub proof_url: Option<String>,
  pub period_name: Option<String>,
  pub customer: Option<customer::Model>,
  pub method: Option<payment_method::Model>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VerificationCounts {
  pub total: u64,
  pub pending: u64,
  pub approved: u64,
  pub rejected: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentList {
  #[serde(flatten)]
  pub page: Page<PaymentRow>,
  pub stats: VerificationCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentDetail {
  #[serde(flatten)]
  pub row: PaymentRow,
  pub invoice: Option<invoice::Model>,
  pub tariff: Option<tariff::Model>,
  pub verifier: Option<user::Model>,
  pub breakdown: Option<Breakdown>,
}

/// `<unix-ts>_<name with spaces as underscores>`, path components stripped.
pub fn proof_file_name(original: &str, timestamp: i64) -> String {
  let base = Path::new(original)
    .file_name()
    .and_then(|n| n.to_str())
    .unwrap_or("proof");
  format!("{timestamp}_{}", base.replace(char::is_whitespace, "_"))
}

fn check_proof(name: &str, size: usize) -> Result<()> {
  let ext = Path::new(name)
    .extension()
    .and_then(|e| e.to_str())
    .map(str::to_ascii_lowercase)
    .unwrap_or_default();

  if !PROOF_EXTENSIONS.contains(&ext.as_str()) {
    return Err(Error::validation("proof", "must be a jpeg, jpg or png image"));
  }
  if size > MAX_PROOF_BYTES {
    return Err(Error::validation("proof", "must not exceed 5 MiB"));
  }
  Ok(())
}

fn check_note(note: Option<&str>) -> Result<()> {
  if let Some(note) = note
    && note.chars().count() > MAX_NOTE_LEN
  {
    return Err(Error::validation("note", "max 500 characters"));
  }
  Ok(())
}

pub async fn verification_counts<C: ConnectionTrait>(
  conn: &C,
) -> Result<VerificationCounts> {
  let count = |status: Verification| {
    payment::Entity::find()
      .filter(payment::Column::Verification.eq(status))
      .count(conn)
  };

  let pending = count(Verification::Pending).await?;
  let approved = count(Verification::Approved).await?;
  let rejected = count(Verification::Rejected).await?;

  Ok(VerificationCounts {
    total: pending + approved + rejected,
    pending,
    approved,
    rejected,
  })
}

impl<'a> Payment<'a> {
  pub fn new(db: &'a DatabaseConnection, config: &'a Config) -> Self {
    Self { db, config }
  }

  pub async fn by_id(&self, id: i32) -> Result<payment::Model> {
    payment::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or_else(|| Error::not_found("payment", id))
  }

  pub fn proof_url(&self, payment: &payment::Model) -> Option<String> {
    utils::storage_url(
      &self.config.asset_base_url,
      "proofs",
      payment.proof.as_deref(),
    )
  }

  /// Invoice the actor is allowed to see; customers only reach their own.
  async fn visible_invoice(
    &self,
    actor: &Actor,
    invoice_id: i32,
  ) -> Result<invoice::Model> {
    let mut query = invoice::Entity::find_by_id(invoice_id);
    if actor.role == Role::Customer {
      query = query.filter(invoice::Column::CustomerId.eq(actor.id));
    }

    query
      .one(self.db)
      .await?
      .ok_or_else(|| Error::not_found("invoice", invoice_id))
  }

  async fn price_of(&self, customer_id: i32) -> Result<i64> {
    let (customer, tariff) = customer::Entity::find_by_id(customer_id)
      .find_also_related(tariff::Entity)
      .one(self.db)
      .await?
      .ok_or_else(|| Error::not_found("customer", customer_id))?;

    tariff
      .map(|t| t.price_per_kwh)
      .ok_or_else(|| Error::not_found("tariff", customer.tariff_id))
  }

  /// Amount preview; nothing is written.
  pub async fn quote(
    &self,
    actor: &Actor,
    invoice_id: i32,
    method_id: i32,
    adjustment: i64,
  ) -> Result<Breakdown> {
    if !actor.is_staff() {
      actor.ensure(Action::ViewOwnBills)?;
    }

    let invoice = self.visible_invoice(actor, invoice_id).await?;
    let method = payment_method::Entity::find_by_id(method_id)
      .one(self.db)
      .await?
      .ok_or_else(|| Error::not_found("payment method", method_id))?;
    let price = self.price_of(invoice.customer_id).await?;

    Breakdown::new(invoice.kwh, price, method.admin_fee, adjustment)
  }

  /// Customer pays an unpaid invoice; the invoice then waits for staff.
  pub async fn submit(
    &self,
    actor: &Actor,
    form: SubmitPayment,
  ) -> Result<payment::Model> {
    actor.ensure(Action::SubmitPayment)?;

    let invoice = self.visible_invoice(actor, form.invoice_id).await?;
    if !invoice.status.can_become(InvoiceStatus::PendingConfirmation) {
      return Err(Error::InvalidTransition {
        from: invoice.status,
        to: InvoiceStatus::PendingConfirmation,
      });
    }

    let method = payment_method::Entity::find_by_id(form.method_id)
      .one(self.db)
      .await?
      .ok_or_else(|| Error::not_found("payment method", form.method_id))?;
    if !method.is_active {
      return Err(Error::validation("method_id", "payment method is inactive"));
    }

    let price = self.price_of(invoice.customer_id).await?;
    let breakdown =
      Breakdown::new(invoice.kwh, price, method.admin_fee, form.adjustment)?;
    if breakdown.total < 0 {
      return Err(Error::validation(
        "adjustment",
        "would make the amount negative",
      ));
    }

    let proof = match form.proof {
      Some(upload) => Some(self.store_proof(upload).await?),
      None => None,
    };

    match self.insert_submission(&invoice, &method, &breakdown, proof.clone()).await
    {
      Ok(payment) => {
        info!(
          "Payment {} submitted for invoice #{} ({})",
          payment.reference(),
          invoice.id,
          utils::format_rupiah(payment.amount)
        );
        Ok(payment)
      }
      Err(err) => {
        if let Some(file) = proof {
          self.remove_proof(&file).await;
        }
        Err(err)
      }
    }
  }

  async fn insert_submission(
    &self,
    invoice: &invoice::Model,
    method: &payment_method::Model,
    breakdown: &Breakdown,
    proof: Option<String>,
  ) -> Result<payment::Model> {
    let txn = self.db.begin().await?;

    let moved = invoice::Entity::update_many()
      .col_expr(
        invoice::Column::Status,
        Expr::value(InvoiceStatus::PendingConfirmation),
      )
      .col_expr(invoice::Column::UpdatedAt, Expr::value(utils::now()))
      .filter(invoice::Column::Id.eq(invoice.id))
      .filter(invoice::Column::Status.eq(InvoiceStatus::Unpaid))
      .exec(&txn)
      .await?;
    if moved.rows_affected == 0 {
      let current = invoice::Entity::find_by_id(invoice.id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("invoice", invoice.id))?;
      return Err(Error::InvalidTransition {
        from: current.status,
        to: InvoiceStatus::PendingConfirmation,
      });
    }

    let now = utils::now();
    let payment = payment::ActiveModel {
      id: NotSet,
      invoice_id: Set(invoice.id),
      customer_id: Set(invoice.customer_id),
      method_id: Set(method.id),
      payment_date: Set(utils::today()),
      billed_month: Set(invoice.month),
      amount: Set(breakdown.total),
      adjustment: Set(breakdown.adjustment),
      proof: Set(proof),
      verification: Set(Verification::Pending),
      verification_note: Set(None),
      verified_at: Set(None),
      verifier_id: Set(None),
      created_at: Set(now),
      updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    Ok(payment)
  }

  async fn store_proof(&self, upload: ProofUpload) -> Result<String> {
    let bytes = STANDARD
      .decode(upload.data.trim())
      .map_err(|_| Error::validation("proof", "is not valid base64"))?;
    check_proof(&upload.name, bytes.len())?;

    let file = proof_file_name(&upload.name, Utc::now().timestamp());
    tokio::fs::create_dir_all(&self.config.proof_dir).await?;
    tokio::fs::write(self.config.proof_dir.join(&file), &bytes).await?;

    debug!("Stored proof {file} ({} bytes)", bytes.len());
    Ok(file)
  }

  async fn remove_proof(&self, file: &str) {
    if let Err(err) =
      tokio::fs::remove_file(self.config.proof_dir.join(file)).await
    {
      warn!("Failed to remove orphaned proof {file}: {err}");
    }
  }

  /// Path of the stored proof for staff or the paying customer.
  pub async fn proof_path(&self, actor: &Actor, id: i32) -> Result<PathBuf> {
    let payment = self.by_id(id).await?;
    if actor.is_staff() {
      actor.ensure(Action::VerifyPayments)?;
    } else if payment.customer_id != actor.id {
      return Err(Error::not_found("payment", id));
    }

    let file = payment.proof.ok_or_else(|| Error::not_found("proof", id))?;
    Ok(self.config.proof_dir.join(file))
  }

  pub async fn approve(
    &self,
    actor: &Actor,
    id: i32,
    note: Option<String>,
  ) -> Result<payment::Model> {
    actor.ensure(Action::VerifyPayments)?;
    check_note(note.as_deref())?;
    self.verify(actor, id, Verification::Approved, note).await
  }

  pub async fn reject(
    &self,
    actor: &Actor,
    id: i32,
    note: String,
  ) -> Result<payment::Model> {
    actor.ensure(Action::VerifyPayments)?;
    if note.trim().is_empty() {
      return Err(Error::validation("note", "a reason is required"));
    }
    check_note(Some(&note))?;
    self.verify(actor, id, Verification::Rejected, Some(note)).await
  }

  async fn verify(
    &self,
    actor: &Actor,
    id: i32,
    outcome: Verification,
    note: Option<String>,
  ) -> Result<payment::Model> {
    let payment = self.by_id(id).await?;
    let now = utils::now();

    let txn = self.db.begin().await?;

    let verified = payment::Entity::update_many()
      .col_expr(payment::Column::Verification, Expr::value(outcome))
      .col_expr(payment::Column::VerificationNote, Expr::value(note))
      .col_expr(payment::Column::VerifiedAt, Expr::value(now))
      .col_expr(payment::Column::VerifierId, Expr::value(actor.id))
      .col_expr(payment::Column::UpdatedAt, Expr::value(now))
      .filter(payment::Column::Id.eq(id))
      .filter(payment::Column::Verification.eq(Verification::Pending))
      .exec(&txn)
      .await?;
    if verified.rows_affected == 0 {
      warn!("Payment {} was already verified", payment.reference());
      return Err(Error::Conflict(format!(
        "Payment {} has already been verified",
        payment.reference()
      )));
    }

    let invoice = invoice::Entity::find_by_id(payment.invoice_id)
      .one(&txn)
      .await?
      .ok_or_else(|| Error::not_found("invoice", payment.invoice_id))?;

    let (next, paid_at) = match outcome {
      Verification::Approved => (InvoiceStatus::Paid, Some(payment.payment_date)),
      _ => (InvoiceStatus::Unpaid, None),
    };
    if !invoice.status.can_become(next) {
      return Err(Error::InvalidTransition { from: invoice.status, to: next });
    }

    let moved = invoice::Entity::update_many()
      .col_expr(invoice::Column::Status, Expr::value(next))
      .col_expr(invoice::Column::PaidAt, Expr::value(paid_at))
      .col_expr(invoice::Column::UpdatedAt, Expr::value(now))
      .filter(invoice::Column::Id.eq(invoice.id))
      .filter(invoice::Column::Status.eq(invoice.status))
      .exec(&txn)
      .await?;
    if moved.rows_affected == 0 {
      return Err(Error::Conflict(format!(
        "Invoice #{} changed while verifying {}",
        invoice.id,
        payment.reference()
      )));
    }

    let payment = payment::Entity::find_by_id(id)
      .one(&txn)
      .await?
      .ok_or_else(|| Error::not_found("payment", id))?;

    txn.commit().await?;

    info!(
      "Payment {} {:?} by #{}",
      payment.reference(),
      payment.verification,
      actor.id
    );
    Ok(payment)
  }

  async fn rows(&self, payments: Vec<payment::Model>) -> Result<Vec<PaymentRow>> {
    let customer_ids: HashSet<i32> =
      payments.iter().map(|p| p.customer_id).collect();
    let method_ids: HashSet<i32> = payments.iter().map(|p| p.method_id).collect();
    let invoice_ids: HashSet<i32> =
      payments.iter().map(|p| p.invoice_id).collect();

    let customers: HashMap<i32, customer::Model> = customer::Entity::find()
      .filter(customer::Column::Id.is_in(customer_ids))
      .all(self.db)
      .await?
      .into_iter()
      .map(|c| (c.id, c))
      .collect();
    let methods: HashMap<i32, payment_method::Model> =
      payment_method::Entity::find()
        .filter(payment_method::Column::Id.is_in(method_ids))
        .all(self.db)
        .await?
        .into_iter()
        .map(|m| (m.id, m))
        .collect();
    let periods: HashMap<i32, Period> = invoice::Entity::find()
      .filter(invoice::Column::Id.is_in(invoice_ids))
      .all(self.db)
      .await?
      .into_iter()
      .map(|i| (i.id, Period::new(i.month, i.year)))
      .collect();

    Ok(
      payments
        .into_iter()
        .map(|payment| PaymentRow {
          reference: payment.reference(),
          status_label: payment.verification.customer_label(),
          proof_url: self.proof_url(&payment),
          period_name: periods.get(&payment.invoice_id).map(|p| p.to_string()),
          customer: customers.get(&payment.customer_id).cloned(),
          method: methods.get(&payment.method_id).cloned(),
          payment,
        })
        .collect(),
    )
  }

  pub async fn list(
    &self,
    actor: &Actor,
    filter: PaymentFilter,
  ) -> Result<PaymentList> {
    actor.ensure(Action::VerifyPayments)?;

    let mut condition = Condition::all();
    if let Some(status) = filter.verification()? {
      condition = condition.add(payment::Column::Verification.eq(status));
    }
    if let Some(term) =
      filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty())
    {
      let ids: Vec<i32> = customer::Entity::find()
        .select_only()
        .column(customer::Column::Id)
        .filter(
          Condition::any()
            .add(customer::Column::Name.contains(term))
            .add(customer::Column::MeterNumber.contains(term)),
        )
        .into_tuple()
        .all(self.db)
        .await?;
      condition = condition.add(payment::Column::CustomerId.is_in(ids));
    }

    let paging = filter.paging();
    let query = payment::Entity::find().filter(condition);
    let total = query.clone().count(self.db).await?;
    let payments = query
      .order_by_desc(payment::Column::CreatedAt)
      .order_by_desc(payment::Column::Id)
      .offset(paging.offset())
      .limit(paging.per_page())
      .all(self.db)
      .await?;

    Ok(PaymentList {
      page: Page::new(self.rows(payments).await?, paging, total),
      stats: verification_counts(self.db).await?,
    })
  }

  pub async fn detail(&self, actor: &Actor, id: i32) -> Result<PaymentDetail> {
    actor.ensure(Action::VerifyPayments)?;
    let payment = self.by_id(id).await?;

    let invoice =
      invoice::Entity::find_by_id(payment.invoice_id).one(self.db).await?;
    let verifier = match payment.verifier_id {
      Some(verifier_id) => user::Entity::find_by_id(verifier_id).one(self.db).await?,
      None => None,
    };

    let row = self
      .rows(vec![payment])
      .await?
      .pop()
      .ok_or_else(|| Error::not_found("payment", id))?;

    let tariff = match &row.customer {
      Some(customer) => {
        tariff::Entity::find_by_id(customer.tariff_id).one(self.db).await?
      }
      None => None,
    };

    let breakdown = match (&invoice, &tariff, &row.method) {
      (Some(invoice), Some(tariff), Some(method)) => Breakdown::new(
        invoice.kwh,
        tariff.price_per_kwh,
        method.admin_fee,
        row.payment.adjustment,
      )
      .ok(),
      _ => None,
    };

    Ok(PaymentDetail { row, invoice, tariff, verifier, breakdown })
  }

  /// Newest first, for the customer's own history.
  pub async fn for_customer(
    &self,
    customer_id: i32,
    limit: u64,
  ) -> Result<Vec<PaymentRow>> {
    let payments = payment::Entity::find()
      .filter(payment::Column::CustomerId.eq(customer_id))
      .order_by_desc(payment::Column::CreatedAt)
      .order_by_desc(payment::Column::Id)
      .limit(limit)
      .all(self.db)
      .await?;

    self.rows(payments).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    entity::StaffRole,
    sv::{
      billing::MeterInput,
      invoice::{Invoice, NewInvoice},
      test_utils::test_db,
    },
  };

  struct Fixture {
    db: DatabaseConnection,
    config: Config,
    officer: Actor,
    customer: Actor,
    invoice: invoice::Model,
    method: payment_method::Model,
    _dir: tempfile::TempDir,
  }

  /// 1467.28 Rp/kWh, 1250 -> 1395, method fee 2500 Rp.
  async fn fixture() -> Fixture {
    let db = test_db::setup().await;
    let dir = tempfile::tempdir().unwrap();
    let config = Config { proof_dir: dir.path().join("proofs"), ..test_db::config() };

    let (_, officer) =
      test_db::staff(&db, "officer@petir.id", StaffRole::Officer).await;
    let tariff = test_db::tariff(&db, 1300, 146_728).await;
    let customer = test_db::customer(&db, tariff.id, "Budi", "111").await;
    let method = test_db::method(&db, "BCA", 250_000).await;

    let invoices = Invoice::new(&db, &config);
    for (month, end) in [(6, 1250), (7, 1395)] {
      invoices
        .create(
          &officer,
          NewInvoice {
            customer_id: customer.id,
            month,
            year: 2025,
            reading: MeterInput::EndReading(end),
          },
        )
        .await
        .unwrap();
    }
    let invoice = invoice::Entity::find()
      .filter(invoice::Column::Month.eq(7))
      .one(&db)
      .await
      .unwrap()
      .unwrap();

    Fixture {
      db,
      config,
      officer,
      customer: Actor::new(customer.id, Role::Customer),
      invoice,
      method,
      _dir: dir,
    }
  }

  fn submission(f: &Fixture, proof: Option<ProofUpload>) -> SubmitPayment {
    SubmitPayment {
      invoice_id: f.invoice.id,
      method_id: f.method.id,
      adjustment: 0,
      proof,
    }
  }

  fn png(name: &str) -> ProofUpload {
    ProofUpload { name: name.into(), data: STANDARD.encode(b"\x89PNG fake") }
  }

  async fn status_of(f: &Fixture) -> InvoiceStatus {
    invoice::Entity::find_by_id(f.invoice.id)
      .one(&f.db)
      .await
      .unwrap()
      .unwrap()
      .status
  }

  #[tokio::test]
  async fn test_quote_matches_reference_bill() {
    let f = fixture().await;
    let sv = Payment::new(&f.db, &f.config);

    let quote = sv.quote(&f.customer, f.invoice.id, f.method.id, 0).await.unwrap();
    assert_eq!(quote.kwh, 145);
    assert_eq!(quote.total, 21_525_560);
    assert_eq!(utils::format_rupiah(quote.total), "Rp 215.255,60");
  }

  #[tokio::test]
  async fn test_submit_then_approve() {
    let f = fixture().await;
    let sv = Payment::new(&f.db, &f.config);

    let payment = sv
      .submit(&f.customer, submission(&f, Some(png("bukti transfer.png"))))
      .await
      .unwrap();
    assert_eq!(payment.amount, 21_525_560);
    assert_eq!(payment.billed_month, 7);
    assert_eq!(payment.verification, Verification::Pending);
    assert_eq!(status_of(&f).await, InvoiceStatus::PendingConfirmation);

    let file = payment.proof.clone().unwrap();
    assert!(file.ends_with("_bukti_transfer.png"));
    assert!(f.config.proof_dir.join(&file).exists());
    assert_eq!(
      sv.proof_url(&payment),
      Some(format!("http://localhost:3000/storage/proofs/{file}"))
    );

    let approved = sv.approve(&f.officer, payment.id, None).await.unwrap();
    assert_eq!(approved.verification, Verification::Approved);
    assert_eq!(approved.verifier_id, Some(f.officer.id));
    assert!(approved.verified_at.is_some());

    let invoice =
      invoice::Entity::find_by_id(f.invoice.id).one(&f.db).await.unwrap().unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Paid);
    assert_eq!(invoice.paid_at, Some(payment.payment_date));
  }

  #[tokio::test]
  async fn test_reject_allows_resubmission() {
    let f = fixture().await;
    let sv = Payment::new(&f.db, &f.config);

    let first = sv.submit(&f.customer, submission(&f, None)).await.unwrap();
    assert!(matches!(
      sv.reject(&f.officer, first.id, "  ".into()).await,
      Err(Error::Validation { field: "note", .. })
    ));

    let rejected = sv
      .reject(&f.officer, first.id, "Bukti tidak terbaca".into())
      .await
      .unwrap();
    assert_eq!(rejected.verification, Verification::Rejected);
    assert_eq!(status_of(&f).await, InvoiceStatus::Unpaid);

    let second = sv.submit(&f.customer, submission(&f, None)).await.unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(status_of(&f).await, InvoiceStatus::PendingConfirmation);

    assert!(matches!(
      sv.approve(&f.officer, first.id, None).await,
      Err(Error::Conflict(_))
    ));
  }

  #[tokio::test]
  async fn test_cannot_pay_twice() {
    let f = fixture().await;
    let sv = Payment::new(&f.db, &f.config);

    sv.submit(&f.customer, submission(&f, None)).await.unwrap();
    assert!(matches!(
      sv.submit(&f.customer, submission(&f, None)).await,
      Err(Error::InvalidTransition {
        from: InvoiceStatus::PendingConfirmation,
        to: InvoiceStatus::PendingConfirmation,
      })
    ));
    assert_eq!(payment::Entity::find().count(&f.db).await.unwrap(), 1);
  }

  #[tokio::test]
  async fn test_stale_submission_reports_current_status() {
    let f = fixture().await;
    let sv = Payment::new(&f.db, &f.config);

    invoice::Entity::update_many()
      .col_expr(invoice::Column::Status, Expr::value(InvoiceStatus::Paid))
      .filter(invoice::Column::Id.eq(f.invoice.id))
      .exec(&f.db)
      .await
      .unwrap();

    let breakdown = Breakdown::new(145, 146_728, 250_000, 0).unwrap();
    assert!(matches!(
      sv.insert_submission(&f.invoice, &f.method, &breakdown, None).await,
      Err(Error::InvalidTransition {
        from: InvoiceStatus::Paid,
        to: InvoiceStatus::PendingConfirmation,
      })
    ));
    assert_eq!(payment::Entity::find().count(&f.db).await.unwrap(), 0);
  }

  #[tokio::test]
  async fn test_verification_is_guarded_by_pending_status() {
    let f = fixture().await;
    let sv = Payment::new(&f.db, &f.config);

    let payment = sv.submit(&f.customer, submission(&f, None)).await.unwrap();
    payment::Entity::update_many()
      .col_expr(
        payment::Column::Verification,
        Expr::value(Verification::Approved),
      )
      .filter(payment::Column::Id.eq(payment.id))
      .exec(&f.db)
      .await
      .unwrap();

    assert!(matches!(
      sv.reject(&f.officer, payment.id, "Nominal salah".into()).await,
      Err(Error::Conflict(_))
    ));

    let stored =
      payment::Entity::find_by_id(payment.id).one(&f.db).await.unwrap().unwrap();
    assert_eq!(stored.verification, Verification::Approved);
    assert_eq!(stored.verifier_id, None);
    assert_eq!(stored.verification_note, None);
    assert_eq!(status_of(&f).await, InvoiceStatus::PendingConfirmation);
  }

  #[tokio::test]
  async fn test_other_customers_invoice_is_not_found() {
    let f = fixture().await;
    let sv = Payment::new(&f.db, &f.config);
    let stranger = Actor::new(f.customer.id + 100, Role::Customer);

    assert!(matches!(
      sv.submit(&stranger, submission(&f, None)).await,
      Err(Error::NotFound { entity: "invoice", .. })
    ));
  }

  #[tokio::test]
  async fn test_negative_amount_rejected() {
    let f = fixture().await;
    let sv = Payment::new(&f.db, &f.config);

    let form = SubmitPayment { adjustment: -30_000_000, ..submission(&f, None) };
    assert!(matches!(
      sv.submit(&f.customer, form).await,
      Err(Error::Validation { field: "adjustment", .. })
    ));
    assert_eq!(status_of(&f).await, InvoiceStatus::Unpaid);
  }

  #[tokio::test]
  async fn test_proof_type_is_checked() {
    let f = fixture().await;
    let sv = Payment::new(&f.db, &f.config);

    let upload = ProofUpload { name: "bukti.pdf".into(), data: STANDARD.encode(b"%PDF") };
    assert!(matches!(
      sv.submit(&f.customer, submission(&f, Some(upload))).await,
      Err(Error::Validation { field: "proof", .. })
    ));
    assert_eq!(payment::Entity::find().count(&f.db).await.unwrap(), 0);
  }

  #[tokio::test]
  async fn test_inactive_method_rejected() {
    let f = fixture().await;
    payment_method::ActiveModel {
      is_active: Set(false),
      ..f.method.clone().into()
    }
    .update(&f.db)
    .await
    .unwrap();

    let result =
      Payment::new(&f.db, &f.config).submit(&f.customer, submission(&f, None)).await;
    assert!(matches!(result, Err(Error::Validation { field: "method_id", .. })));
  }

  #[tokio::test]
  async fn test_list_defaults_to_pending() {
    let f = fixture().await;
    let sv = Payment::new(&f.db, &f.config);

    let payment = sv.submit(&f.customer, submission(&f, None)).await.unwrap();

    let pending = sv.list(&f.officer, PaymentFilter::default()).await.unwrap();
    assert_eq!(pending.page.total, 1);
    let row = &pending.page.items[0];
    assert_eq!(row.reference, format!("REF{:010}", payment.id));
    assert_eq!(row.status_label, "waiting_verification");
    assert_eq!(row.period_name.as_deref(), Some("Juli 2025"));

    sv.approve(&f.officer, payment.id, Some("OK".into())).await.unwrap();
    let pending = sv.list(&f.officer, PaymentFilter::default()).await.unwrap();
    assert_eq!(pending.page.total, 0);
    assert_eq!(pending.stats.approved, 1);

    let all = sv
      .list(
        &f.officer,
        PaymentFilter { status: Some("all".into()), ..Default::default() },
      )
      .await
      .unwrap();
    assert_eq!(all.page.total, 1);

    let detail = sv.detail(&f.officer, payment.id).await.unwrap();
    assert_eq!(detail.breakdown.map(|b| b.total), Some(21_525_560));
    assert_eq!(detail.verifier.map(|u| u.email).as_deref(), Some("officer@petir.id"));
  }

  #[test]
  fn test_proof_file_name() {
    assert_eq!(
      proof_file_name("bukti bayar juli.jpg", 1_752_624_000),
      "1752624000_bukti_bayar_juli.jpg"
    );
    assert_eq!(proof_file_name("../../etc/x.png", 1), "1_x.png");
  }

  #[test]
  fn test_check_proof() {
    assert!(check_proof("a.JPG", 10).is_ok());
    assert!(check_proof("a.jpeg", MAX_PROOF_BYTES).is_ok());
    assert!(check_proof("a.png", MAX_PROOF_BYTES + 1).is_err());
    assert!(check_proof("a.gif", 10).is_err());
    assert!(check_proof("noext", 10).is_err());
  }
}
