use axum::{
  Json,
  body::Body,
  extract::{Path, Query, State},
  http::{StatusCode, header},
  response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;

use super::session::{self, Session};
use crate::{
  entity::{customer, tariff, user},
  prelude::*,
  state::AppState,
  sv::{
    billing::{Breakdown, Period},
    customer::{CustomerDetail, CustomerUpdate, CustomerWithTariff, Registration},
    export,
    invoice::{Created, InvoiceFilter, InvoiceList, InvoiceRow, NewInvoice},
    paging::{Page, PageQuery},
    payment::{PaymentDetail, PaymentFilter, PaymentList, SubmitPayment},
    payment_method::{MethodForm, MethodView},
    policy::{Action, Actor, Role},
    report::{
      CustomerDashboard, Dashboard, EntityCounts, MethodRevenue, Revenue,
      StatusShare, TariffShare,
    },
    staff::{OfficerForm, PasswordChange, ProfileForm},
    tariff::TariffForm,
    usage::PreviousReading,
  },
  utils,
};

type AppRef = State<Arc<AppState>>;

#[derive(Debug, Serialize)]
pub struct Reply<T> {
  success: bool,
  data: T,
}

pub type Api<T> = Result<Json<Reply<T>>>;

fn ok<T>(data: T) -> Api<T> {
  Ok(Json(Reply { success: true, data }))
}

fn created<T>(data: T) -> Result<(StatusCode, Json<Reply<T>>)> {
  Ok((StatusCode::CREATED, Json(Reply { success: true, data })))
}

pub async fn health() -> &'static str {
  "OK"
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
  pub email: String,
  pub password: String,
}

#[derive(Debug, Serialize)]
pub struct Login {
  pub token: String,
  pub role: Role,
  pub id: i32,
  pub name: String,
}

pub async fn customer_register(
  State(app): AppRef,
  Json(form): Json<Registration>,
) -> Result<(StatusCode, Json<Reply<customer::Model>>)> {
  created(app.sv().customer.register(form).await?)
}

pub async fn customer_login(
  State(app): AppRef,
  Json(creds): Json<Credentials>,
) -> Api<Login> {
  let customer =
    app.sv().customer.login(&creds.email, &creds.password).await?;
  let token = session::issue(&app, Actor::new(customer.id, Role::Customer))?;

  ok(Login { token, role: Role::Customer, id: customer.id, name: customer.name })
}

pub async fn staff_login(
  State(app): AppRef,
  Json(creds): Json<Credentials>,
) -> Api<Login> {
  let user = app.sv().staff.login(&creds.email, &creds.password).await?;
  let role = Role::from(user.role);
  let token = session::issue(&app, Actor::new(user.id, role))?;

  ok(Login { token, role, id: user.id, name: user.name })
}

pub async fn tariffs(State(app): AppRef) -> Api<Vec<tariff::Model>> {
  ok(app.sv().tariff.all().await?)
}

// customer area

pub async fn customer_dashboard(
  State(app): AppRef,
  Session(actor): Session,
) -> Api<CustomerDashboard> {
  ok(app.sv().report.customer_dashboard(&actor).await?)
}

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
  pub method_id: i32,
  #[serde(default)]
  pub adjustment: i64,
}

pub async fn quote(
  State(app): AppRef,
  Session(actor): Session,
  Path(invoice_id): Path<i32>,
  Query(q): Query<QuoteQuery>,
) -> Api<Breakdown> {
  ok(
    app
      .sv()
      .payment
      .quote(&actor, invoice_id, q.method_id, q.adjustment)
      .await?,
  )
}

#[derive(Debug, Serialize)]
pub struct Submitted {
  pub id: i32,
  pub reference: String,
  pub amount: i64,
  pub amount_label: String,
  pub proof_url: Option<String>,
}

pub async fn submit_payment(
  State(app): AppRef,
  Session(actor): Session,
  Json(form): Json<SubmitPayment>,
) -> Result<(StatusCode, Json<Reply<Submitted>>)> {
  let sv = app.sv();
  let payment = sv.payment.submit(&actor, form).await?;

  created(Submitted {
    id: payment.id,
    reference: payment.reference(),
    amount: payment.amount,
    amount_label: utils::format_rupiah(payment.amount),
    proof_url: sv.payment.proof_url(&payment),
  })
}

pub async fn proof(
  State(app): AppRef,
  Session(actor): Session,
  Path(id): Path<i32>,
) -> Result<Response> {
  let path = app.sv().payment.proof_path(&actor, id).await?;
  let file = tokio::fs::File::open(&path)
    .await
    .map_err(|_| Error::not_found("proof", id))?;

  let content_type = match path.extension().and_then(|e| e.to_str()) {
    Some("png") => "image/png",
    _ => "image/jpeg",
  };

  Ok(
    (
      [(header::CONTENT_TYPE, content_type)],
      Body::from_stream(ReaderStream::new(file)),
    )
      .into_response(),
  )
}

// tariffs

pub async fn create_tariff(
  State(app): AppRef,
  Session(actor): Session,
  Json(form): Json<TariffForm>,
) -> Result<(StatusCode, Json<Reply<tariff::Model>>)> {
  created(app.sv().tariff.create(&actor, form).await?)
}

pub async fn update_tariff(
  State(app): AppRef,
  Session(actor): Session,
  Path(id): Path<i32>,
  Json(form): Json<TariffForm>,
) -> Api<tariff::Model> {
  ok(app.sv().tariff.update(&actor, id, form).await?)
}

pub async fn delete_tariff(
  State(app): AppRef,
  Session(actor): Session,
  Path(id): Path<i32>,
) -> Api<()> {
  ok(app.sv().tariff.delete(&actor, id).await?)
}

// payment methods

pub async fn methods(
  State(app): AppRef,
  Session(actor): Session,
) -> Api<Vec<MethodView>> {
  let methods = app.sv().method.all(&actor).await?;
  ok(methods.into_iter().map(|m| MethodView::new(m, &app.config)).collect())
}

pub async fn create_method(
  State(app): AppRef,
  Session(actor): Session,
  Json(form): Json<MethodForm>,
) -> Result<(StatusCode, Json<Reply<MethodView>>)> {
  let method = app.sv().method.create(&actor, form).await?;
  created(MethodView::new(method, &app.config))
}

pub async fn update_method(
  State(app): AppRef,
  Session(actor): Session,
  Path(id): Path<i32>,
  Json(form): Json<MethodForm>,
) -> Api<MethodView> {
  let method = app.sv().method.update(&actor, id, form).await?;
  ok(MethodView::new(method, &app.config))
}

pub async fn toggle_method(
  State(app): AppRef,
  Session(actor): Session,
  Path(id): Path<i32>,
) -> Api<MethodView> {
  let method = app.sv().method.toggle(&actor, id).await?;
  ok(MethodView::new(method, &app.config))
}

pub async fn delete_method(
  State(app): AppRef,
  Session(actor): Session,
  Path(id): Path<i32>,
) -> Api<()> {
  ok(app.sv().method.delete(&actor, id).await?)
}

// staff

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
  pub search: Option<String>,
  pub page: Option<u64>,
  pub per_page: Option<u64>,
}

impl ListQuery {
  fn paging(&self) -> PageQuery {
    PageQuery { page: self.page, per_page: self.per_page }
  }
}

pub async fn staff(
  State(app): AppRef,
  Session(actor): Session,
  Query(q): Query<ListQuery>,
) -> Api<Page<user::Model>> {
  ok(app.sv().staff.list(&actor, q.search.as_deref(), q.paging()).await?)
}

pub async fn create_officer(
  State(app): AppRef,
  Session(actor): Session,
  Json(form): Json<OfficerForm>,
) -> Result<(StatusCode, Json<Reply<user::Model>>)> {
  created(app.sv().staff.create_officer(&actor, form).await?)
}

pub async fn update_officer(
  State(app): AppRef,
  Session(actor): Session,
  Path(id): Path<i32>,
  Json(form): Json<OfficerForm>,
) -> Api<user::Model> {
  ok(app.sv().staff.update_officer(&actor, id, form).await?)
}

pub async fn delete_staff(
  State(app): AppRef,
  Session(actor): Session,
  Path(id): Path<i32>,
) -> Api<()> {
  ok(app.sv().staff.delete(&actor, id).await?)
}

pub async fn account(
  State(app): AppRef,
  Session(actor): Session,
) -> Api<user::Model> {
  actor.ensure(Action::ManageOwnAccount)?;
  ok(app.sv().staff.by_id(actor.id).await?)
}

pub async fn update_account(
  State(app): AppRef,
  Session(actor): Session,
  Json(form): Json<ProfileForm>,
) -> Api<user::Model> {
  ok(app.sv().staff.update_profile(&actor, form).await?)
}

pub async fn change_password(
  State(app): AppRef,
  Session(actor): Session,
  Json(form): Json<PasswordChange>,
) -> Api<()> {
  ok(app.sv().staff.change_password(&actor, form).await?)
}

// customers

pub async fn customers(
  State(app): AppRef,
  Session(actor): Session,
  Query(q): Query<ListQuery>,
) -> Api<Page<CustomerWithTariff>> {
  ok(app.sv().customer.list(&actor, q.search.as_deref(), q.paging()).await?)
}

pub async fn create_customer(
  State(app): AppRef,
  Session(actor): Session,
  Json(form): Json<Registration>,
) -> Result<(StatusCode, Json<Reply<customer::Model>>)> {
  created(app.sv().customer.create(&actor, form).await?)
}

pub async fn customer_detail(
  State(app): AppRef,
  Session(actor): Session,
  Path(id): Path<i32>,
) -> Api<CustomerDetail> {
  ok(app.sv().customer.detail(&actor, id).await?)
}

pub async fn update_customer(
  State(app): AppRef,
  Session(actor): Session,
  Path(id): Path<i32>,
  Json(form): Json<CustomerUpdate>,
) -> Api<customer::Model> {
  ok(app.sv().customer.update(&actor, id, form).await?)
}

pub async fn delete_customer(
  State(app): AppRef,
  Session(actor): Session,
  Path(id): Path<i32>,
) -> Api<()> {
  ok(app.sv().customer.delete(&actor, id).await?)
}

// invoices

pub async fn invoices(
  State(app): AppRef,
  Session(actor): Session,
  Query(filter): Query<InvoiceFilter>,
) -> Api<InvoiceList> {
  ok(app.sv().invoice.list(&actor, filter).await?)
}

pub async fn create_invoice(
  State(app): AppRef,
  Session(actor): Session,
  Json(form): Json<NewInvoice>,
) -> Result<(StatusCode, Json<Reply<Created>>)> {
  created(app.sv().invoice.create(&actor, form).await?)
}

pub async fn invoice_detail(
  State(app): AppRef,
  Session(actor): Session,
  Path(id): Path<i32>,
) -> Api<InvoiceRow> {
  ok(app.sv().invoice.detail(&actor, id).await?)
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
  #[serde(default)]
  pub q: String,
}

pub async fn search_customers(
  State(app): AppRef,
  Session(actor): Session,
  Query(q): Query<SearchQuery>,
) -> Api<Vec<CustomerWithTariff>> {
  ok(app.sv().customer.search(&actor, &q.q).await?)
}

#[derive(Debug, Deserialize)]
pub struct PreviousQuery {
  pub customer_id: i32,
  pub month: i32,
  pub year: i32,
}

pub async fn previous_usage(
  State(app): AppRef,
  Session(actor): Session,
  Query(q): Query<PreviousQuery>,
) -> Api<PreviousReading> {
  let period = Period::new(q.month, q.year);
  period.validate(app.config.min_year, app.config.max_year)?;

  ok(app.sv().usage.previous_reading(&actor, q.customer_id, period).await?)
}

// payment verification

pub async fn payments(
  State(app): AppRef,
  Session(actor): Session,
  Query(filter): Query<PaymentFilter>,
) -> Api<PaymentList> {
  ok(app.sv().payment.list(&actor, filter).await?)
}

pub async fn payment_detail(
  State(app): AppRef,
  Session(actor): Session,
  Path(id): Path<i32>,
) -> Api<PaymentDetail> {
  ok(app.sv().payment.detail(&actor, id).await?)
}

#[derive(Debug, Default, Deserialize)]
pub struct Verdict {
  pub note: Option<String>,
}

pub async fn approve(
  State(app): AppRef,
  Session(actor): Session,
  Path(id): Path<i32>,
  Json(verdict): Json<Verdict>,
) -> Api<PaymentDetail> {
  let sv = app.sv();
  sv.payment.approve(&actor, id, verdict.note).await?;
  ok(sv.payment.detail(&actor, id).await?)
}

pub async fn reject(
  State(app): AppRef,
  Session(actor): Session,
  Path(id): Path<i32>,
  Json(verdict): Json<Verdict>,
) -> Api<PaymentDetail> {
  let sv = app.sv();
  sv.payment.reject(&actor, id, verdict.note.unwrap_or_default()).await?;
  ok(sv.payment.detail(&actor, id).await?)
}

// reporting

pub async fn dashboard(
  State(app): AppRef,
  Session(actor): Session,
) -> Api<Dashboard> {
  ok(app.sv().report.dashboard(&actor).await?)
}

#[derive(Debug, Serialize)]
pub struct FullReport {
  pub counts: EntityCounts,
  pub invoice_status: Vec<StatusShare>,
  pub tariffs: Vec<TariffShare>,
  pub revenue: Revenue,
  pub revenue_by_method: Vec<MethodRevenue>,
  pub recent_invoices: Vec<InvoiceRow>,
}

pub async fn report(
  State(app): AppRef,
  Session(actor): Session,
) -> Api<FullReport> {
  actor.ensure(Action::ViewDashboard)?;
  let report = app.sv().report;

  ok(FullReport {
    counts: report.counts().await?,
    invoice_status: report.status_breakdown().await?,
    tariffs: report.tariff_breakdown().await?,
    revenue: report.total_revenue().await?,
    revenue_by_method: report.revenue_by_method().await?,
    recent_invoices: report.recent_invoices(5).await?,
  })
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
  pub ids: Option<String>,
}

pub async fn export_customers(
  State(app): AppRef,
  Session(actor): Session,
  Query(q): Query<ExportQuery>,
) -> Result<Response> {
  let ids = q.ids.as_deref().map(export::parse_ids).transpose()?;
  let bytes = app.sv().export.customers_csv(&actor, ids.as_deref()).await?;

  let disposition = format!(
    "attachment; filename=\"data-pelanggan-{}.csv\"",
    utils::today().format("%Y-%m-%d")
  );

  Ok(
    (
      [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (header::CONTENT_DISPOSITION, disposition),
      ],
      bytes,
    )
      .into_response(),
  )
}
