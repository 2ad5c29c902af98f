mod handlers;
mod session;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use async_trait::async_trait;
use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

use crate::{prelude::*, state::AppState, sv::payment::MAX_PROOF_BYTES};

/// Base64 of the largest proof plus room for the rest of the JSON body.
const MAX_PAYMENT_BODY: usize = MAX_PROOF_BYTES.div_ceil(3) * 4 + 64 * 1024;

pub struct Plugin;

pub fn routes() -> Router<Arc<AppState>> {
  use handlers::*;

  let customer = Router::new()
    .route("/register", post(customer_register))
    .route("/login", post(customer_login))
    .route("/dashboard", get(customer_dashboard))
    .route("/invoices/{id}/quote", get(quote))
    .route(
      "/payments",
      post(submit_payment).layer(DefaultBodyLimit::max(MAX_PAYMENT_BODY)),
    )
    .route("/payments/{id}/proof", get(proof));

  let admin = Router::new()
    .route("/login", post(staff_login))
    .route("/dashboard", get(dashboard))
    .route("/report", get(report))
    .route("/export", get(export_customers))
    .route("/account", get(account).put(update_account))
    .route("/account/password", put(change_password))
    .route("/tariffs", post(create_tariff))
    .route("/tariffs/{id}", put(update_tariff).delete(delete_tariff))
    .route("/payment-methods", get(methods).post(create_method))
    .route(
      "/payment-methods/{id}",
      put(update_method).delete(delete_method),
    )
    .route("/payment-methods/{id}/toggle", post(toggle_method))
    .route("/staff", get(staff).post(create_officer))
    .route("/staff/{id}", put(update_officer).delete(delete_staff))
    .route("/customers", get(customers).post(create_customer))
    .route(
      "/customers/{id}",
      get(customer_detail).put(update_customer).delete(delete_customer),
    )
    .route("/invoices", get(invoices).post(create_invoice))
    .route("/invoices/customers", get(search_customers))
    .route("/invoices/previous", get(previous_usage))
    .route("/invoices/{id}", get(invoice_detail))
    .route("/payments", get(payments))
    .route("/payments/{id}", get(payment_detail))
    .route("/payments/{id}/approve", post(approve))
    .route("/payments/{id}/reject", post(reject))
    .route("/payments/{id}/proof", get(proof));

  Router::new()
    .route("/health", get(health))
    .route("/api/tariffs", get(tariffs))
    .nest("/api/customer", customer)
    .nest("/api/admin", admin)
}

#[async_trait]
impl super::Plugin for Plugin {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    if app.config.secret.is_none() {
      anyhow::bail!("SERVER_SECRET not set");
    }

    let governor_conf = Arc::new(
      GovernorConfigBuilder::default()
        .per_second(2)
        .burst_size(100)
        .finish()
        .context("Failed to build rate limiter config")?,
    );

    let governor_limiter = governor_conf.limiter().clone();

    tokio::spawn(async move {
      loop {
        tokio::time::sleep(Duration::from_secs(60)).await;
        governor_limiter.retain_recent();
      }
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], app.config.port));

    let router = routes()
      .layer(
        ServiceBuilder::new()
          .layer(TraceLayer::new_for_http())
          .layer(GovernorLayer::new(governor_conf))
          .layer(
            CorsLayer::new()
              .allow_origin(Any)
              .allow_methods(Any)
              .allow_headers(Any),
          ),
      )
      .with_state(app)
      .into_make_service_with_connect_info::<SocketAddr>();

    let listener = tokio::net::TcpListener::bind(addr)
      .await
      .with_context(|| format!("Failed to bind {addr}"))?;

    info!("HTTP server listening on {addr}");

    tokio::spawn(async move {
      if let Err(err) = axum::serve(listener, router).await {
        error!("HTTP server stopped: {err}");
      }
    });

    Ok(())
  }
}
