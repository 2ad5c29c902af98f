use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::{
  prelude::*,
  state::AppState,
  sv::{self, export::parse_ids, policy::Actor, report::Report},
  utils,
};

#[derive(Parser)]
#[command(name = "petirpay")]
#[command(about = "Postpaid electricity billing server and tools")]
#[command(version)]
pub struct Cli {
  #[command(subcommand)]
  pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
  /// Run the HTTP server (default)
  Serve,

  /// Print record counts and billing figures
  Status {
    /// Include breakdowns, recent invoices and revenue
    #[arg(long)]
    detailed: bool,
  },

  /// Write customers to a CSV file
  Export {
    #[arg(long)]
    out: PathBuf,

    /// Comma separated customer ids, all customers when omitted
    #[arg(long)]
    ids: Option<String>,
  },

  /// Insert default tariffs, payment methods and the administrator
  Seed,

  /// Apply pending migrations
  Migrate,
}

pub async fn status(app: &AppState, detailed: bool) -> anyhow::Result<()> {
  let report = Report::new(&app.db, &app.config);
  let counts = report.counts().await?;

  println!("PetirPay v{}", env!("CARGO_PKG_VERSION"));
  println!();
  println!("  Staff users      {:>8}", counts.users);
  println!("  Tariffs          {:>8}", counts.tariffs);
  println!("  Customers        {:>8}", counts.customers);
  println!("  Usage records    {:>8}", counts.usages);
  println!("  Invoices         {:>8}", counts.invoices);
  println!("  Payment methods  {:>8}", counts.payment_methods);
  println!("  Payments         {:>8}", counts.payments);

  if !detailed {
    return Ok(());
  }

  println!();
  println!("Invoice status");
  for share in report.status_breakdown().await? {
    println!(
      "  {:<22} {:>6} ({:.1}%)",
      share.status.as_str(),
      share.count,
      share.percentage
    );
  }

  println!();
  println!("Customers per tariff");
  for tariff in report.tariff_breakdown().await? {
    println!(
      "  {:>5} VA  {:>12}/kWh  {:>6}",
      tariff.power_va,
      utils::format_rupiah(tariff.price_per_kwh),
      tariff.customers
    );
  }

  println!();
  println!("Recent invoices");
  for row in report.recent_invoices(5).await? {
    let name = row.customer.as_ref().map_or("-", |c| c.name.as_str());
    println!(
      "  #{:<5} {:<24} {:<16} {:>6} kWh  {}",
      row.invoice.id,
      name,
      row.period_name,
      row.invoice.kwh,
      row.invoice.status.as_str()
    );
  }

  let revenue = report.total_revenue().await?;
  println!();
  println!(
    "Total revenue: {}{}",
    utils::format_rupiah(revenue.amount),
    if revenue.fallback { " (estimated from paid invoices)" } else { "" }
  );

  for method in report.revenue_by_method().await? {
    println!(
      "  {:<16} {:>20}  {:>4} payment(s)",
      method.name,
      utils::format_rupiah(method.total),
      method.count
    );
  }

  Ok(())
}

pub async fn export(
  app: &AppState,
  out: PathBuf,
  ids: Option<String>,
) -> anyhow::Result<()> {
  let ids = ids.as_deref().map(parse_ids).transpose()?;
  let bytes = sv::Export::new(&app.db)
    .customers_csv(&Actor::system(), ids.as_deref())
    .await?;

  tokio::fs::write(&out, bytes).await?;
  info!("Customers written to {}", out.display());
  Ok(())
}

pub async fn seed(app: &AppState) -> anyhow::Result<()> {
  let seeded = sv::seed::run(&app.db, &app.config).await?;
  println!(
    "Seeded {} tariff(s), {} payment method(s){}",
    seeded.tariffs,
    seeded.methods,
    if seeded.admin { ", administrator ready" } else { "" }
  );
  Ok(())
}
