mod cli;
mod config;
mod entity;
mod error;
mod plugins;
mod prelude;
mod state;
mod sv;
mod utils;

use clap::Parser;
use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{
  cli::{Cli, Command},
  config::Config,
  plugins::{App, server},
  prelude::*,
  state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "petirpay=debug,tower_http=debug,sea_orm=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  let args = Cli::parse();
  let config = Config::from_env()?;
  let app = Arc::new(AppState::new(config).await?);

  match args.command.unwrap_or(Command::Serve) {
    Command::Serve => {
      info!("Starting PetirPay v{}", env!("CARGO_PKG_VERSION"));

      App::new().register(server::Plugin).run(app).await?;

      tokio::signal::ctrl_c().await?;
      info!("Shutting down");
    }
    Command::Status { detailed } => cli::status(&app, detailed).await?,
    Command::Export { out, ids } => cli::export(&app, out, ids).await?,
    Command::Seed => cli::seed(&app).await?,
    Command::Migrate => println!("Migrations are up to date"),
  }

  Ok(())
}
