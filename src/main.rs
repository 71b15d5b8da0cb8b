mod api;
mod catalog;
mod database;
mod error;
mod export;
mod pipeline;
mod settings;
mod views;
mod web;

use std::{process::exit, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::{
    catalog::CatalogCache,
    database::Database,
    error::DashboardError,
    settings::{Args, Settings},
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let settings = Settings::from_file(&args.config)
        .with_context(|| format!("cannot load settings from {}", args.config.display()))?;

    let database = match Database::connect(&settings.database.path) {
        Ok(database) => database,
        Err(e) => {
            error!("{}", DashboardError::unavailable(format!("{e:#}")));
            exit(1);
        }
    };

    if let Some(path) = &args.import {
        let products = export::import_csv(path)?;
        database.insert_products(products)?;
    }

    let cache = Arc::new(CatalogCache::new(database));
    match cache.get().await {
        Ok(catalog) => info!("Catalog ready with {} products", catalog.products.len()),
        Err(e) => {
            error!("{e}");
            exit(1);
        }
    }

    let schema = api::schema(cache.clone(), settings.dashboard);
    web::serve(schema, cache, settings.web.address).await;
    Ok(())
}
