use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::{
    database::{CategorySummary, Database, Product},
    error::DashboardError,
};

/// Everything the dashboard reads from the store: the full product table,
/// which doubles as the KPI baseline, and the category snapshot.
#[derive(Debug, Default)]
pub(crate) struct Catalog {
    pub(crate) products: Vec<Product>,
    pub(crate) category_summary: Vec<CategorySummary>,
}

pub(crate) fn load_products(db: &Database) -> Result<Vec<Product>, DashboardError> {
    db.products()
        .collect::<anyhow::Result<Vec<_>>>()
        .map_err(DashboardError::unavailable)
}

/// Reads the stored summary snapshot, falling back to summarizing `products`
/// when none was recorded.
pub(crate) fn load_category_summary(
    db: &Database,
    products: &[Product],
) -> Result<Vec<CategorySummary>, DashboardError> {
    let summary = db
        .category_summaries()
        .collect::<anyhow::Result<Vec<_>>>()
        .map_err(DashboardError::unavailable)?;
    if summary.is_empty() && !products.is_empty() {
        warn!("No category summary stored; computing it from products");
        return Ok(CategorySummary::summarize(products));
    }
    Ok(summary)
}

impl Catalog {
    pub(crate) fn load(db: &Database) -> Result<Self, DashboardError> {
        let products = load_products(db)?;
        let category_summary = load_category_summary(db, &products)?;
        info!(
            "Loaded {} products in {} categories",
            products.len(),
            category_summary.len()
        );
        Ok(Self {
            products,
            category_summary,
        })
    }
}

/// Loads the catalog once per process and hands out shared references.
///
/// A failed load leaves the cell empty, so the next caller tries again.
pub(crate) struct CatalogCache {
    db: Database,
    catalog: OnceCell<Arc<Catalog>>,
}

impl CatalogCache {
    pub(crate) fn new(db: Database) -> Self {
        Self {
            db,
            catalog: OnceCell::new(),
        }
    }

    pub(crate) async fn get(&self) -> Result<Arc<Catalog>, DashboardError> {
        self.catalog
            .get_or_try_init(|| async { Catalog::load(&self.db).map(Arc::new) })
            .await
            .cloned()
    }
}
