use async_graphql::{Context, Object, Result, SimpleObject};

use crate::{
    api,
    database::CategorySummary,
    pipeline::{category_options, Bounds, FilterBounds},
    views::{sort_summary, CategoryMetric},
};

#[derive(SimpleObject)]
struct Range {
    min: f64,
    max: f64,
}

impl From<Bounds> for Range {
    fn from(bounds: Bounds) -> Self {
        Self {
            min: bounds.min,
            max: bounds.max,
        }
    }
}

#[derive(SimpleObject)]
struct FilterDomain {
    /// Lowest and highest price in the catalog.
    price: Range,
    /// The rating scale.
    rating: Range,
}

#[derive(SimpleObject)]
struct CategorySummaryRow {
    category: String,
    product_count: usize,
    avg_price: f64,
    avg_rating: f64,
    total_reviews: u64,
    avg_value_score: f64,
}

impl From<CategorySummary> for CategorySummaryRow {
    fn from(row: CategorySummary) -> Self {
        Self {
            category: row.category,
            product_count: row.product_count,
            avg_price: row.avg_price,
            avg_rating: row.avg_rating,
            total_reviews: row.total_reviews,
            avg_value_score: row.avg_value_score,
        }
    }
}

#[derive(Default)]
pub(super) struct CatalogQuery;

#[Object]
impl CatalogQuery {
    /// Category choices, starting with "All".
    async fn categories(&self, ctx: &Context<'_>) -> Result<Vec<String>> {
        let catalog = api::load_catalog(ctx).await?;
        Ok(category_options(&catalog.products))
    }

    async fn filter_domain(&self, ctx: &Context<'_>) -> Result<FilterDomain> {
        let catalog = api::load_catalog(ctx).await?;
        let bounds = FilterBounds::of(&catalog.products);
        Ok(FilterDomain {
            price: bounds.price.into(),
            rating: bounds.rating.into(),
        })
    }

    /// The per-category snapshot taken at import time, ascending by
    /// `sortBy` when given and by category name otherwise.
    async fn category_summary(
        &self,
        ctx: &Context<'_>,
        sort_by: Option<CategoryMetric>,
    ) -> Result<Vec<CategorySummaryRow>> {
        let catalog = api::load_catalog(ctx).await?;
        let rows = match sort_by {
            Some(metric) => sort_summary(&catalog.category_summary, metric),
            None => catalog.category_summary.clone(),
        };
        Ok(rows.into_iter().map(CategorySummaryRow::from).collect())
    }
}
