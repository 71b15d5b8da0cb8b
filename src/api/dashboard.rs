use async_graphql::{Context, Object, Result, SimpleObject};
use tracing::debug;

use crate::{
    api::{self, ProductFilter},
    error::DashboardError,
    export::export_csv,
    settings::DashboardSettings,
    views::{
        compute_kpis, price_category_distribution, price_rating_points, price_spread_by_category,
        rating_histogram, top_n, HistogramBucket, Kpi, PricePoint, PriceSpread, RankedProduct,
        RankingKey, MAX_HISTOGRAM_BINS,
    },
};

#[derive(SimpleObject)]
struct CountKpi {
    value: i64,
    /// Change against the unfiltered catalog; null unless a category is selected.
    delta: Option<i64>,
}

impl From<Kpi<i64>> for CountKpi {
    fn from(kpi: Kpi<i64>) -> Self {
        Self {
            value: kpi.value,
            delta: kpi.delta,
        }
    }
}

#[derive(SimpleObject)]
struct MeanKpi {
    value: f64,
    /// Change against the unfiltered catalog; null unless a category is selected.
    delta: Option<f64>,
}

#[derive(SimpleObject)]
struct Kpis {
    /// The number of matching products.
    product_count: CountKpi,
    /// The mean price; null when no product matches.
    avg_price: Option<MeanKpi>,
    /// The mean rating; null when no product matches.
    avg_rating: Option<MeanKpi>,
    /// The sum of review counts.
    total_reviews: CountKpi,
}

fn placeholder(kpi: Result<Kpi<f64>, DashboardError>) -> Option<MeanKpi> {
    match kpi {
        Ok(kpi) => Some(MeanKpi {
            value: kpi.value,
            delta: kpi.delta,
        }),
        Err(e) => {
            debug!("Showing placeholder: {e}");
            None
        }
    }
}

#[derive(SimpleObject)]
struct PriceCategoryCount {
    price_category: String,
    count: usize,
}

#[derive(Default)]
pub(super) struct DashboardQuery;

#[Object]
impl DashboardQuery {
    async fn kpis(&self, ctx: &Context<'_>, filter: ProductFilter) -> Result<Kpis> {
        let catalog = api::load_catalog(ctx).await?;
        let (predicate, filtered) = filter.select(&catalog);
        let kpis = compute_kpis(&catalog.products, &filtered, predicate.is_restricted());

        Ok(Kpis {
            product_count: kpis.product_count.into(),
            avg_price: placeholder(kpis.avg_price),
            avg_rating: placeholder(kpis.avg_rating),
            total_reviews: kpis.total_reviews.into(),
        })
    }

    /// The ten best products under `key`.
    async fn top_products(
        &self,
        ctx: &Context<'_>,
        filter: ProductFilter,
        key: RankingKey,
    ) -> Result<Vec<RankedProduct>> {
        let catalog = api::load_catalog(ctx).await?;
        let (_, filtered) = filter.select(&catalog);
        Ok(top_n(&filtered, key))
    }

    async fn price_category_distribution(
        &self,
        ctx: &Context<'_>,
        filter: ProductFilter,
    ) -> Result<Vec<PriceCategoryCount>> {
        let catalog = api::load_catalog(ctx).await?;
        let (_, filtered) = filter.select(&catalog);
        Ok(price_category_distribution(&filtered)
            .into_iter()
            .map(|(price_category, count)| PriceCategoryCount {
                price_category,
                count,
            })
            .collect())
    }

    /// Rating counts in equal-width buckets over 0 to 5. `bins` must be
    /// between 1 and 1000.
    async fn rating_histogram(
        &self,
        ctx: &Context<'_>,
        filter: ProductFilter,
        bins: Option<usize>,
    ) -> Result<Vec<HistogramBucket>> {
        let settings = ctx.data::<DashboardSettings>()?;
        let bins = bins.unwrap_or(settings.histogram_bins);
        if !(1..=MAX_HISTOGRAM_BINS).contains(&bins) {
            return Err(
                format!("bins must be between 1 and {MAX_HISTOGRAM_BINS}, got {bins}").into(),
            );
        }
        let catalog = api::load_catalog(ctx).await?;
        let (_, filtered) = filter.select(&catalog);
        Ok(rating_histogram(&filtered, bins))
    }

    /// Points of the price against rating scatter chart.
    async fn price_rating_points(
        &self,
        ctx: &Context<'_>,
        filter: ProductFilter,
    ) -> Result<Vec<PricePoint>> {
        let catalog = api::load_catalog(ctx).await?;
        let (_, filtered) = filter.select(&catalog);
        Ok(price_rating_points(&filtered))
    }

    async fn price_spread_by_category(
        &self,
        ctx: &Context<'_>,
        filter: ProductFilter,
    ) -> Result<Vec<PriceSpread>> {
        let catalog = api::load_catalog(ctx).await?;
        let (_, filtered) = filter.select(&catalog);
        Ok(price_spread_by_category(&filtered))
    }

    /// The matching rows as CSV text with a header row.
    async fn export_csv(&self, ctx: &Context<'_>, filter: ProductFilter) -> Result<String> {
        let catalog = api::load_catalog(ctx).await?;
        let (_, filtered) = filter.select(&catalog);
        Ok(export_csv(&filtered)?)
    }
}
