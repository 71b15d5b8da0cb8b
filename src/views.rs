//! Derived values the dashboard shows for a filtered product set: KPIs with
//! deltas against the full catalog, leaderboards, and the distributions the
//! charts are drawn from.

use std::collections::BTreeMap;

use async_graphql::{Enum, SimpleObject};

use crate::{
    database::{product::MAX_RATING, CategorySummary, Product},
    error::DashboardError,
};

/// Length of every leaderboard.
pub(crate) const TOP_N: usize = 10;

/// Largest bucket count a rating histogram may be asked for.
pub(crate) const MAX_HISTOGRAM_BINS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Kpi<T> {
    pub(crate) value: T,
    /// Difference from the baseline; `None` when no comparison was asked for.
    pub(crate) delta: Option<T>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct KpiSet {
    pub(crate) product_count: Kpi<i64>,
    pub(crate) avg_price: Result<Kpi<f64>, DashboardError>,
    pub(crate) avg_rating: Result<Kpi<f64>, DashboardError>,
    pub(crate) total_reviews: Kpi<i64>,
}

fn signed(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn mean(
    records: &[Product],
    field: &'static str,
    value: impl Fn(&Product) -> f64,
) -> Result<f64, DashboardError> {
    if records.is_empty() {
        return Err(DashboardError::EmptyInput { field });
    }
    #[allow(clippy::cast_precision_loss)]
    let n = records.len() as f64;
    Ok(records.iter().map(value).sum::<f64>() / n)
}

fn total_reviews(records: &[Product]) -> i64 {
    records.iter().map(|p| i64::from(p.review_count)).sum()
}

fn mean_kpi(
    baseline: &[Product],
    filtered: &[Product],
    compare: bool,
    field: &'static str,
    value: impl Fn(&Product) -> f64,
) -> Result<Kpi<f64>, DashboardError> {
    let current = mean(filtered, field, &value)?;
    let delta = if compare {
        Some(current - mean(baseline, field, &value)?)
    } else {
        None
    };
    Ok(Kpi {
        value: current,
        delta,
    })
}

/// Computes the four headline figures for `filtered`, with deltas against
/// `baseline` when `compare` is set.
///
/// The mean fields hold [`DashboardError::EmptyInput`] when `filtered` is
/// empty; the count and sum fields are always defined.
pub(crate) fn compute_kpis(baseline: &[Product], filtered: &[Product], compare: bool) -> KpiSet {
    let count = signed(filtered.len());
    let reviews = total_reviews(filtered);
    KpiSet {
        product_count: Kpi {
            value: count,
            delta: compare.then(|| count - signed(baseline.len())),
        },
        avg_price: mean_kpi(baseline, filtered, compare, "average price", |p| p.price),
        avg_rating: mean_kpi(baseline, filtered, compare, "average rating", |p| p.rating),
        total_reviews: Kpi {
            value: reviews,
            delta: compare.then(|| reviews - total_reviews(baseline)),
        },
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum RankingKey {
    Rating,
    ReviewCount,
    ValueScore,
    PopularityIndex,
}

impl RankingKey {
    fn score(self, product: &Product) -> f64 {
        match self {
            Self::Rating => product.rating,
            Self::ReviewCount => f64::from(product.review_count),
            Self::ValueScore => product.value_score,
            Self::PopularityIndex => product.popularity_index,
        }
    }
}

/// A leaderboard row. Only the column the board is ranked on, plus the review
/// count on the rating board, is filled in.
#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub(crate) struct RankedProduct {
    pub(crate) name: String,
    pub(crate) category: String,
    pub(crate) price: f64,
    pub(crate) rating: f64,
    pub(crate) review_count: Option<u32>,
    pub(crate) value_score: Option<f64>,
    pub(crate) popularity_index: Option<f64>,
}

impl RankedProduct {
    fn project(product: &Product, key: RankingKey) -> Self {
        let mut ranked = Self {
            name: product.name.clone(),
            category: product.category.clone(),
            price: product.price,
            rating: product.rating,
            review_count: None,
            value_score: None,
            popularity_index: None,
        };
        match key {
            RankingKey::Rating | RankingKey::ReviewCount => {
                ranked.review_count = Some(product.review_count);
            }
            RankingKey::ValueScore => ranked.value_score = Some(product.value_score),
            RankingKey::PopularityIndex => {
                ranked.popularity_index = Some(product.popularity_index);
            }
        }
        ranked
    }
}

/// The [`TOP_N`] highest records under `key`. Ties keep their order in
/// `filtered`.
pub(crate) fn top_n(filtered: &[Product], key: RankingKey) -> Vec<RankedProduct> {
    let mut ranked: Vec<&Product> = filtered.iter().collect();
    ranked.sort_by(|a, b| key.score(b).total_cmp(&key.score(a)));
    ranked
        .into_iter()
        .take(TOP_N)
        .map(|p| RankedProduct::project(p, key))
        .collect()
}

pub(crate) fn price_category_distribution(filtered: &[Product]) -> BTreeMap<String, usize> {
    filtered.iter().fold(BTreeMap::new(), |mut acc, p| {
        *acc.entry(p.price_category.clone()).or_insert(0) += 1;
        acc
    })
}

#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub(crate) struct HistogramBucket {
    /// Inclusive lower edge.
    pub(crate) lower: f64,
    /// Exclusive upper edge, except for the last bucket.
    pub(crate) upper: f64,
    pub(crate) count: usize,
}

/// Counts ratings in `bins` equal-width buckets spanning the rating scale.
pub(crate) fn rating_histogram(filtered: &[Product], bins: usize) -> Vec<HistogramBucket> {
    if bins == 0 {
        return Vec::new();
    }
    #[allow(clippy::cast_precision_loss)]
    let width = MAX_RATING / bins as f64;
    let mut counts = vec![0; bins];
    for product in filtered {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let index = ((product.rating / width).floor() as usize).min(bins - 1);
        counts[index] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| {
            #[allow(clippy::cast_precision_loss)]
            let lower = i as f64 * width;
            HistogramBucket {
                lower,
                upper: lower + width,
                count,
            }
        })
        .collect()
}

/// One dot of the price against rating scatter chart.
#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub(crate) struct PricePoint {
    pub(crate) name: String,
    pub(crate) category: String,
    pub(crate) price: f64,
    pub(crate) rating: f64,
    /// Sizes the dot.
    pub(crate) review_count: u32,
}

pub(crate) fn price_rating_points(filtered: &[Product]) -> Vec<PricePoint> {
    filtered
        .iter()
        .map(|p| PricePoint {
            name: p.name.clone(),
            category: p.category.clone(),
            price: p.price,
            rating: p.rating,
            review_count: p.review_count,
        })
        .collect()
}

/// Five-number summary of prices within one category.
#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub(crate) struct PriceSpread {
    pub(crate) category: String,
    pub(crate) min: f64,
    pub(crate) q1: f64,
    pub(crate) median: f64,
    pub(crate) q3: f64,
    pub(crate) max: f64,
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let pos = q * (sorted.len() - 1) as f64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (lo, hi) = (pos.floor() as usize, pos.ceil() as usize);
    #[allow(clippy::cast_precision_loss)]
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

pub(crate) fn price_spread_by_category(filtered: &[Product]) -> Vec<PriceSpread> {
    filtered
        .iter()
        .fold(BTreeMap::<&str, Vec<f64>>::new(), |mut acc, p| {
            acc.entry(p.category.as_str()).or_default().push(p.price);
            acc
        })
        .into_iter()
        .map(|(category, mut prices)| {
            prices.sort_by(f64::total_cmp);
            PriceSpread {
                category: category.to_string(),
                min: prices[0],
                q1: quantile(&prices, 0.25),
                median: quantile(&prices, 0.5),
                q3: quantile(&prices, 0.75),
                max: prices[prices.len() - 1],
            }
        })
        .collect()
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum CategoryMetric {
    ProductCount,
    AvgPrice,
    AvgRating,
    TotalReviews,
    AvgValueScore,
}

impl CategoryMetric {
    #[allow(clippy::cast_precision_loss)]
    fn value(self, row: &CategorySummary) -> f64 {
        match self {
            Self::ProductCount => row.product_count as f64,
            Self::AvgPrice => row.avg_price,
            Self::AvgRating => row.avg_rating,
            Self::TotalReviews => row.total_reviews as f64,
            Self::AvgValueScore => row.avg_value_score,
        }
    }
}

/// Orders summary rows ascending by `metric`, keeping ties in input order.
pub(crate) fn sort_summary(
    rows: &[CategorySummary],
    metric: CategoryMetric,
) -> Vec<CategorySummary> {
    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| metric.value(a).total_cmp(&metric.value(b)));
    sorted
}
