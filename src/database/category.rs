use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{Product, TryFromKeyValue};

/// Per-category rollup, kept as a snapshot of the product tree at the time of
/// the last import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct CategorySummary {
    pub(crate) category: String,
    pub(crate) product_count: usize,
    pub(crate) avg_price: f64,
    pub(crate) avg_rating: f64,
    pub(crate) total_reviews: u64,
    pub(crate) avg_value_score: f64,
}

#[derive(Default)]
struct Totals {
    count: usize,
    price: f64,
    rating: f64,
    reviews: u64,
    value_score: f64,
}

impl CategorySummary {
    /// Groups `products` by category. Rows come out sorted by category name,
    /// and every row covers at least one product.
    pub(crate) fn summarize(products: &[Product]) -> Vec<CategorySummary> {
        products
            .iter()
            .fold(BTreeMap::<&str, Totals>::new(), |mut acc, p| {
                let totals = acc.entry(p.category.as_str()).or_default();
                totals.count += 1;
                totals.price += p.price;
                totals.rating += p.rating;
                totals.reviews += u64::from(p.review_count);
                totals.value_score += p.value_score;
                acc
            })
            .into_iter()
            .map(|(category, t)| {
                #[allow(clippy::cast_precision_loss)]
                let n = t.count as f64;
                CategorySummary {
                    category: category.to_string(),
                    product_count: t.count,
                    avg_price: t.price / n,
                    avg_rating: t.rating / n,
                    total_reviews: t.reviews,
                    avg_value_score: t.value_score / n,
                }
            })
            .collect()
    }
}

impl TryFromKeyValue for CategorySummary {
    fn try_from_key_value(_key: &[u8], value: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(value)?)
    }
}
