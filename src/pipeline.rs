//! Narrows the catalog to the rows matching the user's current filter.

use std::collections::BTreeSet;

use crate::database::{product::MAX_RATING, Product};

/// The category value meaning "no restriction".
pub(crate) const ALL_CATEGORIES: &str = "All";

/// Rating interval applied when the user has not moved the rating slider.
pub(crate) const DEFAULT_RATING_RANGE: Bounds = Bounds { min: 3.0, max: 5.0 };

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) enum CategorySelector {
    #[default]
    All,
    Exact(String),
}

impl From<&str> for CategorySelector {
    fn from(value: &str) -> Self {
        if value == ALL_CATEGORIES {
            Self::All
        } else {
            Self::Exact(value.to_string())
        }
    }
}

impl CategorySelector {
    fn matches(&self, category: &str) -> bool {
        match self {
            Self::All => true,
            Self::Exact(selected) => selected == category,
        }
    }
}

/// A closed interval `[min, max]`. An inverted interval contains nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Bounds {
    pub(crate) min: f64,
    pub(crate) max: f64,
}

impl Bounds {
    pub(crate) fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub(crate) fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Predicate {
    pub(crate) category: CategorySelector,
    pub(crate) price: Bounds,
    pub(crate) rating: Bounds,
}

impl Predicate {
    pub(crate) fn matches(&self, product: &Product) -> bool {
        self.category.matches(&product.category)
            && self.price.contains(product.price)
            && self.rating.contains(product.rating)
    }

    /// Whether a category restriction is active. KPI deltas are only shown
    /// in that case.
    pub(crate) fn is_restricted(&self) -> bool {
        self.category != CategorySelector::All
    }
}

/// Keeps the records matching every condition of `predicate`, in their
/// original order.
pub(crate) fn apply_filter(records: &[Product], predicate: &Predicate) -> Vec<Product> {
    records
        .iter()
        .filter(|product| predicate.matches(product))
        .cloned()
        .collect()
}

pub(crate) fn distinct_categories(records: &[Product]) -> Vec<String> {
    records
        .iter()
        .map(|p| p.category.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(String::from)
        .collect()
}

/// Category choices for a selector widget: the "All" sentinel followed by
/// the distinct categories.
pub(crate) fn category_options(records: &[Product]) -> Vec<String> {
    std::iter::once(ALL_CATEGORIES.to_string())
        .chain(distinct_categories(records))
        .collect()
}

/// Slider domains for the price and rating filters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FilterBounds {
    pub(crate) price: Bounds,
    pub(crate) rating: Bounds,
}

impl FilterBounds {
    pub(crate) fn of(records: &[Product]) -> Self {
        let price = records
            .iter()
            .map(|p| p.price)
            .fold(None, |acc: Option<Bounds>, price| {
                Some(acc.map_or(Bounds::new(price, price), |b| {
                    Bounds::new(b.min.min(price), b.max.max(price))
                }))
            })
            .unwrap_or(Bounds::new(0.0, 0.0));
        Self {
            price,
            rating: Bounds::new(0.0, MAX_RATING),
        }
    }

    /// The predicate a fresh session starts with.
    pub(crate) fn default_predicate(&self) -> Predicate {
        Predicate {
            category: CategorySelector::All,
            price: self.price,
            rating: DEFAULT_RATING_RANGE,
        }
    }
}
