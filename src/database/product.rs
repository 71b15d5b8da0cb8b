use std::collections::HashSet;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::TryFromKeyValue;
use crate::error::DashboardError;

pub(crate) const MAX_RATING: f64 = 5.0;

/// A catalog row as stored in the `products` tree and exported to CSV.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Product {
    pub(crate) id: u64,
    pub(crate) name: String,
    pub(crate) category: String,
    pub(crate) price: f64,
    pub(crate) rating: f64,
    pub(crate) review_count: u32,
    pub(crate) value_score: f64,
    pub(crate) popularity_index: f64,
    pub(crate) price_category: String,
}

impl Product {
    /// Big-endian id, so tree order is insertion-id order.
    pub(crate) fn key(&self) -> [u8; 8] {
        self.id.to_be_bytes()
    }

    pub(crate) fn validate(&self) -> Result<(), DashboardError> {
        let invalid = |reason: String| DashboardError::InvalidRecord {
            id: self.id,
            reason,
        };
        if !(self.price.is_finite() && self.price >= 0.0) {
            return Err(invalid(format!(
                "price {} must be a non-negative number",
                self.price
            )));
        }
        if !(0.0..=MAX_RATING).contains(&self.rating) {
            return Err(invalid(format!(
                "rating {} is outside 0..={MAX_RATING}",
                self.rating
            )));
        }
        Ok(())
    }
}

/// Rejects a batch in which two records share an id.
pub(crate) fn check_unique_ids(products: &[Product]) -> Result<(), DashboardError> {
    let mut seen = HashSet::with_capacity(products.len());
    for product in products {
        if !seen.insert(product.id) {
            return Err(DashboardError::InvalidRecord {
                id: product.id,
                reason: "duplicate id".to_string(),
            });
        }
    }
    Ok(())
}

impl TryFromKeyValue for Product {
    fn try_from_key_value(key: &[u8], value: &[u8]) -> Result<Self> {
        let id = key
            .try_into()
            .map(u64::from_be_bytes)
            .with_context(|| format!("invalid key in database: {key:02x?}"))?;
        let mut product: Product = bincode::deserialize(value)?;
        product.id = id;
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds_are_inclusive() {
        let mut product = Product {
            rating: 5.0,
            ..Default::default()
        };
        assert!(product.validate().is_ok());
        product.rating = 0.0;
        assert!(product.validate().is_ok());
        product.rating = 5.01;
        assert!(matches!(
            product.validate(),
            Err(DashboardError::InvalidRecord { .. })
        ));
    }

    #[test]
    fn negative_price_is_rejected() {
        let product = Product {
            id: 4,
            price: -0.5,
            ..Default::default()
        };
        assert_eq!(
            product.validate(),
            Err(DashboardError::InvalidRecord {
                id: 4,
                reason: "price -0.5 must be a non-negative number".to_string()
            })
        );
    }

    #[test]
    fn repeated_id_is_rejected() {
        let lamp = Product {
            id: 1,
            name: "Lamp".to_string(),
            ..Default::default()
        };
        let drone = Product {
            id: 1,
            name: "Drone".to_string(),
            ..Default::default()
        };
        let desk = Product {
            id: 2,
            ..Default::default()
        };
        assert!(check_unique_ids(&[lamp.clone(), desk]).is_ok());
        assert_eq!(
            check_unique_ids(&[lamp, drone]),
            Err(DashboardError::InvalidRecord {
                id: 1,
                reason: "duplicate id".to_string()
            })
        );
    }

    #[test]
    fn key_value_round_trip_takes_id_from_key() {
        let product = Product {
            id: 77,
            name: "Desk Lamp".to_string(),
            ..Default::default()
        };
        let value = bincode::serialize(&product).unwrap();
        let decoded = Product::try_from_key_value(&product.key(), &value).unwrap();
        assert_eq!(decoded, product);

        assert!(Product::try_from_key_value(b"short", &value).is_err());
    }
}
