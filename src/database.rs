pub(crate) mod category;
pub(crate) mod product;

use std::{marker::PhantomData, path::Path};

use anyhow::{Context, Result};
use serde::Serialize;
use sled::{Db, Tree};
use tracing::info;

use self::product::check_unique_ids;
pub(crate) use self::{category::CategorySummary, product::Product};
use crate::error::DashboardError;

const PRODUCT_TREE: &str = "products";
const CATEGORY_SUMMARY_TREE: &str = "category_summary";

#[derive(Clone)]
pub(crate) struct Database {
    #[allow(unused)]
    db: Db,
    product_tree: Tree,
    category_summary_tree: Tree,
}

impl Database {
    pub(crate) fn connect(path: &Path) -> Result<Database> {
        let db = sled::open(path)
            .with_context(|| format!("cannot open database at {}", path.display()))?;
        let product_tree = db.open_tree(PRODUCT_TREE)?;
        let category_summary_tree = db.open_tree(CATEGORY_SUMMARY_TREE)?;
        Ok(Database {
            db,
            product_tree,
            category_summary_tree,
        })
    }

    fn insert<T: Serialize>(key: impl AsRef<[u8]>, val: &T, tree: &Tree) -> Result<()> {
        tree.insert(key.as_ref(), bincode::serialize(val)?)?;
        Ok(())
    }

    /// Stores `products` and refreshes the category summary snapshot.
    ///
    /// Every record is validated before anything is written, so a bad row
    /// leaves the store untouched. Ids must be unique within the batch and
    /// must not already be stored.
    pub(crate) fn insert_products(&self, products: Vec<Product>) -> Result<usize> {
        check_unique_ids(&products)?;
        for product in &products {
            product.validate()?;
            if self.product_tree.contains_key(product.key())? {
                return Err(DashboardError::InvalidRecord {
                    id: product.id,
                    reason: "id is already stored".to_string(),
                }
                .into());
            }
        }
        let count = products.len();
        for product in products {
            Database::insert(product.key(), &product, &self.product_tree)?;
        }
        self.refresh_category_summary()?;
        info!("Stored {count} products");
        Ok(count)
    }

    /// Rebuilds the per-category rollup from the stored products.
    pub(crate) fn refresh_category_summary(&self) -> Result<()> {
        let products = self.products().collect::<Result<Vec<_>>>()?;
        self.category_summary_tree.clear()?;
        for row in CategorySummary::summarize(&products) {
            Database::insert(row.category.as_bytes(), &row, &self.category_summary_tree)?;
        }
        Ok(())
    }

    pub(crate) fn products(&self) -> Iter<Product> {
        Iter::new(self.product_tree.iter())
    }

    pub(crate) fn category_summaries(&self) -> Iter<CategorySummary> {
        Iter::new(self.category_summary_tree.iter())
    }
}

pub(crate) trait TryFromKeyValue: Sized {
    fn try_from_key_value(key: &[u8], value: &[u8]) -> Result<Self>;
}

pub(crate) struct Iter<T> {
    inner: sled::Iter,
    phantom: PhantomData<T>,
}

impl<T> Iter<T> {
    fn new(inner: sled::Iter) -> Self {
        Self {
            inner,
            phantom: PhantomData,
        }
    }
}

impl<T: TryFromKeyValue> Iterator for Iter<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|item| {
            let (key, value) = item?;
            T::try_from_key_value(&key, &value)
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Stores bytes under `id` that do not decode as a product.
    pub(crate) fn store_undecodable_product(db: &Database, id: u64) {
        db.product_tree
            .insert(id.to_be_bytes(), &[0xff_u8][..])
            .unwrap();
    }

    fn product(id: u64, category: &str, price: f64) -> Product {
        Product {
            id,
            name: format!("item-{id}"),
            category: category.to_string(),
            price,
            rating: 4.0,
            review_count: 10,
            ..Default::default()
        }
    }

    #[test]
    fn products_come_back_in_id_order() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(dir.path()).unwrap();
        db.insert_products(vec![
            product(300, "Toys", 1.0),
            product(2, "Toys", 2.0),
            product(10, "Tools", 3.0),
        ])
        .unwrap();

        let ids: Vec<u64> = db.products().map(|p| p.unwrap().id).collect();
        assert_eq!(ids, vec![2, 10, 300]);
    }

    #[test]
    fn insert_refreshes_summary_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(dir.path()).unwrap();
        db.insert_products(vec![product(1, "Toys", 5.0), product(2, "Tools", 7.0)])
            .unwrap();
        db.insert_products(vec![product(3, "Toys", 15.0)]).unwrap();

        let summary = db
            .category_summaries()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].category, "Tools");
        assert_eq!(summary[1].category, "Toys");
        assert_eq!(summary[1].product_count, 2);
        assert!((summary[1].avg_price - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_record_aborts_whole_batch() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(dir.path()).unwrap();
        let mut bad = product(2, "Toys", 1.0);
        bad.rating = 7.5;

        assert!(db
            .insert_products(vec![product(1, "Toys", 1.0), bad])
            .is_err());
        assert_eq!(db.products().count(), 0);
    }

    #[test]
    fn repeated_id_in_batch_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(dir.path()).unwrap();
        let mut drone = product(1, "Toys", 2.0);
        drone.name = "Drone".to_string();

        let err = db
            .insert_products(vec![product(1, "Home", 1.0), drone])
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<DashboardError>(),
            Some(&DashboardError::InvalidRecord {
                id: 1,
                reason: "duplicate id".to_string()
            })
        );
        assert_eq!(db.products().count(), 0);
    }

    #[test]
    fn already_stored_id_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(dir.path()).unwrap();
        db.insert_products(vec![product(1, "Home", 1.0)]).unwrap();

        let mut drone = product(1, "Toys", 2.0);
        drone.name = "Drone".to_string();
        assert!(db
            .insert_products(vec![product(2, "Toys", 3.0), drone])
            .is_err());

        let stored: Vec<Product> = db.products().map(Result::unwrap).collect();
        assert_eq!(stored, vec![product(1, "Home", 1.0)]);
    }
}
