pub(crate) mod catalog;
pub(crate) mod dashboard;
pub(crate) mod product;

use std::{fmt::Display, sync::Arc};

use async_graphql::{
    types::connection::{Connection, Edge, EmptyFields},
    Context, EmptyMutation, EmptySubscription, InputObject, MergedObject, OutputType, Result,
};
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;

use crate::{
    catalog::{Catalog, CatalogCache},
    database::Product,
    pipeline::{apply_filter, Bounds, CategorySelector, FilterBounds, Predicate},
    settings::DashboardSettings,
};

/// The default page size for connections when neither `first` nor `last` is provided.
const DEFAULT_PAGE_SIZE: usize = 100;

/// A set of queries defined in the schema.
///
/// This is exposed only for [`Schema`], and not used directly.
#[derive(Default, MergedObject)]
pub(crate) struct Query(
    catalog::CatalogQuery,
    dashboard::DashboardQuery,
    product::ProductQuery,
);

pub(crate) type Schema = async_graphql::Schema<Query, EmptyMutation, EmptySubscription>;

pub(crate) fn schema(cache: Arc<CatalogCache>, settings: DashboardSettings) -> Schema {
    Schema::build(Query::default(), EmptyMutation, EmptySubscription)
        .data(cache)
        .data(settings)
        .finish()
}

/// The user's current filter. Absent fields take the dashboard defaults:
/// every category, the full price range, and ratings from 3 to 5.
#[derive(InputObject, Deserialize, Debug, Default)]
pub(crate) struct ProductFilter {
    /// Exact category to keep. "All" keeps every category.
    category: Option<String>,
    /// Lower price bound. (inclusive)
    price_min: Option<f64>,
    /// Upper price bound. (inclusive)
    price_max: Option<f64>,
    /// Lower rating bound. (inclusive)
    rating_min: Option<f64>,
    /// Upper rating bound. (inclusive)
    rating_max: Option<f64>,
}

impl ProductFilter {
    pub(crate) fn to_predicate(&self, bounds: &FilterBounds) -> Predicate {
        let default = bounds.default_predicate();
        Predicate {
            category: self
                .category
                .as_deref()
                .map_or(CategorySelector::All, CategorySelector::from),
            price: Bounds::new(
                self.price_min.unwrap_or(default.price.min),
                self.price_max.unwrap_or(default.price.max),
            ),
            rating: Bounds::new(
                self.rating_min.unwrap_or(default.rating.min),
                self.rating_max.unwrap_or(default.rating.max),
            ),
        }
    }

    /// Applies the filter to the catalog, returning the resolved predicate
    /// alongside the matching rows.
    pub(crate) fn select(&self, catalog: &Catalog) -> (Predicate, Vec<Product>) {
        let predicate = self.to_predicate(&FilterBounds::of(&catalog.products));
        let filtered = apply_filter(&catalog.products, &predicate);
        (predicate, filtered)
    }
}

async fn load_catalog(ctx: &Context<'_>) -> Result<Arc<Catalog>> {
    Ok(ctx.data::<Arc<CatalogCache>>()?.get().await?)
}

fn connect_cursor<T>(
    select_vec: Vec<T>,
    prev: bool,
    next: bool,
) -> Connection<String, T, EmptyFields, EmptyFields>
where
    T: OutputType + Display,
{
    let mut connection: Connection<String, T, EmptyFields, EmptyFields> =
        Connection::new(prev, next);
    for output in select_vec {
        connection.edges.push(Edge::new(
            general_purpose::STANDARD.encode(format!("{output}")),
            output,
        ));
    }
    connection
}

fn decode_cursor(cursor: &str) -> Result<u64> {
    let bytes = general_purpose::STANDARD.decode(cursor)?;
    Ok(String::from_utf8(bytes)?.parse()?)
}

/// Pages through `nodes`, which must be sorted by the key the cursors encode.
fn load_connection<N>(
    nodes: Vec<N>,
    key: impl Fn(&N) -> u64,
    after: Option<String>,
    before: Option<String>,
    first: Option<usize>,
    last: Option<usize>,
) -> Result<Connection<String, N, EmptyFields, EmptyFields>>
where
    N: Display + OutputType,
{
    let (nodes, has_previous, has_next) = if let Some(before) = before {
        if after.is_some() {
            return Err("cannot use both `after` and `before`".into());
        }
        if first.is_some() {
            return Err("'before' and 'first' cannot be specified simultaneously".into());
        }
        let last = last.unwrap_or(DEFAULT_PAGE_SIZE);
        let cursor = decode_cursor(&before)?;
        let iter = nodes.into_iter().filter(|n| key(n) < cursor).rev();
        let (mut nodes, has_previous) = collect_nodes(iter, last);
        nodes.reverse();
        (nodes, has_previous, false)
    } else if let Some(after) = after {
        if last.is_some() {
            return Err("'after' and 'last' cannot be specified simultaneously".into());
        }
        let first = first.unwrap_or(DEFAULT_PAGE_SIZE);
        let cursor = decode_cursor(&after)?;
        let iter = nodes.into_iter().filter(|n| key(n) > cursor);
        let (nodes, has_next) = collect_nodes(iter, first);
        (nodes, false, has_next)
    } else if let Some(last) = last {
        if first.is_some() {
            return Err("first and last cannot be used together".into());
        }
        let (mut nodes, has_previous) = collect_nodes(nodes.into_iter().rev(), last);
        nodes.reverse();
        (nodes, has_previous, false)
    } else {
        let first = first.unwrap_or(DEFAULT_PAGE_SIZE);
        let (nodes, has_next) = collect_nodes(nodes.into_iter(), first);
        (nodes, false, has_next)
    };
    Ok(connect_cursor(nodes, has_previous, has_next))
}

fn collect_nodes<I, T>(mut iter: I, size: usize) -> (Vec<T>, bool)
where
    I: Iterator<Item = T>,
{
    let nodes: Vec<T> = iter.by_ref().take(size).collect();
    let has_more = iter.next().is_some();
    (nodes, has_more)
}

#[cfg(test)]
struct TestSchema {
    _dir: tempfile::TempDir, // to prevent the data directory from being deleted while the test is running
    db: crate::database::Database,
    schema: Schema,
}

#[cfg(test)]
impl TestSchema {
    fn new() -> Self {
        let db_dir = tempfile::tempdir().unwrap();
        let db = crate::database::Database::connect(db_dir.path()).unwrap();
        let cache = Arc::new(CatalogCache::new(db.clone()));
        let schema = schema(cache, DashboardSettings::default());
        Self {
            _dir: db_dir,
            db,
            schema,
        }
    }

    fn with_products(products: Vec<Product>) -> Self {
        let schema = Self::new();
        schema.db.insert_products(products).unwrap();
        schema
    }

    async fn execute(&self, query: &str) -> async_graphql::Response {
        let request: async_graphql::Request = query.into();
        self.schema.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::sample;

    #[test]
    fn absent_fields_take_dashboard_defaults() {
        let bounds = FilterBounds::of(&sample());
        let predicate = ProductFilter::default().to_predicate(&bounds);
        assert_eq!(predicate.category, CategorySelector::All);
        assert_eq!(predicate.price, Bounds::new(5.0, 30.0));
        assert_eq!(predicate.rating, Bounds::new(3.0, 5.0));
    }

    #[test]
    fn explicit_fields_override_defaults() {
        let bounds = FilterBounds::of(&sample());
        let filter = ProductFilter {
            category: Some("Toys".to_string()),
            price_max: Some(12.0),
            rating_min: Some(0.0),
            ..Default::default()
        };
        let predicate = filter.to_predicate(&bounds);
        assert_eq!(predicate.category, CategorySelector::Exact("Toys".to_string()));
        assert_eq!(predicate.price, Bounds::new(5.0, 12.0));
        assert_eq!(predicate.rating, Bounds::new(0.0, 5.0));
    }

    #[tokio::test]
    async fn unreadable_store_is_a_query_error() {
        let schema = TestSchema::with_products(sample());
        crate::database::tests::store_undecodable_product(&schema.db, 99);

        let res = schema
            .execute("{ kpis(filter: {}) { productCount { value } } }")
            .await;
        assert_eq!(res.errors.len(), 1);
        assert!(res.errors[0].message.starts_with("data source unavailable"));
        assert_eq!(res.data, async_graphql::Value::Null);
    }

    #[test]
    fn collect_nodes_reports_remaining() {
        let (nodes, more) = collect_nodes(1..=3, 2);
        assert_eq!(nodes, vec![1, 2]);
        assert!(more);
        let (nodes, more) = collect_nodes(1..=3, 3);
        assert_eq!(nodes, vec![1, 2, 3]);
        assert!(!more);
    }
}
