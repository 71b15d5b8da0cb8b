use std::fmt;

use async_graphql::{
    connection::{query, Connection, EmptyFields},
    Context, Object, Result, SimpleObject,
};

use crate::{
    api::{self, ProductFilter},
    database::Product,
};

#[derive(SimpleObject, Debug)]
pub(crate) struct ProductNode {
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

impl From<Product> for ProductNode {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            category: product.category,
            price: product.price,
            rating: product.rating,
            review_count: product.review_count,
            value_score: product.value_score,
            popularity_index: product.popularity_index,
            price_category: product.price_category,
        }
    }
}

impl fmt::Display for ProductNode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

#[derive(Default)]
pub(super) struct ProductQuery;

#[Object]
impl ProductQuery {
    /// The filtered rows in id order, for browsing the raw data.
    async fn products(
        &self,
        ctx: &Context<'_>,
        filter: ProductFilter,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
    ) -> Result<Connection<String, ProductNode, EmptyFields, EmptyFields>> {
        let catalog = api::load_catalog(ctx).await?;
        let (_, filtered) = filter.select(&catalog);
        let nodes: Vec<ProductNode> = filtered.into_iter().map(ProductNode::from).collect();
        query(
            after,
            before,
            first,
            last,
            |after, before, first, last| async move {
                api::load_connection(nodes, |n| n.id, after, before, first, last)
            },
        )
        .await
    }
}
