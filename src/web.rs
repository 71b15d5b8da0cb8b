use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use async_graphql::http::GraphiQLSource;
use async_graphql_warp::GraphQLResponse;
use tracing::{error, info};
use warp::{
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    reply::Response,
    Filter, Reply,
};

use crate::{
    api::{ProductFilter, Schema},
    catalog::CatalogCache,
    error::DashboardError,
    export::{export_csv, EXPORT_FILE_NAME},
};

pub(crate) async fn serve(schema: Schema, cache: Arc<CatalogCache>, addr: SocketAddr) {
    info!("Listening on {addr}");
    warp::serve(routes(schema, cache)).run(addr).await;
}

fn routes(
    schema: Schema,
    cache: Arc<CatalogCache>,
) -> impl Filter<Extract = (impl Reply,), Error = warp::Rejection> + Clone {
    let graphql = warp::path("graphql").and(async_graphql_warp::graphql(schema).and_then(
        |(schema, request): (Schema, async_graphql::Request)| async move {
            Ok::<_, Infallible>(GraphQLResponse::from(schema.execute(request).await))
        },
    ));

    let graphiql = warp::path("graphiql")
        .and(warp::get())
        .map(|| warp::reply::html(GraphiQLSource::build().endpoint("/graphql").finish()));

    let export = warp::path("export.csv")
        .and(warp::get())
        .and(warp::query::<ProductFilter>())
        .and(warp::any().map(move || cache.clone()))
        .then(download);

    graphql.or(graphiql).or(export)
}

async fn export_filtered(filter: &ProductFilter, cache: &CatalogCache) -> anyhow::Result<String> {
    let catalog = cache.get().await?;
    let (_, filtered) = filter.select(&catalog);
    export_csv(&filtered)
}

async fn download(filter: ProductFilter, cache: Arc<CatalogCache>) -> Response {
    match export_filtered(&filter, &cache).await {
        Ok(csv) => warp::reply::with_header(
            warp::reply::with_header(csv, CONTENT_TYPE, "text/csv; charset=utf-8"),
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{EXPORT_FILE_NAME}\""),
        )
        .into_response(),
        Err(e) => {
            error!("Problem while exporting products. {e:#}");
            let status = match e.downcast_ref::<DashboardError>() {
                Some(DashboardError::DataSourceUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            warp::reply::with_status(e.to_string(), status).into_response()
        }
    }
}
