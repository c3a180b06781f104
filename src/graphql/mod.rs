use async_graphql::http::{playground_source, GraphQLPlaygroundConfig};
use async_graphql::{EmptySubscription, Request, Response, Schema};
use axum::extract::Extension;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Html;
use axum::routing::{get, get_service};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::config::Config;
use crate::graphql::guards::{get_token, is_staff, Staff, STAFF_TOKEN_HEADER};
use crate::graphql::mutation::MutationRoot;
use crate::graphql::query::QueryRoot;
use crate::models::photo::PhotoStorage;
use crate::store::SharedStore;

pub mod guards;
pub mod mutation;
pub mod query;

pub const SUCCESS_MESSAGE: &str = "success";

pub type BarbellSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(store: SharedStore, config: Config) -> BarbellSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(store)
        .data(PhotoStorage::new(&config.photo_dir))
        .data(config)
        .finish()
}

/// The staff token requests are checked against, if any.
#[derive(Clone)]
struct StaffToken(Option<String>);

pub fn router(schema: BarbellSchema, config: &Config) -> Router {
    let photos = get_service(ServeDir::new(&config.photo_dir)).handle_error(
        |err: std::io::Error| async move {
            error!(%err, "failed to serve photo");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to serve photo")
        },
    );

    Router::new()
        .route("/graphql", get(playground).post(query))
        .route("/health", get(health))
        .nest("/photos", photos)
        .layer(Extension(schema))
        .layer(Extension(StaffToken(config.staff_token.clone())))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn query(
    Extension(schema): Extension<BarbellSchema>,
    Extension(StaffToken(staff_token)): Extension<StaffToken>,
    headers: HeaderMap,
    Json(request): Json<Request>,
) -> Json<Response> {
    let request = if is_staff(&headers, staff_token.as_deref()) {
        request.data(Staff)
    } else {
        request
    };

    Json(schema.execute(request).await)
}

async fn playground(headers: HeaderMap) -> Html<String> {
    let mut config = GraphQLPlaygroundConfig::new("/graphql");
    if let Some(token) = get_token(&headers) {
        config = config.with_header(STAFF_TOKEN_HEADER, token);
    }

    Html(playground_source(config))
}

async fn health() -> &'static str {
    "ok"
}
