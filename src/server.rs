use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::api::{Ack, ApiError};
use crate::nodes;
use crate::roads;
use crate::schema::SchemaProfile;
use crate::store::GraphStore;

#[derive(Clone)]
pub struct AppState {
    pub store: GraphStore,
}

/// Builds the route set for `schema` over `state`.
pub fn router(state: AppState, schema: SchemaProfile) -> Router {
    let resources = match schema {
        SchemaProfile::Osm => Router::new()
            .route(
                "/nodes",
                post(nodes::upsert_osm_node)
                    .get(nodes::get_osm_node)
                    .patch(nodes::patch_osm_node)
                    .delete(nodes::delete_osm_node),
            )
            .route(
                "/roads",
                post(roads::upsert_osm_road)
                    .get(roads::get_osm_road)
                    .patch(roads::patch_osm_road)
                    .delete(roads::delete_osm_road),
            ),
        SchemaProfile::Location => Router::new()
            .route(
                "/nodes",
                post(nodes::upsert_location)
                    .get(nodes::get_location_by_query)
                    .patch(nodes::patch_location)
                    .delete(nodes::delete_location),
            )
            .route("/locations/{id}", get(nodes::get_location))
            .route(
                "/roads",
                post(roads::upsert_location_road)
                    .get(roads::get_location_road)
                    .patch(roads::patch_location_road)
                    .delete(roads::delete_location_road),
            ),
    };

    resources
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors())
        .with_state(state)
}

// Any origin, method and header, with credentials. `*` cannot be combined with
// credentials, so the request's own values are mirrored back instead.
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn health(State(state): State<AppState>) -> Result<Json<Ack>, ApiError> {
    let session = state.store.session().await?;
    session.execute_read(|tx| tx.ping()).await?;
    Ok(Ack::ok())
}
