//! `/roads` handlers for both schema profiles.

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::api::{Ack, ApiError, WriteSummary};
use crate::schema::{SchemaProfile, location, osm};
use crate::server::AppState;
use crate::store::{Assignment, EdgeRef, Properties, WriteCounters};

const OSM: SchemaProfile = SchemaProfile::Osm;
const LOCATION: SchemaProfile = SchemaProfile::Location;

const NOT_CREATED: &str = "Road relation was not created";

fn default_oneway() -> Option<bool> {
    Some(false)
}

#[derive(Deserialize)]
pub struct RoadUpsert {
    from: i64,
    to: i64,
    /// Distance in meters.
    m: f64,
    name: Option<String>,
    #[serde(rename = "type")]
    road_type: Option<String>,
    // Omitted means `false`; an explicit `null` keeps the stored flag.
    #[serde(default = "default_oneway")]
    oneway: Option<bool>,
}

#[derive(Deserialize)]
pub struct RoadPatch {
    from: Option<i64>,
    to: Option<i64>,
    #[serde(alias = "distance")]
    m: Option<f64>,
    #[serde(alias = "road_name")]
    name: Option<String>,
    #[serde(rename = "type", alias = "road_type")]
    road_type: Option<String>,
    oneway: Option<bool>,
}

#[derive(Deserialize)]
pub struct RoadQuery {
    from: i64,
    to: i64,
}

#[derive(Debug, Serialize)]
pub struct OsmRoadView {
    #[serde(rename = "FROM")]
    from: Option<i64>,
    #[serde(rename = "TO")]
    to: Option<i64>,
    #[serde(rename = "DISTANCE_METERS")]
    distance_meters: Option<f64>,
    #[serde(rename = "ROAD_NAME")]
    road_name: Option<String>,
    #[serde(rename = "ROAD_TYPE")]
    road_type: Option<String>,
    #[serde(rename = "ONEWAY")]
    oneway: Option<bool>,
}

impl From<Properties> for OsmRoadView {
    fn from(properties: Properties) -> Self {
        let text = |key: &str| properties.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            from: properties.get(osm::FROM).and_then(Value::as_i64),
            to: properties.get(osm::TO).and_then(Value::as_i64),
            distance_meters: properties.get(osm::DISTANCE_METERS).and_then(Value::as_f64),
            road_name: text(osm::ROAD_NAME),
            road_type: text(osm::ROAD_KIND),
            oneway: properties.get(osm::ONEWAY).and_then(Value::as_bool),
        }
    }
}

#[derive(Deserialize)]
pub struct LocationRoadUpsert {
    from: Option<String>,
    to: Option<String>,
    km: Option<f64>,
    min: Option<f64>,
}

#[derive(Deserialize)]
pub struct LocationRoadQuery {
    from: String,
    to: String,
}

#[derive(Debug, Serialize)]
pub struct LocationRoadView {
    from: String,
    to: String,
    distance_km: Option<f64>,
    travel_min: Option<f64>,
}

/// Merges a directed road between two existing nodes.
///
/// A merge that matched no endpoints writes nothing; that is reported as 404.
pub async fn upsert_osm_road(
    State(state): State<AppState>,
    payload: Result<Json<RoadUpsert>, JsonRejection>,
) -> Result<Json<WriteSummary>, ApiError> {
    let Json(payload) = payload?;
    let road = OSM.road(payload.from, payload.to);
    let assignments = vec![
        Assignment::set(osm::DISTANCE_METERS, payload.m),
        Assignment::coalesce(osm::ROAD_NAME, payload.name),
        Assignment::coalesce(osm::ROAD_KIND, payload.road_type),
        Assignment::coalesce(osm::ONEWAY, payload.oneway),
        Assignment::set(osm::FROM, payload.from),
        Assignment::set(osm::TO, payload.to),
    ];

    let counters = merge_road(&state, road, assignments).await?;
    debug!(from = payload.from, to = payload.to, ?counters, "road upserted");

    Ok(WriteSummary::relationships(counters))
}

pub async fn get_osm_road(
    State(state): State<AppState>,
    query: Result<Query<RoadQuery>, QueryRejection>,
) -> Result<Json<OsmRoadView>, ApiError> {
    let Query(query) = query?;
    let properties = read_road(&state, OSM.road(query.from, query.to)).await?;
    Ok(Json(OsmRoadView::from(properties)))
}

/// Partial update: every attribute other than the endpoints is optional.
pub async fn patch_osm_road(
    State(state): State<AppState>,
    payload: Result<Json<RoadPatch>, JsonRejection>,
) -> Result<Json<Ack>, ApiError> {
    let Json(payload) = payload?;
    let presence = [("from", payload.from.is_some()), ("to", payload.to.is_some())];
    let (Some(from), Some(to)) = (payload.from, payload.to) else {
        return Err(ApiError::missing(&presence));
    };
    let assignments = vec![
        Assignment::coalesce(osm::DISTANCE_METERS, payload.m),
        Assignment::coalesce(osm::ROAD_NAME, payload.name),
        Assignment::coalesce(osm::ROAD_KIND, payload.road_type),
        Assignment::coalesce(osm::ONEWAY, payload.oneway),
        Assignment::set(osm::FROM, from),
        Assignment::set(osm::TO, to),
    ];

    update_road(&state, OSM.road(from, to), assignments).await?;
    Ok(Ack::ok())
}

pub async fn delete_osm_road(
    State(state): State<AppState>,
    query: Result<Query<RoadQuery>, QueryRejection>,
) -> Result<Json<Ack>, ApiError> {
    let Query(query) = query?;
    delete_road(&state, OSM.road(query.from, query.to)).await?;
    Ok(Ack::ok())
}

pub async fn upsert_location_road(
    State(state): State<AppState>,
    payload: Result<Json<LocationRoadUpsert>, JsonRejection>,
) -> Result<Json<WriteSummary>, ApiError> {
    let Json(payload) = payload?;
    let presence = [
        ("from", payload.from.is_some()),
        ("to", payload.to.is_some()),
        ("km", payload.km.is_some()),
        ("min", payload.min.is_some()),
    ];
    let LocationRoadUpsert {
        from: Some(from),
        to: Some(to),
        km: Some(km),
        min: Some(min),
    } = payload
    else {
        return Err(ApiError::missing(&presence));
    };
    let road = LOCATION.road(from.clone(), to.clone());
    let assignments = vec![
        Assignment::set(location::DISTANCE_KM, km),
        Assignment::set(location::TRAVEL_MIN, min),
    ];

    let counters = merge_road(&state, road, assignments).await?;
    debug!(%from, %to, ?counters, "road upserted");

    Ok(WriteSummary::relationships(counters))
}

pub async fn get_location_road(
    State(state): State<AppState>,
    query: Result<Query<LocationRoadQuery>, QueryRejection>,
) -> Result<Json<LocationRoadView>, ApiError> {
    let Query(query) = query?;
    let road = LOCATION.road(query.from.clone(), query.to.clone());
    let properties = read_road(&state, road).await?;
    Ok(Json(LocationRoadView {
        from: query.from,
        to: query.to,
        distance_km: properties.get(location::DISTANCE_KM).and_then(Value::as_f64),
        travel_min: properties.get(location::TRAVEL_MIN).and_then(Value::as_f64),
    }))
}

pub async fn patch_location_road(
    State(state): State<AppState>,
    payload: Result<Json<LocationRoadUpsert>, JsonRejection>,
) -> Result<Json<Ack>, ApiError> {
    let Json(payload) = payload?;
    let presence = [("from", payload.from.is_some()), ("to", payload.to.is_some())];
    let (Some(from), Some(to)) = (payload.from, payload.to) else {
        return Err(ApiError::missing(&presence));
    };
    let assignments = vec![
        Assignment::coalesce(location::DISTANCE_KM, payload.km),
        Assignment::coalesce(location::TRAVEL_MIN, payload.min),
    ];

    update_road(&state, LOCATION.road(from, to), assignments).await?;
    Ok(Ack::ok())
}

pub async fn delete_location_road(
    State(state): State<AppState>,
    query: Result<Query<LocationRoadQuery>, QueryRejection>,
) -> Result<Json<Ack>, ApiError> {
    let Query(query) = query?;
    delete_road(&state, LOCATION.road(query.from, query.to)).await?;
    Ok(Ack::ok())
}

async fn merge_road(
    state: &AppState,
    road: EdgeRef,
    assignments: Vec<Assignment>,
) -> Result<WriteCounters, ApiError> {
    let session = state.store.session().await?;
    let (matched, counters) = session
        .execute_write(move |tx| tx.merge_edge(&road, &assignments))
        .await?;
    if !matched {
        return Err(ApiError::NotFound(NOT_CREATED));
    }
    Ok(counters)
}

async fn read_road(state: &AppState, road: EdgeRef) -> Result<Properties, ApiError> {
    let session = state.store.session().await?;
    session
        .execute_read(move |tx| tx.edge(&road))
        .await?
        .ok_or(ApiError::NotFound("Not found"))
}

async fn update_road(
    state: &AppState,
    road: EdgeRef,
    assignments: Vec<Assignment>,
) -> Result<(), ApiError> {
    let session = state.store.session().await?;
    let (matched, counters) = session
        .execute_write(move |tx| tx.update_edge(&road, &assignments))
        .await?;
    debug!(matched, ?counters, "road patched");
    Ok(())
}

async fn delete_road(state: &AppState, road: EdgeRef) -> Result<(), ApiError> {
    let session = state.store.session().await?;
    let (deleted, _) = session
        .execute_write(move |tx| tx.delete_edge(&road))
        .await?;
    debug!(deleted, "road deleted");
    Ok(())
}
