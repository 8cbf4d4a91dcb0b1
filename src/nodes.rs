//! `/nodes` handlers for both schema profiles.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::api::{Ack, ApiError, WriteSummary};
use crate::schema::{SchemaProfile, location, osm};
use crate::server::AppState;
use crate::store::{Assignment, Properties};

const OSM: SchemaProfile = SchemaProfile::Osm;
const LOCATION: SchemaProfile = SchemaProfile::Location;

#[derive(Deserialize)]
pub struct NodeUpsert {
    osmid: i64,
    lat: f64,
    lon: f64,
}

#[derive(Deserialize)]
pub struct NodePatch {
    osmid: Option<i64>,
    lat: Option<f64>,
    lon: Option<f64>,
}

#[derive(Deserialize)]
pub struct OsmIdQuery {
    osmid: i64,
}

#[derive(Deserialize)]
pub struct LocationIdQuery {
    id: String,
}

#[derive(Debug, Serialize)]
pub struct OsmNodeView {
    #[serde(rename = "OSMID")]
    osmid: Option<i64>,
    #[serde(rename = "LAT")]
    lat: Option<f64>,
    #[serde(rename = "LON")]
    lon: Option<f64>,
}

impl From<Properties> for OsmNodeView {
    fn from(properties: Properties) -> Self {
        Self {
            osmid: properties.get(osm::OSMID).and_then(Value::as_i64),
            lat: properties.get(osm::LAT).and_then(Value::as_f64),
            lon: properties.get(osm::LON).and_then(Value::as_f64),
        }
    }
}

pub async fn upsert_osm_node(
    State(state): State<AppState>,
    payload: Result<Json<NodeUpsert>, JsonRejection>,
) -> Result<Json<WriteSummary>, ApiError> {
    let Json(payload) = payload?;
    let node = OSM.node(payload.osmid);
    let assignments = vec![
        Assignment::set(osm::LAT, payload.lat),
        Assignment::set(osm::LON, payload.lon),
    ];

    let session = state.store.session().await?;
    let ((), counters) = session
        .execute_write(move |tx| tx.merge_node(&node, &assignments))
        .await?;
    debug!(osmid = payload.osmid, ?counters, "node upserted");

    Ok(WriteSummary::nodes(counters))
}

pub async fn get_osm_node(
    State(state): State<AppState>,
    query: Result<Query<OsmIdQuery>, QueryRejection>,
) -> Result<Json<OsmNodeView>, ApiError> {
    let Query(query) = query?;
    let node = OSM.node(query.osmid);

    let session = state.store.session().await?;
    let properties = session
        .execute_read(move |tx| tx.node(&node))
        .await?
        .ok_or(ApiError::NotFound("Not found"))?;

    Ok(Json(OsmNodeView::from(properties)))
}

/// Partial update: absent or null coordinates keep their stored value.
pub async fn patch_osm_node(
    State(state): State<AppState>,
    payload: Result<Json<NodePatch>, JsonRejection>,
) -> Result<Json<Ack>, ApiError> {
    let Json(payload) = payload?;
    let osmid = payload.osmid.ok_or(ApiError::MissingField("osmid"))?;
    let node = OSM.node(osmid);
    let assignments = vec![
        Assignment::coalesce(osm::LAT, payload.lat),
        Assignment::coalesce(osm::LON, payload.lon),
    ];

    let session = state.store.session().await?;
    let (matched, _) = session
        .execute_write(move |tx| tx.update_node(&node, &assignments))
        .await?;
    debug!(osmid, matched, "node patched");

    Ok(Ack::ok())
}

pub async fn delete_osm_node(
    State(state): State<AppState>,
    query: Result<Query<OsmIdQuery>, QueryRejection>,
) -> Result<Json<Ack>, ApiError> {
    let Query(query) = query?;
    let node = OSM.node(query.osmid);

    let session = state.store.session().await?;
    let (deleted, counters) = session
        .execute_write(move |tx| tx.detach_delete_node(&node))
        .await?;
    debug!(osmid = query.osmid, deleted, ?counters, "node deleted");

    Ok(Ack::ok())
}

/// Creates or overwrites a location. Every supplied attribute is written;
/// `null` removes it.
pub async fn upsert_location(
    State(state): State<AppState>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<WriteSummary>, ApiError> {
    let Json(mut payload) = payload?;
    let id = take_location_id(&mut payload)?;
    let assignments = location_assignments(payload, Assignment::Set)?;
    let node = LOCATION.node(id.clone());

    let session = state.store.session().await?;
    let ((), counters) = session
        .execute_write(move |tx| tx.merge_node(&node, &assignments))
        .await?;
    debug!(%id, ?counters, "location upserted");

    Ok(WriteSummary::nodes(counters))
}

pub async fn get_location_by_query(
    State(state): State<AppState>,
    query: Result<Query<LocationIdQuery>, QueryRejection>,
) -> Result<Json<Properties>, ApiError> {
    let Query(query) = query?;
    read_location(&state, query.id).await
}

pub async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Properties>, ApiError> {
    read_location(&state, id).await
}

async fn read_location(state: &AppState, id: String) -> Result<Json<Properties>, ApiError> {
    let node = LOCATION.node(id);
    let session = state.store.session().await?;
    let properties = session
        .execute_read(move |tx| tx.node(&node))
        .await?
        .ok_or(ApiError::NotFound("Not found"))?;
    Ok(Json(properties))
}

/// Partial update: `null` attributes keep their stored value.
pub async fn patch_location(
    State(state): State<AppState>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<Ack>, ApiError> {
    let Json(mut payload) = payload?;
    let id = take_location_id(&mut payload)?;
    let assignments = location_assignments(payload, |property, value| {
        Assignment::Coalesce(property, Some(value).filter(|value| !value.is_null()))
    })?;
    let node = LOCATION.node(id.clone());

    let session = state.store.session().await?;
    let (matched, _) = session
        .execute_write(move |tx| tx.update_node(&node, &assignments))
        .await?;
    debug!(%id, matched, "location patched");

    Ok(Ack::ok())
}

pub async fn delete_location(
    State(state): State<AppState>,
    query: Result<Query<LocationIdQuery>, QueryRejection>,
) -> Result<Json<Ack>, ApiError> {
    let Query(query) = query?;
    let node = LOCATION.node(query.id.clone());

    let session = state.store.session().await?;
    let (deleted, counters) = session
        .execute_write(move |tx| tx.detach_delete_node(&node))
        .await?;
    debug!(id = %query.id, deleted, ?counters, "location deleted");

    Ok(Ack::ok())
}

fn take_location_id(payload: &mut Map<String, Value>) -> Result<String, ApiError> {
    match payload.remove(location::ID) {
        None => Err(ApiError::MissingField("id")),
        Some(Value::String(id)) => Ok(id),
        Some(_) => Err(ApiError::InvalidPayload("id must be a string".to_string())),
    }
}

// Property values are scalars or lists of scalars; nested objects are rejected.
fn location_assignments(
    payload: Map<String, Value>,
    assign: impl Fn(String, Value) -> Assignment,
) -> Result<Vec<Assignment>, ApiError> {
    payload
        .into_iter()
        .map(|(property, value)| {
            let storable = match &value {
                Value::Object(_) => false,
                Value::Array(items) => items
                    .iter()
                    .all(|item| !matches!(item, Value::Object(_) | Value::Array(_))),
                _ => true,
            };
            if storable {
                Ok(assign(property, value))
            } else {
                Err(ApiError::InvalidPayload(format!(
                    "attribute `{property}` must be a scalar or a list of scalars"
                )))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn location_id_must_be_present_and_textual() {
        let mut payload = object(json!({ "name": "Depot" }));
        assert!(matches!(
            take_location_id(&mut payload),
            Err(ApiError::MissingField("id"))
        ));

        let mut payload = object(json!({ "id": 4 }));
        assert!(matches!(
            take_location_id(&mut payload),
            Err(ApiError::InvalidPayload(_))
        ));

        let mut payload = object(json!({ "id": "A", "name": "Depot" }));
        assert_eq!(take_location_id(&mut payload).unwrap(), "A");
        assert!(!payload.contains_key("id"));
    }

    #[test]
    fn nested_attributes_are_rejected() {
        let payload = object(json!({ "meta": { "zone": 3 } }));
        assert!(location_assignments(payload, Assignment::Set).is_err());

        let payload = object(json!({ "tags": ["a", "b"], "zone": 3 }));
        let assignments = location_assignments(payload, Assignment::Set).unwrap();
        assert_eq!(assignments.len(), 2);
    }

    #[test]
    fn osm_view_reads_stored_properties() {
        let properties = object(json!({ "OSMID": 42, "LAT": 10.0, "LON": 5.0 }));
        let view = OsmNodeView::from(properties);
        assert_eq!(view.osmid, Some(42));
        assert_eq!(view.lat, Some(10.0));
        assert_eq!(view.lon, Some(5.0));
    }
}
