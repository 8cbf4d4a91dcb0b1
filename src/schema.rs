//! Labels and property names for the two supported graph layouts.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::store::{EdgeRef, NodeRef};

/// Which node/relationship layout a deployment serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaProfile {
    /// `OSM_NODE {OSMID, LAT, LON}` joined by `OSM_ROAD`.
    #[default]
    Osm,
    /// `Location {id, ...}` joined by `ROAD_TO`.
    Location,
}

pub mod osm {
    pub const NODE_LABEL: &str = "OSM_NODE";
    pub const ROAD_TYPE: &str = "OSM_ROAD";

    pub const OSMID: &str = "OSMID";
    pub const LAT: &str = "LAT";
    pub const LON: &str = "LON";

    pub const DISTANCE_METERS: &str = "DISTANCE_METERS";
    pub const ROAD_NAME: &str = "ROAD_NAME";
    pub const ROAD_KIND: &str = "ROAD_TYPE";
    pub const ONEWAY: &str = "ONEWAY";
    pub const FROM: &str = "FROM";
    pub const TO: &str = "TO";
}

pub mod location {
    pub const NODE_LABEL: &str = "Location";
    pub const ROAD_TYPE: &str = "ROAD_TO";

    pub const ID: &str = "id";

    pub const DISTANCE_KM: &str = "distance_km";
    pub const TRAVEL_MIN: &str = "travel_min";
}

impl SchemaProfile {
    pub const fn node_label(self) -> &'static str {
        match self {
            SchemaProfile::Osm => osm::NODE_LABEL,
            SchemaProfile::Location => location::NODE_LABEL,
        }
    }

    pub const fn node_key(self) -> &'static str {
        match self {
            SchemaProfile::Osm => osm::OSMID,
            SchemaProfile::Location => location::ID,
        }
    }

    pub const fn road_type(self) -> &'static str {
        match self {
            SchemaProfile::Osm => osm::ROAD_TYPE,
            SchemaProfile::Location => location::ROAD_TYPE,
        }
    }

    pub fn node(self, key: impl Into<Value>) -> NodeRef {
        NodeRef::new(self.node_label(), self.node_key(), key.into())
    }

    pub fn road(self, from: impl Into<Value>, to: impl Into<Value>) -> EdgeRef {
        EdgeRef::new(self.road_type(), self.node(from), self.node(to))
    }
}

impl fmt::Display for SchemaProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaProfile::Osm => f.write_str("osm"),
            SchemaProfile::Location => f.write_str("location"),
        }
    }
}

impl FromStr for SchemaProfile {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "osm" => Ok(SchemaProfile::Osm),
            "location" => Ok(SchemaProfile::Location),
            other => Err(format!("unknown schema profile `{other}`")),
        }
    }
}
