//! HTTP CRUD service for a road-network graph: nodes (locations) joined by
//! directed, weighted road edges, kept in an embedded property-graph store.

pub mod api;
pub mod config;
pub mod nodes;
pub mod roads;
pub mod schema;
pub mod server;
pub mod store;

pub use config::Config;
pub use schema::SchemaProfile;
pub use server::{AppState, router};
pub use store::{GraphStore, PoolOptions};
