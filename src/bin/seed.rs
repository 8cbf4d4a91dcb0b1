use std::env;
use std::fs;

use roadgraph::schema::osm;
use roadgraph::store::{Assignment, StoreError, WriteTx};
use roadgraph::{GraphStore, PoolOptions, SchemaProfile};
use tracing::info;

const ORIGIN_LAT: f64 = 52.5200;
const ORIGIN_LON: f64 = 13.4050;
const GRID_STEP_DEG: f64 = 0.001;
const EARTH_RADIUS_M: f64 = 6_371_000.0;
const ROAD_KINDS: [&str; 3] = ["residential", "secondary", "primary"];

struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.state >> 32) as u32
    }

    fn gen_range(&mut self, max: u32) -> u32 {
        if max == 0 { 0 } else { self.next_u32() % max }
    }

    /// Uniform-ish offset in `[-amplitude, amplitude]`.
    fn jitter(&mut self, amplitude: f64) -> f64 {
        let unit = f64::from(self.gen_range(2001)) / 1000.0 - 1.0;
        unit * amplitude
    }
}

#[derive(Clone, Copy)]
struct GridNode {
    osmid: i64,
    lat: f64,
    lon: f64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let db_path = env::var("ROADGRAPH_DB_PATH").unwrap_or_else(|_| "roadgraph.redb".to_string());
    let reset = env::var("SEED_RESET").ok().as_deref() == Some("true");
    if reset {
        let _ = fs::remove_file(&db_path);
    }

    let rows = env::var("SEED_ROWS")
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(100);
    let cols = env::var("SEED_COLS")
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(100);
    let batch_size = env::var("SEED_BATCH")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(1_000)
        .max(1);
    let rng_seed = env::var("SEED_RANDOM")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(42);

    let store = GraphStore::open(&db_path, PoolOptions::default())?;
    let mut rng = Lcg::new(rng_seed);
    let grid = build_grid(rows, cols, &mut rng);

    for chunk in grid.chunks(batch_size) {
        let chunk = chunk.to_vec();
        let session = store.session().await?;
        session.execute_write(move |tx| seed_nodes(tx, &chunk)).await?;
    }

    let roads = build_roads(&grid, rows, cols, &mut rng);
    for chunk in roads.chunks(batch_size) {
        let chunk = chunk.to_vec();
        let session = store.session().await?;
        session.execute_write(move |tx| seed_roads(tx, &chunk)).await?;
    }

    store.close().await;
    info!(nodes = grid.len(), roads = roads.len(), "seeded road grid");
    Ok(())
}

fn build_grid(rows: u32, cols: u32, rng: &mut Lcg) -> Vec<GridNode> {
    let mut grid = Vec::with_capacity(rows as usize * cols as usize);
    for row in 0..rows {
        for col in 0..cols {
            grid.push(GridNode {
                osmid: grid_osmid(row, col, cols),
                lat: ORIGIN_LAT + f64::from(row) * GRID_STEP_DEG + rng.jitter(GRID_STEP_DEG / 4.0),
                lon: ORIGIN_LON + f64::from(col) * GRID_STEP_DEG + rng.jitter(GRID_STEP_DEG / 4.0),
            });
        }
    }
    grid
}

// Row-major position; widened first so large grids cannot overflow `u32`.
fn grid_index(row: u32, col: u32, cols: u32) -> usize {
    row as usize * cols as usize + col as usize
}

fn grid_osmid(row: u32, col: u32, cols: u32) -> i64 {
    i64::from(row) * i64::from(cols) + i64::from(col) + 1
}

#[derive(Clone)]
struct SeedRoad {
    from: GridNode,
    to: GridNode,
    name: String,
    kind: &'static str,
}

/// Connects every node to its right and lower neighbour in both directions.
fn build_roads(grid: &[GridNode], rows: u32, cols: u32, rng: &mut Lcg) -> Vec<SeedRoad> {
    let mut roads = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            let here = grid[grid_index(row, col, cols)];
            let mut neighbours = Vec::with_capacity(2);
            if col + 1 < cols {
                neighbours.push((grid[grid_index(row, col + 1, cols)], format!("Row {row} Street")));
            }
            if row + 1 < rows {
                neighbours.push((grid[grid_index(row + 1, col, cols)], format!("Column {col} Avenue")));
            }
            for (there, name) in neighbours {
                let kind = ROAD_KINDS[rng.gen_range(ROAD_KINDS.len() as u32) as usize];
                roads.push(SeedRoad {
                    from: here,
                    to: there,
                    name: name.clone(),
                    kind,
                });
                roads.push(SeedRoad {
                    from: there,
                    to: here,
                    name,
                    kind,
                });
            }
        }
    }
    roads
}

fn seed_nodes(tx: &mut WriteTx, nodes: &[GridNode]) -> Result<(), StoreError> {
    for node in nodes {
        tx.merge_node(
            &SchemaProfile::Osm.node(node.osmid),
            &[
                Assignment::set(osm::LAT, node.lat),
                Assignment::set(osm::LON, node.lon),
            ],
        )?;
    }
    Ok(())
}

fn seed_roads(tx: &mut WriteTx, roads: &[SeedRoad]) -> Result<(), StoreError> {
    for road in roads {
        tx.merge_edge(
            &SchemaProfile::Osm.road(road.from.osmid, road.to.osmid),
            &[
                Assignment::set(osm::DISTANCE_METERS, haversine_meters(&road.from, &road.to)),
                Assignment::set(osm::ROAD_NAME, road.name.as_str()),
                Assignment::set(osm::ROAD_KIND, road.kind),
                Assignment::set(osm::ONEWAY, false),
                Assignment::set(osm::FROM, road.from.osmid),
                Assignment::set(osm::TO, road.to.osmid),
            ],
        )?;
    }
    Ok(())
}

fn haversine_meters(from: &GridNode, to: &GridNode) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let dlat = (to.lat - from.lat).to_radians();
    let dlon = (to.lon - from.lon).to_radians();
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_positions_do_not_wrap_for_large_grids() {
        let cols = 100_000;
        assert_eq!(grid_osmid(99_999, 99_999, cols), 10_000_000_000);
        assert_eq!(grid_index(70_000, 5, cols), 7_000_000_005);
    }

    #[test]
    fn small_grid_links_neighbours_both_ways() {
        let mut rng = Lcg::new(7);
        let grid = build_grid(2, 3, &mut rng);
        assert_eq!(grid.len(), 6);
        assert_eq!(grid[5].osmid, 6);

        let roads = build_roads(&grid, 2, 3, &mut rng);
        // 2 rows x 2 horizontal links + 3 vertical links, each in both directions.
        assert_eq!(roads.len(), 14);
        assert!(roads.iter().all(|road| haversine_meters(&road.from, &road.to) > 0.0));
    }
}
