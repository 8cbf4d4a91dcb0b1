mod common;

use common::{request_json, start_server};
use serde_json::{Value, json};

fn create_node(base: &str, osmid: i64) {
    let (status, _) = request_json(
        "POST",
        &format!("{}/nodes", base),
        Some(&json!({ "osmid": osmid, "lat": 50.0 + osmid as f64 / 1000.0, "lon": 8.0 })),
    );
    assert_eq!(status, 200, "node {} not created", osmid);
}

fn get_road(base: &str, from: i64, to: i64) -> (u16, Value) {
    request_json("GET", &format!("{}/roads?from={}&to={}", base, from, to), None)
}

#[test]
fn road_between_missing_nodes_is_not_created() {
    let server = start_server("road_missing_nodes", "osm");
    let base = &server.base;

    let (status, body) = request_json(
        "POST",
        &format!("{}/roads", base),
        Some(&json!({ "from": 1, "to": 2, "m": 100.0 })),
    );
    assert_eq!(status, 404);
    assert_eq!(body["detail"], json!("Road relation was not created"));

    let (status, _) = get_road(base, 1, 2);
    assert_eq!(status, 404);

    create_node(base, 1);
    let (status, _) = request_json(
        "POST",
        &format!("{}/roads", base),
        Some(&json!({ "from": 1, "to": 2, "m": 100.0 })),
    );
    assert_eq!(status, 404);
}

#[test]
fn created_road_reads_back_and_merges_on_repeat() {
    let server = start_server("road_create", "osm");
    let base = &server.base;
    create_node(base, 1);
    create_node(base, 2);

    let (status, body) = request_json(
        "POST",
        &format!("{}/roads", base),
        Some(&json!({ "from": 1, "to": 2, "m": 120.5, "name": "Main Street", "type": "primary" })),
    );
    assert_eq!(status, 200);
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["created"], json!(1));
    assert_eq!(body["properties_set"], json!(6));

    let (status, body) = get_road(base, 1, 2);
    assert_eq!(status, 200);
    assert_eq!(body["FROM"].as_i64(), Some(1));
    assert_eq!(body["TO"].as_i64(), Some(2));
    assert_eq!(body["DISTANCE_METERS"].as_f64(), Some(120.5));
    assert_eq!(body["ROAD_NAME"], json!("Main Street"));
    assert_eq!(body["ROAD_TYPE"], json!("primary"));
    assert_eq!(body["ONEWAY"], json!(false));

    let (status, body) = request_json(
        "POST",
        &format!("{}/roads", base),
        Some(&json!({ "from": 1, "to": 2, "m": 130.0 })),
    );
    assert_eq!(status, 200);
    assert_eq!(body["created"], json!(0));
    assert_eq!(body["properties_set"], json!(1));

    let (_, body) = get_road(base, 1, 2);
    assert_eq!(body["DISTANCE_METERS"].as_f64(), Some(130.0));
    assert_eq!(body["ROAD_NAME"], json!("Main Street"));
    assert_eq!(body["ROAD_TYPE"], json!("primary"));

    let (status, _) = get_road(base, 2, 1);
    assert_eq!(status, 404);
}

#[test]
fn road_without_optional_attributes_reports_nulls() {
    let server = start_server("road_nulls", "osm");
    let base = &server.base;
    create_node(base, 10);
    create_node(base, 11);

    let (status, _) = request_json(
        "POST",
        &format!("{}/roads", base),
        Some(&json!({ "from": 10, "to": 11, "m": 5.0, "oneway": null })),
    );
    assert_eq!(status, 200);

    let (_, body) = get_road(base, 10, 11);
    assert_eq!(body["ROAD_NAME"], Value::Null);
    assert_eq!(body["ROAD_TYPE"], Value::Null);
    assert_eq!(body["ONEWAY"], Value::Null);
}

#[test]
fn patch_coalesces_road_attributes() {
    let server = start_server("road_patch", "osm");
    let base = &server.base;
    create_node(base, 1);
    create_node(base, 2);
    request_json(
        "POST",
        &format!("{}/roads", base),
        Some(&json!({ "from": 1, "to": 2, "m": 80.0, "name": "Ring" })),
    );

    let (status, body) = request_json(
        "PATCH",
        &format!("{}/roads", base),
        Some(&json!({ "from": 1, "to": 2, "oneway": true, "road_type": "tertiary" })),
    );
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "ok": true }));

    let (_, body) = get_road(base, 1, 2);
    assert_eq!(body["DISTANCE_METERS"].as_f64(), Some(80.0));
    assert_eq!(body["ROAD_NAME"], json!("Ring"));
    assert_eq!(body["ROAD_TYPE"], json!("tertiary"));
    assert_eq!(body["ONEWAY"], json!(true));

    let (status, _) = request_json(
        "PATCH",
        &format!("{}/roads", base),
        Some(&json!({ "from": 1, "to": 2, "distance": 85.0, "name": null })),
    );
    assert_eq!(status, 200);

    let (_, body) = get_road(base, 1, 2);
    assert_eq!(body["DISTANCE_METERS"].as_f64(), Some(85.0));
    assert_eq!(body["ROAD_NAME"], json!("Ring"));
}

#[test]
fn patch_lists_missing_endpoints() {
    let server = start_server("road_patch_missing", "osm");
    let base = &server.base;

    let (status, body) = request_json(
        "PATCH",
        &format!("{}/roads", base),
        Some(&json!({ "from": 1, "m": 3.0 })),
    );
    assert_eq!(status, 400);
    assert_eq!(body["missing"], json!(["to"]));
    assert_eq!(body["detail"], json!(r#"Missing fields: ["to"]"#));

    let (status, body) = request_json(
        "PATCH",
        &format!("{}/roads", base),
        Some(&json!({ "name": "Nowhere" })),
    );
    assert_eq!(status, 400);
    assert_eq!(body["missing"], json!(["from", "to"]));
}

#[test]
fn deleting_a_node_detaches_its_roads() {
    let server = start_server("road_detach", "osm");
    let base = &server.base;
    create_node(base, 1);
    create_node(base, 2);
    create_node(base, 3);
    for (from, to) in [(1, 2), (3, 1), (2, 3)] {
        let (status, _) = request_json(
            "POST",
            &format!("{}/roads", base),
            Some(&json!({ "from": from, "to": to, "m": 10.0 })),
        );
        assert_eq!(status, 200);
    }

    let (status, _) = request_json("DELETE", &format!("{}/nodes?osmid=1", base), None);
    assert_eq!(status, 200);

    assert_eq!(get_road(base, 1, 2).0, 404);
    assert_eq!(get_road(base, 3, 1).0, 404);
    assert_eq!(get_road(base, 2, 3).0, 200);

    create_node(base, 1);
    assert_eq!(get_road(base, 1, 2).0, 404);
}

#[test]
fn deleting_a_road_keeps_its_endpoints() {
    let server = start_server("road_delete", "osm");
    let base = &server.base;
    create_node(base, 1);
    create_node(base, 2);
    request_json(
        "POST",
        &format!("{}/roads", base),
        Some(&json!({ "from": 1, "to": 2, "m": 10.0 })),
    );

    let (status, body) = request_json("DELETE", &format!("{}/roads?from=1&to=2", base), None);
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "ok": true }));
    assert_eq!(get_road(base, 1, 2).0, 404);

    let (status, _) = request_json("GET", &format!("{}/nodes?osmid=1", base), None);
    assert_eq!(status, 200);
    let (status, _) = request_json("GET", &format!("{}/nodes?osmid=2", base), None);
    assert_eq!(status, 200);

    let (status, body) = request_json("DELETE", &format!("{}/roads?from=1&to=2", base), None);
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "ok": true }));
}
