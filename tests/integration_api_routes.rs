use std::path::Path;
use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt;

use pathmind::api::{create_router, AppState};
use pathmind::models::ForestParams;
use pathmind::services::{ArtifactStore, LifecycleConfig, ModelLifecycleManager, ServiceConfig};

const PATH_GRAPH: &str = "# two components\n1 2 1.0\n2 3 1.0\n3 4 1.0\n5 6 2.0\n";

fn write_graph(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path.to_string_lossy().to_string()
}

fn test_app() -> (Router, TempDir) {
    let temp = TempDir::new().unwrap();
    let default_graph = write_graph(temp.path(), "default.edgelist", PATH_GRAPH);

    let config = ServiceConfig::new()
        .with_artifact_dir(temp.path().join("artifacts"))
        .with_default_graph(default_graph);
    let lifecycle = ModelLifecycleManager::new(
        LifecycleConfig::new().with_forest(ForestParams::new().with_estimators(6).with_seed(11)),
        ArtifactStore::new(&config.artifact_dir),
    );

    let app = create_router(Arc::new(AppState::new(config, lifecycle)));
    (app, temp)
}

async fn send(app: &Router, method: &str, uri: &str, body: String) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();

    let resp = app.clone().oneshot(req).await.expect("router oneshot failed");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, body.to_string()).await
}

#[tokio::test]
async fn test_health() {
    let (app, _temp) = test_app();
    let (status, body) = send(&app, "GET", "/health", String::new()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "pathmind");
    assert_eq!(body["components"]["base_model"], false);
}

#[tokio::test]
async fn test_shortest_path_on_default_graph() {
    let (app, _temp) = test_app();
    let (status, body) = post(&app, "/v1/shortest-path", json!({"source": "1", "target": "4"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["length"], 3.0);
    assert_eq!(body["path"], json!(["1", "2", "3", "4"]));
    assert_eq!(body["algorithm"], "Dijkstra");
}

#[tokio::test]
async fn test_unreachable_length_is_null() {
    let (app, _temp) = test_app();
    let (status, body) = post(&app, "/v1/shortest-path", json!({"source": "1", "target": "6"})).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["length"].is_null());
    assert_eq!(body["path"], json!([]));
}

#[tokio::test]
async fn test_wrong_types_are_validation_errors() {
    let (app, _temp) = test_app();

    let (status, body) = post(&app, "/v1/predict", json!({"source": 1, "target": "10"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = send(&app, "POST", "/v1/shortest-path", "{not json".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_missing_and_empty_graphs_are_bad_requests() {
    let (app, temp) = test_app();

    let missing = temp.path().join("nope.edgelist").to_string_lossy().to_string();
    let (status, body) = post(
        &app,
        "/v1/shortest-path",
        json!({"source": "1", "target": "2", "graph_file": missing}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let empty = write_graph(temp.path(), "empty.edgelist", "# nothing here\n");
    let (status, body) = post(
        &app,
        "/v1/predict",
        json!({"source": "1", "target": "2", "graph_file": empty}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn test_models_must_exist() {
    let (app, temp) = test_app();

    let (status, body) = post(&app, "/v1/predict", json!({"source": "1", "target": "4"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let graph = write_graph(temp.path(), "other.edgelist", PATH_GRAPH);
    let (status, body) = post(
        &app,
        "/v1/evaluate",
        json!({"source": "1", "target": "4", "graph_file": graph}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("adapt/train first"));
}

#[tokio::test]
async fn test_negative_cycle_is_unprocessable() {
    let (app, temp) = test_app();
    let graph = write_graph(temp.path(), "negative.edgelist", "a b 1.0\nb c -2.0\n");

    let (status, body) = post(
        &app,
        "/v1/shortest-path",
        json!({"source": "a", "target": "c", "graph_file": graph}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "UNPROCESSABLE");
}

#[tokio::test]
async fn test_shortest_path_on_graphml_file() {
    let (app, temp) = test_app();
    let graph = write_graph(
        temp.path(),
        "road.graphml",
        r#"<graphml xmlns="http://graphml.graphdrawing.org/xmlns">
  <key id="w" for="edge" attr.name="weight" attr.type="double"/>
  <graph edgedefault="directed">
    <node id="a"/><node id="b"/><node id="c"/>
    <edge source="a" target="b"><data key="w">2.0</data></edge>
    <edge source="b" target="c"><data key="w">1.5</data></edge>
    <edge source="a" target="c"><data key="w">9.0</data></edge>
  </graph>
</graphml>"#,
    );

    let (status, body) = post(
        &app,
        "/v1/shortest-path",
        json!({"source": "a", "target": "c", "graph_file": graph}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["length"], 3.5);
    assert_eq!(body["path"], json!(["a", "b", "c"]));

    let (status, body) = post(
        &app,
        "/v1/shortest-path",
        json!({"source": "c", "target": "a", "graph_file": graph}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["length"].is_null());
}

#[tokio::test]
async fn test_compare_reports_all_algorithms() {
    let (app, _temp) = test_app();
    let (status, body) = post(&app, "/v1/compare", json!({"source": "1", "target": "3"})).await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["algorithm"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Dijkstra", "Bellman-Ford", "Floyd-Warshall"]);
    assert_eq!(body["lengths_agree"], true);
}

#[tokio::test]
async fn test_train_predict_adapt_evaluate() {
    let (app, temp) = test_app();

    let (status, body) = post(&app, "/v1/train", json!({})).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["artifact"], "base");
    assert_eq!(body["capacity"], 6);

    let (status, body) = post(&app, "/v1/predict", json!({"source": "1", "target": "4"})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["predicted_length"].as_f64().unwrap().is_finite());

    let (status, body) = post(&app, "/v1/predict", json!({"source": "2", "target": "2"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["predicted_length"], 0.0);

    let (status, _) = post(&app, "/v1/predict", json!({"source": "1", "target": "ghost"})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let graph = write_graph(temp.path(), "new.edgelist", "a b 3.0\nb c 3.0\nc d 3.0\n");
    let (status, body) = post(&app, "/v1/adapt", json!({"graph_file": graph})).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "adapted");
    assert_eq!(body["examples"], 12);

    let (status, body) = post(
        &app,
        "/v1/evaluate",
        json!({"source": "a", "target": "d", "graph_file": graph}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["actual"], 9.0);
    assert!(body["accuracy"].is_number());

    let (_, body) = send(&app, "GET", "/health", String::new()).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["components"]["adapted_model"], true);
}

#[tokio::test]
async fn test_adapt_on_edgeless_graph_fails() {
    let (app, temp) = test_app();
    post(&app, "/v1/train", json!({})).await;

    let graph = write_graph(temp.path(), "isolated.edgelist", "x x\n");
    let (status, body) = post(&app, "/v1/adapt", json!({"graph_file": graph})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("Insufficient training data"));
}

#[tokio::test]
async fn test_compress_and_search() {
    let (app, _temp) = test_app();
    post(&app, "/v1/train", json!({})).await;

    let (status, body) = post(&app, "/v1/compress", json!({"tolerance": 1.0e6})).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["compressed"], true);
    assert_eq!(body["original_capacity"], 6);
    assert_eq!(body["capacity"], 3);

    let (status, body) = post(&app, "/v1/compress", json!({"tolerance": -1.0})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = post(
        &app,
        "/v1/search",
        json!({
            "iterations": 2,
            "space": {
                "n_estimators": [2, 3],
                "max_depth": [2, 3],
                "min_samples_split": [2, 3],
                "min_samples_leaf": [1, 1]
            }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["candidates"], 2);
}
