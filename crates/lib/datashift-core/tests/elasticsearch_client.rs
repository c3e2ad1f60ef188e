use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::{get, post};
use axum::{Json, Router};
use datashift_core::control::{ExportRequest, SearchControlPlane};
use datashift_core::store::{ElasticsearchClient, ElasticsearchConfig, SearchBackend, StoreError};
use serde_json::{Value, json};

const AUTHORIZATION: &str = "Basic ZWxhc3RpYzpjaGFuZ2VtZQ==";

#[derive(Clone, Default)]
struct FakeCluster {
    requests: Arc<Mutex<Vec<String>>>,
    bodies: Arc<Mutex<Vec<Value>>>,
}

impl FakeCluster {
    fn record(&self, request: String) {
        self.requests
            .lock()
            .expect("request log poisoned")
            .push(request);
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("request log poisoned").clone()
    }

    fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().expect("body log poisoned").clone()
    }
}

fn hits(scroll_id: &str, ids: &[&str]) -> Value {
    let hits: Vec<Value> = ids
        .iter()
        .map(|id| json!({ "_id": id, "_source": { "id": id } }))
        .collect();
    json!({
        "_scroll_id": scroll_id,
        "took": 2,
        "hits": { "total": { "value": 3, "relation": "eq" }, "hits": hits }
    })
}

fn index_missing(index: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": { "type": "index_not_found_exception", "reason": format!("no such index [{index}]") },
            "status": 404
        })),
    )
}

async fn search(
    State(cluster): State<FakeCluster>,
    Path(index): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    cluster.record(format!("search {index} scroll={:?}", params.get("scroll")));
    cluster.bodies.lock().expect("body log poisoned").push(body);
    if index == "missing" {
        return index_missing(&index);
    }
    (StatusCode::OK, Json(hits("scroll-1", &["P-1", "P-2"])))
}

async fn scroll(State(cluster): State<FakeCluster>, Json(body): Json<Value>) -> Json<Value> {
    let scroll_id = body["scroll_id"].as_str().unwrap_or_default().to_string();
    cluster.record(format!("scroll {scroll_id} {}", body["scroll"]));
    match scroll_id.as_str() {
        "scroll-1" => Json(hits("scroll-2", &["P-3"])),
        _ => Json(hits("scroll-2", &[])),
    }
}

async fn clear_scroll(State(cluster): State<FakeCluster>, Json(body): Json<Value>) -> Json<Value> {
    cluster.record(format!("clear {}", body["scroll_id"]));
    Json(json!({ "succeeded": true, "num_freed": 1 }))
}

async fn get_doc(
    State(cluster): State<FakeCluster>,
    Path((index, id)): Path<(String, String)>,
) -> (StatusCode, Json<Value>) {
    cluster.record(format!("get {index}/{id}"));
    if index == "missing" {
        return index_missing(&index);
    }
    if id == "absent" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "_index": index, "_id": id, "found": false })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({ "_index": index, "_id": id, "found": true, "_source": { "id": id } })),
    )
}

async fn aliases(Path(pattern): Path<String>) -> Json<Value> {
    Json(json!({ pattern: { "aliases": { "catalog": {} } } }))
}

async fn bulk(State(cluster): State<FakeCluster>, headers: HeaderMap, body: String) -> Json<Value> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    cluster.record(format!("bulk {content_type} lines={}", body.lines().count()));
    for line in body.lines() {
        let value = serde_json::from_str(line).expect("bulk line should be json");
        cluster.bodies.lock().expect("body log poisoned").push(value);
    }
    Json(json!({
        "errors": false,
        "items": [{ "index": { "_id": "P-1", "status": 201 } }]
    }))
}

async fn health(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some(AUTHORIZATION);
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": { "type": "security_exception", "reason": "missing authentication credentials" } })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({ "cluster_name": "docker-cluster", "status": "green", "number_of_nodes": 1 })),
    )
}

async fn index_head(Path(index): Path<String>) -> StatusCode {
    if index == "products" {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn spawn_cluster(cluster: FakeCluster) -> SocketAddr {
    let app = Router::new()
        .route("/", get(|| async { StatusCode::OK }))
        .route("/_search/scroll", post(scroll).delete(clear_scroll))
        .route("/_bulk", post(bulk))
        .route("/_cluster/health", get(health))
        .route("/:index", get(index_head))
        .route("/:index/_search", post(search))
        .route("/:index/_doc/:id", get(get_doc))
        .route("/:index/_alias", get(aliases))
        .with_state(cluster);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind fake cluster");
    let addr = listener.local_addr().expect("listener has an address");
    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("fake cluster stopped");
    });
    addr
}

async fn client_for(cluster: &FakeCluster) -> ElasticsearchClient {
    let addr = spawn_cluster(cluster.clone()).await;
    ElasticsearchClient::new(&ElasticsearchConfig::new(format!("http://{addr}/")))
        .expect("client should build")
}

#[tokio::test]
async fn ping_reaches_cluster_root() {
    let cluster = FakeCluster::default();
    let client = client_for(&cluster).await;
    assert!(client.ping().await);
}

#[tokio::test]
async fn bulk_export_walks_scroll_over_http() {
    let cluster = FakeCluster::default();
    let client = client_for(&cluster).await;
    let control = SearchControlPlane::new(Arc::new(client));

    let export = control
        .bulk_export(ExportRequest {
            index: "products".to_string(),
            query: None,
            batch_size: Some(2),
        })
        .await
        .expect("export should succeed");

    assert_eq!(export.total, 3);
    assert_eq!(export.exported, 3);
    assert_eq!(
        cluster.requests(),
        vec![
            "search products scroll=Some(\"2m\")".to_string(),
            "scroll scroll-1 \"2m\"".to_string(),
            "scroll scroll-2 \"2m\"".to_string(),
            "clear [\"scroll-2\"]".to_string(),
        ]
    );
    assert_eq!(
        cluster.bodies()[0],
        json!({ "query": { "match_all": {} }, "size": 2 })
    );
}

#[tokio::test]
async fn get_document_distinguishes_missing_document_from_missing_index() {
    let cluster = FakeCluster::default();
    let client = client_for(&cluster).await;

    let err = client
        .get_document("products", "absent")
        .await
        .expect_err("document should be missing");
    assert!(matches!(err, StoreError::NotFound(_)));

    let err = client
        .get_document("missing", "P-1")
        .await
        .expect_err("index should be missing");
    match err {
        StoreError::Status { status, reason } => {
            assert_eq!(status, 404);
            assert_eq!(reason, "index_not_found_exception: no such index [missing]");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn get_document_encodes_id() {
    let cluster = FakeCluster::default();
    let client = client_for(&cluster).await;

    let document = client
        .get_document("products", "P 1/a")
        .await
        .expect("document should be found");
    assert_eq!(document["_source"], json!({ "id": "P 1/a" }));
    assert_eq!(cluster.requests(), vec!["get products/P 1/a".to_string()]);
}

#[tokio::test]
async fn search_errors_carry_engine_reason() {
    let cluster = FakeCluster::default();
    let client = client_for(&cluster).await;

    let err = client
        .search("missing", json!({ "query": { "match_all": {} } }), None)
        .await
        .expect_err("search should fail");
    assert_eq!(
        err.to_string(),
        "Elasticsearch returned 404: index_not_found_exception: no such index [missing]"
    );
}

#[tokio::test]
async fn aliases_are_fetched_per_pattern() {
    let cluster = FakeCluster::default();
    let client = client_for(&cluster).await;

    let aliases = client.get_aliases("products").await.expect("aliases");
    assert_eq!(aliases, json!({ "products": { "aliases": { "catalog": {} } } }));
}

#[tokio::test]
async fn bulk_sends_newline_delimited_json() {
    let cluster = FakeCluster::default();
    let client = client_for(&cluster).await;

    let response = client
        .bulk(vec![
            json!({ "index": { "_index": "products", "_id": "P-1" } }),
            json!({ "id": "P-1", "name": "Lamp" }),
        ])
        .await
        .expect("bulk should succeed");

    assert_eq!(response["errors"], json!(false));
    assert_eq!(
        cluster.requests(),
        vec!["bulk application/x-ndjson lines=2".to_string()]
    );
    assert_eq!(cluster.bodies()[1], json!({ "id": "P-1", "name": "Lamp" }));
}

#[tokio::test]
async fn basic_auth_is_sent_when_configured() {
    let cluster = FakeCluster::default();
    let addr = spawn_cluster(cluster).await;

    let anonymous = ElasticsearchClient::new(&ElasticsearchConfig::new(format!("http://{addr}")))
        .expect("client should build");
    let err = anonymous.cluster_health().await.expect_err("auth required");
    assert!(matches!(err, StoreError::Status { status: 401, .. }));

    let config = ElasticsearchConfig::new(format!("http://{addr}"))
        .with_basic_auth("elastic", Some("changeme".to_string()));
    let client = ElasticsearchClient::new(&config).expect("client should build");
    let health = client.cluster_health().await.expect("health");
    assert_eq!(health["status"], json!("green"));
}

#[tokio::test]
async fn index_exists_maps_not_found_to_false() {
    let cluster = FakeCluster::default();
    let client = client_for(&cluster).await;

    assert!(client.index_exists("products").await.expect("head products"));
    assert!(!client.index_exists("orders").await.expect("head orders"));
}
