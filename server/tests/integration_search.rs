use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use engine::{EngineConfig, SearchEngine};
use http_body_util::BodyExt;
use serde_json::Value;
use server::{build_app, AppState};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

fn write_corpus(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("猪肝菜谱.txt"), "猪肝制作方法：猪肝先用清水浸泡去除血水，然后切片焯水，最后大火快炒。").unwrap();
    fs::write(dir.join("汤圆做法.txt"), "汤圆做法：糯米粉加温水揉成面团，包入芝麻馅，下锅煮至汤圆浮起即可。").unwrap();
    fs::write(dir.join("安全标准.txt"), "食品安全标准：所有原料必须可追溯，厨房每日消毒，员工持健康证上岗。").unwrap();
}

fn app(scratch: &TempDir) -> Router {
    let config = EngineConfig { index_dir: scratch.path().join("index"), ..Default::default() };
    let engine = Arc::new(SearchEngine::open(config).unwrap());
    build_app(AppState { engine, docs_root: scratch.path().join("docs") })
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri).header("content-type", "application/json").body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn not_ready_until_rebuilt() {
    let scratch = tempdir().unwrap();
    write_corpus(&scratch.path().join("docs"));
    let app = app(&scratch);

    let (status, health) = call(app.clone(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["ready"], false);

    let (status, body) = call(app.clone(), get("/search?query=%E7%8C%AA%E8%82%9D")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].is_string());

    let (status, summary) = call(app.clone(), Request::post("/index/rebuild").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["success"], true);
    assert_eq!(summary["documents_count"], 3);

    let (_, health) = call(app, get("/health")).await;
    assert_eq!(health["ready"], true);
    assert!(health["last_indexed"].is_string());
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let scratch = tempdir().unwrap();
    write_corpus(&scratch.path().join("docs"));
    let app = app(&scratch);
    call(app.clone(), Request::post("/index/rebuild").body(Body::empty()).unwrap()).await;

    let (status, json) = call(app.clone(), get("/search?query=%E7%8C%AA%E8%82%9D&limit=2")).await;
    assert_eq!(status, StatusCode::OK);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["title"], "猪肝菜谱.txt");
    assert!(arr[0]["snippet"].as_str().unwrap().contains("猪肝"));
    assert!(json["took_s"].is_number());

    let (status, json) = call(
        app,
        post_json("/search", serde_json::json!({ "query": "汤圆", "include_snippets": false, "analyze_query": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["results"][0]["title"], "汤圆做法.txt");
    assert!(json["results"][0].get("snippet").map_or(true, Value::is_null));
    assert!(json["query_analysis"]["processed_terms"].is_array());
}

#[tokio::test]
async fn bad_requests_map_to_client_errors() {
    let scratch = tempdir().unwrap();
    write_corpus(&scratch.path().join("docs"));
    let app = app(&scratch);
    call(app.clone(), Request::post("/index/rebuild").body(Body::empty()).unwrap()).await;

    let (status, _) = call(app.clone(), get("/search?query=")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(app.clone(), get("/search?query=%E7%8C%AA%E8%82%9D&limit=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(app, get("/doc/42")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failed_rebuild_reports_unprocessable() {
    let scratch = tempdir().unwrap();
    fs::create_dir_all(scratch.path().join("docs")).unwrap();
    let app = app(&scratch);

    let (status, body) = call(app.clone(), Request::post("/index/rebuild").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);

    let (_, health) = call(app, get("/health")).await;
    assert_eq!(health["ready"], false);
}

#[tokio::test]
async fn document_and_statistics_endpoints() {
    let scratch = tempdir().unwrap();
    write_corpus(&scratch.path().join("docs"));
    let app = app(&scratch);
    call(app.clone(), Request::post("/index/rebuild").body(Body::empty()).unwrap()).await;

    let (status, stats) = call(app.clone(), get("/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["document_count"], 3);
    assert!(stats["vocabulary_size"].as_u64().unwrap() > 0);

    let (status, doc) = call(app.clone(), get("/doc/0?content=true")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["content"].is_string());
    assert!(doc["top_terms"].is_array());

    let (status, similar) = call(app.clone(), get("/similar/0?limit=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(similar.as_array().unwrap().len() <= 1);

    let (status, term) = call(app, get("/term/%E6%B1%A4%E5%9C%86")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(term["document_frequency"], 1);
}
