//! End-to-end cache behaviour through the HTTP router.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{
        Method, Request, StatusCode,
        header::{CONTENT_TYPE, HOST},
    },
    response::Response,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use shareabouts::{
    application::{activity::ActivityService, resources::ResourceService},
    cache::{CacheConfig, CachingDispatcher, Family, FamilyTable, ResponseCache},
    infra::{
        db::MemoryRepositories,
        http::{ApiState, build_router},
    },
};
use tower::ServiceExt;

fn app_with(config: CacheConfig) -> (Router, Arc<CachingDispatcher>) {
    let repos = Arc::new(MemoryRepositories::new());
    let state = ApiState {
        resources: Arc::new(ResourceService::new(
            repos.clone(),
            repos.clone(),
            repos.clone(),
            repos.clone(),
        )),
        activity: Arc::new(ActivityService::new(repos)),
    };
    let dispatcher = Arc::new(CachingDispatcher::new(
        ResponseCache::in_memory(&config),
        config,
        FamilyTable::shareabouts(),
    ));
    (build_router(state, dispatcher.clone(), None), dispatcher)
}

fn app() -> (Router, Arc<CachingDispatcher>) {
    app_with(CacheConfig::default())
}

fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(HOST, "api.example");
    match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request should build"),
        None => builder.body(Body::empty()).expect("request should build"),
    }
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone()
        .oneshot(request)
        .await
        .expect("router should respond")
}

async fn json_body(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be json")
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = send(app, request(Method::GET, uri, None)).await;
    let status = response.status();
    (status, json_body(response).await)
}

async fn create(app: &Router, uri: &str, body: Value) -> Value {
    let response = send(app, request(Method::POST, uri, Some(body))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await
}

#[tokio::test]
async fn read_after_write_never_sees_stale_collection() {
    let (app, dispatcher) = app();

    let (status, places) = get_json(&app, "/places/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(places, json!([]));
    assert_eq!(
        dispatcher
            .cache()
            .keys_for_family(Family::PlaceCollection)
            .len(),
        1
    );

    create(&app, "/places/", json!({"name": "Bench"})).await;
    assert!(
        dispatcher
            .cache()
            .keys_for_family(Family::PlaceCollection)
            .is_empty()
    );

    let (_, places) = get_json(&app, "/places/").await;
    let places = places.as_array().expect("array");
    assert_eq!(places.len(), 1);
    assert_eq!(places[0]["name"], "Bench");
}

#[tokio::test]
async fn repeated_reads_are_byte_identical_and_cached_once() {
    let (app, dispatcher) = app();
    create(&app, "/places/", json!({"name": "Bench"})).await;

    let first = send(&app, request(Method::GET, "/places/", None)).await;
    let first_headers = first.headers().clone();
    let first_body = first.into_body().collect().await.expect("body").to_bytes();
    let second = send(&app, request(Method::GET, "/places/", None)).await;
    assert_eq!(second.headers()[CONTENT_TYPE], first_headers[CONTENT_TYPE]);
    let second_body = second.into_body().collect().await.expect("body").to_bytes();

    assert_eq!(first_body, second_body);
    assert_eq!(dispatcher.cache().len(), 1);
}

#[tokio::test]
async fn absolutized_urls_follow_the_request_host() {
    let (app, _) = app();
    create(&app, "/places/", json!({"name": "Bench"})).await;

    let for_host = |host: &'static str| {
        Request::builder()
            .method(Method::GET)
            .uri("/places/")
            .header(HOST, host)
            .body(Body::empty())
            .expect("request should build")
    };

    let a = json_body(send(&app, for_host("a.example")).await).await;
    let b = json_body(send(&app, for_host("b.example:8080")).await).await;

    assert_eq!(a[0]["url"], "http://a.example/places/1/");
    assert_eq!(b[0]["url"], "http://b.example:8080/places/1/");
}

#[tokio::test]
async fn dataset_places_and_scoped_activity() {
    let (app, _) = app();

    let dataset = create(
        &app,
        "/datasets/",
        json!({"owner": "alice", "display_name": "Street Trees"}),
    )
    .await;
    assert_eq!(dataset["slug"], "street-trees");
    assert_eq!(dataset["url"], "http://api.example/datasets/alice/street-trees/");
    assert_eq!(
        dataset["places"]["url"],
        "http://api.example/datasets/alice/street-trees/places/"
    );

    let place = create(
        &app,
        "/datasets/alice/street-trees/places/",
        json!({"species": "oak"}),
    )
    .await;
    assert_eq!(
        place["dataset"]["url"],
        "http://api.example/datasets/alice/street-trees/"
    );
    create(&app, "/places/", json!({"species": "elm"})).await;

    let (_, scoped) = get_json(&app, "/datasets/alice/street-trees/places/").await;
    assert_eq!(scoped.as_array().expect("array").len(), 1);
    let (_, all) = get_json(&app, "/places/").await;
    assert_eq!(all.as_array().expect("array").len(), 2);

    let (_, activity) = get_json(&app, "/datasets/alice/street-trees/activity/").await;
    let activity = activity.as_array().expect("array");
    assert_eq!(activity.len(), 1);
    assert_eq!(activity[0]["data"]["species"], "oak");
}

#[tokio::test]
async fn dataset_errors_use_api_error_codes() {
    let (app, _) = app();
    let body = json!({"owner": "alice", "short_name": "trees"});
    create(&app, "/datasets/", body.clone()).await;

    let duplicate = send(&app, request(Method::POST, "/datasets/", Some(body))).await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(duplicate).await["error"]["code"], "duplicate");

    let invalid = send(&app, request(Method::POST, "/places/", Some(json!([1, 2])))).await;
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(invalid).await["error"]["code"], "invalid_input");

    let (status, missing) = get_json(&app, "/datasets/alice/nothing/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing["error"]["code"], "not_found");
}

#[tokio::test]
async fn dataset_id_alias_reads_and_writes_the_same_dataset() {
    let (app, _) = app();
    let body = json!({"owner": "alice", "short_name": "trees"});
    let dataset = create(&app, "/datasets/", body).await;
    let by_id = format!("/datasets/{}/", dataset["id"]);

    let (status, fetched) = get_json(&app, &by_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["url"], "http://api.example/datasets/alice/trees/");

    let (_, listed) = get_json(&app, "/datasets/").await;
    assert_eq!(listed[0].get("title"), None);

    let patched = send(
        &app,
        request(Method::PATCH, &by_id, Some(json!({"title": "Street trees"}))),
    )
    .await;
    assert_eq!(patched.status(), StatusCode::OK);
    let (_, listed) = get_json(&app, "/datasets/").await;
    assert_eq!(listed[0]["title"], "Street trees");

    let deleted = send(&app, request(Method::DELETE, &by_id, None)).await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    let (status, missing) = get_json(&app, &by_id).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing["error"]["code"], "not_found");

    let (status, _) = get_json(&app, "/datasets/alice/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dataset_delete_drops_cached_places() {
    let (app, _) = app();
    create(&app, "/datasets/", json!({"owner": "alice", "short_name": "trees"})).await;
    create(&app, "/datasets/alice/trees/places/", json!({"species": "oak"})).await;

    let (_, before) = get_json(&app, "/places/").await;
    assert_eq!(before.as_array().expect("array").len(), 1);

    let deleted = send(&app, request(Method::DELETE, "/datasets/alice/trees/", None)).await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let (_, after) = get_json(&app, "/places/").await;
    assert_eq!(after, json!([]));
    let (_, datasets) = get_json(&app, "/datasets/").await;
    assert_eq!(datasets, json!([]));
}

#[tokio::test]
async fn submission_updates_invalidate_submission_lists() {
    let (app, _) = app();
    create(&app, "/places/", json!({"name": "Bench"})).await;
    let comment = create(&app, "/places/1/comments/", json!({"text": "nice"})).await;
    assert_eq!(comment["url"], "http://api.example/places/1/comments/1/");
    assert_eq!(comment["type"], "comments");

    let (_, listed) = get_json(&app, "/places/1/comments/").await;
    assert_eq!(listed[0]["text"], "nice");

    let patched = send(
        &app,
        request(
            Method::PATCH,
            "/places/1/comments/1/",
            Some(json!({"text": "lovely"})),
        ),
    )
    .await;
    assert_eq!(patched.status(), StatusCode::OK);

    let (_, listed) = get_json(&app, "/places/1/comments/").await;
    assert_eq!(listed[0]["text"], "lovely");

    let (status, _) = get_json(&app, "/places/1/votes/1/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn place_replace_and_delete() {
    let (app, _) = app();
    create(&app, "/places/", json!({"name": "Bench", "kind": "seat"})).await;

    let replaced = send(
        &app,
        request(Method::PUT, "/places/1/", Some(json!({"name": "Stool"}))),
    )
    .await;
    assert_eq!(replaced.status(), StatusCode::OK);
    let replaced = json_body(replaced).await;
    assert_eq!(replaced["name"], "Stool");
    assert!(replaced.get("kind").is_none());

    let deleted = send(&app, request(Method::DELETE, "/places/1/", None)).await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let (status, _) = get_json(&app, "/places/1/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, activity) = get_json(&app, "/activity/").await;
    let actions: Vec<&str> = activity
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|record| record["action"].as_str())
        .collect();
    assert_eq!(actions, ["delete", "update", "create"]);
}

#[tokio::test]
async fn disabled_cache_stores_nothing() {
    let (app, dispatcher) = app_with(CacheConfig {
        enabled: false,
        ..Default::default()
    });
    get_json(&app, "/places/").await;
    get_json(&app, "/activity/").await;
    assert!(dispatcher.cache().is_empty());
}
