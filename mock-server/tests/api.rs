use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{
    app, router, AppState, ServerConfig, APPLICATION_ID_HEADER, MASTER_KEY_HEADER, REST_API_KEY_HEADER,
    SESSION_TOKEN_HEADER,
};
use serde_json::{json, Value};
use tower::{Service, ServiceExt};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn request(method: &str, uri: &str) -> http::request::Builder {
    let config = ServerConfig::default();
    Request::builder()
        .method(method)
        .uri(uri)
        .header(APPLICATION_ID_HEADER, config.application_id)
        .header(REST_API_KEY_HEADER, config.rest_api_key)
}

fn empty(method: &str, uri: &str) -> Request<String> {
    request(method, uri).body(String::new()).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<String> {
    request(method, uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

async fn call(
    app: &mut axum::routing::RouterIntoService<String>,
    request: Request<String>,
) -> axum::response::Response {
    ServiceExt::ready(app).await.unwrap().call(request).await.unwrap()
}

fn service(app: Router) -> axum::routing::RouterIntoService<String> {
    app.into_service()
}

// --- auth ---

#[tokio::test]
async fn missing_keys_are_unauthorized() {
    let resp = app(ServerConfig::default())
        .oneshot(Request::builder().uri("/1/classes/Dogs").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await, json!({"error": "unauthorized"}));
}

#[tokio::test]
async fn master_key_replaces_rest_key() {
    let config = ServerConfig::default();
    let resp = app(config.clone())
        .oneshot(
            Request::builder()
                .uri("/1/classes/Dogs")
                .header(APPLICATION_ID_HEADER, &config.application_id)
                .header(MASTER_KEY_HEADER, &config.master_key)
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"results": []}));
}

// --- classes ---

#[tokio::test]
async fn create_returns_201_with_id() {
    let resp = app(ServerConfig::default())
        .oneshot(json_request("POST", "/1/classes/Dogs", json!({"name": "Prince"})))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert!(body["objectId"].is_string());
    assert!(body["createdAt"].is_string());
    assert!(body.get("name").is_none());
}

#[tokio::test]
async fn invalid_type_returns_code_111() {
    let resp = app(ServerConfig::default())
        .oneshot(json_request(
            "POST",
            "/1/classes/Dogs",
            json!({"name": "Woof", "owner": {"__type": "InvalidName"}}),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["code"], 111);
}

#[tokio::test]
async fn malformed_json_returns_code_107() {
    let resp = app(ServerConfig::default())
        .oneshot(
            request("POST", "/1/classes/Dogs")
                .header(http::header::CONTENT_TYPE, "application/json")
                .body("{not json".to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["code"], 107);
}

#[tokio::test]
async fn get_missing_object_is_404() {
    let resp = app(ServerConfig::default())
        .oneshot(empty("GET", "/1/classes/Dogs/nope"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(resp).await,
        json!({"code": 101, "error": "object not found for get"})
    );
}

#[tokio::test]
async fn record_lifecycle() {
    let mut app = service(app(ServerConfig::default()));

    // create
    let resp = call(&mut app, json_request("POST", "/1/classes/Dogs", json!({"name": "Keiko", "age": 3}))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let id = body_json(resp).await["objectId"].as_str().unwrap().to_string();

    // query with where + count
    let uri = format!(
        "/1/classes/Dogs?where={}&count=1&limit=0",
        "%7B%22name%22%3A%22Keiko%22%7D"
    );
    let resp = call(&mut app, empty("GET", &uri)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"results": [], "count": 1}));

    // increment
    let resp = call(
        &mut app,
        json_request(
            "PUT",
            &format!("/1/classes/Dogs/{id}"),
            json!({"age": {"__op": "Increment", "amount": 2}}),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_json(resp).await["updatedAt"].is_string());

    // get
    let resp = call(&mut app, empty("GET", &format!("/1/classes/Dogs/{id}"))).await;
    let dog = body_json(resp).await;
    assert_eq!(dog["age"], 5);
    assert_eq!(dog["name"], "Keiko");

    // delete
    let resp = call(&mut app, empty("DELETE", &format!("/1/classes/Dogs/{id}"))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({}));

    // get after delete
    let resp = call(&mut app, empty("GET", &format!("/1/classes/Dogs/{id}"))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- batch ---

#[tokio::test]
async fn batch_returns_per_item_results() {
    let resp = app(ServerConfig::default())
        .oneshot(json_request(
            "POST",
            "/1/batch",
            json!({"requests": [
                {"method": "POST", "path": "/1/classes/Dogs", "body": {"name": "Buddy"}},
                {"method": "DELETE", "path": "/1/classes/Dogs/missing"}
            ]}),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert!(body[0]["success"]["objectId"].is_string());
    assert_eq!(body[1]["error"]["code"], 101);
}

// --- users ---

#[tokio::test]
async fn sign_up_log_in_and_me() {
    let mut app = service(app(ServerConfig::default()));

    let resp = call(&mut app, json_request("POST", "/1/users", json!({"name": "Ling"}))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["code"], 200);

    let resp = call(
        &mut app,
        json_request("POST", "/1/users", json!({"username": "ling", "password": "pw"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert!(body_json(resp).await["sessionToken"].is_string());

    let resp = call(&mut app, empty("GET", "/1/login?username=ling&password=pw")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let user = body_json(resp).await;
    assert!(user.get("password").is_none());
    let token = user["sessionToken"].as_str().unwrap().to_string();

    let resp = call(
        &mut app,
        request("GET", "/1/users/me")
            .header(SESSION_TOKEN_HEADER, &token)
            .body(String::new())
            .unwrap(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["username"], "ling");

    let resp = call(
        &mut app,
        request("GET", "/1/users/me")
            .header(SESSION_TOKEN_HEADER, "r:bogus")
            .body(String::new())
            .unwrap(),
    )
    .await;
    assert_eq!(body_json(resp).await["code"], 209);
}

#[tokio::test]
async fn user_update_requires_session_or_master() {
    let mut app = service(app(ServerConfig::default()));
    let resp = call(
        &mut app,
        json_request("POST", "/1/users", json!({"username": "ling", "password": "pw"})),
    )
    .await;
    let id = body_json(resp).await["objectId"].as_str().unwrap().to_string();

    let resp = call(&mut app, json_request("PUT", &format!("/1/users/{id}"), json!({"nick": "L"}))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["code"], 206);

    let resp = call(
        &mut app,
        request("PUT", &format!("/1/users/{id}"))
            .header(MASTER_KEY_HEADER, ServerConfig::default().master_key)
            .body(json!({"nick": "L"}).to_string())
            .unwrap(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

// --- files ---

#[tokio::test]
async fn upload_download_delete_file() {
    let mut app = service(app(ServerConfig::default()));

    let resp = call(
        &mut app,
        request("POST", "/1/files/hello.txt")
            .header(http::header::CONTENT_TYPE, "text/plain")
            .header(http::header::HOST, "parse.test")
            .body("Hello, World!".to_string())
            .unwrap(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    let name = body["name"].as_str().unwrap().to_string();
    assert!(name.ends_with("-hello.txt"));
    assert_eq!(body["url"], format!("http://parse.test/files/test-app-id/{name}"));

    let resp = call(
        &mut app,
        Request::builder()
            .uri(format!("/files/test-app-id/{name}"))
            .body(String::new())
            .unwrap(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "text/plain");
    assert_eq!(body_bytes(resp).await.as_ref(), b"Hello, World!");

    let resp = call(&mut app, empty("DELETE", &format!("/1/files/{name}"))).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = call(
        &mut app,
        request("DELETE", &format!("/1/files/{name}"))
            .header(MASTER_KEY_HEADER, "test-master-key")
            .body(String::new())
            .unwrap(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

// --- analytics and push ---

#[tokio::test]
async fn events_and_push_reach_the_store() {
    let state = AppState::new(ServerConfig::default());
    let mut app = service(router(state.clone()));

    let resp = call(
        &mut app,
        json_request("POST", "/1/events/Search", json!({"dimensions": {"source": "craigslist"}})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({}));

    let resp = call(
        &mut app,
        json_request("POST", "/1/push", json!({"channels": ["Giants"], "data": {"alert": "hi"}})),
    )
    .await;
    assert_eq!(body_json(resp).await, json!({"result": true}));

    let store = state.store.read().await;
    assert_eq!(store.events().len(), 1);
    assert_eq!(store.events()[0].name, "Search");
    assert_eq!(store.pushes().len(), 1);
}
