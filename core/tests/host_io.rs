//! Host-does-IO round trip: the host builds requests with the client, runs
//! them over its own HTTP stack (ureq here), and hands the raw responses back
//! for classification. No async runtime is involved on the client side.

use mock_server::ServerConfig;
use parse_rest_core::{ClientConfig, HttpMethod, HttpRequest, HttpResponse, ParseClient, Query, RequestSpec};
use serde_json::json;

/// Execute an `HttpRequest` using ureq and return an `HttpResponse`.
///
/// Disables ureq's automatic status-code-as-error behavior so 4xx/5xx
/// responses are returned as data rather than `Err`, letting the client
/// classify them.
fn execute(req: HttpRequest) -> HttpResponse {
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent();
    let url = req.full_url().unwrap();

    let mut response = match req.method {
        HttpMethod::Get => {
            let mut builder = agent.get(&url);
            for (name, value) in &req.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            builder.call()
        }
        HttpMethod::Delete => {
            let mut builder = agent.delete(&url);
            for (name, value) in &req.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            builder.call()
        }
        HttpMethod::Post | HttpMethod::Put => {
            let mut builder = if req.method == HttpMethod::Post {
                agent.post(&url)
            } else {
                agent.put(&url)
            };
            for (name, value) in &req.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            match req.body {
                Some(body) => builder.send(&body[..]),
                None => builder.send_empty(),
            }
        }
    }
    .expect("HTTP transport error");

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
        .collect();
    let body = response.body_mut().read_to_vec().unwrap_or_default();

    HttpResponse { status, headers, body }
}

#[test]
fn build_execute_parse_lifecycle() {
    // Step 1: start mock server on a random port.
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, ServerConfig::default()).await
        })
        .unwrap();
    });

    let server = ServerConfig::default();
    let client = ParseClient::new(
        ClientConfig::new(server.application_id, server.rest_api_key).with_base_url(format!("http://{addr}")),
    )
    .unwrap();
    let round_trip = |spec: RequestSpec| {
        let req = client.build_request(&spec).unwrap();
        client.parse_response(&spec, execute(req))
    };

    // Step 2: empty class lists as an empty array.
    let outcome = round_trip(RequestSpec::get("/1/classes/Dogs"));
    assert!(outcome.success);
    assert_eq!(outcome.json().unwrap(), &json!([]));

    // Step 3: create.
    let outcome = round_trip(RequestSpec::post("/1/classes/Dogs").param("name", "Keiko").param("age", 3));
    assert_eq!(outcome.status(), Some(201));
    let id = outcome.field("objectId").unwrap().as_str().unwrap().to_string();

    // Step 4: query with structured params flattened into the query string.
    let spec = RequestSpec::get("/1/classes/Dogs")
        .params(Query::new().filter(json!({"age": {"$gte": 3}})).count().to_params());
    let outcome = round_trip(spec);
    assert_eq!(outcome.field("count").unwrap(), 1);
    assert_eq!(outcome.field("results").unwrap()[0]["name"], "Keiko");

    // Step 5: update, then read back.
    let outcome = round_trip(RequestSpec::put(format!("/1/classes/Dogs/{id}")).param("name", "Buddy"));
    assert!(outcome.success);
    let outcome = round_trip(RequestSpec::get(format!("/1/classes/Dogs/{id}")));
    assert_eq!(outcome.field("name").unwrap(), "Buddy");

    // Step 6: delete, then a 404 classified as data.
    assert!(round_trip(RequestSpec::delete(format!("/1/classes/Dogs/{id}"))).success);
    let outcome = round_trip(RequestSpec::get(format!("/1/classes/Dogs/{id}")));
    assert!(!outcome.success);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.error_body().unwrap().code, Some(101));
}
