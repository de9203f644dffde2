#![allow(dead_code)]

use polyquery_common::DsnConfig;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const QUERY_ID: &str = "20240309_101500_00042_abcde";

/// DSN pointing at a mock statement server.
pub fn dsn_for(server: &MockServer, query: &str) -> DsnConfig {
    let authority = server.uri().trim_start_matches("http://").to_string();
    DsnConfig::new(format!("http://analyst@{}?{}", authority, query))
}

pub fn executing_path(n: usize) -> String {
    format!("/v1/statement/executing/{}/{}", QUERY_ID, n)
}

/// One protocol response; `nextUri` points at batch `next` when given.
pub fn batch(
    server: &MockServer,
    columns: Option<Value>,
    data: Option<Value>,
    next: Option<usize>,
) -> Value {
    let state = if next.is_some() { "RUNNING" } else { "FINISHED" };
    let mut body = json!({
        "id": QUERY_ID,
        "stats": { "state": state },
    });
    if let Some(columns) = columns {
        body["columns"] = columns;
    }
    if let Some(data) = data {
        body["data"] = data;
    }
    if let Some(n) = next {
        body["nextUri"] = json!(format!("{}{}", server.uri(), executing_path(n)));
    }
    body
}

/// Serve `batches[0]` for the POST and `batches[n]` for each `nextUri` GET.
pub async fn mount_batches(server: &MockServer, batches: Vec<Value>) {
    let mut batches = batches.into_iter();
    if let Some(first) = batches.next() {
        Mock::given(method("POST"))
            .and(path("/v1/statement"))
            .respond_with(ResponseTemplate::new(200).set_body_json(first))
            .expect(1)
            .mount(server)
            .await;
    }
    for (i, body) in batches.enumerate() {
        Mock::given(method("GET"))
            .and(path(executing_path(i + 1)))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(server)
            .await;
    }
}
