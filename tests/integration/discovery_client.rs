//! Discovery client against a local HTTP server

use crate::common::mock_http::{CannedResponse, MockServer};
use budget_pacing_monitor::discovery::{
    shared_resources::global_http_client, Credentials, DiscoveryError, ServiceBuilder, TokenProvider, UploadParams,
};
use budget_pacing_monitor::quota::CallBudget;
use serde_json::json;

fn document(root: &str) -> serde_json::Value {
    json!({
        "rootUrl": root,
        "servicePath": "svc/v1/",
        "parameters": { "fields": { "location": "query" }, "broken": { "location": "header" } },
        "resources": { "items": { "methods": {
            "get": {
                "httpMethod": "GET",
                "path": "items/{itemId}",
                "parameters": { "itemId": { "location": "path", "required": true } }
            },
            "insert": { "httpMethod": "POST", "path": "items" },
            "upload": {
                "httpMethod": "PUT",
                "path": "items/{itemId}",
                "parameters": { "itemId": { "location": "path" } },
                "supportsMediaUpload": true,
                "mediaUpload": { "protocols": { "simple": { "path": "/upload/svc/v1/items/{itemId}" } } }
            }
        } } }
    })
}

async fn server() -> MockServer {
    MockServer::start(|request| {
        let root = format!("http://{}/", request.header("host").unwrap_or_default());
        match request.path() {
            "/discovery" => CannedResponse::json(document(&root)),
            "/not-json" => CannedResponse::text(200, "<html>"),
            "/token" => CannedResponse::json(json!({ "access_token": "exchanged" })),
            "/svc/v1/items/missing" => CannedResponse::text(404, "{\"error\":\"not found\"}"),
            "/svc/v1/items/raw" => CannedResponse::text(200, "plain text"),
            _ => CannedResponse::json(json!({ "ok": true })),
        }
    })
    .await
}

fn builder(server: &MockServer) -> ServiceBuilder {
    ServiceBuilder::new().with_token_provider(TokenProvider::new(
        global_http_client(),
        format!("{}/token", server.url()),
    ))
}

#[tokio::test]
async fn test_refresh_token_exchange() {
    let server = server().await;
    let tokens = TokenProvider::new(global_http_client(), format!("{}/token", server.url()));

    let token = tokens
        .get_access_token(&Credentials::with_refresh_token("id", "secret", "refresh"))
        .await
        .unwrap();
    assert_eq!(token, "exchanged");

    let sent = &server.requests()[0];
    assert_eq!(sent.method, "POST");
    let body = sent.body_text();
    assert!(body.contains("grant_type=refresh_token"));
    assert!(body.contains("refresh_token=refresh"));
    assert!(body.contains("client_id=id"));
}

#[tokio::test]
async fn test_token_endpoint_rejection_is_auth_error_with_body() {
    let server = MockServer::start(|_| CannedResponse::text(400, "{\"error\":\"invalid_grant\"}")).await;
    let tokens = TokenProvider::new(global_http_client(), format!("{}/token", server.url()));

    let err = tokens
        .get_access_token(&Credentials::with_refresh_token("id", "secret", "stale"))
        .await
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::Auth(body) if body.contains("invalid_grant")));
}

#[tokio::test]
async fn test_invoke_builds_url_and_sends_bearer() {
    let server = server().await;
    let service = builder(&server)
        .build(&format!("{}/discovery", server.url()), &Credentials::with_refresh_token("id", "s", "r"))
        .await
        .unwrap();

    let response = service
        .invoke(
            "items.get",
            &[("itemId", "42".to_string()), ("fields", "name".to_string())],
            None,
        )
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.json()["ok"], json!(true));

    let call = server.requests().into_iter().find(|r| r.path() == "/svc/v1/items/42").unwrap();
    assert_eq!(call.method, "GET");
    assert_eq!(call.target, "/svc/v1/items/42?fields=name");
    assert_eq!(call.header("authorization"), Some("Bearer exchanged"));
    assert!(call.body.is_empty());
}

#[tokio::test]
async fn test_json_body_is_sent_as_json() {
    let server = server().await;
    let service = builder(&server)
        .build(&format!("{}/discovery", server.url()), &Credentials::with_access_token("t"))
        .await
        .unwrap();

    service
        .invoke("items.insert", &[], Some(json!({ "name": "x" })))
        .await
        .unwrap();

    let call = server.requests().into_iter().find(|r| r.path() == "/svc/v1/items").unwrap();
    assert_eq!(call.header("content-type"), Some("application/json"));
    assert_eq!(serde_json::from_slice::<serde_json::Value>(&call.body).unwrap(), json!({ "name": "x" }));
}

#[tokio::test]
async fn test_simple_upload_uses_upload_path() {
    let server = server().await;
    let service = builder(&server)
        .build(&format!("{}/discovery", server.url()), &Credentials::with_access_token("t"))
        .await
        .unwrap();

    service
        .invoke_upload(
            "items.upload",
            &[("itemId", "7".to_string())],
            b"[1,2]".to_vec(),
            &UploadParams::simple("text/plain"),
        )
        .await
        .unwrap();

    let call = server
        .requests()
        .into_iter()
        .find(|r| r.path() == "/upload/svc/v1/items/7")
        .unwrap();
    assert_eq!(call.method, "PUT");
    assert_eq!(call.target, "/upload/svc/v1/items/7?uploadType=media");
    assert_eq!(call.header("content-type"), Some("text/plain"));
    assert_eq!(call.body, b"[1,2]");
}

#[tokio::test]
async fn test_non_success_status_is_api_error_with_raw_body() {
    let server = server().await;
    let service = builder(&server)
        .build(&format!("{}/discovery", server.url()), &Credentials::with_access_token("t"))
        .await
        .unwrap();

    let err = service
        .invoke("items.get", &[("itemId", "missing".to_string())], None)
        .await
        .unwrap_err();
    match err {
        DiscoveryError::Api { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "{\"error\":\"not found\"}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_non_json_success_keeps_raw_body() {
    let server = server().await;
    let service = builder(&server)
        .build(&format!("{}/discovery", server.url()), &Credentials::with_access_token("t"))
        .await
        .unwrap();

    let response = service
        .invoke("items.get", &[("itemId", "raw".to_string())], None)
        .await
        .unwrap();
    assert!(response.result.is_none());
    assert_eq!(response.body, "plain text");
}

#[tokio::test]
async fn test_parameter_errors() {
    let server = server().await;
    let service = builder(&server)
        .build(&format!("{}/discovery", server.url()), &Credentials::with_access_token("t"))
        .await
        .unwrap();
    let before = server.requests().len();

    let unknown = service
        .invoke("items.get", &[("itemId", "1".to_string()), ("nope", "x".to_string())], None)
        .await
        .unwrap_err();
    assert!(matches!(unknown, DiscoveryError::UnknownParameter { ref name, .. } if name == "nope"));

    let location = service
        .invoke("items.get", &[("itemId", "1".to_string()), ("broken", "x".to_string())], None)
        .await
        .unwrap_err();
    assert!(matches!(location, DiscoveryError::UnknownParameterLocation { ref location, .. } if location == "header"));

    let no_upload = service
        .invoke_upload("items.get", &[], Vec::new(), &UploadParams::simple("text/plain"))
        .await
        .unwrap_err();
    assert!(matches!(no_upload, DiscoveryError::UnsupportedUpload(_)));

    let missing_op = service.invoke("items.delete", &[], None).await.unwrap_err();
    assert!(matches!(missing_op, DiscoveryError::UnknownOperation(_)));

    assert_eq!(server.requests().len(), before);
}

#[tokio::test]
async fn test_discovery_fetch_failures() {
    let server = server().await;

    let err = builder(&server)
        .build(&format!("{}/not-json", server.url()), &Credentials::with_access_token("t"))
        .await
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::DiscoveryFetch(_)));

    let missing = MockServer::start(|_| CannedResponse::text(500, "down")).await;
    let err = builder(&missing)
        .build(&format!("{}/discovery", missing.url()), &Credentials::with_access_token("t"))
        .await
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::DiscoveryFetch(_)));
}

#[tokio::test]
async fn test_missing_credentials_fail_before_network() {
    let server = server().await;
    let err = builder(&server)
        .build(&format!("{}/discovery", server.url()), &Credentials::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::Auth(_)));
    assert!(server.requests().iter().all(|r| r.path() != "/token"));
}

#[tokio::test]
async fn test_calls_are_charged_to_the_budget() {
    let server = server().await;
    let budget = CallBudget::new(3);
    let service = builder(&server)
        .with_call_budget(budget.clone())
        .build(&format!("{}/discovery", server.url()), &Credentials::with_access_token("t"))
        .await
        .unwrap();
    assert_eq!(budget.remaining(), 2);

    service.invoke("items.insert", &[], None).await.unwrap();
    service.invoke("items.insert", &[], None).await.unwrap();
    let err = service.invoke("items.insert", &[], None).await.unwrap_err();
    assert!(matches!(err, DiscoveryError::QuotaExhausted(_)));
    assert_eq!(budget.remaining(), 0);
}
