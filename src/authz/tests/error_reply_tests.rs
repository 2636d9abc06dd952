//! Error reply tests
//!
//! Reported errors keep their code, render their message template against
//! the details and carry a summary of the request. Internal errors never
//! leak the underlying cause.

use std::sync::Arc;

use anyhow::anyhow;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use cretoai_scopes::api::{
    handler_fn, Api, ApiConfig, ApiService, CallRequest, Endpoint, HandlerError, ServiceContext,
};
use cretoai_scopes::credentials::StaticResolver;
use serde_json::{json, Value};

fn service() -> ApiService {
    let mut api = Api::new(
        ApiConfig::new("Test Api", "Yet another test api").with_error_code("TooManyFoos", 472),
    );

    api.declare(
        Endpoint::new("InputError"),
        handler_fn(|_request, _session, _context| {
            Err(HandlerError::report(
                "InputError",
                "Testing Error",
                json!({"dee": "tails"}),
            ))
        }),
    )
    .unwrap();

    api.declare(
        Endpoint::new("toomanyfoos"),
        handler_fn(|request, _session, _context| {
            Err(HandlerError::report(
                "TooManyFoos",
                "You can only have 3 foos.  You provided:\n{{foos}}",
                json!({"foos": request.payload["foos"]}),
            ))
        }),
    )
    .unwrap();

    api.declare(
        Endpoint::new("ISE"),
        handler_fn(|_request, _session, _context| Err(anyhow!("uhoh").into())),
    )
    .unwrap();

    api.declare(
        Endpoint::new("InputValidationError").with_clean_payload(|mut payload| {
            payload["secret"] = json!("<HIDDEN>");
            payload
        }),
        handler_fn(|_request, _session, _context| {
            Err(HandlerError::report(
                "InputValidationError",
                "Input failed schema validation: {{schema}}",
                json!({"schema": "http://localhost:4321/test-schema.json"}),
            ))
        }),
    )
    .unwrap();

    api.declare(
        Endpoint::new("unmapped"),
        handler_fn(|_request, _session, _context| {
            Err(HandlerError::report("NotInTheTable", "secret detail", json!({})))
        }),
    )
    .unwrap();

    api.build(Arc::new(StaticResolver::new()), ServiceContext::new())
        .unwrap()
}

fn request_info_without_time(body: &Value) -> Value {
    let mut info = body["requestInfo"].clone();
    if let Some(object) = info.as_object_mut() {
        object.remove("time");
    }
    info
}

#[tokio::test]
async fn test_input_error_response() {
    let response = service().call("InputError", CallRequest::new()).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.code(), Some("InputError"));
    let message = response.body["message"].as_str().unwrap();
    assert!(message.starts_with("Testing Error\n----\n"));
    assert!(!message.contains("details:"));
    assert_eq!(
        request_info_without_time(&response.body),
        json!({"method": "InputError", "params": {}, "payload": {}})
    );
    assert_eq!(response.body["details"], json!({"dee": "tails"}));
}

#[tokio::test]
async fn test_custom_error_code_response() {
    let request = CallRequest::new().with_payload(json!({"foos": [1, 2, 3, 4]}));
    let response = service().call("toomanyfoos", request).await;

    assert_eq!(response.status.as_u16(), 472);
    let time = response.body["requestInfo"]["time"].as_str().unwrap().to_string();
    let message = response.body["message"]
        .as_str()
        .unwrap()
        .replace(&time, "<nowish>");

    let expected = [
        "You can only have 3 foos.  You provided:",
        "[",
        "  1,",
        "  2,",
        "  3,",
        "  4",
        "]",
        "----",
        "errorCode:  TooManyFoos",
        "statusCode: 472",
        "requestInfo:",
        "  method:   toomanyfoos",
        "  params:   {}",
        "  payload:  {",
        "  \"foos\": [",
        "    1,",
        "    2,",
        "    3,",
        "    4",
        "  ]",
        "}",
        "  time:     <nowish>",
    ]
    .join("\n");
    assert_eq!(message, expected);
    assert_eq!(response.body["details"], json!({"foos": [1, 2, 3, 4]}));
}

#[tokio::test]
async fn test_internal_server_error_response() {
    let response = service().call("ISE", CallRequest::new()).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.code(), Some("InternalServerError"));
    let message = response.body["message"].as_str().unwrap();
    assert!(message.starts_with("Internal"));
    assert!(!message.contains("uhoh"));
    assert_eq!(
        request_info_without_time(&response.body),
        json!({"method": "ISE", "params": {}, "payload": {}})
    );
}

#[tokio::test]
async fn test_cleaned_payload_in_reply() {
    let request = CallRequest::new().with_payload(json!({"invalid": "yep", "secret": "s3kr!t"}));
    let response = service().call("InputValidationError", request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let message = response.body["message"].as_str().unwrap();
    assert!(message.contains("<HIDDEN>"));
    assert!(!message.contains("s3kr!t"));
    assert_eq!(
        request_info_without_time(&response.body),
        json!({
            "method": "InputValidationError",
            "params": {},
            "payload": {"invalid": "yep", "secret": "<HIDDEN>"},
        })
    );
}

#[tokio::test]
async fn test_unmapped_code_is_internal_error() {
    let response = service().call("unmapped", CallRequest::new()).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!response.body["message"]
        .as_str()
        .unwrap()
        .contains("secret detail"));
}

#[tokio::test]
async fn test_into_response_keeps_status() {
    let response = service().call("InputError", CallRequest::new()).await;
    let http = response.into_response();
    assert_eq!(http.status(), StatusCode::BAD_REQUEST);
}
