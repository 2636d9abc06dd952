//! Error replies and response emission

use std::collections::HashMap;
use std::sync::OnceLock;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, warn};
use uuid::Uuid;

/// Error code to HTTP status table
#[derive(Debug, Clone)]
pub struct ErrorCodes {
    codes: HashMap<String, u16>,
}

impl Default for ErrorCodes {
    fn default() -> Self {
        let codes = [
            ("InputError", 400),
            ("InputValidationError", 400),
            ("AuthenticationFailed", 401),
            ("InsufficientScopes", 403),
            ("ResourceNotFound", 404),
            ("ResourceExpired", 410),
            ("InternalServerError", 500),
        ]
        .into_iter()
        .map(|(code, status)| (code.to_string(), status))
        .collect();

        Self { codes }
    }
}

impl ErrorCodes {
    /// Built-in codes extended with `extra`; `extra` wins on conflicts
    pub fn with_extra(extra: &HashMap<String, u16>) -> Self {
        let mut codes = Self::default();
        codes
            .codes
            .extend(extra.iter().map(|(code, status)| (code.clone(), *status)));
        codes
    }

    /// Status for a known code
    pub fn get(&self, code: &str) -> Option<StatusCode> {
        self.codes
            .get(code)
            .and_then(|status| StatusCode::from_u16(*status).ok())
    }

    /// Status for `code`, falling back to 500 for unmapped codes
    pub fn status(&self, code: &str) -> StatusCode {
        self.get(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Request summary included in every error reply
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestInfo {
    /// Endpoint name
    pub method: String,
    pub params: Value,
    pub payload: Value,
    pub time: String,
}

impl RequestInfo {
    pub fn new(method: impl Into<String>, params: Value, payload: Value) -> Self {
        Self {
            method: method.into(),
            params,
            payload,
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Body of an error response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReply {
    pub code: String,
    pub message: String,
    pub request_info: RequestInfo,
    pub details: Value,
}

impl ErrorReply {
    /// Builds a reply, rendering `template` against `details`
    ///
    /// Every `{{key}}` with a matching member in `details` is replaced by
    /// that member's pretty-printed JSON. A trailer with the error code,
    /// status and request summary is appended.
    pub fn new(
        code: impl Into<String>,
        status: StatusCode,
        template: &str,
        details: Value,
        request_info: RequestInfo,
    ) -> Self {
        let code = code.into();
        let mut message = render_template(template, &details);
        message.push_str("\n----\n");
        message.push_str(&format!("errorCode:  {}\n", code));
        message.push_str(&format!("statusCode: {}\n", status.as_u16()));
        message.push_str("requestInfo:\n");
        message.push_str(&format!("  method:   {}\n", request_info.method));
        message.push_str(&format!("  params:   {}\n", pretty(&request_info.params)));
        message.push_str(&format!("  payload:  {}\n", pretty(&request_info.payload)));
        message.push_str(&format!("  time:     {}", request_info.time));

        Self {
            code,
            message,
            request_info,
            details,
        }
    }
}

fn template_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{([a-zA-Z0-9_-]+)\}\}").expect("template pattern is valid")
    })
}

fn render_template(template: &str, details: &Value) -> String {
    template_pattern()
        .replace_all(template, |caps: &Captures| match details.get(&caps[1]) {
            Some(value) => pretty(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// A response ready for the transport
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Error code of an error response
    pub fn code(&self) -> Option<&str> {
        self.body.get("code").and_then(Value::as_str)
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Turns call outcomes into responses for one request
#[derive(Debug)]
pub struct ErrorReporter<'a> {
    codes: &'a ErrorCodes,
    request_info: RequestInfo,
}

impl<'a> ErrorReporter<'a> {
    pub fn new(codes: &'a ErrorCodes, request_info: RequestInfo) -> Self {
        Self {
            codes,
            request_info,
        }
    }

    pub fn request_info(&self) -> &RequestInfo {
        &self.request_info
    }

    /// Reports a coded error; unmapped codes become an internal error
    pub fn report(&self, code: &str, template: &str, details: Value) -> ApiResponse {
        let Some(status) = self.codes.get(code) else {
            return self.report_internal(&format!("unmapped error code '{}'", code));
        };

        warn!(
            "{} failed with {} ({})",
            self.request_info.method,
            code,
            status.as_u16()
        );
        let reply = ErrorReply::new(code, status, template, details, self.request_info.clone());
        ApiResponse {
            status,
            body: json!(reply),
        }
    }

    /// Reports an internal error without exposing `cause` to the caller
    pub fn report_internal(&self, cause: &dyn std::fmt::Display) -> ApiResponse {
        let incident_id = Uuid::new_v4();
        error!(
            "Internal error in {} (incident {}): {}",
            self.request_info.method, incident_id, cause
        );

        let status = StatusCode::INTERNAL_SERVER_ERROR;
        let reply = ErrorReply::new(
            "InternalServerError",
            status,
            &format!("Internal Server Error, incidentId {}", incident_id),
            json!({ "incidentId": incident_id.to_string() }),
            self.request_info.clone(),
        );
        ApiResponse {
            status,
            body: json!(reply),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> RequestInfo {
        RequestInfo {
            method: "toomanyfoos".to_string(),
            params: json!({}),
            payload: json!({"foos": [1, 2, 3, 4]}),
            time: "<nowish>".to_string(),
        }
    }

    #[test]
    fn test_template_rendering() {
        let reply = ErrorReply::new(
            "TooManyFoos",
            StatusCode::from_u16(472).unwrap(),
            "You can only have 3 foos.  You provided:\n{{foos}}",
            json!({"foos": [1, 2, 3, 4]}),
            info(),
        );

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
        assert_eq!(reply.message, expected);
    }

    #[test]
    fn test_unknown_template_keys_are_kept() {
        assert_eq!(render_template("a {{b}} c", &json!({})), "a {{b}} c");
    }

    #[test]
    fn test_error_codes() {
        let mut extra = HashMap::new();
        extra.insert("TooManyFoos".to_string(), 472);
        let codes = ErrorCodes::with_extra(&extra);

        assert_eq!(codes.status("InputError"), StatusCode::BAD_REQUEST);
        assert_eq!(codes.status("TooManyFoos").as_u16(), 472);
        assert_eq!(codes.status("NoSuchCode"), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_internal_error_hides_cause() {
        let codes = ErrorCodes::default();
        let reporter = ErrorReporter::new(&codes, info());
        let response = reporter.report_internal(&"uhoh");

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.code(), Some("InternalServerError"));
        let message = response.body["message"].as_str().unwrap();
        assert!(message.starts_with("Internal"));
        assert!(!message.contains("uhoh"));
    }

    #[test]
    fn test_unmapped_code_is_internal() {
        let codes = ErrorCodes::default();
        let reporter = ErrorReporter::new(&codes, info());
        let response = reporter.report("Whatever", "nope", json!({}));
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
