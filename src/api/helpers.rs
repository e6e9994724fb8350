//! Response builders for the API Gateway proxy integration.

use serde_json::{Value, json};

fn cors_headers() -> Value {
    json!({
        "Content-Type": "application/json",
        "Access-Control-Allow-Origin": "*",
        "Access-Control-Allow-Methods": "POST, OPTIONS",
        "Access-Control-Allow-Headers": "Content-Type, X-Api-Key, X-Relay-Signature, X-Relay-Timestamp"
    })
}

/// Returns a 200 OK response with the given JSON body.
#[must_use]
pub fn ok_json(body: &Value) -> Value {
    json!({
        "statusCode": 200,
        "headers": cors_headers(),
        "body": body.to_string()
    })
}

/// Returns a 200 OK response with `{"ok": true}`.
#[must_use]
pub fn ok_empty() -> Value {
    ok_json(&json!({ "ok": true }))
}

/// Returns an error response with the given status code and message.
#[must_use]
pub fn err_response(status_code: u16, message: &str) -> Value {
    json!({
        "statusCode": status_code,
        "headers": cors_headers(),
        "body": json!({ "ok": false, "error": message }).to_string()
    })
}

#[must_use]
pub fn preflight() -> Value {
    json!({
        "statusCode": 204,
        "headers": cors_headers(),
        "body": ""
    })
}
