use base64::{Engine as _, engine::general_purpose};
use serde_json::Value;

use crate::core::models::{ChatCommandEvent, CommandKind, RelayEvent, WorkflowCallbackEvent};
use crate::errors::RelayError;

pub fn v_path<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = root;
    for key in path {
        cur = cur.get(*key)?;
    }
    Some(cur)
}

pub fn v_str<'a>(root: &'a Value, path: &[&str]) -> Option<&'a str> {
    v_path(root, path).and_then(|v| v.as_str())
}

/// Chat and run ids arrive as JSON numbers from Telegram and as strings from
/// the workflow; both are normalized to strings.
#[must_use]
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn get_header_value<'a>(headers: &'a Value, name: &str) -> Option<&'a str> {
    if let Some(v) = headers.get(name).and_then(|s| s.as_str()) {
        return Some(v);
    }
    headers.as_object().and_then(|map| {
        map.iter().find_map(|(k, v)| {
            if k.eq_ignore_ascii_case(name) {
                v.as_str()
            } else {
                None
            }
        })
    })
}

/// HTTP method of a REST (v1) or HTTP (v2) API Gateway payload.
#[must_use]
pub fn request_method(payload: &Value) -> Option<&str> {
    v_str(payload, &["httpMethod"]).or_else(|| v_str(payload, &["requestContext", "http", "method"]))
}

/// Request body, decoded when API Gateway marked it as base64.
///
/// # Errors
///
/// Returns `ParseError` if the body is missing, not a string, or not valid
/// base64/UTF-8 when flagged as encoded.
pub fn request_body(payload: &Value) -> Result<String, RelayError> {
    let body = payload
        .get("body")
        .ok_or_else(|| RelayError::ParseError("Missing body".to_string()))?
        .as_str()
        .ok_or_else(|| RelayError::ParseError("Invalid body format".to_string()))?;

    let encoded = payload
        .get("isBase64Encoded")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !encoded {
        return Ok(body.to_string());
    }

    let bytes = general_purpose::STANDARD
        .decode(body)
        .map_err(|e| RelayError::ParseError(format!("Invalid base64 body: {e}")))?;
    String::from_utf8(bytes).map_err(|e| RelayError::ParseError(format!("Body is not UTF-8: {e}")))
}

#[must_use]
pub fn is_callback(body: &Value) -> bool {
    body.get("callback").is_some_and(|v| match v {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    })
}

/// Classifies a request body into one of the closed event variants.
///
/// # Errors
///
/// Returns `ParseError` for non-JSON bodies, bodies that are neither a
/// callback nor a Telegram update, callbacks missing `chat_id` or
/// `raw_output`, and messages without a chat id.
pub fn parse_event(body: &str) -> Result<RelayEvent, RelayError> {
    let json: Value = serde_json::from_str(body)
        .map_err(|e| RelayError::ParseError(format!("Invalid JSON body: {e}")))?;

    if is_callback(&json) {
        return parse_callback(&json).map(RelayEvent::WorkflowCallback);
    }
    if json.get("update_id").is_none() && json.get("message").is_none() {
        return Err(RelayError::ParseError(
            "Body is neither a callback nor a Telegram update".to_string(),
        ));
    }
    parse_chat_update(&json)
}

/// # Errors
///
/// Returns `ParseError` if `chat_id` or `raw_output` is absent.
pub fn parse_callback(json: &Value) -> Result<WorkflowCallbackEvent, RelayError> {
    let chat_id = json
        .get("chat_id")
        .and_then(id_string)
        .ok_or_else(|| RelayError::ParseError("Callback missing chat_id".to_string()))?;
    let raw_output = v_str(json, &["raw_output"])
        .ok_or_else(|| RelayError::ParseError("Callback missing raw_output".to_string()))?
        .to_string();
    let command_kind = CommandKind::parse_or_status(v_str(json, &["command"]).unwrap_or(""));
    let correlation_id = json
        .get("correlation_id")
        .or_else(|| json.get("run_id"))
        .and_then(id_string)
        .unwrap_or_else(|| "unknown".to_string());

    Ok(WorkflowCallbackEvent {
        command_kind,
        raw_output,
        chat_id,
        correlation_id,
    })
}

/// Parses a Telegram `Update`.
///
/// Only a new text `message` becomes a command. Edited messages are ignored so
/// that editing an old `/confirm_destroy` never runs it again; stickers,
/// photos, channel posts and membership changes are ignored too.
///
/// # Errors
///
/// Returns `ParseError` if a message has no chat id.
pub fn parse_chat_update(json: &Value) -> Result<RelayEvent, RelayError> {
    let Some(message) = json.get("message") else {
        let kind = json
            .as_object()
            .and_then(|map| map.keys().find(|k| k.as_str() != "update_id"))
            .map_or("empty", String::as_str);
        return Ok(RelayEvent::Ignored(format!("{kind} update")));
    };
    let chat_id = v_path(message, &["chat", "id"])
        .and_then(id_string)
        .ok_or_else(|| RelayError::ParseError("Message has no chat id".to_string()))?;
    let Some(text) = v_str(message, &["text"]) else {
        return Ok(RelayEvent::Ignored("message without text".to_string()));
    };

    Ok(RelayEvent::ChatCommand(ChatCommandEvent {
        chat_id,
        command: command_name(text),
    }))
}

/// Lowercased command of `/Cmd@bot args`, without the slash, bot suffix or
/// arguments.
#[must_use]
pub fn command_name(text: &str) -> String {
    text.split_whitespace()
        .next()
        .unwrap_or("")
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase()
}
