//! HTTP failures normalised into [`spacenote_core::Error`], and what the
//! front-end should do with each one.

use reqwest::{Response, StatusCode};
use serde_json::Value as JsonValue;

use spacenote_core::Error;

/// Largest error body kept in a message.
const MAX_ERROR_BODY: usize = 512;

/// Human-readable message from an error body.
///
/// Accepts `{"detail": "..."}`, FastAPI validation lists
/// (`{"detail": [{"msg": "..."}]}`) and `{"message": "..."}`. Anything else
/// falls back to `HTTP <status> <reason>`.
pub fn message_from_body(status: StatusCode, body: &str) -> String {
    let parsed = serde_json::from_str::<JsonValue>(body).ok();
    let from_json = parsed.as_ref().and_then(|json| {
        match json.get("detail") {
            Some(JsonValue::String(detail)) => return Some(detail.clone()),
            Some(JsonValue::Array(items)) => {
                let messages: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(JsonValue::as_str))
                    .collect();
                if !messages.is_empty() {
                    return Some(messages.join("; "));
                }
            }
            _ => {}
        }
        json.get("message")
            .and_then(JsonValue::as_str)
            .map(str::to_string)
    });

    from_json.unwrap_or_else(|| {
        format!(
            "HTTP {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        )
        .trim_end()
        .to_string()
    })
}

/// Map a status and message onto the error taxonomy.
pub fn error_from_status(status: StatusCode, message: String) -> Error {
    let code = status.as_u16();
    Error::from_status(code, message.clone()).unwrap_or_else(|| {
        if status.is_server_error() {
            Error::Server(message)
        } else {
            Error::BadRequest(message)
        }
    })
}

/// Consume a non-success response and turn it into an error.
pub async fn error_from_response(response: Response) -> Error {
    let status = response.status();
    let url = response.url().path().to_string();
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    let message = message_from_body(status, &body);
    tracing::debug!(
        subsystem = "client",
        component = "http",
        status = status.as_u16(),
        path = %url,
        message = %message,
        "Request failed"
    );
    error_from_status(status, message)
}

/// Transport-level failure (no response, or an unreadable one).
pub fn error_from_transport(e: reqwest::Error) -> Error {
    if e.is_decode() {
        Error::Serialization(e.to_string())
    } else if let Some(status) = e.status() {
        error_from_status(status, e.to_string())
    } else {
        Error::Network(e.to_string())
    }
}

/// Kind of request that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// First load of a read.
    Query,
    /// Refetch of a read whose previous data is still on screen.
    BackgroundRefetch,
    Mutation,
}

/// Where a failure should surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// Navigate to the login screen, then come back to `return_to`.
    RedirectToLogin { return_to: String },
    /// Replace the page content with an error panel.
    Boundary,
    /// Transient notification; existing content stays.
    Toast,
    /// Message next to the form or action that failed.
    Inline,
}

impl ErrorDisposition {
    pub fn for_error(error: &Error, kind: RequestKind, current_url: &str) -> Self {
        if matches!(error, Error::Unauthorized(_)) {
            return Self::RedirectToLogin {
                return_to: current_url.to_string(),
            };
        }
        match kind {
            RequestKind::Query => Self::Boundary,
            RequestKind::BackgroundRefetch => Self::Toast,
            RequestKind::Mutation => Self::Inline,
        }
    }

    /// Login path carrying the return URL, for redirects.
    pub fn login_path(&self) -> Option<String> {
        match self {
            Self::RedirectToLogin { return_to } => Some(format!(
                "/login?redirect={}",
                urlencoding::encode(return_to)
            )),
            _ => None,
        }
    }
}
