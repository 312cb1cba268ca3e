//! Helpers for writing common responses.
//!
//! JSON payloads are wrapped in an envelope: successful responses as
//! `{"data": <payload>, "status": <code>}` and errors as
//! `{"errors": <payload>, "status": <code>}`.

use std::fmt::Display;

use serde::Serialize;
use tracing::error;

use crate::response::ResponseWriter;

/// The `Content-Type` header name.
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
/// MIME type of JSON responses.
pub const JSON_CONTENT_TYPE: &str = "application/json";
/// MIME type of HTML responses.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=UTF-8";
/// Error payload sent when a response cannot be produced.
pub const ERR_INTERNAL_SERVER: &str = "Internal server error.";

#[derive(Serialize)]
struct DataEnvelope<'a, T: ?Sized> {
    data: &'a T,
    status: u16,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a, T: ?Sized> {
    errors: &'a T,
    status: u16,
}

/// Sends only a status line and headers.
pub fn send_header(w: &mut dyn ResponseWriter, status: u16) {
    w.write_header(status);
}

/// Sends `data` as-is with the given content type. An empty content type
/// leaves the header unset.
pub fn send(w: &mut dyn ResponseWriter, content_type: &str, data: impl Display, status: u16) {
    if !content_type.is_empty() {
        w.headers_mut()
            .insert(HEADER_CONTENT_TYPE.to_string(), content_type.to_string());
    }
    w.write_header(status);
    if let Err(err) = w.write(data.to_string().as_bytes()) {
        error!(%err, "failed to write response body");
    }
}

/// Sends `data` wrapped in the success envelope.
pub fn send_response<T: Serialize + ?Sized>(w: &mut dyn ResponseWriter, data: &T, status: u16) {
    match serde_json::to_vec(&DataEnvelope { data, status }) {
        Ok(body) => write_json(w, &body, status),
        Err(err) => {
            error!(%err, "failed to encode response");
            internal_server_error(w, ERR_INTERNAL_SERVER);
        }
    }
}

/// Sends `errors` wrapped in the error envelope.
pub fn send_error<T: Serialize + ?Sized>(w: &mut dyn ResponseWriter, errors: &T, status: u16) {
    match serde_json::to_vec(&ErrorEnvelope { errors, status }) {
        Ok(body) => write_json(w, &body, status),
        Err(err) => {
            error!(%err, "failed to encode error response");
            let body = serde_json::json!({ "errors": ERR_INTERNAL_SERVER, "status": 500 });
            write_json(w, body.to_string().as_bytes(), 500);
        }
    }
}

fn write_json(w: &mut dyn ResponseWriter, body: &[u8], status: u16) {
    w.headers_mut()
        .insert(HEADER_CONTENT_TYPE.to_string(), JSON_CONTENT_TYPE.to_string());
    w.write_header(status);
    if let Err(err) = w.write(body) {
        error!(%err, "failed to write response body");
    }
}

/// 200 OK.
pub fn ok<T: Serialize + ?Sized>(w: &mut dyn ResponseWriter, data: &T) {
    send_response(w, data, 200);
}

/// 201 Created.
pub fn created<T: Serialize + ?Sized>(w: &mut dyn ResponseWriter, data: &T) {
    send_response(w, data, 201);
}

/// 204 No Content, no body.
pub fn no_content(w: &mut dyn ResponseWriter) {
    send_header(w, 204);
}

/// 302 Found.
pub fn found<T: Serialize + ?Sized>(w: &mut dyn ResponseWriter, data: &T) {
    send_response(w, data, 302);
}

/// 400 Bad Request.
pub fn bad_request<T: Serialize + ?Sized>(w: &mut dyn ResponseWriter, errors: &T) {
    send_error(w, errors, 400);
}

/// 403 Forbidden.
pub fn forbidden<T: Serialize + ?Sized>(w: &mut dyn ResponseWriter, errors: &T) {
    send_error(w, errors, 403);
}

/// 404 Not Found.
pub fn not_found<T: Serialize + ?Sized>(w: &mut dyn ResponseWriter, errors: &T) {
    send_error(w, errors, 404);
}

/// 406 Not Acceptable.
pub fn not_acceptable<T: Serialize + ?Sized>(w: &mut dyn ResponseWriter, errors: &T) {
    send_error(w, errors, 406);
}

/// 451 Unavailable For Legal Reasons.
pub fn unavailable_for_legal_reasons<T: Serialize + ?Sized>(w: &mut dyn ResponseWriter, errors: &T) {
    send_error(w, errors, 451);
}

/// 500 Internal Server Error.
pub fn internal_server_error<T: Serialize + ?Sized>(w: &mut dyn ResponseWriter, errors: &T) {
    send_error(w, errors, 500);
}
