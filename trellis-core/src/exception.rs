//! Exception handling at the pipeline boundary
//!
//! Errors and panics raised while a request travels through the pipeline
//! are reported to an [`ExceptionHandler`] and rendered into a response.
//! Bind `dyn ExceptionHandler` in the container to replace the default:
//!
//! ```ignore
//! container.instance_shared::<dyn ExceptionHandler>(Arc::new(MyHandler));
//! ```

use crate::logging::{debug, error};
use crate::{Error, HttpRequest, HttpResponse};
use serde_json::json;
use std::any::Any;

/// Reports and renders errors that escaped request handling.
pub trait ExceptionHandler: Send + Sync {
    /// Record the error (logging, error trackers).
    fn report(&self, error: &Error);

    /// Convert the error into the response sent to the client.
    fn render(&self, request: &HttpRequest, error: &Error) -> HttpResponse;
}

/// JSON error responses of the form `{"error": "...", "status": 404}`.
///
/// Outside debug mode the message is the canonical reason phrase of the
/// status code, so internal details never reach the client.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExceptionHandler {
    debug: bool,
}

impl DefaultExceptionHandler {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }
}

impl ExceptionHandler for DefaultExceptionHandler {
    fn report(&self, err: &Error) {
        if err.is_server_error() {
            error!(error = %err, status = err.status_code(), "Unhandled error");
        } else {
            debug!(error = %err, status = err.status_code(), "Request failed");
        }
    }

    fn render(&self, request: &HttpRequest, err: &Error) -> HttpResponse {
        let status = err.http_status();
        let message = if self.debug {
            err.to_string()
        } else {
            status.reason().to_string()
        };

        let mut body = json!({
            "error": message,
            "status": status.code(),
        });
        if self.debug {
            body["method"] = json!(request.method);
            body["path"] = json!(request.path);
        }

        let mut response = HttpResponse::new(status.code())
            .with_header("Content-Type", "application/json")
            .with_body(body.to_string());

        if let Some(allowed) = err.allowed_methods() {
            response = response.with_header("Allow", allowed.join(", "));
        }
        response
    }
}

/// Turn a caught panic payload into an error.
pub(crate) fn panic_to_error(payload: Box<dyn Any + Send>) -> Error {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "handler panicked".to_string());
    Error::Internal(format!("panic: {}", message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(response: &HttpResponse) -> serde_json::Value {
        serde_json::from_slice(&response.body).unwrap()
    }

    #[test]
    fn test_generic_message_outside_debug() {
        let handler = DefaultExceptionHandler::new(false);
        let request = HttpRequest::new("GET", "/secret");
        let response = handler.render(&request, &Error::Internal("db password wrong".into()));
        assert_eq!(response.status, 500);
        assert_eq!(body(&response)["error"], "Internal Server Error");
    }

    #[test]
    fn test_debug_renders_message() {
        let handler = DefaultExceptionHandler::new(true);
        let request = HttpRequest::new("GET", "/x");
        let response = handler.render(&request, &Error::NotFound("widget 7".into()));
        assert_eq!(response.status, 404);
        let json = body(&response);
        assert_eq!(json["error"], "Not Found: widget 7");
        assert_eq!(json["path"], "/x");
    }

    #[test]
    fn test_method_not_allowed_sets_allow_header() {
        let handler = DefaultExceptionHandler::default();
        let request = HttpRequest::new("POST", "/x");
        let err = Error::MethodNotAllowed {
            method: "POST".into(),
            path: "/x".into(),
            allowed: vec!["GET".into(), "HEAD".into()],
        };
        let response = handler.render(&request, &err);
        assert_eq!(response.status, 405);
        assert_eq!(response.header("allow"), Some("GET, HEAD"));
    }

    #[test]
    fn test_panic_payloads() {
        let err = panic_to_error(Box::new("boom"));
        assert!(err.to_string().contains("boom"));
        let err = panic_to_error(Box::new(String::from("owned")));
        assert!(err.to_string().contains("owned"));
    }
}
