// Error types for the Trellis framework

use crate::HttpStatus;
use thiserror::Error;

/// Result alias used throughout the core.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    // ========== Container ==========
    /// Resolution was requested for an abstract with no binding and no instance.
    #[error("Unbound abstract: {0}")]
    UnboundAbstract(String),

    /// A binding (directly or through aliases) depends on itself.
    #[error("Circular dependency detected: {}", .0.join(" -> "))]
    CircularDependency(Vec<String>),

    /// A stored value could not be viewed as the requested type.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// A parameter that is never injected was not supplied by the caller.
    #[error("Missing argument: {0}")]
    MissingArgument(String),

    /// The scoped container has already been torn down.
    #[error("Scope already terminated")]
    ScopeTerminated,

    // ========== Routing ==========
    #[error("Invalid route pattern '{pattern}': {reason}")]
    InvalidRoute { pattern: String, reason: String },

    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Method {method} not allowed for {path}")]
    MethodNotAllowed {
        method: String,
        path: String,
        allowed: Vec<String>,
    },

    #[error("Cannot generate URL: {0}")]
    UrlGeneration(String),

    // ========== Application ==========
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unprocessable Entity: {0}")]
    UnprocessableEntity(String),

    #[error("Too Many Requests: {0}")]
    TooManyRequests(String),

    #[error("Service Unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        self.http_status().code()
    }

    /// Get the HttpStatus enum for this error
    pub fn http_status(&self) -> HttpStatus {
        match self {
            Error::RouteNotFound(_) | Error::NotFound(_) => HttpStatus::NotFound,
            Error::MethodNotAllowed { .. } => HttpStatus::MethodNotAllowed,
            Error::Validation(_) | Error::Deserialization(_) | Error::BadRequest(_) => {
                HttpStatus::BadRequest
            }
            Error::Unauthorized(_) => HttpStatus::Unauthorized,
            Error::Forbidden(_) => HttpStatus::Forbidden,
            Error::Conflict(_) => HttpStatus::Conflict,
            Error::UnprocessableEntity(_) => HttpStatus::UnprocessableEntity,
            Error::TooManyRequests(_) => HttpStatus::TooManyRequests,
            Error::ServiceUnavailable(_) => HttpStatus::ServiceUnavailable,

            // Container and configuration faults are server errors.
            _ => HttpStatus::InternalServerError,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.http_status().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.http_status().is_server_error()
    }

    /// Methods registered for the path when this is a method-not-allowed failure.
    pub fn allowed_methods(&self) -> Option<&[String]> {
        match self {
            Error::MethodNotAllowed { allowed, .. } => Some(allowed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_errors_map_to_status() {
        assert_eq!(Error::RouteNotFound("/x".into()).status_code(), 404);
        let err = Error::MethodNotAllowed {
            method: "POST".into(),
            path: "/x".into(),
            allowed: vec!["GET".into()],
        };
        assert_eq!(err.status_code(), 405);
        assert_eq!(err.allowed_methods(), Some(&["GET".to_string()][..]));
    }

    #[test]
    fn test_container_errors_are_server_errors() {
        assert!(Error::UnboundAbstract("Mailer".into()).is_server_error());
        assert!(Error::CircularDependency(vec!["A".into(), "B".into()]).is_server_error());
        assert!(Error::BadRequest("nope".into()).is_client_error());
    }

    #[test]
    fn test_circular_dependency_message() {
        let err = Error::CircularDependency(vec!["A".into(), "B".into(), "A".into()]);
        assert_eq!(err.to_string(), "Circular dependency detected: A -> B -> A");
    }
}
