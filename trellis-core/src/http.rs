// HTTP request and response types

use crate::container::{Arguments, Dependency, Resolver};
use crate::{Error, Result};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// HTTP methods
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::OPTIONS => "OPTIONS",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::GET),
            "POST" => Ok(HttpMethod::POST),
            "PUT" => Ok(HttpMethod::PUT),
            "DELETE" => Ok(HttpMethod::DELETE),
            "PATCH" => Ok(HttpMethod::PATCH),
            "HEAD" => Ok(HttpMethod::HEAD),
            "OPTIONS" => Ok(HttpMethod::OPTIONS),
            other => Err(Error::BadRequest(format!("unknown HTTP method '{}'", other))),
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP request wrapper
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub path_params: HashMap<String, String>,
    pub query_params: HashMap<String, String>,
}

impl HttpRequest {
    /// Build a request; a query string on `path` is split off into `query_params`.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        let mut method = method.into();
        method.make_ascii_uppercase();
        let path = path.into();

        let (path, query_params) = match path.split_once('?') {
            Some((path, query)) => (path.to_string(), parse_query_string(query)),
            None => (path, HashMap::new()),
        };

        Self {
            method,
            path,
            query_params,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Parse the request body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Get a path parameter by name
    pub fn param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    /// Get a query parameter by name
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }
}

/// The request is supplied by the router as a call argument; outside of
/// dispatch it falls back to the instance registered in the request scope.
impl Dependency for HttpRequest {
    fn extract(resolver: &Resolver, args: &mut Arguments) -> BoxFuture<'static, Result<Self>> {
        if let Some(request) = args.take::<HttpRequest>() {
            return Box::pin(async move { Ok(request) });
        }
        let resolver = resolver.clone();
        Box::pin(async move {
            match resolver.get::<HttpRequest>().await {
                Ok(shared) => Ok((*shared).clone()),
                Err(Error::UnboundAbstract(_)) => {
                    Err(Error::MissingArgument("HttpRequest".to_string()))
                }
                Err(e) => Err(e),
            }
        })
    }
}

/// Parameters captured from the matched route pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams(pub HashMap<String, String>);

impl RouteParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Parse a captured parameter into `T`.
    pub fn parse<T: FromStr>(&self, name: &str) -> Result<T> {
        let raw = self
            .get(name)
            .ok_or_else(|| Error::BadRequest(format!("missing route parameter '{}'", name)))?;
        raw.parse()
            .map_err(|_| Error::BadRequest(format!("invalid route parameter '{}'", name)))
    }
}

impl Dependency for RouteParams {
    fn extract(_resolver: &Resolver, args: &mut Arguments) -> BoxFuture<'static, Result<Self>> {
        let params = args.take::<RouteParams>().unwrap_or_default();
        Box::pin(async move { Ok(params) })
    }
}

/// HTTP response wrapper
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn created() -> Self {
        Self::new(201)
    }

    pub fn no_content() -> Self {
        Self::new(204)
    }

    pub fn not_found() -> Self {
        Self::new(404)
    }

    pub fn internal_server_error() -> Self {
        Self::new(500)
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_json<T: Serialize>(mut self, value: &T) -> Result<Self> {
        self.body = serde_json::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))?;
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap_or_default()
    }
}

/// JSON response helper
#[derive(Debug)]
pub struct Json<T: Serialize>(pub T);

/// Conversion of endpoint return values into responses.
pub trait IntoResponse {
    fn into_response(self) -> Result<HttpResponse>;
}

impl IntoResponse for HttpResponse {
    fn into_response(self) -> Result<HttpResponse> {
        Ok(self)
    }
}

impl<R: IntoResponse> IntoResponse for Result<R> {
    fn into_response(self) -> Result<HttpResponse> {
        self?.into_response()
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Result<HttpResponse> {
        Ok(HttpResponse::ok()
            .with_header("Content-Type", "text/plain; charset=utf-8")
            .with_body(self))
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Result<HttpResponse> {
        self.to_string().into_response()
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Result<HttpResponse> {
        Ok(HttpResponse::no_content())
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Result<HttpResponse> {
        HttpResponse::ok().with_json(&self.0)
    }
}

/// Parse a query string into a map of parameters
fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (key, value) = part.split_once('=').unwrap_or((part, ""));
            (decode(key), decode(value))
        })
        .collect()
}

fn decode(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    urlencoding::decode(&raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_splits_query_string() {
        let req = HttpRequest::new("get", "/search?q=rust+lang&page=2&flag");
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/search");
        assert_eq!(req.query("q"), Some("rust lang"));
        assert_eq!(req.query("page"), Some("2"));
        assert_eq!(req.query("flag"), Some(""));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = HttpRequest::new("GET", "/").with_header("X-Request-Id", "abc");
        assert_eq!(req.header("x-request-id"), Some("abc"));
    }

    #[test]
    fn test_into_response_variants() {
        let res = "hello".into_response().unwrap();
        assert_eq!(res.status, 200);
        assert_eq!(res.body_str(), "hello");

        let res = ().into_response().unwrap();
        assert_eq!(res.status, 204);

        let res = Json(serde_json::json!({"ok": true})).into_response().unwrap();
        assert_eq!(res.header("content-type"), Some("application/json"));

        let err: Result<HttpResponse> = Err(Error::NotFound("x".into()));
        assert!(err.into_response().is_err());
    }

    #[test]
    fn test_route_params_parse() {
        let mut map = HashMap::new();
        map.insert("id".to_string(), "42".to_string());
        let params = RouteParams(map);
        assert_eq!(params.parse::<u32>("id").unwrap(), 42);
        assert!(params.parse::<u32>("missing").is_err());
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("patch".parse::<HttpMethod>().unwrap(), HttpMethod::PATCH);
        assert!("BREW".parse::<HttpMethod>().is_err());
    }
}
