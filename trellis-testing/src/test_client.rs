// Test HTTP Client

use trellis_core::{Container, Error, HttpMethod, HttpRequest, HttpResponse, Router};
use std::collections::HashMap;
use std::sync::Arc;

/// Drives requests through [`Router::handle`] against a container.
///
/// Every request runs in its own request scope of `container`, exactly as
/// a server would dispatch it.
#[derive(Clone)]
pub struct TestClient {
    router: Arc<Router>,
    container: Container,
}

impl TestClient {
    pub fn new(router: Arc<Router>, container: Container) -> Self {
        Self { router, container }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(HttpMethod::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: impl Into<Vec<u8>>) -> TestResponse {
        self.request(HttpMethod::POST, path, Some(body.into())).await
    }

    pub async fn put(&self, path: &str, body: impl Into<Vec<u8>>) -> TestResponse {
        self.request(HttpMethod::PUT, path, Some(body.into())).await
    }

    pub async fn patch(&self, path: &str, body: impl Into<Vec<u8>>) -> TestResponse {
        self.request(HttpMethod::PATCH, path, Some(body.into())).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request(HttpMethod::DELETE, path, None).await
    }

    /// Make a request with a custom method
    pub async fn request(&self, method: HttpMethod, path: &str, body: Option<Vec<u8>>) -> TestResponse {
        let mut builder = TestRequestBuilder::new(method, path);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        self.send(builder.build()).await
    }

    /// Dispatch a fully built request
    pub async fn send(&self, request: HttpRequest) -> TestResponse {
        TestResponse(self.router.handle(&self.container, request).await)
    }
}

/// Builder for test requests
pub struct TestRequestBuilder {
    method: HttpMethod,
    path: String,
    headers: HashMap<String, String>,
    body: Vec<u8>,
    query_params: HashMap<String, String>,
}

impl TestRequestBuilder {
    pub fn new(method: HttpMethod, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: HashMap::new(),
            body: Vec::new(),
            query_params: HashMap::new(),
        }
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a JSON body and the matching content type
    pub fn json<T: serde::Serialize>(mut self, data: &T) -> Result<Self, Error> {
        self.body = serde_json::to_vec(data).map_err(|e| Error::Serialization(e.to_string()))?;
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query_params.insert(key.to_string(), value.to_string());
        self
    }

    /// Query parameters given here are merged over any in the path.
    pub fn build(self) -> HttpRequest {
        let mut request = HttpRequest::new(self.method.as_str(), self.path).with_body(self.body);
        request.headers.extend(self.headers);
        request.query_params.extend(self.query_params);
        request
    }
}

/// Response from a test request
#[derive(Debug, Clone)]
pub struct TestResponse(pub HttpResponse);

impl TestResponse {
    pub fn status(&self) -> u16 {
        self.0.status
    }

    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.0.body).into_owned()
    }

    pub fn body_json<T: serde::de::DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.0.body).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Case-insensitive header lookup
    pub fn header(&self, key: &str) -> Option<&str> {
        self.0.header(key)
    }

    pub fn into_inner(self) -> HttpResponse {
        self.0
    }
}

impl From<HttpResponse> for TestResponse {
    fn from(response: HttpResponse) -> Self {
        Self(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = TestRequestBuilder::new(HttpMethod::GET, "/test?page=2")
            .header("Authorization", "Bearer token")
            .query("foo", "bar")
            .build();

        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/test");
        assert_eq!(req.header("authorization"), Some("Bearer token"));
        assert_eq!(req.query("foo"), Some("bar"));
        assert_eq!(req.query("page"), Some("2"));
    }

    #[test]
    fn test_request_builder_json() {
        let req = TestRequestBuilder::new(HttpMethod::POST, "/users")
            .json(&serde_json::json!({"name": "Ada"}))
            .unwrap()
            .build();

        assert_eq!(req.header("content-type"), Some("application/json"));
        let body: serde_json::Value = req.json().unwrap();
        assert_eq!(body["name"], "Ada");
    }

    #[test]
    fn test_response_accessors() {
        let response = TestResponse::from(
            HttpResponse::ok()
                .with_header("X-Trace", "abc")
                .with_body("[1,2]"),
        );

        assert_eq!(response.status(), 200);
        assert_eq!(response.header("x-trace"), Some("abc"));
        assert_eq!(response.body_json::<Vec<u8>>().unwrap(), vec![1, 2]);
        assert!(response.body_json::<String>().is_err());
    }
}
