//! HTTP client for the user administration REST API.
//!
//! `HttpClient` is the seam between the typed accessors in `auth` and
//! `users` and the wire. `UreqClient` is the real implementation; tests plug
//! in a recording mock.

pub mod auth;
pub mod users;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("could not encode request body: {0}")]
    Encode(String),

    #[error("invalid user id '{0}'")]
    InvalidId(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

impl Request {
    pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::Encode(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into `ApiError::Status`
    pub fn success(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            let body = match self.body {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            Err(ApiError::Status {
                status: self.status,
                body,
            })
        }
    }

    pub fn json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        serde_json::from_value(self.body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Trait for HTTP transports to allow mocking
pub trait HttpClient {
    /// Send a request. Any HTTP status is a successful `Response`; only
    /// transport failures are errors.
    fn send(&self, request: &Request) -> Result<Response, ApiError>;
}

pub struct UreqClient {
    base_url: String,
    agent: ureq::Agent,
}

impl UreqClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl HttpClient for UreqClient {
    fn send(&self, request: &Request) -> Result<Response, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);

        let mut req = self
            .agent
            .request(request.method.as_str(), &url)
            .set("Accept", "application/json");
        for (key, value) in &request.query {
            req = req.query(key, value);
        }
        if let Some(token) = &request.bearer {
            req = req.set("Authorization", &format!("Bearer {}", token));
        }

        let result = match &request.body {
            Some(body) => req
                .set("Content-Type", "application/json")
                .send_json(body.clone()),
            None => req.call(),
        };

        let resp = match result {
            Ok(r) => r,
            Err(ureq::Error::Status(_, r)) => r,
            Err(e) => return Err(ApiError::Transport(e.to_string())),
        };

        let status = resp.status();
        let text = resp
            .into_string()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Response {
            status,
            body: parse_body(&text),
        })
    }
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// An API handle: transport plus the current session's bearer token
pub struct Api<'a> {
    http: &'a dyn HttpClient,
    token: Option<&'a str>,
}

impl<'a> Api<'a> {
    pub fn new(http: &'a dyn HttpClient, token: Option<&'a str>) -> Self {
        Self { http, token }
    }

    pub fn request(&self, method: Method, path: &str) -> Request {
        Request {
            method,
            path: path.to_string(),
            query: Vec::new(),
            body: None,
            bearer: self.token.map(String::from),
        }
    }

    pub fn send(&self, request: &Request) -> Result<Response, ApiError> {
        self.http.send(request)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Replays queued responses and records every request it receives
    #[derive(Default)]
    pub struct MockHttp {
        pub requests: RefCell<Vec<Request>>,
        responses: RefCell<VecDeque<Result<Response, ApiError>>>,
    }

    impl MockHttp {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(&self, status: u16, body: Value) -> &Self {
            self.responses
                .borrow_mut()
                .push_back(Ok(Response { status, body }));
            self
        }

        pub fn fail(&self, message: &str) -> &Self {
            self.responses
                .borrow_mut()
                .push_back(Err(ApiError::Transport(message.to_string())));
            self
        }

        pub fn calls(&self) -> usize {
            self.requests.borrow().len()
        }

        pub fn last(&self) -> Request {
            self.requests
                .borrow()
                .last()
                .cloned()
                .expect("no request was sent")
        }
    }

    /// Lets a test keep a handle on the mock after boxing it into a context
    impl HttpClient for Rc<MockHttp> {
        fn send(&self, request: &Request) -> Result<Response, ApiError> {
            self.as_ref().send(request)
        }
    }

    impl HttpClient for MockHttp {
        fn send(&self, request: &Request) -> Result<Response, ApiError> {
            self.requests.borrow_mut().push(request.clone());
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::Transport("no response queued".to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(""), Value::Null);
        assert_eq!(parse_body("{\"ok\":true}"), json!({ "ok": true }));
        assert_eq!(parse_body("ok"), json!("ok"));
    }

    #[test]
    fn test_non_success_becomes_status_error() {
        let resp = Response {
            status: 404,
            body: json!({ "message": "User not found" }),
        };
        match resp.success() {
            Err(ApiError::Status { status, body }) => {
                assert_eq!(status, 404);
                assert!(body.contains("User not found"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_request_carries_bearer() {
        let http = mock::MockHttp::new();
        let api = Api::new(&http, Some("tok"));
        let req = api.request(Method::Get, "/users");
        assert_eq!(req.bearer.as_deref(), Some("tok"));

        let anonymous = Api::new(&http, None).request(Method::Post, "/auth/login");
        assert!(anonymous.bearer.is_none());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = UreqClient::new("http://localhost:3000/", Duration::from_secs(1));
        assert_eq!(client.base_url(), "http://localhost:3000");
    }
}
