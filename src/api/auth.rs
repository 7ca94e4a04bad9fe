use super::{Api, ApiError, Method};
use crate::models::Registration;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// `POST /auth/login`. Returns the access token, or `None` when the server
/// did not accept the credentials.
pub fn login(api: &Api, email: &str, password: &str) -> Result<Option<String>, ApiError> {
    let mut req = api.request(Method::Post, "/auth/login");
    req.body = Some(json!({ "email": email, "password": password }));

    let resp = api.send(&req)?;
    if !matches!(resp.status, 200 | 201) {
        return Ok(None);
    }
    let body: LoginResponse = resp.json()?;
    Ok(body.access_token.filter(|t| !t.is_empty()))
}

/// `POST /auth/register`. Returns the HTTP status of an accepted request.
pub fn register(api: &Api, registration: &Registration) -> Result<u16, ApiError> {
    let req = api
        .request(Method::Post, "/auth/register")
        .with_json(registration)?;
    let resp = api.send(&req)?.success()?;
    Ok(resp.status)
}
