use super::{Api, ApiError, Method};
use crate::models::{NewUser, User, UserPage, UserPatch};
use crate::query::{self, ListQuery};
use serde::Deserialize;

/// `GET /users` answers either a page envelope or, on older deployments,
/// the whole list.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody {
    Paged(UserPage),
    Plain(Vec<User>),
}

/// `GET /users?role&sortBy&sortOrder&page&perPage`
pub fn list_users(api: &Api, list_query: &ListQuery) -> Result<UserPage, ApiError> {
    let mut req = api.request(Method::Get, "/users");
    req.query = list_query.params();

    match api.send(&req)?.success()?.json::<ListBody>()? {
        ListBody::Paged(page) => Ok(page),
        ListBody::Plain(users) => Ok(query::paginate_locally(users, list_query)),
    }
}

/// `GET /users/:id`
pub fn get_user(api: &Api, id: &str) -> Result<User, ApiError> {
    let req = api.request(Method::Get, &user_path(id)?);
    api.send(&req)?.success()?.json()
}

/// `POST /users`. Any 2xx is success; the echoed user is returned when the
/// body has that shape.
pub fn create_user(api: &Api, user: &NewUser) -> Result<Option<User>, ApiError> {
    let req = api.request(Method::Post, "/users").with_json(user)?;
    let resp = api.send(&req)?.success()?;
    Ok(resp.json().ok())
}

/// `PATCH /users/:id`, same success rule as `create_user`
pub fn update_user(api: &Api, id: &str, patch: &UserPatch) -> Result<Option<User>, ApiError> {
    let req = api.request(Method::Patch, &user_path(id)?).with_json(patch)?;
    let resp = api.send(&req)?.success()?;
    Ok(resp.json().ok())
}

/// `DELETE /users/:id`
pub fn delete_user(api: &Api, id: &str) -> Result<(), ApiError> {
    let req = api.request(Method::Delete, &user_path(id)?);
    api.send(&req)?.success()?;
    Ok(())
}

/// Ids are used verbatim; anything that could change the path is rejected
fn user_path(id: &str) -> Result<String, ApiError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
    if valid {
        Ok(format!("/users/{}", id))
    } else {
        Err(ApiError::InvalidId(id.to_string()))
    }
}
