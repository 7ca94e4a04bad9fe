//! Wire types shared by the API accessors and the views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Account role as issued by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ADMIN" => Some(Self::Admin),
            "USER" => Some(Self::User),
            _ => None,
        }
    }

    /// Lenient parse for console input ("admin", "User", ...)
    pub fn parse_loose(s: &str) -> Option<Self> {
        Self::parse(&s.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::User => "USER",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user account. The password is accepted on read but never serialized back.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Payload for `POST /users`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Payload for `PATCH /users/:id`; absent fields are left untouched server-side
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.password.is_none()
    }
}

/// Payload for `POST /auth/register`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum SortBy {
    #[serde(rename = "name")]
    Name,
    #[default]
    #[serde(rename = "createdAt")]
    CreatedAt,
}

impl SortBy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "name" => Some(Self::Name),
            "createdat" | "created_at" | "created-at" | "created" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::CreatedAt => "createdAt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Pagination metadata returned alongside a page of users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    pub total: u64,
    pub page: u32,
    pub last_page: u32,
    pub per_page: u32,
}

impl ListMeta {
    /// Whether `page` is below the last page. Takes the caller's page rather
    /// than `self.page`, which is stale after a failed fetch.
    pub fn has_page_after(&self, page: u32) -> bool {
        page < self.last_page
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserPage {
    pub data: Vec<User>,
    pub meta: ListMeta,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_from_backend_json() {
        let user: User = serde_json::from_value(json!({
            "id": "8c1f",
            "name": "Ana",
            "email": "ana@example.com",
            "password": "$2b$10$hash",
            "role": "ADMIN",
            "createdAt": "2024-03-01T12:00:00.000Z"
        }))
        .unwrap();
        assert_eq!(user.id, "8c1f");
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.created_at.to_rfc3339(), "2024-03-01T12:00:00+00:00");
    }

    #[test]
    fn test_numeric_id_and_missing_password() {
        let user: User = serde_json::from_value(json!({
            "id": 42,
            "name": "Bruno",
            "email": "bruno@example.com",
            "role": "USER",
            "createdAt": "2024-03-01T12:00:00Z"
        }))
        .unwrap();
        assert_eq!(user.id, "42");
        assert!(user.password.is_none());
    }

    #[test]
    fn test_patch_omits_absent_fields() {
        let patch = UserPatch {
            name: Some("New".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({ "name": "New" })
        );
        assert!(UserPatch::default().is_empty());
    }

    #[test]
    fn test_sort_params_wire_names() {
        assert_eq!(
            serde_json::to_value(SortBy::CreatedAt).unwrap(),
            json!("createdAt")
        );
        assert_eq!(SortBy::parse("createdAt"), Some(SortBy::CreatedAt));
        assert_eq!(SortOrder::parse("ASC"), Some(SortOrder::Asc));
        assert_eq!(Role::parse_loose(" admin "), Some(Role::Admin));
        assert_eq!(Role::parse("admin"), None);
    }

    #[test]
    fn test_meta_bounds() {
        let meta = ListMeta {
            total: 12,
            page: 1,
            last_page: 3,
            per_page: 5,
        };
        assert!(meta.has_page_after(1));
        assert!(meta.has_page_after(2));
        assert!(!meta.has_page_after(3));
        assert!(!meta.has_page_after(4));

        let empty = ListMeta {
            total: 0,
            page: 1,
            last_page: 0,
            per_page: 5,
        };
        assert!(!empty.has_page_after(1));
    }
}
