use super::{non_blank, Outcome, MIN_PASSWORD_LEN, PASSWORD_TOO_SHORT};
use crate::api::{users, Api, HttpClient};
use crate::models::{User, UserPatch};
use crate::router::Route;
use crate::session::{self, Session};
use crate::token;

pub const NO_CHANGES: &str = "No changes made.";
pub const UPDATED: &str = "Profile updated successfully.";
pub const LOAD_FAILED: &str = "Could not load profile.";
pub const UPDATE_FAILED: &str = "Could not update profile.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    pub name: String,
    pub password: String,
}

impl ProfileForm {
    pub fn to_patch(&self) -> Result<UserPatch, &'static str> {
        let password_given = !self.password.trim().is_empty();
        if password_given && self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(PASSWORD_TOO_SHORT);
        }
        let patch = UserPatch {
            name: non_blank(&self.name),
            email: None,
            password: password_given.then(|| self.password.clone()),
        };
        if patch.is_empty() {
            return Err(NO_CHANGES);
        }
        Ok(patch)
    }
}

/// Self-service profile for any logged-in user
#[derive(Debug, Default)]
pub struct ProfileView {
    pub user: Option<User>,
    pub editing: bool,
    pub form: ProfileForm,
    pub error: Option<String>,
    pub notice: Option<String>,
}

impl ProfileView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_mount(&mut self, http: &dyn HttpClient, session: &Session) -> Outcome {
        if let Some(requirement) = Route::Profile.requirement() {
            if session::authorize(session, requirement).is_err() {
                return Outcome::Navigate(Route::Login);
            }
        }
        self.fetch_user(http, session)
    }

    /// Load the account named by the token's subject claim
    pub fn fetch_user(&mut self, http: &dyn HttpClient, session: &Session) -> Outcome {
        let Some(raw) = session.token() else {
            return Outcome::Navigate(Route::Login);
        };
        let user_id = match token::subject_from_token(raw) {
            Ok(id) => id,
            Err(e) => {
                eprintln!("Error: could not read user id from session token: {}", e);
                return Outcome::Navigate(Route::Login);
            }
        };

        match users::get_user(&Api::new(http, Some(raw)), &user_id) {
            Ok(user) => {
                self.user = Some(user);
                self.error = None;
            }
            Err(_) => self.error = Some(LOAD_FAILED.to_string()),
        }
        Outcome::Stay
    }

    pub fn start_edit(&mut self) {
        self.editing = true;
        self.form = ProfileForm::default();
        self.error = None;
        self.notice = None;
    }

    pub fn cancel_edit(&mut self) {
        self.editing = false;
        self.form = ProfileForm::default();
        self.error = None;
    }

    pub fn submit(&mut self, http: &dyn HttpClient, session: &Session) -> Outcome {
        let Some(user_id) = self.user.as_ref().map(|u| u.id.clone()) else {
            return Outcome::Stay;
        };
        self.error = None;

        let patch = match self.form.to_patch() {
            Ok(p) => p,
            Err(message) => {
                self.error = Some(message.to_string());
                return Outcome::Stay;
            }
        };

        match users::update_user(&Api::new(http, session.token()), &user_id, &patch) {
            Ok(_) => {
                self.notice = Some(UPDATED.to_string());
                self.editing = false;
                self.form = ProfileForm::default();
                self.fetch_user(http, session)
            }
            Err(_) => {
                self.error = Some(UPDATE_FAILED.to_string());
                Outcome::Stay
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockHttp;
    use crate::views::testing::{empty_session, session_with_role};
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn user_json(id: &str, name: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "email": "bruno@example.com",
            "role": "USER",
            "createdAt": "2023-11-20T08:30:00.000Z"
        })
    }

    #[test]
    fn test_mount_without_session_redirects() {
        let dir = TempDir::new().unwrap();
        let http = MockHttp::new();
        let mut view = ProfileView::new();
        assert_eq!(
            view.on_mount(&http, &empty_session(&dir)),
            Outcome::Navigate(Route::Login)
        );

        let mut broken = empty_session(&dir);
        broken.login("garbage").unwrap();
        assert_eq!(
            view.on_mount(&http, &broken),
            Outcome::Navigate(Route::Login)
        );
        assert_eq!(http.calls(), 0);
    }

    #[test]
    fn test_mount_loads_subject() {
        let dir = TempDir::new().unwrap();
        let session = session_with_role(&dir, "u-7", "USER");
        let http = MockHttp::new();
        http.reply(200, user_json("u-7", "Bruno"));

        let mut view = ProfileView::new();
        assert_eq!(view.on_mount(&http, &session), Outcome::Stay);
        assert_eq!(view.user.as_ref().unwrap().name, "Bruno");
        assert_eq!(http.last().path, "/users/u-7");
    }

    #[test]
    fn test_admin_may_view_own_profile() {
        let dir = TempDir::new().unwrap();
        let session = session_with_role(&dir, "a-1", "ADMIN");
        let http = MockHttp::new();
        http.reply(200, user_json("a-1", "Ana"));

        let mut view = ProfileView::new();
        assert_eq!(view.on_mount(&http, &session), Outcome::Stay);
    }

    #[test]
    fn test_blank_and_short_submissions_stay_local() {
        let dir = TempDir::new().unwrap();
        let session = session_with_role(&dir, "u-7", "USER");
        let http = MockHttp::new();
        http.reply(200, user_json("u-7", "Bruno"));
        let mut view = ProfileView::new();
        view.on_mount(&http, &session);

        view.start_edit();
        view.submit(&http, &session);
        assert_eq!(view.error.as_deref(), Some(NO_CHANGES));

        view.form.password = "short".to_string();
        view.submit(&http, &session);
        assert_eq!(view.error.as_deref(), Some(PASSWORD_TOO_SHORT));
        assert!(view.editing);
        assert_eq!(http.calls(), 1);
    }

    #[test]
    fn test_successful_update_refetches() {
        let dir = TempDir::new().unwrap();
        let session = session_with_role(&dir, "u-7", "USER");
        let http = MockHttp::new();
        http.reply(200, user_json("u-7", "Bruno"));
        let mut view = ProfileView::new();
        view.on_mount(&http, &session);

        view.start_edit();
        view.form.name = "Bruno Lima".to_string();
        http.reply(200, user_json("u-7", "Bruno Lima"))
            .reply(200, user_json("u-7", "Bruno Lima"));
        assert_eq!(view.submit(&http, &session), Outcome::Stay);

        assert!(!view.editing);
        assert_eq!(view.notice.as_deref(), Some(UPDATED));
        assert_eq!(view.user.as_ref().unwrap().name, "Bruno Lima");
        let requests = http.requests.borrow();
        assert_eq!(requests[1].body, Some(json!({ "name": "Bruno Lima" })));
        assert_eq!(requests.len(), 3);
    }

    #[test]
    fn test_form_patch_rules() {
        let form = ProfileForm {
            name: String::new(),
            password: "longenough".to_string(),
        };
        assert_eq!(
            form.to_patch().unwrap(),
            UserPatch {
                password: Some("longenough".to_string()),
                ..Default::default()
            }
        );
    }
}
