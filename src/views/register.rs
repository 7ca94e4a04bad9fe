use super::{is_valid_email, Outcome, MIN_PASSWORD_LEN, PASSWORD_TOO_SHORT};
use crate::api::{auth, Api, HttpClient};
use crate::models::Registration;
use crate::router::Route;

pub const REGISTERED: &str = "User registered successfully!";
pub const PASSWORDS_DIFFER: &str = "Passwords do not match.";
pub const REQUIRED_FIELDS: &str = "All fields are required.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const REGISTER_FAILED: &str = "Could not register user.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    /// Local checks, in the order the user sees them
    pub fn validate(&self) -> Result<Registration, &'static str> {
        if self.name.trim().is_empty()
            || self.email.trim().is_empty()
            || self.password.is_empty()
            || self.confirm_password.is_empty()
        {
            return Err(REQUIRED_FIELDS);
        }
        if !is_valid_email(&self.email) {
            return Err(INVALID_EMAIL);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(PASSWORD_TOO_SHORT);
        }
        if self.password != self.confirm_password {
            return Err(PASSWORDS_DIFFER);
        }
        Ok(Registration {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Default)]
pub struct RegisterView {
    pub form: RegisterForm,
    pub error: Option<String>,
    pub success: bool,
}

impl RegisterView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&mut self, http: &dyn HttpClient) -> Outcome {
        self.error = None;
        self.success = false;

        let registration = match self.form.validate() {
            Ok(r) => r,
            Err(message) => {
                self.error = Some(message.to_string());
                return Outcome::Stay;
            }
        };

        match auth::register(&Api::new(http, None), &registration) {
            Ok(201) => {
                self.success = true;
                self.form = RegisterForm::default();
                Outcome::Navigate(Route::Login)
            }
            Ok(_) | Err(_) => {
                self.error = Some(REGISTER_FAILED.to_string());
                Outcome::Stay
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockHttp;
    use serde_json::json;

    fn form(password: &str, confirm: &str) -> RegisterForm {
        RegisterForm {
            name: "Ana Souza".to_string(),
            email: "ana@example.com".to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    fn view_with(form: RegisterForm) -> RegisterView {
        RegisterView {
            form,
            ..Default::default()
        }
    }

    #[test]
    fn test_short_password_rejected_locally() {
        let http = MockHttp::new();
        let mut view = view_with(form("short", "short"));
        assert_eq!(view.submit(&http), Outcome::Stay);
        assert_eq!(view.error.as_deref(), Some(PASSWORD_TOO_SHORT));

        let mut seven = view_with(form("1234567", "1234567"));
        seven.submit(&http);
        assert_eq!(seven.error.as_deref(), Some(PASSWORD_TOO_SHORT));
        assert_eq!(http.calls(), 0);
    }

    #[test]
    fn test_mismatch_rejected_locally() {
        let http = MockHttp::new();
        let mut view = view_with(form("longenough", "longenougH"));
        assert_eq!(view.submit(&http), Outcome::Stay);
        assert_eq!(view.error.as_deref(), Some(PASSWORDS_DIFFER));
        assert_eq!(http.calls(), 0);
    }

    #[test]
    fn test_required_and_email_checks() {
        let mut blank = form("longenough", "longenough");
        blank.name = " ".to_string();
        assert_eq!(blank.validate(), Err(REQUIRED_FIELDS));

        let mut bad_email = form("longenough", "longenough");
        bad_email.email = "ana-at-example".to_string();
        assert_eq!(bad_email.validate(), Err(INVALID_EMAIL));
    }

    #[test]
    fn test_success_redirects_to_login() {
        let http = MockHttp::new();
        http.reply(201, json!({ "id": "1" }));
        let mut view = view_with(form("longenough", "longenough"));

        assert_eq!(view.submit(&http), Outcome::Navigate(Route::Login));
        assert!(view.success);
        assert_eq!(view.form, RegisterForm::default());
        assert_eq!(
            http.last().body,
            Some(json!({
                "name": "Ana Souza",
                "email": "ana@example.com",
                "password": "longenough"
            }))
        );
    }

    #[test]
    fn test_server_rejection_keeps_form() {
        let http = MockHttp::new();
        http.reply(409, json!({ "message": "Email already registered" }));
        let mut view = view_with(form("longenough", "longenough"));

        assert_eq!(view.submit(&http), Outcome::Stay);
        assert_eq!(view.error.as_deref(), Some(REGISTER_FAILED));
        assert_eq!(view.form.name, "Ana Souza");
    }
}
