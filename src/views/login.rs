use super::Outcome;
use crate::api::{auth, Api, HttpClient};
use crate::router::Route;
use crate::session::{self, Session};
use crate::token;
use anyhow::Result;

pub const INVALID_CREDENTIALS: &str = "Invalid credentials. Check your email and password.";
pub const MISSING_FIELDS: &str = "Email and password are required.";

#[derive(Debug, Default)]
pub struct LoginView {
    pub email: String,
    pub password: String,
    pub error: Option<String>,
}

impl LoginView {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stored token whose role decodes skips the form, provided the
    /// landing route would admit it
    pub fn on_mount(&self, session: &Session) -> Outcome {
        let Some(role) = session.token().and_then(token::role_from_token) else {
            return Outcome::Stay;
        };
        let landing = Route::landing_for(role);
        match landing.requirement() {
            Some(requirement) if session::authorize(session, requirement).is_err() => {
                Outcome::Stay
            }
            _ => Outcome::Navigate(landing),
        }
    }

    pub fn submit(&mut self, http: &dyn HttpClient, session: &mut Session) -> Result<Outcome> {
        self.error = None;

        if self.email.trim().is_empty() || self.password.is_empty() {
            self.error = Some(MISSING_FIELDS.to_string());
            return Ok(Outcome::Stay);
        }

        let api = Api::new(http, None);
        let token = match auth::login(&api, self.email.trim(), &self.password) {
            Ok(Some(token)) => token,
            Ok(None) | Err(_) => {
                self.error = Some(INVALID_CREDENTIALS.to_string());
                return Ok(Outcome::Stay);
            }
        };

        session.login(&token)?;
        self.password.clear();

        Ok(match token::role_from_token(&token) {
            Some(role) => Outcome::Navigate(Route::landing_for(role)),
            None => Outcome::Stay,
        })
    }
}
