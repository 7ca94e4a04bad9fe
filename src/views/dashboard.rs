//! Admin dashboard: paginated user list with create, edit, and delete.

use super::{is_valid_email, non_blank, Outcome};
use crate::api::{users, Api, ApiError, HttpClient};
use crate::models::{ListMeta, NewUser, Role, User, UserPage, UserPatch};
use crate::query::{ListQuery, QueryAction, RequestSeq, Ticket};
use crate::router::Route;
use crate::session::{self, Denial, Session};

pub const EMPTY_UPDATE: &str = "Fill in at least one field to update.";
pub const CREATE_REQUIRED: &str = "Name, email, password and role are required.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const LOAD_FAILED: &str = "Could not load users.";
pub const CREATE_FAILED: &str = "Could not create user.";
pub const UPDATE_FAILED: &str = "Could not update user.";
pub const DELETE_FAILED: &str = "Could not delete user.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl Default for CreateForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            password: String::new(),
            role: Role::User,
        }
    }
}

impl CreateForm {
    pub fn validate(&self) -> Result<NewUser, &'static str> {
        if self.name.trim().is_empty() || self.email.trim().is_empty() || self.password.is_empty()
        {
            return Err(CREATE_REQUIRED);
        }
        if !is_valid_email(&self.email) {
            return Err(INVALID_EMAIL);
        }
        Ok(NewUser {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            role: self.role,
        })
    }
}

/// Edit form; blank fields are left out of the patch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl UpdateForm {
    pub fn to_patch(&self) -> UserPatch {
        UserPatch {
            name: non_blank(&self.name),
            email: non_blank(&self.email),
            password: (!self.password.trim().is_empty()).then(|| self.password.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Editing {
    pub user: User,
    pub form: UpdateForm,
}

#[derive(Debug, Default)]
pub struct DashboardView {
    pub query: ListQuery,
    pub users: Vec<User>,
    pub meta: Option<ListMeta>,
    /// Open create modal
    pub creating: Option<CreateForm>,
    /// Open edit modal
    pub editing: Option<Editing>,
    pub error: Option<String>,
    pub notice: Option<String>,
    seq: RequestSeq,
}

impl DashboardView {
    pub fn new(query: ListQuery) -> Self {
        Self {
            query,
            ..Default::default()
        }
    }

    /// Verify the session holds an ADMIN token, then load the first page.
    /// Nothing is requested before the check passes.
    pub fn on_mount(
        &mut self,
        http: &dyn HttpClient,
        session: &Session,
    ) -> Result<Outcome, Denial> {
        if let Some(requirement) = Route::Dashboard.requirement() {
            session::authorize(session, requirement)?;
        }
        self.refresh(http, session);
        Ok(Outcome::Stay)
    }

    /// Fetch the page described by the current query
    pub fn refresh(&mut self, http: &dyn HttpClient, session: &Session) {
        let ticket = self.seq.issue();
        let result = users::list_users(&Api::new(http, session.token()), &self.query);
        self.receive(ticket, result);
    }

    /// Apply a list response unless a newer request has been issued since.
    /// Returns whether the response was applied.
    pub fn receive(&mut self, ticket: Ticket, result: Result<UserPage, ApiError>) -> bool {
        if !self.seq.is_current(ticket) {
            return false;
        }
        match result {
            Ok(page) => {
                self.users = page.data;
                self.meta = Some(page.meta);
                self.error = None;
            }
            Err(_) => {
                self.error = Some(LOAD_FAILED.to_string());
            }
        }
        true
    }

    /// Change filter, sort, or page; refetch when the query actually moved
    pub fn control(
        &mut self,
        http: &dyn HttpClient,
        session: &Session,
        action: QueryAction,
    ) -> bool {
        let changed = self.query.apply(action, self.meta.as_ref());
        if changed {
            self.refresh(http, session);
        }
        changed
    }

    pub fn can_prev(&self) -> bool {
        self.query.page > 1
    }

    pub fn can_next(&self) -> bool {
        self.meta.is_some_and(|m| m.has_page_after(self.query.page))
    }

    pub fn open_create(&mut self) {
        self.creating = Some(CreateForm::default());
    }

    pub fn cancel_create(&mut self) {
        self.creating = None;
    }

    pub fn submit_create(&mut self, http: &dyn HttpClient, session: &Session) {
        self.error = None;
        let Some(form) = &self.creating else {
            return;
        };
        let new_user = match form.validate() {
            Ok(u) => u,
            Err(message) => {
                self.error = Some(message.to_string());
                return;
            }
        };

        match users::create_user(&Api::new(http, session.token()), &new_user) {
            Ok(_) => {
                self.creating = None;
                self.notice = Some(format!("Created user {}.", new_user.email));
                self.refresh(http, session);
            }
            Err(_) => self.error = Some(CREATE_FAILED.to_string()),
        }
    }

    /// Open the editor for a user on the current page, or fetch it by id
    pub fn open_edit(&mut self, http: &dyn HttpClient, session: &Session, id: &str) -> bool {
        self.error = None;
        let user = match self.users.iter().find(|u| u.id == id) {
            Some(u) => u.clone(),
            None => match users::get_user(&Api::new(http, session.token()), id) {
                Ok(u) => u,
                Err(_) => {
                    self.error = Some(format!("No user with id {}.", id));
                    return false;
                }
            },
        };
        self.editing = Some(Editing {
            user,
            form: UpdateForm::default(),
        });
        true
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    pub fn submit_edit(&mut self, http: &dyn HttpClient, session: &Session) {
        self.error = None;
        let Some(editing) = &self.editing else {
            return;
        };
        let patch = editing.form.to_patch();
        if patch.is_empty() {
            self.error = Some(EMPTY_UPDATE.to_string());
            return;
        }

        let id = editing.user.id.clone();
        match users::update_user(&Api::new(http, session.token()), &id, &patch) {
            Ok(_) => {
                self.editing = None;
                self.notice = Some(format!("Updated user {}.", id));
                self.refresh(http, session);
            }
            Err(_) => self.error = Some(UPDATE_FAILED.to_string()),
        }
    }

    /// Delete a user; the caller has already confirmed
    pub fn delete(&mut self, http: &dyn HttpClient, session: &Session, id: &str) {
        self.error = None;
        match users::delete_user(&Api::new(http, session.token()), id) {
            Ok(()) => {
                self.notice = Some(format!("Deleted user {}.", id));
                self.refresh(http, session);
            }
            Err(_) => self.error = Some(DELETE_FAILED.to_string()),
        }
    }
}

impl From<Denial> for Outcome {
    fn from(_: Denial) -> Self {
        Outcome::Navigate(Route::Login)
    }
}
