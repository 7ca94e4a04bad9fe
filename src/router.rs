use crate::models::Role;
use crate::session::Requirement;

/// The four screens, addressed by path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    Dashboard,
    Profile,
}

impl Route {
    pub const ALL: [Route; 4] = [Route::Login, Route::Register, Route::Dashboard, Route::Profile];

    pub fn parse(path: &str) -> Option<Self> {
        let path = path.trim();
        let path = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        match path {
            "/" | "" => Some(Self::Login),
            "/register" => Some(Self::Register),
            "/dashboard" => Some(Self::Dashboard),
            "/profile" => Some(Self::Profile),
            _ => None,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Self::Login => "/",
            Self::Register => "/register",
            Self::Dashboard => "/dashboard",
            Self::Profile => "/profile",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Login => "Login",
            Self::Register => "Register",
            Self::Dashboard => "Dashboard - Users",
            Self::Profile => "User Profile",
        }
    }

    /// Where a freshly authenticated user of `role` lands
    pub fn landing_for(role: Role) -> Self {
        match role {
            Role::Admin => Self::Dashboard,
            Role::User => Self::Profile,
        }
    }

    /// Session requirement for protected routes
    pub fn requirement(&self) -> Option<Requirement> {
        match self {
            Self::Dashboard => Some(Requirement::Role(Role::Admin)),
            Self::Profile => Some(Requirement::AnyValid),
            Self::Login | Self::Register => None,
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}
