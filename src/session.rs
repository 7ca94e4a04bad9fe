//! Session context: the persisted token slot and the navigation gate.
//!
//! The token is kept in a single file. `Session::login` creates it,
//! `Session::logout` removes it; nothing else writes the slot. Views receive
//! the `Session` explicitly and consult `Gate` before doing anything that
//! needs an authenticated user.

use crate::models::Role;
use crate::token::{self, Claims, TokenError};
use anyhow::{Context as _, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// File-backed storage for the raw token string
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.conectar/session`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".conectar").join("session"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session file {}", self.path.display()))?;
        let token = content.trim();
        Ok(if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        })
    }

    pub fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let context = || format!("Failed to write session file {}", self.path.display());
        let mut file = options.open(&self.path).with_context(context)?;
        file.write_all(token.as_bytes()).with_context(context)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove session file {}", self.path.display())),
        }
    }
}

pub struct Session {
    store: SessionStore,
    token: Option<String>,
}

impl Session {
    /// Open the session, picking up a token left by a previous run
    pub fn open(store: SessionStore) -> Result<Self> {
        let token = store.load()?;
        Ok(Self { store, token })
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn login(&mut self, token: &str) -> Result<()> {
        self.store.save(token)?;
        self.token = Some(token.to_string());
        Ok(())
    }

    /// The file goes first: if it cannot be removed the session stays
    /// active rather than silently coming back on the next run.
    pub fn logout(&mut self) -> Result<()> {
        self.store.clear()?;
        self.token = None;
        Ok(())
    }

    pub fn claims(&self) -> Option<Result<Claims, TokenError>> {
        self.token.as_deref().map(token::decode)
    }
}

/// What a view demands of the session before it renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Role(Role),
    AnyValid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    NoToken,
    Malformed(TokenError),
    WrongRole { required: Role, found: Role },
}

impl std::fmt::Display for Denial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoToken => write!(f, "not logged in"),
            Self::Malformed(e) => write!(f, "invalid session token: {}", e),
            Self::WrongRole { required, found } => {
                write!(f, "requires role {}, session has {}", required, found)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Unauthenticated,
    Verifying,
    Authorized(Claims),
    Denied(Denial),
}

impl GateState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Authorized(_) | Self::Denied(_))
    }
}

/// Per-view access check. Starts unauthenticated and only reaches
/// `Authorized` by way of `Verifying`.
#[derive(Debug)]
pub struct Gate {
    requirement: Requirement,
    state: GateState,
}

impl Gate {
    pub fn new(requirement: Requirement) -> Self {
        Self {
            requirement,
            state: GateState::Unauthenticated,
        }
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    /// Take one transition
    pub fn advance(&mut self, session: &Session) -> &GateState {
        self.state = match &self.state {
            GateState::Unauthenticated => match session.token() {
                Some(_) => GateState::Verifying,
                None => GateState::Denied(Denial::NoToken),
            },
            GateState::Verifying => match session.claims() {
                None => GateState::Denied(Denial::NoToken),
                Some(Err(e)) => GateState::Denied(Denial::Malformed(e)),
                Some(Ok(claims)) => match self.requirement {
                    Requirement::Role(required) if claims.role != required => {
                        GateState::Denied(Denial::WrongRole {
                            required,
                            found: claims.role,
                        })
                    }
                    // Self-service views are keyed on the subject
                    Requirement::AnyValid if claims.sub.is_none() => {
                        GateState::Denied(Denial::Malformed(TokenError::MissingClaim("sub")))
                    }
                    _ => GateState::Authorized(claims),
                },
            },
            terminal => terminal.clone(),
        };
        &self.state
    }

    /// Run to a terminal state
    pub fn resolve(mut self, session: &Session) -> Result<Claims, Denial> {
        while !self.state.is_terminal() {
            self.advance(session);
        }
        match self.state {
            GateState::Authorized(claims) => Ok(claims),
            GateState::Denied(denial) => Err(denial),
            _ => unreachable!("gate stopped in a non-terminal state"),
        }
    }
}

/// Check `session` against `requirement`
pub fn authorize(session: &Session, requirement: Requirement) -> Result<Claims, Denial> {
    Gate::new(requirement).resolve(session)
}
