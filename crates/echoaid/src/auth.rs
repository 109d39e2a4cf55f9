//! Mock authentication.
//!
//! Users live in an in-memory list seeded at startup; passwords are accepted
//! but never checked. The signed-in user is persisted under
//! [`CURRENT_USER_KEY`] so a session survives restarts. Every call waits a
//! configurable simulated latency before answering.

use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::request::Coordinates;
use crate::storage::{load_json, save_json, KeyValueStore, CURRENT_USER_KEY};

/// Default simulated auth latency.
pub const DEFAULT_AUTH_LATENCY: Duration = Duration::from_millis(500);

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

/// What a user does on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    /// Raises SOS requests.
    Requester,
    /// Triages and accepts missions.
    Volunteer,
    /// Marked safe; checks on others.
    Safe,
}

impl UserRole {
    /// All roles, in signup order.
    pub const ALL: [Self; 3] = [Self::Requester, Self::Volunteer, Self::Safe];
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Requester => write!(f, "Requester"),
            Self::Volunteer => write!(f, "Volunteer"),
            Self::Safe => write!(f, "Safe"),
        }
    }
}

/// A platform user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Role.
    pub role: UserRole,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_photo: Option<String>,
    /// Home location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Coordinates>,
    /// Volunteer skills.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
    /// Identity checked by the Aegis pipeline.
    #[serde(default)]
    pub is_aegis_verified: bool,
    /// Organisation the volunteer belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
}

impl User {
    /// A freshly signed-up user with no profile extras.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        role: UserRole,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            role,
            profile_photo: None,
            location: None,
            skills: Vec::new(),
            is_aegis_verified: false,
            affiliation: None,
        }
    }
}

/// Mock authentication service.
#[derive(Debug)]
pub struct AuthService {
    store: Arc<dyn KeyValueStore>,
    users: Vec<User>,
    current: Option<User>,
    latency: Duration,
    email_pattern: Regex,
}

impl AuthService {
    /// Create the service over a user list, restoring any persisted session.
    ///
    /// A malformed persisted user is discarded. A persisted user missing
    /// from the list (a previous signup) is added to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn new(store: Arc<dyn KeyValueStore>, users: Vec<User>, latency: Duration) -> Result<Self> {
        let email_pattern = Regex::new(EMAIL_PATTERN)
            .map_err(|e| Error::internal(format!("email pattern: {e}")))?;
        let current: Option<User> = load_json(store.as_ref(), CURRENT_USER_KEY)?;

        let mut users = users;
        if let Some(user) = &current {
            debug!("Restored session for {}", user.email);
            if !users.iter().any(|u| u.email == user.email) {
                users.push(user.clone());
            }
        }

        Ok(Self {
            store,
            users,
            current,
            latency,
            email_pattern,
        })
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<&User> {
        self.current.as_ref()
    }

    /// Every known user.
    #[must_use]
    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// Look a user up by id.
    #[must_use]
    pub fn find_user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    /// Sign in by email. The password is not checked.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCredentials`] if no user has that email.
    pub async fn login(&mut self, email: &str, _password: &str) -> Result<User> {
        tokio::time::sleep(self.latency).await;

        let email = email.trim();
        let user = self
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(Error::InvalidCredentials)?;

        self.set_current(Some(user.clone()))?;
        info!("Signed in as {} ({})", user.email, user.role);
        Ok(user)
    }

    /// Register a new user and sign them in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSignup`] for a blank name or malformed email,
    /// and [`Error::UserExists`] if the email is already registered.
    pub async fn signup(
        &mut self,
        name: &str,
        email: &str,
        _password: &str,
        role: UserRole,
    ) -> Result<User> {
        tokio::time::sleep(self.latency).await;

        let name = name.trim();
        let email = email.trim();
        if name.is_empty() {
            return Err(Error::InvalidSignup {
                message: "Please enter your name.".to_string(),
            });
        }
        if !self.email_pattern.is_match(email) {
            return Err(Error::InvalidSignup {
                message: "Please enter a valid email address.".to_string(),
            });
        }
        if self.users.iter().any(|u| u.email == email) {
            return Err(Error::UserExists {
                email: email.to_string(),
            });
        }

        let user = User::new(format!("user-{}", Uuid::new_v4().simple()), name, email, role);
        self.users.push(user.clone());
        self.set_current(Some(user.clone()))?;
        info!("Signed up {} as {}", user.email, user.role);
        Ok(user)
    }

    /// Sign out and forget the persisted session.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn logout(&mut self) -> Result<()> {
        if let Some(user) = &self.current {
            info!("Signed out {}", user.email);
        }
        self.set_current(None)
    }

    /// The signed-in user, if their role is one of `allowed`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAuthenticated`] if nobody is signed in and
    /// [`Error::Forbidden`] if the role is not allowed.
    pub fn require_role(&self, allowed: &[UserRole], action: &str) -> Result<&User> {
        let user = self.current.as_ref().ok_or(Error::NotAuthenticated)?;
        if allowed.contains(&user.role) {
            Ok(user)
        } else {
            Err(Error::Forbidden {
                role: user.role.to_string(),
                action: action.to_string(),
            })
        }
    }

    fn set_current(&mut self, user: Option<User>) -> Result<()> {
        match &user {
            Some(u) => save_json(self.store.as_ref(), CURRENT_USER_KEY, u)?,
            None => {
                self.store.remove(CURRENT_USER_KEY)?;
            }
        }
        self.current = user;
        Ok(())
    }
}
