//! Caller identity, resolved once at the authentication boundary.

use serde::{Deserialize, Serialize};

use crate::{ProgressError, UserId, UserProfile};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Trainer,
    User,
}

impl std::str::FromStr for Role {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "trainer" => Ok(Role::Trainer),
            "user" => Ok(Role::User),
            other => Err(ProgressError::Validation(format!("unknown role: {other}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "lowercase")]
pub enum Identity {
    Admin(u64),
    Trainer(u64),
    User(UserId),
}

impl Identity {
    pub fn from_parts(role: Role, id: u64) -> Self {
        match role {
            Role::Admin => Identity::Admin(id),
            Role::Trainer => Identity::Trainer(id),
            Role::User => Identity::User(id),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Identity::Admin(_) => Role::Admin,
            Identity::Trainer(_) => Role::Trainer,
            Identity::User(_) => Role::User,
        }
    }

    pub fn id(&self) -> u64 {
        match *self {
            Identity::Admin(id) | Identity::Trainer(id) | Identity::User(id) => id,
        }
    }

    /// Admins see everyone, trainers see their own clients, users see
    /// themselves.
    pub fn may_view(&self, user: &UserProfile) -> bool {
        match *self {
            Identity::Admin(_) => true,
            Identity::Trainer(trainer_id) => user.trainer_id == Some(trainer_id),
            Identity::User(id) => user.id == id,
        }
    }

    pub fn ensure_may_view(&self, user: &UserProfile) -> Result<(), ProgressError> {
        if self.may_view(user) {
            Ok(())
        } else {
            Err(ProgressError::Forbidden(format!(
                "{:?} {} may not access user {}",
                self.role(),
                self.id(),
                user.id
            )))
        }
    }

    /// The user id when the caller is an end user.
    pub fn as_user(&self) -> Result<UserId, ProgressError> {
        match *self {
            Identity::User(id) => Ok(id),
            _ => Err(ProgressError::Forbidden(
                "only client accounts record their own plan progress".into(),
            )),
        }
    }
}
