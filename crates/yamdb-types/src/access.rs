//! Access policies guarding every mutating request.
//!
//! Policies are pure functions of the access kind, the caller and, for object
//! level checks, the owner of the target object. Collection level checks run
//! before a handler touches the request body, object level checks after the
//! target is loaded.

use crate::claim::Role;

/// Kind of access implied by the request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// GET, HEAD, OPTIONS, TRACE
    Read,
    Write,
}

impl Access {
    pub fn from_method_name(method: &str) -> Self {
        match method {
            "GET" | "HEAD" | "OPTIONS" | "TRACE" => Access::Read,
            _ => Access::Write,
        }
    }
}

/// Authenticated user, as seen by the policies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub is_superuser: bool,
}

impl Identity {
    fn is_admin(&self) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Moderator | Role::User => false,
        }
    }

    fn can_moderate(&self) -> bool {
        match self.role {
            Role::Admin | Role::Moderator => true,
            Role::User => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Caller {
    #[default]
    Anonymous,
    User(Identity),
}

impl Caller {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Caller::Anonymous => None,
            Caller::User(identity) => Some(identity),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity().is_some()
    }

    /// Authenticated identity or [`Denial::NotAuthenticated`]
    pub fn require(&self) -> Result<&Identity, Denial> {
        self.identity().ok_or(Denial::NotAuthenticated)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    NotAuthenticated,
    PermissionDenied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Reads for everybody, writes for admins.
    AdminOrReadOnly,
    /// Reads for everybody, writes for authenticated users; changing an
    /// existing object needs its author, a moderator or an admin.
    AuthorAdminModerOrReadOnly,
    /// Admins and superusers only, for any method.
    AdminOnly,
    /// Any authenticated user.
    Authenticated,
}

impl Policy {
    /// Collection level check.
    pub fn check(self, access: Access, caller: &Caller) -> Result<(), Denial> {
        match (self, access) {
            (Policy::AdminOrReadOnly, Access::Read) => Ok(()),
            (Policy::AdminOrReadOnly, Access::Write) => allow(caller.require()?.is_admin()),
            (Policy::AuthorAdminModerOrReadOnly, Access::Read) => Ok(()),
            (Policy::AuthorAdminModerOrReadOnly, Access::Write) => caller.require().map(|_| ()),
            (Policy::AdminOnly, _) => {
                let identity = caller.require()?;
                allow(identity.is_admin() || identity.is_superuser)
            }
            (Policy::Authenticated, _) => caller.require().map(|_| ()),
        }
    }

    /// Object level check, `author_id` is the owner of the target object.
    pub fn check_object(self, access: Access, caller: &Caller, author_id: i64) -> Result<(), Denial> {
        match (self, access) {
            (Policy::AuthorAdminModerOrReadOnly, Access::Read) => Ok(()),
            (Policy::AuthorAdminModerOrReadOnly, Access::Write) => {
                let identity = caller.require()?;
                allow(identity.id == author_id || identity.can_moderate())
            }
            (Policy::AdminOrReadOnly | Policy::AdminOnly | Policy::Authenticated, _) => {
                self.check(access, caller)
            }
        }
    }
}

fn allow(granted: bool) -> Result<(), Denial> {
    if granted {
        Ok(())
    } else {
        Err(Denial::PermissionDenied)
    }
}
