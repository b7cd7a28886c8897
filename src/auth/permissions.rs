//! Roles and the permission policy applied before guarded operations
//!
//! Admins may do anything. Members may act only on resources they own.
//! Resources with no owner (the user directory, the category catalogue)
//! are therefore admin-only for whichever action is being guarded.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::auth::Principal;
use crate::types::{QuillError, RespCode, Result};

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Member,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Member => write!(f, "member"),
        }
    }
}

impl FromStr for Role {
    type Err = QuillError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            _ => Err(QuillError::Rejected(RespCode::InvalidRole)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    List,
    Create,
    Edit,
    Delete,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::List => "list",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    User,
    Category,
    Article,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::User => "user",
            ResourceKind::Category => "category",
            ResourceKind::Article => "article",
        }
    }
}

/// Target of an authorization decision
#[derive(Debug, Clone, Copy)]
pub struct Resource<'a> {
    pub kind: ResourceKind,
    pub owner_id: Option<&'a str>,
}

impl<'a> Resource<'a> {
    /// A single record owned by `owner_id` (for users, the user itself)
    pub fn owned(kind: ResourceKind, owner_id: &'a str) -> Self {
        Self {
            kind,
            owner_id: Some(owner_id),
        }
    }

    /// A whole collection, or a record nobody owns
    pub fn unowned(kind: ResourceKind) -> Self {
        Self {
            kind,
            owner_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(RespCode),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Turn a denial into a `NoPermission` rejection
    pub fn into_result(self) -> Result<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(code) => Err(QuillError::Rejected(code)),
        }
    }
}

/// Decide whether `principal` may perform `action` on `resource`
///
/// Every action on every kind follows the same ownership rule for members.
pub fn authorize(principal: &Principal, action: Action, resource: Resource<'_>) -> Decision {
    let decision = match principal.role {
        Role::Admin => Decision::Allow,
        Role::Member => match resource.owner_id {
            Some(owner) if owner == principal.user_id => Decision::Allow,
            Some(_) | None => Decision::Deny(RespCode::NoPermission),
        },
    };

    if let Decision::Deny(_) = decision {
        debug!(
            user_id = %principal.user_id,
            action = action.as_str(),
            kind = resource.kind.as_str(),
            "Permission denied"
        );
    }
    decision
}
