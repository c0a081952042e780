use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Permission;

/// Role identifier used for RBAC.
///
/// Roles are opaque strings in tokens; [`permissions_for_roles`] is the single
/// place they are mapped to permissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));
    pub const MEMBER: Role = Role(Cow::Borrowed("member"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve the permissions granted by a set of roles.
///
/// - `admin` grants the wildcard.
/// - `member` (legacy name: `user`) may browse, borrow and manage own loans/holds.
/// - Unknown roles grant nothing.
pub fn permissions_for_roles(roles: &[Role]) -> Vec<Permission> {
    if roles.iter().any(|r| r.as_str() == "admin") {
        return vec![Permission::WILDCARD];
    }

    if roles.iter().any(|r| matches!(r.as_str(), "member" | "user")) {
        return vec![
            Permission::CATALOG_READ,
            Permission::LOANS_BORROW,
            Permission::LOANS_RETURN,
            Permission::LOANS_RENEW,
            Permission::LOANS_READ_OWN,
            Permission::HOLDS_MANAGE,
        ];
    }

    Vec::new()
}
