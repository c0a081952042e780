use libristack_core::UserId;

use crate::{JwtClaims, Permission, Role, permissions_for_roles};

/// A fully resolved principal for authorization decisions.
///
/// Built once per request from verified claims and passed explicitly into
/// every service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

impl Principal {
    /// Resolve permissions from roles.
    pub fn new(user_id: UserId, roles: Vec<Role>) -> Self {
        let permissions = permissions_for_roles(&roles);
        Self {
            user_id,
            roles,
            permissions,
        }
    }

    pub fn from_claims(claims: &JwtClaims) -> Self {
        Self::new(claims.sub, claims.roles.clone())
    }

    pub fn admin(user_id: UserId) -> Self {
        Self::new(user_id, vec![Role::ADMIN])
    }

    pub fn member(user_id: UserId) -> Self {
        Self::new(user_id, vec![Role::MEMBER])
    }

    pub fn is_admin(&self) -> bool {
        self.permissions.iter().any(Permission::is_wildcard)
    }

    /// Whether this principal may act on a record owned by `owner`.
    pub fn can_act_for(&self, owner: UserId) -> bool {
        self.user_id == owner || self.is_admin()
    }
}
