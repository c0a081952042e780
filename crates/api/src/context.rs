use libristack_auth::{Principal, Role};
use libristack_core::UserId;

/// Principal context for a request (authenticated identity + roles).
///
/// Inserted by the auth middleware from verified claims and handed to every
/// service call explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(user_id: UserId, roles: Vec<Role>) -> Self {
        Self {
            principal: Principal::new(user_id, roles),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.principal.roles
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}
