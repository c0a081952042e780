//! API-side authorization guard.
//!
//! Permission checks happen here, before the service is called. Ownership
//! checks (whose loan is this?) stay in the service.

use libristack_auth::{AuthzError, CommandAuthorization, authorize};

use crate::context::PrincipalContext;

/// Check every permission a command requires against the request principal.
pub fn authorize_command<C: CommandAuthorization>(
    principal: &PrincipalContext,
    command: &C,
) -> Result<(), AuthzError> {
    for perm in command.required_permissions() {
        authorize(principal.principal(), perm)?;
    }

    Ok(())
}
