use libristack_auth::{CommandAuthorization, Permission};

/// Small helper wrapper to associate required permissions with a request.
pub struct CmdAuth<C> {
    pub inner: C,
    pub required: Vec<Permission>,
}

impl<C> CommandAuthorization for CmdAuth<C> {
    fn required_permissions(&self) -> &[Permission] {
        &self.required
    }
}

/// Authorize `inner` for `required`, or produce the 403 response.
pub fn guard<C>(
    principal: &crate::context::PrincipalContext,
    inner: C,
    required: Vec<Permission>,
) -> Result<C, axum::response::Response> {
    let cmd = CmdAuth { inner, required };
    crate::authz::authorize_command(principal, &cmd).map_err(crate::app::errors::forbidden)?;
    Ok(cmd.inner)
}
