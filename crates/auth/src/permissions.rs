use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "loans.borrow").
/// The wildcard permission `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: Permission = Permission(Cow::Borrowed("*"));

    pub const CATALOG_READ: Permission = Permission(Cow::Borrowed("catalog.read"));
    pub const CATALOG_MANAGE: Permission = Permission(Cow::Borrowed("catalog.manage"));

    pub const LOANS_BORROW: Permission = Permission(Cow::Borrowed("loans.borrow"));
    pub const LOANS_RETURN: Permission = Permission(Cow::Borrowed("loans.return"));
    pub const LOANS_RENEW: Permission = Permission(Cow::Borrowed("loans.renew"));
    pub const LOANS_READ_OWN: Permission = Permission(Cow::Borrowed("loans.read_own"));
    pub const LOANS_READ_ALL: Permission = Permission(Cow::Borrowed("loans.read_all"));

    pub const HOLDS_MANAGE: Permission = Permission(Cow::Borrowed("holds.manage"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
