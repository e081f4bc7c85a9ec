//! Authenticated principal and the request-scoped auth context.

use std::collections::BTreeSet;

use serde::Serialize;
use uuid::Uuid;

use crate::auth::error::{AuthError, AuthResult};
use crate::types::{ADMIN_ROLE, RoleName, Username};

/// Identity attached to a request after a login or a successful token decode.
///
/// Immutable once built; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    user_id: Uuid,
    username: Username,
    roles: BTreeSet<RoleName>,
}

impl Principal {
    /// Create a new principal.
    pub fn new(
        user_id: Uuid,
        username: impl Into<Username>,
        roles: impl IntoIterator<Item = RoleName>,
    ) -> Self {
        Self {
            user_id,
            username: username.into(),
            roles: roles.into_iter().collect(),
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    /// Role names, sorted.
    pub fn roles(&self) -> &BTreeSet<RoleName> {
        &self.roles
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Role names joined with `,` in sorted order.
    pub fn joined_roles(&self) -> String {
        self.roles
            .iter()
            .map(RoleName::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Auth context for the current request.
///
/// Passed explicitly to handlers and services. An anonymous context is a
/// valid value, but every accessor on it fails with
/// [`AuthError::Unauthenticated`]; there is no implicit fallback identity.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    principal: Option<Principal>,
}

impl AuthContext {
    /// Context for an authenticated request.
    pub fn authenticated(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
        }
    }

    /// Context for a request that carried no valid session token.
    pub fn anonymous() -> Self {
        Self { principal: None }
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    /// The authenticated principal.
    pub fn current_authentication(&self) -> AuthResult<&Principal> {
        self.principal.as_ref().ok_or(AuthError::Unauthenticated)
    }

    /// Id of the authenticated user.
    pub fn current_user_id(&self) -> AuthResult<Uuid> {
        self.current_authentication().map(Principal::user_id)
    }

    /// Primary role of the authenticated user.
    ///
    /// Logins always produce a single role; for multi-role principals this is
    /// the first role in sorted order.
    pub fn current_role(&self) -> AuthResult<String> {
        self.current_authentication()?
            .roles()
            .iter()
            .next()
            .map(|role| role.as_str().to_string())
            .ok_or(AuthError::Unauthenticated)
    }

    pub fn is_admin(&self) -> bool {
        self.principal
            .as_ref()
            .is_some_and(|p| p.has_role(ADMIN_ROLE))
    }

    /// Allow the action when the caller is an admin or owns the resource.
    pub fn ensure_admin_or_owner(&self, owner_id: Uuid) -> AuthResult<()> {
        let user_id = self.current_user_id()?;
        if self.is_admin() || user_id == owner_id {
            return Ok(());
        }
        Err(AuthError::access_denied())
    }
}
