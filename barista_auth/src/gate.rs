//! Permission checks on verified claims
//!
//! An operation names the permission it requires. The gate admits a request
//! only if the token's `permissions` claim grants it.

use thiserror::Error;

use crate::{AuthError, HasPermissions, Permission, PermissionRef, Permissions};

/// An authorization policy
pub trait Policy {
    /// The request to evaluate
    type Request: ?Sized;
    /// The denial returned when the request is not permitted
    type Denial;

    /// Evaluates the request, returning `Ok(())` if it is permitted
    ///
    /// # Errors
    ///
    /// The request was not permitted by the policy.
    fn evaluate(&self, held: &Self::Request) -> Result<(), Self::Denial>;
}

/// Indicates the requester held insufficient permissions to be granted
/// access to a controlled resource
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Error)]
#[error("insufficient permissions")]
pub struct InsufficientPermissions;

/// An access policy based on granted permissions
///
/// The policy is a list of alternatives, each a set of required
/// permissions. A request is allowed if it holds every permission of any
/// one alternative. A policy without alternatives denies everything.
///
/// ```
/// use barista_auth::{Permission, PermissionPolicy, Permissions, Policy};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let policy = PermissionPolicy::allow_one(Permissions::single(
///     Permission::from_static("delete:drinks"),
/// ))
/// .or_allow("post:drinks patch:drinks".parse()?);
///
/// assert!(policy.evaluate(&"delete:drinks".parse()?).is_ok());
/// assert!(policy.evaluate(&"patch:drinks post:drinks".parse()?).is_ok());
/// assert!(policy.evaluate(&"patch:drinks".parse()?).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct PermissionPolicy {
    inner: PermissionPolicyInner,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum PermissionPolicyInner {
    DenyAll,
    AllowAny,
    AllowOne(Permissions),
    AllowMany(Vec<Permissions>),
}

impl Default for PermissionPolicy {
    #[inline]
    fn default() -> Self {
        Self::deny_all()
    }
}

impl PermissionPolicy {
    /// Constructs a policy that has no permissible alternatives
    #[inline]
    pub const fn deny_all() -> Self {
        Self {
            inner: PermissionPolicyInner::DenyAll,
        }
    }

    /// Constructs a policy that does not require any permissions
    #[inline]
    pub const fn allow_any() -> Self {
        Self {
            inner: PermissionPolicyInner::AllowAny,
        }
    }

    /// Constructs a policy that requires this set of permissions
    #[inline]
    pub const fn allow_one(permissions: Permissions) -> Self {
        Self {
            inner: PermissionPolicyInner::AllowOne(permissions),
        }
    }

    /// Constructs a policy that requires a single permission
    #[inline]
    pub fn require(permission: Permission) -> Self {
        Self::allow_one(Permissions::single(permission))
    }

    /// Adds an alternate allowable set of permissions
    ///
    /// An empty set allows any request.
    pub fn or_allow(self, permissions: Permissions) -> Self {
        if permissions.is_empty() {
            return Self::allow_any();
        }

        let inner = match self.inner {
            PermissionPolicyInner::AllowAny => PermissionPolicyInner::AllowAny,
            PermissionPolicyInner::DenyAll => PermissionPolicyInner::AllowOne(permissions),
            PermissionPolicyInner::AllowOne(existing) => {
                PermissionPolicyInner::AllowMany(vec![existing, permissions])
            }
            PermissionPolicyInner::AllowMany(mut alternatives) => {
                alternatives.push(permissions);
                PermissionPolicyInner::AllowMany(alternatives)
            }
        };

        Self { inner }
    }

    /// Adds an alternate allowable set of permissions
    pub fn allow(&mut self, permissions: Permissions) {
        let this = std::mem::take(self);
        *self = this.or_allow(permissions);
    }

    /// The permission this policy requires, if it requires exactly one
    #[must_use]
    pub fn single_permission(&self) -> Option<&PermissionRef> {
        let PermissionPolicyInner::AllowOne(required) = &self.inner else {
            return None;
        };

        let mut iter = required.iter();
        match (iter.next(), iter.next()) {
            (Some(one), None) => Some(one),
            _ => None,
        }
    }

    fn alternatives(&self) -> &[Permissions] {
        match &self.inner {
            PermissionPolicyInner::DenyAll | PermissionPolicyInner::AllowAny => &[],
            PermissionPolicyInner::AllowOne(p) => std::slice::from_ref(p),
            PermissionPolicyInner::AllowMany(v) => v,
        }
    }
}

impl Policy for PermissionPolicy {
    type Request = Permissions;
    type Denial = InsufficientPermissions;

    fn evaluate(&self, held: &Self::Request) -> Result<(), Self::Denial> {
        let allowed = matches!(self.inner, PermissionPolicyInner::AllowAny)
            || self.alternatives().iter().any(|req| held.contains_all(req));

        if allowed {
            Ok(())
        } else {
            Err(InsufficientPermissions)
        }
    }
}

/// Confirms that `claims` grant the `required` permission
///
/// # Errors
///
/// * `invalid_claims` (400) if the claims carry no `permissions` entry
/// * `unauthorized` (401) if the permission is not granted
pub fn check_permissions<C>(required: &PermissionRef, claims: &C) -> Result<(), AuthError>
where
    C: HasPermissions + ?Sized,
{
    let granted = claims.permissions().ok_or_else(|| {
        tracing::debug!(%required, "token carries no permissions claim");
        AuthError::permissions_missing()
    })?;

    if granted.contains(required) {
        Ok(())
    } else {
        tracing::debug!(%required, "required permission not granted");
        Err(AuthError::permission_denied())
    }
}

/// Confirms that `claims` satisfy `policy`
///
/// # Errors
///
/// The same as [`check_permissions()`], with `unauthorized` returned when
/// the policy denies the granted permissions.
pub fn check_policy<C>(policy: &PermissionPolicy, claims: &C) -> Result<(), AuthError>
where
    C: HasPermissions + ?Sized,
{
    if let Some(required) = policy.single_permission() {
        return check_permissions(required, claims);
    }

    let granted = claims.permissions().ok_or_else(|| {
        tracing::debug!("token carries no permissions claim");
        AuthError::permissions_missing()
    })?;

    policy.evaluate(granted).map_err(|InsufficientPermissions| {
        tracing::debug!("permission policy denied access");
        AuthError::permission_denied()
    })
}
