use barista_clock::UnixTime;
use barista_jose::jwt;
use serde::{Deserialize, Serialize};

use crate::Permissions;

/// The decoded payload of a verified token
///
/// Registered claims are checked by the verifier. The `permissions` claim is
/// checked by the permission gate. Every other claim is kept as-is in
/// [`extra()`](Self::extra).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[must_use]
pub struct Claims {
    #[serde(default, skip_serializing_if = "jwt::Audiences::is_empty")]
    aud: jwt::Audiences,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iss: Option<jwt::Issuer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub: Option<jwt::Subject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<UnixTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nbf: Option<UnixTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    permissions: Option<Permissions>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl Claims {
    /// Constructs a new, empty payload
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `aud` claim
    pub fn with_audience(mut self, aud: impl Into<jwt::Audience>) -> Self {
        self.aud = jwt::Audiences::single(aud);
        self
    }

    /// Sets the `iss` claim
    pub fn with_issuer(mut self, iss: impl Into<jwt::Issuer>) -> Self {
        self.iss = Some(iss.into());
        self
    }

    /// Sets the `sub` claim
    pub fn with_subject(mut self, sub: impl Into<jwt::Subject>) -> Self {
        self.sub = Some(sub.into());
        self
    }

    /// Sets the `exp` claim
    pub fn with_expiration(mut self, time: UnixTime) -> Self {
        self.exp = Some(time);
        self
    }

    /// Sets the `nbf` claim
    pub fn with_not_before(mut self, time: UnixTime) -> Self {
        self.nbf = Some(time);
        self
    }

    /// Sets the `permissions` claim
    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = Some(permissions);
        self
    }

    /// Sets an arbitrary claim
    pub fn with_claim(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(name.into(), value);
        self
    }

    /// Claims other than the registered claims and `permissions`
    #[must_use]
    pub fn extra(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.extra
    }
}

impl jwt::CoreClaims for Claims {
    #[inline]
    fn nbf(&self) -> Option<UnixTime> {
        self.nbf
    }

    #[inline]
    fn exp(&self) -> Option<UnixTime> {
        self.exp
    }

    #[inline]
    fn aud(&self) -> &jwt::Audiences {
        &self.aud
    }

    #[inline]
    fn iss(&self) -> Option<&jwt::IssuerRef> {
        self.iss.as_deref()
    }

    #[inline]
    fn sub(&self) -> Option<&jwt::SubjectRef> {
        self.sub.as_deref()
    }
}

/// Indicates that the type may carry a `permissions` claim
pub trait HasPermissions {
    /// The granted permissions, or `None` if the claim is absent
    fn permissions(&self) -> Option<&Permissions>;
}

impl HasPermissions for Claims {
    #[inline]
    fn permissions(&self) -> Option<&Permissions> {
        self.permissions.as_ref()
    }
}

impl HasPermissions for Permissions {
    #[inline]
    fn permissions(&self) -> Option<&Permissions> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use barista_jose::jwt::CoreClaims;
    use color_eyre::Result;

    use super::*;
    use crate::{Permission, PermissionRef};

    const AUTH0_PAYLOAD: &str = r#"{
        "iss": "https://barista.eu.auth0.com/",
        "sub": "auth0|5f4c1b2a",
        "aud": ["coffee", "https://barista.eu.auth0.com/userinfo"],
        "iat": 1700000000,
        "exp": 1700007200,
        "azp": "Wlz8hO1n",
        "scope": "openid profile email",
        "permissions": ["get:drinks-detail", "post:drinks"]
    }"#;

    #[test]
    fn deserializes_auth0_payload() -> Result<()> {
        let claims: Claims = serde_json::from_str(AUTH0_PAYLOAD)?;

        assert_eq!(claims.exp(), Some(UnixTime(1_700_007_200)));
        assert_eq!(claims.aud().iter().count(), 2);
        assert_eq!(
            claims.iss().map(jwt::IssuerRef::as_str),
            Some("https://barista.eu.auth0.com/")
        );

        let permissions = claims.permissions().unwrap();
        assert!(permissions.contains(PermissionRef::from_static("post:drinks")));

        assert_eq!(claims.extra()["azp"], "Wlz8hO1n");
        assert_eq!(claims.extra()["iat"], 1_700_000_000);
        assert!(!claims.extra().contains_key("permissions"));
        Ok(())
    }

    #[test]
    fn absent_permissions_differ_from_empty() -> Result<()> {
        let absent: Claims = serde_json::from_str(r#"{"sub": "someone"}"#)?;
        let empty: Claims = serde_json::from_str(r#"{"sub": "someone", "permissions": []}"#)?;

        assert!(absent.permissions().is_none());
        assert!(empty.permissions().unwrap().is_empty());
        Ok(())
    }

    #[test]
    fn single_audience_serializes_as_string() -> Result<()> {
        let claims = Claims::new()
            .with_audience("coffee")
            .with_permissions(Permissions::single(Permission::from_static("post:drinks")));

        let value = serde_json::to_value(&claims)?;
        assert_eq!(value["aud"], "coffee");
        assert_eq!(value["permissions"], serde_json::json!(["post:drinks"]));
        Ok(())
    }
}
