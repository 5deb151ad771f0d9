//! Guarding operations behind a bearer token and a permission
//!
//! [`AuthMiddleware`] runs the whole pipeline for a request: it extracts the
//! bearer token from the headers, verifies it with the [`Authority`], and
//! checks that the verified claims grant the permission the operation
//! requires. [`AuthMiddleware::requires_auth`] wraps an operation so that it
//! only ever runs with claims that passed every step.

use std::{fmt, future::Future};

use barista_jose::Jwt;
use http::{header, HeaderMap};

use crate::{
    gate, AuthConfig, AuthError, Authority, Claims, Permission, PermissionPolicy, PermissionRef,
};

/// Extracts the bearer token from the `Authorization` header
///
/// `headers` is `None` when the request carried no headers at all. The
/// header value must split on whitespace into exactly two parts, the first
/// of which is `Bearer` in any letter case.
///
/// # Errors
///
/// * `no_request_header` if there are no headers
/// * `no_auth_in_header` if the `Authorization` header is missing
/// * `too_many_parts` if the value does not have exactly two parts
/// * `no_bearer_tag` if the scheme is not `Bearer`, or the value is not
///   visible ASCII
pub fn extract_bearer(headers: Option<&HeaderMap>) -> Result<Jwt, AuthError> {
    let headers = headers.ok_or_else(|| {
        tracing::debug!("request has no headers");
        AuthError::no_request_header()
    })?;

    let value = headers.get(header::AUTHORIZATION).ok_or_else(|| {
        tracing::debug!("request has no authorization header");
        AuthError::no_auth_in_header()
    })?;

    let value = value.to_str().map_err(|_| {
        tracing::debug!("authorization header is not visible ASCII");
        AuthError::no_bearer_tag()
    })?;

    let mut parts = value.split_whitespace();
    let (scheme, token) = match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) => (scheme, token),
        _ => {
            tracing::debug!("authorization header does not have two parts");
            return Err(AuthError::too_many_parts());
        }
    };

    if !scheme.eq_ignore_ascii_case("bearer") {
        tracing::debug!(scheme, "authorization scheme is not bearer");
        return Err(AuthError::no_bearer_tag());
    }

    Ok(Jwt::from(token))
}

/// Runs bearer extraction, token verification and the permission check
#[derive(Debug, Clone)]
pub struct AuthMiddleware {
    authority: Authority,
    collapse_verifier_errors: bool,
}

impl AuthMiddleware {
    /// Guards operations with tokens verified by `authority`
    #[must_use]
    pub fn new(authority: Authority) -> Self {
        Self {
            authority,
            collapse_verifier_errors: false,
        }
    }

    /// Constructs the middleware described by `config`
    ///
    /// # Errors
    ///
    /// The HTTP client used to fetch keys could not be constructed.
    pub fn from_config(config: &AuthConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(Authority::from_config(config)?)
            .with_collapsed_verifier_errors(config.collapse_verifier_errors()))
    }

    /// Reports every verification failure as `invalid_token` instead of
    /// its specific code
    ///
    /// Failures while extracting the token or checking permissions are not
    /// affected.
    #[must_use]
    pub fn with_collapsed_verifier_errors(self, collapse: bool) -> Self {
        Self {
            collapse_verifier_errors: collapse,
            ..self
        }
    }

    /// The authority verifying tokens
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Extracts and verifies the bearer token without checking permissions
    ///
    /// # Errors
    ///
    /// See [`extract_bearer()`] and [`Authority::verify_token()`].
    pub async fn authenticate(&self, headers: Option<&HeaderMap>) -> Result<Claims, AuthError> {
        let token = extract_bearer(headers)?;

        self.authority.verify_token(&token).await.map_err(|err| {
            if self.collapse_verifier_errors {
                AuthError::invalid_token()
            } else {
                AuthError::from(err)
            }
        })
    }

    /// Extracts and verifies the bearer token, then checks that it grants
    /// `permission`
    ///
    /// # Errors
    ///
    /// The first stage to reject the request determines the error.
    pub async fn authorize(
        &self,
        headers: Option<&HeaderMap>,
        permission: &PermissionRef,
    ) -> Result<Claims, AuthError> {
        let claims = self.authenticate(headers).await?;
        gate::check_permissions(permission, &claims)?;

        Ok(claims)
    }

    /// Extracts and verifies the bearer token, then checks that its
    /// permissions satisfy `policy`
    ///
    /// # Errors
    ///
    /// The first stage to reject the request determines the error.
    pub async fn authorize_policy(
        &self,
        headers: Option<&HeaderMap>,
        policy: &PermissionPolicy,
    ) -> Result<Claims, AuthError> {
        let claims = self.authenticate(headers).await?;
        gate::check_policy(policy, &claims)?;

        Ok(claims)
    }

    /// Wraps `op` so that it only runs for requests granted `permission`
    ///
    /// The verified claims are passed to `op` ahead of its own arguments.
    ///
    /// ```
    /// use barista_auth::{AuthMiddleware, Claims, Permission};
    ///
    /// # fn wrap(auth: &AuthMiddleware) {
    /// let delete = auth.requires_auth(
    ///     Permission::from_static("delete:drinks"),
    ///     |_claims: Claims, id: u32| async move { id },
    /// );
    /// # let _ = delete;
    /// # }
    /// ```
    pub fn requires_auth<F>(&self, permission: Permission, op: F) -> Protected<F> {
        Protected {
            middleware: self.clone(),
            permission,
            op,
        }
    }
}

/// An operation guarded by a required permission
///
/// Constructed by [`AuthMiddleware::requires_auth`].
#[derive(Clone)]
#[must_use]
pub struct Protected<F> {
    middleware: AuthMiddleware,
    permission: Permission,
    op: F,
}

impl<F> fmt::Debug for Protected<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Protected")
            .field("middleware", &self.middleware)
            .field("permission", &self.permission)
            .finish_non_exhaustive()
    }
}

impl<F> Protected<F> {
    /// The permission the operation requires
    #[must_use]
    pub fn permission(&self) -> &PermissionRef {
        &self.permission
    }

    /// Authorizes the request, then runs the operation with the verified
    /// claims followed by `args`
    ///
    /// # Errors
    ///
    /// The request was refused; the operation did not run.
    pub async fn call<A, Fut>(
        &self,
        headers: Option<&HeaderMap>,
        args: A,
    ) -> Result<Fut::Output, AuthError>
    where
        F: Fn(Claims, A) -> Fut,
        Fut: Future,
    {
        let claims = self
            .middleware
            .authorize(headers, &self.permission)
            .await?;

        Ok((self.op)(claims, args).await)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use barista_clock::{TestClock, UnixTime};
    use barista_jose::{
        jwa,
        jwt::{self, BasicHeaders},
        test_util::{self, TestKey},
        Jwks,
    };
    use color_eyre::Result;
    use http::{HeaderValue, StatusCode};

    use super::*;
    use crate::{resolver::StaticKeyResolver, ErrorCode, HasPermissions};

    const NOW: UnixTime = UnixTime(1_700_000_000);

    fn middleware() -> Result<AuthMiddleware> {
        let jwks: Jwks = serde_json::from_str(test_util::JWKS)?;
        let validator = AuthConfig::new("barista.eu.auth0.com", "coffee").validator();
        let authority =
            Authority::new(StaticKeyResolver::new(jwks), validator).with_clock(TestClock::new(NOW));

        Ok(AuthMiddleware::new(authority))
    }

    fn claims() -> Result<Claims> {
        Ok(Claims::new()
            .with_audience("coffee")
            .with_issuer("https://barista.eu.auth0.com/")
            .with_subject("auth0|barista")
            .with_expiration(NOW.saturating_add(3600))
            .with_permissions("get:drinks-detail".parse()?))
    }

    fn bearer(claims: &Claims) -> Result<HeaderMap> {
        let headers = BasicHeaders::with_key_id(jwa::Algorithm::RS256, test_util::PRIMARY_KEY_ID);
        let token = test_util::sign(&headers, claims, TestKey::Primary);

        let mut map = HeaderMap::new();
        map.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token.as_str()))?,
        );
        Ok(map)
    }

    fn with_authorization(value: &'static [u8]) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        map.insert(header::AUTHORIZATION, HeaderValue::from_bytes(value)?);
        Ok(map)
    }

    fn extract_code(headers: Option<&HeaderMap>) -> ErrorCode {
        extract_bearer(headers).unwrap_err().code()
    }

    #[test]
    fn extracts_bearer_token() -> Result<()> {
        let headers = with_authorization(b"Bearer abc.def.ghi")?;

        let token = extract_bearer(Some(&headers))?;

        assert_eq!(token.as_str(), "abc.def.ghi");
        Ok(())
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() -> Result<()> {
        let headers = with_authorization(b"bEaReR abc.def.ghi")?;

        assert_eq!(extract_bearer(Some(&headers))?.as_str(), "abc.def.ghi");
        Ok(())
    }

    #[test]
    fn absent_headers_are_no_request_header() {
        let err = extract_bearer(None).unwrap_err();

        assert_eq!(err.code(), ErrorCode::NoRequestHeader);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn missing_authorization_is_no_auth_in_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let err = extract_bearer(Some(&headers)).unwrap_err();

        assert_eq!(err.code(), ErrorCode::NoAuthInHeader);
        assert_eq!(err.description(), "No authorization details in request header.");
    }

    #[test]
    fn other_scheme_is_no_bearer_tag() -> Result<()> {
        let headers = with_authorization(b"Basic abc123")?;

        let err = extract_bearer(Some(&headers)).unwrap_err();

        assert_eq!(err.code(), ErrorCode::NoBearerTag);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[test]
    fn wrong_part_count_is_too_many_parts() -> Result<()> {
        let values: [&'static [u8]; 4] = [b"Bearer", b"Bearer a b", b"", b"Basic"];
        for value in values {
            let headers = with_authorization(value)?;
            assert_eq!(extract_code(Some(&headers)), ErrorCode::TooManyParts);
        }
        Ok(())
    }

    #[test]
    fn opaque_header_value_is_no_bearer_tag() -> Result<()> {
        let headers = with_authorization(b"Bearer \xfftoken")?;

        assert_eq!(extract_code(Some(&headers)), ErrorCode::NoBearerTag);
        Ok(())
    }

    #[tokio::test]
    async fn authorizes_granted_permission() -> Result<()> {
        let expected = claims()?;
        let headers = bearer(&expected)?;

        let actual = middleware()?
            .authorize(Some(&headers), PermissionRef::from_static("get:drinks-detail"))
            .await?;

        assert_eq!(actual, expected);
        Ok(())
    }

    #[tokio::test]
    async fn refuses_missing_permission() -> Result<()> {
        let headers = bearer(&claims()?)?;

        let err = middleware()?
            .authorize(Some(&headers), PermissionRef::from_static("delete:drinks"))
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::Unauthorized);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn propagates_verifier_codes_by_default() -> Result<()> {
        let headers = bearer(&claims()?.with_expiration(NOW.saturating_sub(10)))?;

        let err = middleware()?
            .authorize(Some(&headers), PermissionRef::from_static("get:drinks-detail"))
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::TokenExpired);
        Ok(())
    }

    #[tokio::test]
    async fn collapses_verifier_codes_when_asked() -> Result<()> {
        let middleware = middleware()?.with_collapsed_verifier_errors(true);
        let permission = PermissionRef::from_static("get:drinks-detail");

        let expired = bearer(&claims()?.with_expiration(NOW.saturating_sub(10)))?;
        let err = middleware
            .authorize(Some(&expired), permission)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidToken);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.description(), "Invalid token.");

        let wrong_audience = bearer(&claims()?.with_audience(jwt::Audience::from_static("tea")))?;
        let err = middleware
            .authorize(Some(&wrong_audience), permission)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidToken);

        let basic = with_authorization(b"Basic abc123")?;
        let err = middleware
            .authorize(Some(&basic), permission)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoBearerTag);

        let ungranted = bearer(&claims()?)?;
        let err = middleware
            .authorize(Some(&ungranted), PermissionRef::from_static("post:drinks"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthorized);
        Ok(())
    }

    #[tokio::test]
    async fn authorizes_against_policy() -> Result<()> {
        let middleware = middleware()?;
        let headers = bearer(&claims()?)?;

        let policy = PermissionPolicy::deny_all()
            .or_allow("delete:drinks".parse()?)
            .or_allow("get:drinks-detail".parse()?);
        let _claims = middleware.authorize_policy(Some(&headers), &policy).await?;

        let err = middleware
            .authorize_policy(Some(&headers), &PermissionPolicy::deny_all())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthorized);
        Ok(())
    }

    #[tokio::test]
    async fn protected_operation_receives_claims_first() -> Result<()> {
        let middleware = middleware()?;
        let headers = bearer(&claims()?)?;

        let detail = middleware.requires_auth(
            Permission::from_static("get:drinks-detail"),
            |claims: Claims, (id, label): (u32, &'static str)| async move {
                let granted = claims
                    .permissions()
                    .map(|p| p.iter().count())
                    .unwrap_or_default();
                format!("{label} {id} for {granted} permission(s)")
            },
        );

        let out = detail.call(Some(&headers), (7, "drink")).await?;

        assert_eq!(out, "drink 7 for 1 permission(s)");
        Ok(())
    }

    #[tokio::test]
    async fn protected_operation_does_not_run_when_refused() -> Result<()> {
        let runs = Arc::new(AtomicUsize::new(0));
        let middleware = middleware()?;

        let delete = {
            let runs = Arc::clone(&runs);
            middleware.requires_auth(
                Permission::from_static("delete:drinks"),
                move |_: Claims, id: u32| {
                    runs.fetch_add(1, Ordering::SeqCst);
                    async move { id }
                },
            )
        };

        let err = delete.call(None, 1).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoRequestHeader);

        let headers = bearer(&claims()?)?;
        let err = delete.call(Some(&headers), 1).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthorized);

        assert_eq!(runs.load(Ordering::SeqCst), 0);
        Ok(())
    }
}
