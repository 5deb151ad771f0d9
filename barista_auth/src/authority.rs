use std::{fmt, sync::Arc};

use barista_clock::{Clock, System};
use barista_jose::{
    error::{ClaimsRejected, JwtVerifyError},
    jwt::{self, CoreHeaders, HasAlgorithm},
    JwtRef,
};
use thiserror::Error;

use crate::{
    resolver::{CachingKeyResolver, KeyResolver, RemoteKeyResolver, ResolveError},
    AuthConfig, AuthError, Claims,
};

/// Indicates why a token could not be verified
#[derive(Debug, Error)]
pub enum AuthorityError {
    /// The token header does not name the key that signed it
    #[error("token header has no key id")]
    MissingKeyId,
    /// The signing key could not be found
    #[error("unable to resolve signing key")]
    KeyResolution(#[from] ResolveError),
    /// The JWT was malformed, badly signed or carried unacceptable claims
    #[error("invalid JWT")]
    JwtVerifyError(#[from] JwtVerifyError),
}

impl From<AuthorityError> for AuthError {
    fn from(err: AuthorityError) -> Self {
        match err {
            AuthorityError::MissingKeyId => AuthError::missing_key_id(),
            AuthorityError::KeyResolution(ResolveError::UnknownKeyId { .. }) => {
                AuthError::unknown_key()
            }
            AuthorityError::KeyResolution(ResolveError::Fetch { .. }) => {
                AuthError::key_set_unavailable()
            }
            AuthorityError::JwtVerifyError(JwtVerifyError::ClaimsRejected(rejected)) => {
                match rejected {
                    ClaimsRejected::TokenExpired => AuthError::token_expired(),
                    ClaimsRejected::InvalidAudience
                    | ClaimsRejected::InvalidIssuer
                    | ClaimsRejected::TokenNotYetValid
                    | ClaimsRejected::MissingRequiredClaim(_) => AuthError::incorrect_claims(),
                    ClaimsRejected::InvalidAlgorithm => AuthError::unparseable_token(),
                }
            }
            AuthorityError::JwtVerifyError(_) => AuthError::unparseable_token(),
        }
    }
}

struct Inner {
    resolver: Arc<dyn KeyResolver>,
    validator: jwt::CoreValidator,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl fmt::Debug for Inner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inner")
            .field("resolver", &self.resolver)
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

/// Verifies bearer tokens against the keys published by the identity
/// provider
///
/// Cloning is cheap; clones share the same resolver and validator.
#[derive(Debug, Clone)]
#[must_use]
pub struct Authority {
    inner: Arc<Inner>,
}

impl Authority {
    /// Constructs an authority that resolves keys with `resolver` and
    /// checks claims with `validator`
    pub fn new(resolver: impl KeyResolver + 'static, validator: jwt::CoreValidator) -> Self {
        Self::from_parts(Arc::new(resolver), validator, Arc::new(System))
    }

    /// Constructs the authority described by `config`
    ///
    /// Keys are fetched from the configured key set location on every
    /// verification, or kept for the configured time-to-live if one is set.
    ///
    /// # Errors
    ///
    /// The HTTP client could not be constructed.
    pub fn from_config(config: &AuthConfig) -> Result<Self, reqwest::Error> {
        let remote = RemoteKeyResolver::new(config.jwks_url(), config.jwks_timeout())?;

        let resolver: Arc<dyn KeyResolver> = match config.jwks_cache_ttl() {
            Some(ttl) => Arc::new(CachingKeyResolver::new(remote, ttl)),
            None => Arc::new(remote),
        };

        Ok(Self::from_parts(resolver, config.validator(), Arc::new(System)))
    }

    /// Judges time-based claims against `clock` instead of the system clock
    pub fn with_clock(self, clock: impl Clock + Send + Sync + 'static) -> Self {
        Self::from_parts(
            Arc::clone(&self.inner.resolver),
            self.inner.validator.clone(),
            Arc::new(clock),
        )
    }

    fn from_parts(
        resolver: Arc<dyn KeyResolver>,
        validator: jwt::CoreValidator,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                resolver,
                validator,
                clock,
            }),
        }
    }

    /// Verifies the token's signature and registered claims, returning its
    /// decoded payload
    ///
    /// The header is parsed first to learn which key signed the token. The
    /// key is then resolved, the signature checked, and finally the expiry,
    /// audience and issuer are validated.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed, if its key cannot be
    /// found, or if its signature or claims are not acceptable.
    pub async fn verify_token(&self, token: &JwtRef) -> Result<Claims, AuthorityError> {
        let untrusted: jwt::Decomposed<jwt::UntrustedHeaders> =
            token.decompose().map_err(|err| {
                let error: &dyn std::error::Error = &err;
                tracing::debug!(error, "unable to parse token");
                err
            })?;

        if untrusted.untrusted_header().kid().is_none() {
            tracing::debug!(
                alg = untrusted.untrusted_header().alg(),
                "token header has no key id"
            );
            return Err(AuthorityError::MissingKeyId);
        }

        let decomposed: jwt::Decomposed = untrusted
            .try_map_header(jwt::BasicHeaders::try_from)
            .map_err(|err| {
                let error: &dyn std::error::Error = &err;
                tracing::debug!(error, "unsupported token algorithm");
                JwtVerifyError::from(err)
            })?;

        let alg = decomposed.alg();
        let kid = decomposed.kid().ok_or(AuthorityError::MissingKeyId)?;

        let key = self.inner.resolver.resolve(kid, alg).await?;

        let validated: jwt::Validated<Claims> = decomposed
            .verify_with_clock(&key, &self.inner.validator, &self.inner.clock)
            .map_err(|err| {
                let error: &dyn std::error::Error = &err;
                tracing::debug!(error, %alg, "JWT validation failed");
                err
            })?;

        let (_, claims) = validated.extract();

        Ok(claims)
    }
}
