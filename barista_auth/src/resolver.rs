//! Locating the key that signed a token
//!
//! The identity provider publishes its signing keys as a JSON Web Key Set.
//! A [`KeyResolver`] turns the key id named in a token header into the
//! matching public key.
//!
//! * [`RemoteKeyResolver`] fetches the key set on every call.
//! * [`CachingKeyResolver`] keeps a fetched key set for a time-to-live, and
//!   fetches once more when asked for a key id it does not hold.
//! * [`StaticKeyResolver`] serves a fixed key set.

use std::{fmt, sync::Arc, time::Duration};

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use barista_jose::{jwa, jwk, Jwk, Jwks};
use reqwest::Client;
use thiserror::Error;
use tokio::{sync::Mutex, time::Instant};

/// An error occurring while resolving a signing key
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The key set could not be retrieved or decoded
    #[error("unable to fetch JWKS from {url}")]
    Fetch {
        /// The location of the key set
        url: String,
        /// The underlying transport or decoding error
        #[source]
        source: reqwest::Error,
    },

    /// The key set holds no usable key with the requested id
    #[error("no key with kid {kid} in JWKS")]
    UnknownKeyId {
        /// The requested key id
        kid: jwk::KeyId,
    },
}

impl ResolveError {
    /// Whether the key set was retrieved but did not hold the key
    #[must_use]
    pub fn is_unknown_key_id(&self) -> bool {
        matches!(self, Self::UnknownKeyId { .. })
    }
}

/// A source of public keys for verifying token signatures
#[async_trait]
pub trait KeyResolver: Send + Sync + fmt::Debug {
    /// Finds the key with id `kid` that can verify `alg` signatures
    async fn resolve(&self, kid: &jwk::KeyIdRef, alg: jwa::Algorithm) -> Result<Jwk, ResolveError>;
}

fn find_key(jwks: &Jwks, kid: &jwk::KeyIdRef, alg: jwa::Algorithm) -> Result<Jwk, ResolveError> {
    jwks.get_key_by_id(kid, alg).cloned().ok_or_else(|| {
        tracing::debug!(%kid, %alg, "unable to find matching key");
        ResolveError::UnknownKeyId {
            kid: kid.to_owned(),
        }
    })
}

/// Resolves keys from a fixed key set
#[derive(Clone, Debug, Default)]
pub struct StaticKeyResolver {
    jwks: Jwks,
}

impl StaticKeyResolver {
    /// Serves keys from `jwks`
    #[must_use]
    pub fn new(jwks: Jwks) -> Self {
        Self { jwks }
    }
}

#[async_trait]
impl KeyResolver for StaticKeyResolver {
    async fn resolve(&self, kid: &jwk::KeyIdRef, alg: jwa::Algorithm) -> Result<Jwk, ResolveError> {
        find_key(&self.jwks, kid, alg)
    }
}

/// Resolves keys by fetching the key set from its published location on
/// every call
#[derive(Clone, Debug)]
pub struct RemoteKeyResolver {
    jwks_url: String,
    client: Client,
}

impl RemoteKeyResolver {
    /// Fetches keys from `jwks_url`, abandoning any request that takes
    /// longer than `timeout`
    ///
    /// # Errors
    ///
    /// The HTTP client could not be constructed.
    pub fn new(jwks_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("barista_auth/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            jwks_url: jwks_url.into(),
            client,
        })
    }

    /// The location the key set is fetched from
    #[must_use]
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Fetches the current key set
    ///
    /// No retries are attempted.
    ///
    /// # Errors
    ///
    /// The request failed or timed out, the response status was not a
    /// success, or the body was not a key set.
    #[tracing::instrument(skip(self), fields(jwks.url = %self.jwks_url))]
    pub async fn fetch(&self) -> Result<Jwks, ResolveError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|err| self.fetch_failed(err))?;

        if let Err(err) = response.error_for_status_ref() {
            tracing::warn!(
                http.status_code = response.status().as_u16(),
                "JWKS fetch failed; unexpected response status",
            );
            return Err(self.fetch_failed(err));
        }

        let jwks = response
            .json::<Jwks>()
            .await
            .map_err(|err| self.fetch_failed(err))?;

        tracing::info!(jwks.keys = jwks.keys().len(), "JWKS fetched");

        Ok(jwks)
    }

    fn fetch_failed(&self, source: reqwest::Error) -> ResolveError {
        let error: &dyn std::error::Error = &source;
        tracing::warn!(error, "JWKS fetch failed");

        ResolveError::Fetch {
            url: self.jwks_url.clone(),
            source,
        }
    }
}

#[async_trait]
impl KeyResolver for RemoteKeyResolver {
    async fn resolve(&self, kid: &jwk::KeyIdRef, alg: jwa::Algorithm) -> Result<Jwk, ResolveError> {
        let jwks = self.fetch().await?;
        find_key(&jwks, kid, alg)
    }
}

#[derive(Debug)]
struct CachedJwks {
    jwks: Jwks,
    fetched_at: Instant,
}

/// Resolves keys from a remote key set that is kept for a time-to-live
///
/// A key set older than the time-to-live is fetched again before use. When
/// the held key set does not contain the requested key id, the key set is
/// fetched once more in case the identity provider has rotated its keys.
/// If the key is still missing, the failure is the same as for an uncached
/// lookup.
#[derive(Debug)]
pub struct CachingKeyResolver {
    remote: RemoteKeyResolver,
    ttl: Duration,
    cached: ArcSwapOption<CachedJwks>,
    refresh_lock: Mutex<()>,
}

impl CachingKeyResolver {
    /// Keeps key sets fetched by `remote` for `ttl`
    #[must_use]
    pub fn new(remote: RemoteKeyResolver, ttl: Duration) -> Self {
        Self {
            remote,
            ttl,
            cached: ArcSwapOption::empty(),
            refresh_lock: Mutex::new(()),
        }
    }

    fn current(&self) -> Option<Arc<CachedJwks>> {
        self.cached
            .load_full()
            .filter(|c| c.fetched_at.elapsed() < self.ttl)
    }

    /// Fetches a new key set unless another caller replaced `stale` while
    /// this one waited for its turn
    async fn refresh(
        &self,
        stale: Option<&Arc<CachedJwks>>,
    ) -> Result<Arc<CachedJwks>, ResolveError> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(latest) = self.cached.load_full() {
            let replaced = stale.map_or(true, |s| !Arc::ptr_eq(s, &latest));
            if replaced && latest.fetched_at.elapsed() < self.ttl {
                return Ok(latest);
            }
        }

        let jwks = self.remote.fetch().await?;
        let fresh = Arc::new(CachedJwks {
            jwks,
            fetched_at: Instant::now(),
        });
        self.cached.store(Some(Arc::clone(&fresh)));

        Ok(fresh)
    }
}

#[async_trait]
impl KeyResolver for CachingKeyResolver {
    async fn resolve(&self, kid: &jwk::KeyIdRef, alg: jwa::Algorithm) -> Result<Jwk, ResolveError> {
        let held = match self.current() {
            Some(held) => held,
            None => {
                let stale = self.cached.load_full();
                let fresh = self.refresh(stale.as_ref()).await?;
                return find_key(&fresh.jwks, kid, alg);
            }
        };

        match find_key(&held.jwks, kid, alg) {
            Err(err) if err.is_unknown_key_id() => {
                tracing::debug!(%kid, "key id not held; refetching JWKS");
                let fresh = self.refresh(Some(&held)).await?;
                find_key(&fresh.jwks, kid, alg)
            }
            res => res,
        }
    }
}
