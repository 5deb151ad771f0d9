use std::time::Duration;

use barista_jose::{jwa, jwt};

const DEFAULT_JWKS_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for verifying bearer tokens, fixed at startup
///
/// The issuer and the key set location are derived from the identity
/// provider's domain: tokens must be issued by `https://<domain>/` and are
/// verified against the keys published at
/// `https://<domain>/.well-known/jwks.json`.
///
/// ```
/// use barista_auth::AuthConfig;
///
/// let config = AuthConfig::new("barista.eu.auth0.com", "coffee");
///
/// assert_eq!(config.issuer().as_str(), "https://barista.eu.auth0.com/");
/// assert_eq!(
///     config.jwks_url(),
///     "https://barista.eu.auth0.com/.well-known/jwks.json"
/// );
/// ```
#[derive(Clone, Debug)]
#[must_use]
pub struct AuthConfig {
    domain: String,
    audience: jwt::Audience,
    algorithms: Vec<jwa::Algorithm>,
    leeway: Duration,
    jwks_timeout: Duration,
    jwks_cache_ttl: Option<Duration>,
    jwks_url: Option<String>,
    collapse_verifier_errors: bool,
}

impl AuthConfig {
    /// Settings for tokens issued by `domain` for `audience`
    ///
    /// Only `RS256` signatures are approved, no leeway is granted on expiry
    /// and the key set is fetched on every verification.
    pub fn new(domain: impl Into<String>, audience: impl Into<jwt::Audience>) -> Self {
        Self {
            domain: domain.into(),
            audience: audience.into(),
            algorithms: vec![jwa::Algorithm::RS256],
            leeway: Duration::ZERO,
            jwks_timeout: DEFAULT_JWKS_TIMEOUT,
            jwks_cache_ttl: None,
            jwks_url: None,
            collapse_verifier_errors: false,
        }
    }

    /// Replaces the approved signing algorithms
    ///
    /// An empty list leaves the current approvals in place.
    pub fn with_algorithms<I: IntoIterator<Item = jwa::Algorithm>>(self, algs: I) -> Self {
        let algorithms: Vec<_> = algs.into_iter().collect();
        if algorithms.is_empty() {
            self
        } else {
            Self { algorithms, ..self }
        }
    }

    /// Grants a grace period on the `exp` and `nbf` claims
    pub fn with_leeway(self, leeway: Duration) -> Self {
        Self { leeway, ..self }
    }

    /// Bounds each key set request
    pub fn with_jwks_timeout(self, jwks_timeout: Duration) -> Self {
        Self {
            jwks_timeout,
            ..self
        }
    }

    /// Keeps fetched key sets for `ttl` instead of fetching on every
    /// verification
    pub fn with_jwks_cache_ttl(self, ttl: Duration) -> Self {
        Self {
            jwks_cache_ttl: Some(ttl),
            ..self
        }
    }

    /// Fetches keys from `url` instead of the identity provider's
    /// well-known location
    pub fn with_jwks_url(self, url: impl Into<String>) -> Self {
        Self {
            jwks_url: Some(url.into()),
            ..self
        }
    }

    /// Reports every verification failure as `invalid_token`
    pub fn with_collapsed_verifier_errors(self, collapse: bool) -> Self {
        Self {
            collapse_verifier_errors: collapse,
            ..self
        }
    }

    /// The identity provider's domain
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The audience tokens must be intended for
    #[must_use]
    pub fn audience(&self) -> &jwt::AudienceRef {
        &self.audience
    }

    /// The approved signing algorithms
    #[must_use]
    pub fn algorithms(&self) -> &[jwa::Algorithm] {
        &self.algorithms
    }

    /// The grace period on time-based claims
    #[must_use]
    pub fn leeway(&self) -> Duration {
        self.leeway
    }

    /// The time allowed for a single key set request
    #[must_use]
    pub fn jwks_timeout(&self) -> Duration {
        self.jwks_timeout
    }

    /// How long a fetched key set is kept, if at all
    #[must_use]
    pub fn jwks_cache_ttl(&self) -> Option<Duration> {
        self.jwks_cache_ttl
    }

    /// Whether verification failures are reported as `invalid_token`
    #[must_use]
    pub fn collapse_verifier_errors(&self) -> bool {
        self.collapse_verifier_errors
    }

    /// The issuer tokens must name: `https://<domain>/`
    #[must_use]
    pub fn issuer(&self) -> jwt::Issuer {
        jwt::Issuer::new(format!("https://{}/", self.domain))
    }

    /// The location of the identity provider's key set
    #[must_use]
    pub fn jwks_url(&self) -> String {
        self.jwks_url
            .clone()
            .unwrap_or_else(|| format!("https://{}/.well-known/jwks.json", self.domain))
    }

    /// The claims validator these settings describe
    pub fn validator(&self) -> jwt::CoreValidator {
        jwt::CoreValidator::default()
            .extend_approved_algorithms(self.algorithms.iter().copied())
            .with_leeway(self.leeway)
            .add_allowed_audience(self.audience.clone())
            .require_issuer(self.issuer())
    }
}

#[cfg(test)]
mod tests {
    use barista_clock::{TestClock, UnixTime};
    use barista_jose::jwt::{BasicClaims, BasicHeaders};

    use super::*;

    const NOW: UnixTime = UnixTime(1_700_000_000);

    fn claims() -> BasicClaims {
        BasicClaims::new()
            .with_audience("coffee")
            .with_issuer("https://barista.eu.auth0.com/")
            .with_expiration(NOW.saturating_add(60))
    }

    #[test]
    fn jwks_url_can_be_overridden() {
        let config = AuthConfig::new("barista.eu.auth0.com", "coffee")
            .with_jwks_url("http://127.0.0.1:4000/jwks.json");

        assert_eq!(config.jwks_url(), "http://127.0.0.1:4000/jwks.json");
        assert_eq!(config.issuer().as_str(), "https://barista.eu.auth0.com/");
    }

    #[test]
    fn empty_algorithm_list_keeps_default() {
        let config = AuthConfig::new("barista.eu.auth0.com", "coffee").with_algorithms(None);
        assert_eq!(config.algorithms(), [jwa::Algorithm::RS256]);
    }

    #[test]
    fn validator_checks_audience_and_issuer() {
        let config = AuthConfig::new("barista.eu.auth0.com", "coffee");
        let validator = config.validator();
        let clock = TestClock::new(NOW);
        let header = BasicHeaders::new(jwa::Algorithm::RS256);

        validator
            .validate_with_clock(&header, &claims(), &clock)
            .unwrap();

        validator
            .validate_with_clock(&header, &claims().with_audience("tea"), &clock)
            .unwrap_err();

        validator
            .validate_with_clock(
                &header,
                &claims().with_issuer("https://barista.eu.auth0.com"),
                &clock,
            )
            .unwrap_err();

        validator
            .validate_with_clock(&BasicHeaders::new(jwa::Algorithm::RS384), &claims(), &clock)
            .unwrap_err();
    }

    #[test]
    fn leeway_extends_expiry() {
        let config = AuthConfig::new("barista.eu.auth0.com", "coffee")
            .with_leeway(Duration::from_secs(30));
        let header = BasicHeaders::new(jwa::Algorithm::RS256);
        let clock = TestClock::new(NOW.saturating_add(75));

        config
            .validator()
            .validate_with_clock(&header, &claims(), &clock)
            .unwrap();
    }
}
