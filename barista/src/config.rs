//! Command line and environment configuration for the service

use std::{net::SocketAddr, time::Duration};

use barista_auth::AuthConfig;
use barista_jose::jwa;
use clap::Parser;

/// Serves the drink catalog
///
/// Every option may also be given through the environment, or through a
/// `.env` file in the working directory.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Opts {
    /// The identity provider's domain, such as `barista.eu.auth0.com`
    #[arg(long, env = "AUTH0_DOMAIN")]
    pub auth0_domain: String,

    /// The audience tokens must be issued for
    #[arg(long, env = "API_AUDIENCE")]
    pub api_audience: String,

    /// The approved signing algorithms, separated by commas
    #[arg(
        long,
        env = "JWT_ALGORITHMS",
        value_delimiter = ',',
        default_value = "RS256"
    )]
    pub algorithms: Vec<jwa::Algorithm>,

    /// Grace period on token expiry, in seconds
    #[arg(long, env = "JWT_LEEWAY_SECS", default_value_t = 0)]
    pub leeway_secs: u64,

    /// Time allowed for fetching the key set, in seconds
    #[arg(long, env = "JWKS_TIMEOUT_SECS", default_value_t = 10)]
    pub jwks_timeout_secs: u64,

    /// Keep fetched key sets for this many seconds instead of fetching on
    /// every request
    #[arg(long, env = "JWKS_CACHE_TTL_SECS")]
    pub jwks_cache_ttl_secs: Option<u64>,

    /// Fetch keys from this URL instead of the identity provider's
    /// well-known location
    #[arg(long, env = "JWKS_URL")]
    pub jwks_url: Option<String>,

    /// Report every token verification failure as `invalid_token`
    #[arg(long, env = "COLLAPSE_VERIFIER_ERRORS")]
    pub collapse_verifier_errors: bool,

    /// The address to listen on
    #[arg(long, env = "LISTEN_ADDR", default_value = "127.0.0.1:5000")]
    pub listen: SocketAddr,
}

impl Opts {
    /// The token verification settings these options describe
    pub fn auth_config(&self) -> AuthConfig {
        let mut config = AuthConfig::new(self.auth0_domain.clone(), self.api_audience.clone())
            .with_algorithms(self.algorithms.iter().copied())
            .with_leeway(Duration::from_secs(self.leeway_secs))
            .with_jwks_timeout(Duration::from_secs(self.jwks_timeout_secs))
            .with_collapsed_verifier_errors(self.collapse_verifier_errors);

        if let Some(ttl) = self.jwks_cache_ttl_secs {
            config = config.with_jwks_cache_ttl(Duration::from_secs(ttl));
        }

        if let Some(url) = &self.jwks_url {
            config = config.with_jwks_url(url.clone());
        }

        config
    }
}
