//! Verification of RS256-signed JSON Web Tokens
//!
//! This crate implements the verifying half of the JOSE standards, limited
//! to what a resource server needs to accept tokens issued by an external
//! authority:
//!
//! * JSON Web Signature (JWS) verification: [RFC7515][]
//! * RSA JSON Web Keys and key sets (JWK/JWKS): [RFC7517][]
//! * RSA signing algorithms (JWA): [RFC7518][]
//! * JSON Web Tokens (JWT) and their registered claims: [RFC7519][]
//!
//! Token issuance is out of scope; the `test-util` feature exposes a signer
//! backed by fixed RSA fixtures for use in tests only.
//!
//! [RFC7515]: https://tools.ietf.org/html/rfc7515
//! [RFC7517]: https://tools.ietf.org/html/rfc7517
//! [RFC7518]: https://tools.ietf.org/html/rfc7518
//! [RFC7519]: https://tools.ietf.org/html/rfc7519
//!
//! # Example
//!
//! ```no_run
//! use barista_jose::{jwa, jwt, Jwks, JwtRef};
//! use barista_jose::jwt::{CoreHeaders, HasAlgorithm};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let jwks: Jwks = serde_json::from_str(r#"{"keys": []}"#)?;
//! let token = JwtRef::from_str("eyJhbGciOiJSUzI1NiIsImtpZCI6ImsxIn0.e30.c2ln");
//!
//! let validator = jwt::CoreValidator::default()
//!     .add_approved_algorithm(jwa::Algorithm::RS256)
//!     .add_allowed_audience(jwt::Audience::from_static("coffee"))
//!     .require_issuer(jwt::Issuer::from_static("https://example.auth0.com/"));
//!
//! let decomposed: jwt::Decomposed = token.decompose()?;
//! let kid = decomposed.kid().ok_or("token has no key id")?;
//! let key = jwks.get_key_by_id(kid, decomposed.alg()).ok_or("unknown key")?;
//!
//! let validated: jwt::Validated = decomposed.verify(key, &validator)?;
//! # let _ = validated;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod base64;
pub mod error;
pub mod jwa;
pub mod jwk;
mod jwks;
pub mod jws;
pub mod jwt;

#[cfg(any(test, feature = "test-util"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub mod test_util;

#[doc(inline)]
pub use crate::base64::Base64Url;
#[doc(inline)]
pub use jwk::Jwk;
#[doc(inline)]
pub use jwks::Jwks;
#[doc(inline)]
pub use jwt::{Jwt, JwtRef};
