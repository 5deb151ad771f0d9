//! Errors raised while decoding and verifying tokens
//!
//! Structural problems with a token ([`MalformedJwt`]), key problems
//! ([`JwkVerifyError`]) and claim problems ([`ClaimsRejected`]) are kept
//! apart so that callers can report each one differently.

use std::{borrow::Cow, error::Error as StdError, fmt};

use thiserror::Error;

use crate::jwa;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// The value was not valid URL-safe base64
#[derive(Debug, Error)]
#[error("invalid base64url data")]
pub struct InvalidBase64Data {
    #[from]
    source: ::base64::DecodeError,
}

pub(crate) fn invalid_base64_data(source: ::base64::DecodeError) -> InvalidBase64Data {
    InvalidBase64Data { source }
}

/// The provided name is not one of the RSA signing algorithms
#[derive(Debug, Error)]
#[error("'{alg}' is not a supported RSA signing algorithm")]
pub struct UnknownAlgorithm {
    alg: String,
}

#[inline]
pub(crate) fn unknown_algorithm(alg: String) -> UnknownAlgorithm {
    UnknownAlgorithm { alg }
}

/// The RSA key material was rejected
#[derive(Debug, Error)]
#[error("RSA key rejected: {reason}")]
pub struct KeyRejected {
    reason: Cow<'static, str>,
}

pub(crate) fn key_rejected(reason: impl Into<Cow<'static, str>>) -> KeyRejected {
    KeyRejected {
        reason: reason.into(),
    }
}

/// The JWK declares an algorithm other than the one the token names
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("key not usable with algorithm '{alg}'")]
pub struct IncompatibleAlgorithm {
    alg: jwa::Algorithm,
}

impl IncompatibleAlgorithm {
    /// The algorithm the key was asked to verify
    #[must_use]
    pub fn algorithm(&self) -> jwa::Algorithm {
        self.alg
    }
}

#[inline]
pub(crate) fn incompatible_algorithm(alg: jwa::Algorithm) -> IncompatibleAlgorithm {
    IncompatibleAlgorithm { alg }
}

/// The JWK is published for a use other than signing
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("key is not published for signature verification")]
pub struct JwkUsageMismatch {
    _p: (),
}

pub(crate) const fn jwk_usage_mismatch() -> JwkUsageMismatch {
    JwkUsageMismatch { _p: () }
}

/// The signature was not produced by the key
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("signature mismatch")]
pub struct SignatureMismatch {
    _p: (),
}

pub(crate) const fn signature_mismatch() -> SignatureMismatch {
    SignatureMismatch { _p: () }
}

/// The part of a compact JWT that could not be decoded
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum JwtSection {
    /// The token is not three dot-separated sections
    Structure,
    /// The JOSE header
    Header,
    /// The claims payload
    Payload,
    /// The signature
    Signature,
}

impl fmt::Display for JwtSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Structure => "structure",
            Self::Header => "header",
            Self::Payload => "payload",
            Self::Signature => "signature",
        })
    }
}

/// A section of the JWT could not be decoded
#[derive(Debug, Error)]
#[error("malformed JWT {section}")]
pub struct MalformedJwt {
    section: JwtSection,
    #[source]
    source: Option<BoxError>,
}

impl MalformedJwt {
    /// The section that could not be decoded
    #[must_use]
    pub fn section(&self) -> JwtSection {
        self.section
    }
}

pub(crate) fn malformed_jwt() -> MalformedJwt {
    MalformedJwt {
        section: JwtSection::Structure,
        source: None,
    }
}

pub(crate) fn malformed_jwt_header(source: impl Into<BoxError>) -> MalformedJwt {
    MalformedJwt {
        section: JwtSection::Header,
        source: Some(source.into()),
    }
}

pub(crate) fn malformed_jwt_payload(source: impl Into<BoxError>) -> MalformedJwt {
    MalformedJwt {
        section: JwtSection::Payload,
        source: Some(source.into()),
    }
}

pub(crate) fn malformed_jwt_signature(source: impl Into<BoxError>) -> MalformedJwt {
    MalformedJwt {
        section: JwtSection::Signature,
        source: Some(source.into()),
    }
}

/// A JWK refused to verify a signature
#[derive(Debug, Error)]
pub enum JwkVerifyError {
    /// The key cannot be used with the token's algorithm
    #[error(transparent)]
    IncompatibleAlgorithm(#[from] IncompatibleAlgorithm),

    /// The key cannot be used for signature verification
    #[error(transparent)]
    JwkUsageMismatch(#[from] JwkUsageMismatch),

    /// The signature is invalid
    #[error(transparent)]
    SignatureMismatch(#[from] SignatureMismatch),
}

impl JwkVerifyError {
    /// Whether the key cannot be used with the token's algorithm
    #[must_use]
    pub fn is_incompatible_alg(&self) -> bool {
        matches!(self, Self::IncompatibleAlgorithm(_))
    }

    /// Whether the key is published for another use
    #[must_use]
    pub fn is_usage_mismatch(&self) -> bool {
        matches!(self, Self::JwkUsageMismatch(_))
    }

    /// Whether the signature is invalid
    #[must_use]
    pub fn is_signature_mismatch(&self) -> bool {
        matches!(self, Self::SignatureMismatch(_))
    }
}

/// A JWT failed verification
#[derive(Debug, Error)]
pub enum JwtVerifyError {
    /// The token could not be decoded
    #[error(transparent)]
    MalformedToken(#[from] MalformedJwt),

    /// The signing key rejected the token
    #[error("token rejected by JWK")]
    JwkVerifyError(#[from] JwkVerifyError),

    /// The claims validator rejected the token
    #[error("token rejected by claims validator")]
    ClaimsRejected(#[from] ClaimsRejected),
}

/// The claims or header of a JWT were not acceptable
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum ClaimsRejected {
    /// The header names an algorithm that is not approved
    #[error("invalid algorithm")]
    InvalidAlgorithm,

    /// None of the token's audiences is allowed
    #[error("invalid audience")]
    InvalidAudience,

    /// The token's issuer is not the required one
    #[error("invalid issuer")]
    InvalidIssuer,

    /// The `exp` claim, with leeway, is not after the current time
    #[error("token expired")]
    TokenExpired,

    /// The `nbf` claim, less leeway, is after the current time
    #[error("token not yet valid")]
    TokenNotYetValid,

    /// A claim the validator needs is absent
    #[error("required {_0} claim missing")]
    MissingRequiredClaim(&'static str),
}
