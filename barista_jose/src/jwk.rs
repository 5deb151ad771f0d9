//! RSA JSON Web Keys (JWK)
//!
//! The specifications for JSON Web Keys can be found in [RFC7517][].
//!
//! [RFC7517]: https://tools.ietf.org/html/rfc7517

use std::convert::TryFrom;

use aliri_braid::braid;
use serde::{Deserialize, Serialize, Serializer};

use crate::{error, jwa, jws::Verifier};

/// An identifier for a JWK
#[braid(serde, ref_doc = "A borrowed reference to a JWK identifier ([`KeyId`])")]
pub struct KeyId;

/// An identified JSON Web Key
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "JwkDto")]
#[must_use]
pub struct Jwk {
    key_id: Option<KeyId>,
    usage: Option<jwa::Usage>,
    algorithm: Option<jwa::Algorithm>,
    key: Key,
}

impl Jwk {
    /// The key ID
    #[must_use]
    pub fn key_id(&self) -> Option<&KeyIdRef> {
        self.key_id.as_deref()
    }

    /// The intended usage of the key
    #[must_use]
    pub fn usage(&self) -> Option<jwa::Usage> {
        self.usage
    }

    /// The algorithm to be used with this JWK
    #[must_use]
    pub fn algorithm(&self) -> Option<jwa::Algorithm> {
        self.algorithm
    }

    /// Whether the key is compatible with the given algorithm
    #[must_use]
    pub fn is_compatible(&self, alg: jwa::Algorithm) -> bool {
        self.key.can_verify(alg)
    }

    /// Sets the key ID
    pub fn with_key_id(self, kid: KeyId) -> Self {
        Self {
            key_id: Some(kid),
            ..self
        }
    }

    /// Sets the algorithm and usage consistent with that algorithm
    pub fn with_algorithm(self, alg: jwa::Algorithm) -> Self {
        Self {
            algorithm: Some(alg),
            usage: Some(alg.to_usage()),
            ..self
        }
    }
}

impl From<jwa::rsa::PublicKey> for Jwk {
    fn from(key: jwa::rsa::PublicKey) -> Self {
        Self {
            key_id: None,
            usage: None,
            algorithm: None,
            key: Key::Rsa(key),
        }
    }
}

impl Verifier for Jwk {
    type Error = error::JwkVerifyError;

    fn can_verify(&self, alg: jwa::Algorithm) -> bool {
        self.key.can_verify(alg)
    }

    fn verify(
        &self,
        alg: jwa::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        if let Some(u) = self.usage {
            if u != alg.to_usage() {
                return Err(error::jwk_usage_mismatch().into());
            }
        }

        match self.algorithm {
            Some(key_alg) if key_alg == alg => {}
            Some(_) => {
                return Err(error::incompatible_algorithm(alg).into());
            }
            None => {}
        }

        self.key.verify(alg, data, signature)?;

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct JwkDto {
    #[serde(rename = "kid", default, skip_serializing_if = "Option::is_none")]
    key_id: Option<KeyId>,

    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    usage: Option<jwa::Usage>,

    #[serde(rename = "alg", default, skip_serializing_if = "Option::is_none")]
    algorithm: Option<jwa::Algorithm>,

    #[serde(flatten)]
    key: Key,
}

impl TryFrom<JwkDto> for Jwk {
    type Error = error::IncompatibleAlgorithm;

    fn try_from(dto: JwkDto) -> Result<Self, Self::Error> {
        if let Some(alg) = dto.algorithm {
            if !dto.key.can_verify(alg) {
                return Err(error::incompatible_algorithm(alg));
            }
        }

        Ok(Self {
            key_id: dto.key_id,
            usage: dto.usage,
            algorithm: dto.algorithm,
            key: dto.key,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct JwkDtoRef<'a> {
    #[serde(rename = "kid", skip_serializing_if = "Option::is_none")]
    key_id: Option<&'a KeyIdRef>,

    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    usage: Option<jwa::Usage>,

    #[serde(rename = "alg", skip_serializing_if = "Option::is_none")]
    algorithm: Option<jwa::Algorithm>,

    #[serde(flatten)]
    key: &'a Key,
}

impl Serialize for Jwk {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let dto = JwkDtoRef {
            key_id: self.key_id(),
            usage: self.usage(),
            algorithm: self.algorithm(),
            key: &self.key,
        };

        dto.serialize(serializer)
    }
}

/// Key material, keyed on `kty`
///
/// Only RSA keys are understood; any other key type fails to deserialize
/// and is skipped when reading a key set.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kty")]
enum Key {
    #[serde(rename = "RSA")]
    Rsa(jwa::rsa::PublicKey),
}

impl Verifier for Key {
    type Error = error::JwkVerifyError;

    fn can_verify(&self, alg: jwa::Algorithm) -> bool {
        match self {
            Self::Rsa(p) => p.can_verify(alg),
        }
    }

    fn verify(
        &self,
        alg: jwa::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        match self {
            Self::Rsa(p) => p.verify(alg, data, signature)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;
    use crate::test_util;

    fn primary_jwk() -> Result<Jwk> {
        let jwks: serde_json::Value = serde_json::from_str(test_util::JWKS)?;
        Ok(serde_json::from_value(jwks["keys"][0].clone())?)
    }

    #[test]
    fn deserializes_rsa_jwk() -> Result<()> {
        let key = primary_jwk()?;
        assert_eq!(
            key.key_id(),
            Some(KeyIdRef::from_str(test_util::PRIMARY_KEY_ID))
        );
        assert_eq!(key.algorithm(), Some(jwa::Algorithm::RS256));
        assert_eq!(key.usage(), Some(jwa::Usage::Signing));
        Ok(())
    }

    #[test]
    fn rejects_non_rsa_key_types() {
        let ec = r#"{"kty":"EC","crv":"P-256","x":"AA","y":"AA"}"#;
        assert!(serde_json::from_str::<Jwk>(ec).is_err());
    }

    #[test]
    fn rejects_unsupported_algorithm() {
        let hs = r#"{"kty":"RSA","alg":"HS256","n":"AQAB","e":"AQAB"}"#;
        assert!(serde_json::from_str::<Jwk>(hs).is_err());
    }

    #[test]
    fn verifies_signature_from_matching_private_key() -> Result<()> {
        let key = primary_jwk()?;
        let sig = test_util::sign_primary(b"the message");

        key.verify(jwa::Algorithm::RS256, b"the message", &sig)?;
        Ok(())
    }

    #[test]
    fn rejects_tampered_message() -> Result<()> {
        let key = primary_jwk()?;
        let sig = test_util::sign_primary(b"the message");

        let err = key
            .verify(jwa::Algorithm::RS256, b"the massage", &sig)
            .unwrap_err();
        assert!(err.is_signature_mismatch());
        Ok(())
    }

    #[test]
    fn rejects_algorithm_other_than_declared() -> Result<()> {
        let key = primary_jwk()?;
        let sig = test_util::sign_primary(b"the message");

        let err = key
            .verify(jwa::Algorithm::RS512, b"the message", &sig)
            .unwrap_err();
        assert!(err.is_incompatible_alg());
        Ok(())
    }

    #[test]
    fn rejects_encryption_key_for_signatures() -> Result<()> {
        let key = Jwk {
            usage: Some(jwa::Usage::Encryption),
            ..primary_jwk()?
        };

        let err = key.verify(jwa::Algorithm::RS256, &[], &[]).unwrap_err();
        assert!(err.is_usage_mismatch());
        Ok(())
    }
}
