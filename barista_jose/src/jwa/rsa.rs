//! RSA public keys

use std::convert::TryFrom;

use serde::{Deserialize, Serialize};

use super::Algorithm;
use crate::{error, jws, Base64Url};

const MIN_MODULUS_BYTES: usize = 2048 / 8;
const MAX_MODULUS_BYTES: usize = 8192 / 8;

/// RSA public key components
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PublicKeyDto")]
pub struct PublicKey {
    /// The public modulus
    #[serde(rename = "n")]
    modulus: Base64Url,

    /// The public exponent
    #[serde(rename = "e")]
    exponent: Base64Url,
}

impl PublicKey {
    /// The public key's modulus
    #[must_use]
    pub fn modulus(&self) -> &Base64Url {
        &self.modulus
    }

    /// The public key's exponent
    #[must_use]
    pub fn exponent(&self) -> &Base64Url {
        &self.exponent
    }

    /// Constructs a public key from the modulus and exponent
    ///
    /// # Errors
    ///
    /// The modulus is not between 2048 and 8192 bits, or the exponent is
    /// empty.
    pub fn from_components(
        modulus: impl Into<Base64Url>,
        exponent: impl Into<Base64Url>,
    ) -> Result<Self, error::KeyRejected> {
        let modulus = strip_leading_zeros(modulus.into());
        let exponent = strip_leading_zeros(exponent.into());

        let len = modulus.as_slice().len();
        if !(MIN_MODULUS_BYTES..=MAX_MODULUS_BYTES).contains(&len) {
            return Err(error::key_rejected(format!(
                "key modulus must be between 2048 and 8192 bits, got {} bytes",
                len
            )));
        }

        if exponent.as_slice().is_empty() {
            return Err(error::key_rejected("key exponent is empty"));
        }

        Ok(Self { modulus, exponent })
    }
}

fn strip_leading_zeros(value: Base64Url) -> Base64Url {
    let raw = value.into_inner();
    let start = raw.iter().position(|b| *b != 0).unwrap_or(raw.len());
    Base64Url::from_raw(raw[start..].to_vec())
}

impl jws::Verifier for PublicKey {
    type Error = error::SignatureMismatch;

    fn can_verify(&self, _alg: Algorithm) -> bool {
        true
    }

    fn verify(
        &self,
        alg: Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        let pk = ring::signature::RsaPublicKeyComponents {
            n: self.modulus.as_slice(),
            e: self.exponent.as_slice(),
        };

        pk.verify(alg.verification_params(), data, signature)
            .map_err(|_| error::signature_mismatch())
    }
}

impl TryFrom<PublicKeyDto> for PublicKey {
    type Error = error::KeyRejected;

    fn try_from(dto: PublicKeyDto) -> Result<Self, Self::Error> {
        Self::from_components(dto.modulus, dto.exponent)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
struct PublicKeyDto {
    #[serde(rename = "n")]
    modulus: Base64Url,

    #[serde(rename = "e")]
    exponent: Base64Url,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_modulus() {
        let err = PublicKey::from_components(vec![0xab; 128], vec![1, 0, 1]).unwrap_err();
        assert!(err.to_string().contains("key rejected"));
    }

    #[test]
    fn ignores_leading_zero_bytes() {
        let mut n = vec![0u8];
        n.extend(std::iter::repeat(0xc3).take(256));

        let key = PublicKey::from_components(n, vec![0, 1, 0, 1]).unwrap();
        assert_eq!(key.modulus().as_slice().len(), 256);
        assert_eq!(key.exponent().as_slice(), &[1, 0, 1]);
    }

    #[test]
    fn rejects_empty_exponent() {
        assert!(PublicKey::from_components(vec![0xc3; 256], Vec::new()).is_err());
    }
}
