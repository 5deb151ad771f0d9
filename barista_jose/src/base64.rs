use std::fmt;

use ::base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error;

// Encodes without padding, but tolerates padded input from key sets that
// include it.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Bytes that travel as URL-safe base64
///
/// The value is held decoded; encoding happens only when serializing or
/// formatting.
#[derive(Clone, Default, Eq, PartialEq, Hash)]
#[repr(transparent)]
#[must_use]
pub struct Base64Url(Vec<u8>);

impl Base64Url {
    /// Wraps already-decoded bytes
    #[inline]
    pub fn from_raw<T: Into<Vec<u8>>>(raw: T) -> Self {
        Self(raw.into())
    }

    /// Decodes a URL-safe base64 string
    ///
    /// # Errors
    ///
    /// The input is not valid URL-safe base64.
    pub fn from_encoded<T: AsRef<[u8]>>(enc: T) -> Result<Self, error::InvalidBase64Data> {
        let data = URL_SAFE_LENIENT
            .decode(enc)
            .map_err(error::invalid_base64_data)?;
        Ok(Self(data))
    }

    /// The decoded bytes
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Unwraps the decoded bytes
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    /// The URL-safe base64 encoding, without padding
    #[must_use]
    pub fn encode(&self) -> String {
        URL_SAFE_LENIENT.encode(&self.0)
    }
}

impl From<Vec<u8>> for Base64Url {
    #[inline]
    fn from(buf: Vec<u8>) -> Self {
        Self(buf)
    }
}

impl fmt::Display for Base64Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl fmt::Debug for Base64Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`", self.encode())
    }
}

impl Serialize for Base64Url {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Base64Url {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        Self::from_encoded(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}
