//! JSON Web Signature (JWS) verification
//!
//! The specifications for this standard can be found in [RFC7515][].
//! Only the compact serialization is supported, and only with the RSA
//! algorithms of [`jwa::Algorithm`].
//!
//! [RFC7515]: https://tools.ietf.org/html/rfc7515

use std::error::Error as StdError;

use crate::jwa;

/// Checks RSA signatures over a JWS signing input
pub trait Verifier {
    /// The error returned when a signature is refused
    type Error: StdError + Send + Sync + 'static;

    /// Whether signatures made with `alg` can be checked by this verifier
    fn can_verify(&self, alg: jwa::Algorithm) -> bool;

    /// Checks that `signature` was made over `data` using `alg`
    ///
    /// # Errors
    ///
    /// The signature was not made by this key, or the key cannot be used
    /// with `alg`.
    fn verify(&self, alg: jwa::Algorithm, data: &[u8], signature: &[u8])
        -> Result<(), Self::Error>;
}
