//! Fixed RSA keys and a token signer for tests
//!
//! The private keys here are published with the source and must never be
//! trusted outside of tests.

#![allow(clippy::missing_panics_doc)]

use serde::Serialize;

use crate::{jwa, jwt::HasAlgorithm, Base64Url, Jwt};

/// Key id of the primary test key
pub const PRIMARY_KEY_ID: &str = "TlxyqF5wzxj3UQfGxA2Xz";

/// Key id of a key that appears only in [`JWKS_ROGUE`]
pub const ROGUE_KEY_ID: &str = "rogue-key-7d1c";

/// A key set holding the primary key, declared for RS256 signatures
pub const JWKS: &str = include_str!("../data/rsa/jwks.json");

/// A key set holding only the rogue key
pub const JWKS_ROGUE: &str = include_str!("../data/rsa/jwks-rogue.json");

/// A key set holding an elliptic curve key and the primary key without a
/// declared algorithm
pub const JWKS_MIXED: &str = include_str!("../data/rsa/jwks-mixed.json");

const PRIMARY_PKCS8: &[u8] = include_bytes!("../data/rsa/primary.pk8");
const ROGUE_PKCS8: &[u8] = include_bytes!("../data/rsa/rogue.pk8");

/// The private key to sign with
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TestKey {
    /// The key published in [`JWKS`]
    Primary,
    /// The key published in [`JWKS_ROGUE`]
    Rogue,
}

impl TestKey {
    fn key_pair(self) -> ring::signature::RsaKeyPair {
        let der = match self {
            Self::Primary => PRIMARY_PKCS8,
            Self::Rogue => ROGUE_PKCS8,
        };

        ring::signature::RsaKeyPair::from_pkcs8(der).expect("test key fixtures are valid PKCS#8")
    }
}

fn signing_params(alg: jwa::Algorithm) -> &'static dyn ring::signature::RsaEncoding {
    match alg {
        jwa::Algorithm::RS256 => &ring::signature::RSA_PKCS1_SHA256,
        jwa::Algorithm::RS384 => &ring::signature::RSA_PKCS1_SHA384,
        jwa::Algorithm::RS512 => &ring::signature::RSA_PKCS1_SHA512,
    }
}

/// Signs `data` with the given key and algorithm
pub fn sign_bytes(key: TestKey, alg: jwa::Algorithm, data: &[u8]) -> Vec<u8> {
    let pair = key.key_pair();
    let rng = ring::rand::SystemRandom::new();
    let mut signature = vec![0; pair.public().modulus_len()];

    pair.sign(signing_params(alg), &rng, data, &mut signature)
        .expect("signing with a fixture key succeeds");

    signature
}

/// Signs `data` with the primary key using RS256
pub fn sign_primary(data: &[u8]) -> Vec<u8> {
    sign_bytes(TestKey::Primary, jwa::Algorithm::RS256, data)
}

/// Produces a compact JWT over the JSON forms of `headers` and `payload`
///
/// The signing algorithm is the one named in the headers.
pub fn sign<H, P>(headers: &H, payload: &P, key: TestKey) -> Jwt
where
    H: Serialize + HasAlgorithm,
    P: Serialize,
{
    let h_raw = Base64Url::from_raw(serde_json::to_vec(headers).expect("headers serialize"));
    let p_raw = Base64Url::from_raw(serde_json::to_vec(payload).expect("payload serialize"));

    let message = format!("{}.{}", h_raw, p_raw);
    let signature = Base64Url::from_raw(sign_bytes(key, headers.alg(), message.as_bytes()));

    Jwt::new(format!("{}.{}", message, signature))
}
