use serde::{Deserialize, Serialize};

use crate::{jwa, jwk, Jwk};

/// A JSON Web Key Set (JWKS)
///
/// Keys that cannot be understood, such as elliptic curve keys or keys
/// meant for encryption algorithms, are dropped with a warning when the set
/// is deserialized.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    #[serde(deserialize_with = "deserialize_keys")]
    keys: Vec<Jwk>,
}

impl Jwks {
    /// Adds a key to the set
    pub fn add_key(&mut self, key: Jwk) {
        self.keys.push(key);
    }

    /// A view of the keys in this set
    #[must_use]
    pub fn keys(&self) -> &[Jwk] {
        &self.keys
    }

    /// Gets the best key with the given key id for the algorithm requested
    ///
    /// Keys without a `kid` never match. Among the keys with a matching
    /// `kid`, one that declares the requested algorithm and usage is
    /// preferred.
    #[must_use]
    pub fn get_key_by_id(&self, kid: &jwk::KeyIdRef, alg: jwa::Algorithm) -> Option<&Jwk> {
        let alg_usage = alg.to_usage();

        let best = self.keys.iter().fold(None, move |best, k| {
            let mut score = 0;

            if k.key_id() != Some(kid) || !k.is_compatible(alg) {
                return best;
            }

            if let Some(algorithm) = k.algorithm() {
                if algorithm == alg {
                    score += 2;
                } else {
                    return best;
                }
            }

            if let Some(key_usage) = k.usage() {
                if key_usage == alg_usage {
                    score += 1;
                } else {
                    return best;
                }
            }

            match best {
                Some((_, best_score)) if best_score < score => Some((k, score)),
                None => Some((k, score)),
                _ => best,
            }
        });

        best.map(|(b, _)| b)
    }

    /// Whether any key in the set carries the given key id
    #[must_use]
    pub fn contains_key_id(&self, kid: &jwk::KeyIdRef) -> bool {
        self.keys.iter().any(|k| k.key_id() == Some(kid))
    }
}

fn deserialize_keys<'de, D>(deserializer: D) -> Result<Vec<Jwk>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct MaybeJwksVisitor;

    impl<'de> serde::de::Visitor<'de> for MaybeJwksVisitor {
        type Value = Vec<Jwk>;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("a list of JWK objects")
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: serde::de::SeqAccess<'de>,
        {
            let mut values = Vec::with_capacity(seq.size_hint().unwrap_or_default());
            let mut index = 0_usize;

            while let Some(value) = seq.next_element()? {
                match value {
                    MaybeJwk::Jwk(jwk) => values.push(jwk),
                    MaybeJwk::Unknown(key) => {
                        tracing::warn!(
                            jwks.idx = index,
                            jwk.kid = ?key.kid,
                            jwk.kty = ?key.kty,
                            jwk.alg = ?key.alg,
                            "ignoring unsupported JWK"
                        );
                    }
                }
                index += 1;
            }

            Ok(values)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MaybeJwk {
        Jwk(Jwk),
        Unknown(JwkLike),
    }

    #[derive(Deserialize)]
    struct JwkLike {
        #[serde(default)]
        kid: Option<jwk::KeyId>,
        #[serde(default)]
        kty: Option<String>,
        #[serde(default)]
        alg: Option<String>,
    }

    deserializer.deserialize_seq(MaybeJwksVisitor)
}
