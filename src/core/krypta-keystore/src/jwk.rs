//! JSON Web Key representation.
//!
//! The manager itself only needs [`KeyMaterial`](crate::manager::KeyMaterial);
//! this concrete type is what Krypta deployments actually persist.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::manager::KeyMaterial;

/// A JSON Web Key (RFC 7517).
///
/// All parameter fields are optional and omitted from the serialized form
/// when unset; which ones are present depends on `kty`. The struct is
/// deliberately permissive: the store treats it as an opaque serializable
/// unit and never validates key-type/parameter consistency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKey {
    /// Key identifier, unique within a set.
    pub kid: String,

    /// Key type, e.g. `oct`, `EC`, `RSA`.
    pub kty: String,

    /// Intended algorithm, e.g. `A256GCM`, `ES256`, `RS256`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Public key use: `sig` or `enc`.
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub public_key_use: Option<String>,

    /// Symmetric key material, base64url.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,

    /// Elliptic curve name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// EC public coordinate, base64url.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// EC public coordinate, base64url.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,

    /// Private exponent / private scalar, base64url.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,

    /// RSA modulus, base64url.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA public exponent, base64url.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

impl JsonWebKey {
    /// Builds a symmetric (`oct`) key from raw bytes.
    pub fn symmetric(kid: impl Into<String>, alg: impl Into<String>, key: &[u8]) -> Self {
        Self {
            kid: kid.into(),
            kty: "oct".to_string(),
            alg: Some(alg.into()),
            public_key_use: None,
            k: Some(URL_SAFE_NO_PAD.encode(key)),
            crv: None,
            x: None,
            y: None,
            d: None,
            n: None,
            e: None,
        }
    }
}

impl KeyMaterial for JsonWebKey {
    fn key_id(&self) -> &str {
        &self.kid
    }
}
