//! JWK / JWKS types for the key discovery document.

use base64ct::{Base64UrlUnpadded, Encoding};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use serde::{Deserialize, Serialize};

use super::jwt::Error;

/// The published key-set document. Contains the active signing key and,
/// during a rotation grace period, the retired one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

impl Jwks {
    #[must_use]
    pub fn from_keys(keys: Vec<Jwk>) -> Self {
        Self { keys }
    }

    /// Parse a JWKS from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if `s` is not valid JSON or doesn't match the
    /// expected shape.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Serialize this JWKS to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Find a key by `kid` (Key ID).
    #[must_use]
    pub fn find_by_kid(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jwk {
    pub kty: String,
    pub alg: String,
    #[serde(rename = "use")]
    pub key_use: String,
    pub kid: String,
    pub n: String,
    pub e: String,
}

impl Jwk {
    /// Build a signature-use RS256 JWK from an `RsaPublicKey`.
    #[must_use]
    pub fn from_rsa_public_key(public_key: &RsaPublicKey, kid: impl Into<String>) -> Self {
        let n = Base64UrlUnpadded::encode_string(&public_key.n().to_bytes_be());
        let e = Base64UrlUnpadded::encode_string(&public_key.e().to_bytes_be());
        Self {
            kty: "RSA".to_string(),
            alg: "RS256".to_string(),
            key_use: "sig".to_string(),
            kid: kid.into(),
            n,
            e,
        }
    }

    /// Convert this JWK back to an `RsaPublicKey`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base64url values cannot be decoded or the RSA
    /// key is invalid.
    pub fn to_rsa_public_key(&self) -> Result<RsaPublicKey, Error> {
        let n_bytes = Base64UrlUnpadded::decode_vec(&self.n).map_err(|_| Error::Base64)?;
        let e_bytes = Base64UrlUnpadded::decode_vec(&self.e).map_err(|_| Error::Base64)?;
        let n = BigUint::from_bytes_be(&n_bytes);
        let e = BigUint::from_bytes_be(&e_bytes);
        RsaPublicKey::new(n, e).map_err(Error::Rsa)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};
    use rsa::pkcs8::DecodePrivateKey;
    use rsa::RsaPrivateKey;

    fn test_public_key() -> Result<RsaPublicKey> {
        let private = RsaPrivateKey::from_pkcs8_pem(crate::signing::test_key::PRIVATE_KEY_PEM)
            .context("failed to parse test key")?;
        Ok(RsaPublicKey::from(&private))
    }

    #[test]
    fn jwk_round_trips_to_rsa_public_key() -> Result<()> {
        let public = test_public_key()?;
        let jwk = Jwk::from_rsa_public_key(&public, "k1");
        assert_eq!(jwk.kty, "RSA");
        assert_eq!(jwk.alg, "RS256");
        assert_eq!(jwk.key_use, "sig");
        let decoded = jwk.to_rsa_public_key()?;
        assert_eq!(decoded, public);
        Ok(())
    }

    #[test]
    fn find_by_kid_matches_exactly() -> Result<()> {
        let public = test_public_key()?;
        let jwks = Jwks::from_keys(vec![
            Jwk::from_rsa_public_key(&public, "k1"),
            Jwk::from_rsa_public_key(&public, "k2"),
        ]);
        assert_eq!(jwks.find_by_kid("k2").map(|k| k.kid.as_str()), Some("k2"));
        assert!(jwks.find_by_kid("k3").is_none());
        Ok(())
    }

    #[test]
    fn json_round_trip_preserves_use_field() -> Result<()> {
        let public = test_public_key()?;
        let jwks = Jwks::from_keys(vec![Jwk::from_rsa_public_key(&public, "k1")]);
        let json = jwks.to_json_pretty()?;
        assert!(json.contains("\"use\": \"sig\""));
        let parsed = Jwks::from_json(&json)?;
        assert_eq!(parsed, jwks);
        Ok(())
    }
}
