//! Signing key lifecycle.
//!
//! The key ring is loaded once at startup and never mutated afterwards.
//! Rotation is modeled as a new key identifier: the operator moves the old
//! public key to `retired_key.pem`, drops a fresh private key in place (or
//! lets the service generate one), and the retired key stays in the JWKS so
//! tokens signed just before the swap verify until they expire.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::info;

use super::jwks::{Jwk, Jwks};

pub const SIGNING_KEY_FILE: &str = "signing_key.pem";
pub const RETIRED_KEY_FILE: &str = "retired_key.pem";

const KEY_BITS: usize = 2048;
const KID_LENGTH: usize = 16;

struct RetiredKey {
    kid: String,
    public: RsaPublicKey,
}

/// Process-wide signing state: the active private key plus an optional
/// retired public key still being published.
///
/// No `Debug` impl: the private key must never end up in logs or error
/// messages.
pub struct KeyRing {
    kid: String,
    private: RsaPrivateKey,
    retired: Option<RetiredKey>,
}

impl KeyRing {
    /// Load the signing key from `state_dir`, generating and persisting a
    /// new one when absent. Fails fast on unreadable or invalid key
    /// material.
    ///
    /// # Errors
    /// Returns an error if key files exist but cannot be read or parsed, or
    /// if key generation/persistence fails.
    pub fn load_or_generate(state_dir: &Path) -> Result<Self> {
        let key_path = state_dir.join(SIGNING_KEY_FILE);
        let private = if key_path.exists() {
            let pem = fs::read_to_string(&key_path)
                .with_context(|| format!("failed to read signing key: {}", key_path.display()))?;
            decode_private_key_pem(&pem)
                .with_context(|| format!("invalid signing key: {}", key_path.display()))?
        } else {
            info!("No signing key found, generating RSA-{KEY_BITS}");
            let private = RsaPrivateKey::new(&mut OsRng, KEY_BITS)
                .context("failed to generate signing key")?;
            fs::create_dir_all(state_dir)
                .with_context(|| format!("failed to create state dir: {}", state_dir.display()))?;
            let pem = private
                .to_pkcs8_pem(LineEnding::LF)
                .context("failed to encode signing key")?;
            fs::write(&key_path, pem.as_bytes())
                .with_context(|| format!("failed to write signing key: {}", key_path.display()))?;
            private
        };

        let retired_path = state_dir.join(RETIRED_KEY_FILE);
        let retired = if retired_path.exists() {
            let pem = fs::read_to_string(&retired_path).with_context(|| {
                format!("failed to read retired key: {}", retired_path.display())
            })?;
            let public = decode_public_key_pem(&pem)
                .with_context(|| format!("invalid retired key: {}", retired_path.display()))?;
            Some(public)
        } else {
            None
        };

        Self::assemble(private, retired)
    }

    /// Build a key ring from an already-decoded private key PEM.
    ///
    /// # Errors
    /// Returns an error if the PEM cannot be parsed.
    pub fn from_private_key_pem(pem: &str) -> Result<Self> {
        let private = decode_private_key_pem(pem).context("invalid signing key PEM")?;
        Self::assemble(private, None)
    }

    /// Attach a retired public key kept in the JWKS during rotation.
    ///
    /// # Errors
    /// Returns an error if the key identifier cannot be derived.
    pub fn with_retired_public_key(mut self, public: RsaPublicKey) -> Result<Self> {
        let kid = key_id(&public)?;
        self.retired = Some(RetiredKey { kid, public });
        Ok(self)
    }

    fn assemble(private: RsaPrivateKey, retired_public: Option<RsaPublicKey>) -> Result<Self> {
        let kid = key_id(&RsaPublicKey::from(&private))?;
        let retired = match retired_public {
            Some(public) => Some(RetiredKey {
                kid: key_id(&public)?,
                public,
            }),
            None => None,
        };
        info!(kid = %kid, retired = retired.is_some(), "signing key ring ready");
        Ok(Self {
            kid,
            private,
            retired,
        })
    }

    #[must_use]
    pub fn active_kid(&self) -> &str {
        &self.kid
    }

    pub(crate) fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }

    /// The published key set: active key first, retired key (if any) after.
    #[must_use]
    pub fn jwks(&self) -> Jwks {
        let mut keys = vec![Jwk::from_rsa_public_key(
            &RsaPublicKey::from(&self.private),
            self.kid.clone(),
        )];
        if let Some(retired) = &self.retired {
            keys.push(Jwk::from_rsa_public_key(&retired.public, retired.kid.clone()));
        }
        Jwks::from_keys(keys)
    }
}

/// Key identifier: truncated base64url SHA-256 of the public key DER.
fn key_id(public: &RsaPublicKey) -> Result<String> {
    let der = public
        .to_public_key_der()
        .context("failed to encode public key")?;
    let mut hasher = Sha256::new();
    hasher.update(der.as_bytes());
    let mut kid = Base64UrlUnpadded::encode_string(&hasher.finalize());
    kid.truncate(KID_LENGTH);
    Ok(kid)
}

fn decode_private_key_pem(pem: &str) -> Result<RsaPrivateKey> {
    if let Ok(key) = RsaPrivateKey::from_pkcs8_pem(pem) {
        return Ok(key);
    }
    RsaPrivateKey::from_pkcs1_pem(pem).context("not a PKCS#8 or PKCS#1 private key")
}

fn decode_public_key_pem(pem: &str) -> Result<RsaPublicKey> {
    if let Ok(key) = RsaPublicKey::from_public_key_pem(pem) {
        return Ok(key);
    }
    RsaPublicKey::from_pkcs1_pem(pem).context("not an SPKI or PKCS#1 public key")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::test_key::PRIVATE_KEY_PEM;
    use anyhow::Result;

    #[test]
    fn kid_is_stable_for_a_given_key() -> Result<()> {
        let first = KeyRing::from_private_key_pem(PRIVATE_KEY_PEM)?;
        let second = KeyRing::from_private_key_pem(PRIVATE_KEY_PEM)?;
        assert_eq!(first.active_kid(), second.active_kid());
        assert_eq!(first.active_kid().len(), KID_LENGTH);
        Ok(())
    }

    #[test]
    fn jwks_contains_active_key_only_by_default() -> Result<()> {
        let ring = KeyRing::from_private_key_pem(PRIVATE_KEY_PEM)?;
        let jwks = ring.jwks();
        assert_eq!(jwks.keys.len(), 1);
        assert!(jwks.find_by_kid(ring.active_kid()).is_some());
        Ok(())
    }

    #[test]
    fn retired_key_is_published_alongside_active() -> Result<()> {
        let ring = KeyRing::from_private_key_pem(PRIVATE_KEY_PEM)?;
        let retired_public = RsaPublicKey::from(ring.private_key());
        let ring = ring.with_retired_public_key(retired_public)?;
        let jwks = ring.jwks();
        assert_eq!(jwks.keys.len(), 2);
        Ok(())
    }

    #[test]
    fn load_reads_existing_key_from_disk() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join(SIGNING_KEY_FILE), PRIVATE_KEY_PEM)?;
        let ring = KeyRing::load_or_generate(dir.path())?;
        let expected = KeyRing::from_private_key_pem(PRIVATE_KEY_PEM)?;
        assert_eq!(ring.active_kid(), expected.active_kid());
        Ok(())
    }

    #[test]
    fn load_fails_fast_on_garbage_key_material() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join(SIGNING_KEY_FILE), "not a key")?;
        assert!(KeyRing::load_or_generate(dir.path()).is_err());
        Ok(())
    }

    #[test]
    fn load_picks_up_retired_key_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join(SIGNING_KEY_FILE), PRIVATE_KEY_PEM)?;
        let public = RsaPublicKey::from(
            KeyRing::from_private_key_pem(PRIVATE_KEY_PEM)?.private_key(),
        );
        let public_pem = public
            .to_public_key_pem(LineEnding::LF)
            .context("failed to encode public key")?;
        fs::write(dir.path().join(RETIRED_KEY_FILE), public_pem)?;

        let ring = KeyRing::load_or_generate(dir.path())?;
        assert_eq!(ring.jwks().keys.len(), 2);
        Ok(())
    }
}
