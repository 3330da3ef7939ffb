//! Token generation and hashing helpers shared by the auth engines.

use anyhow::{Context, Result};
use base64::Engine;
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Wire prefix carried by AHP token secrets. Documented format only; the
/// engines treat secrets as opaque strings and never branch on it.
pub const AHP_TOKEN_PREFIX: &str = "ahp_";

/// Normalize an email for lookup/uniqueness checks.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(crate) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Default display name for a freshly created account: the email local part.
pub(crate) fn default_display_name(email_normalized: &str) -> String {
    email_normalized
        .split('@')
        .next()
        .unwrap_or(email_normalized)
        .to_string()
}

/// 32 bytes from the OS RNG, base64url without padding. Used for login
/// tokens, session identifiers, and form transaction ids.
pub(crate) fn generate_opaque_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate random token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// A fresh AHP secret in its documented wire form.
pub(crate) fn generate_ahp_secret() -> Result<String> {
    Ok(format!("{AHP_TOKEN_PREFIX}{}", generate_opaque_token()?))
}

/// Hash a login token or session id so raw values never touch the store.
pub(crate) fn hash_opaque_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Hash an AHP secret under the server pepper. The pepper keeps stored
/// hashes salted while the result stays a deterministic lookup key.
pub(crate) fn hash_ahp_secret(pepper: &[u8], secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(pepper);
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

/// Masked rendering of a secret for dashboards: first eight and last four
/// characters with the middle elided.
pub(crate) fn mask_secret(secret: &str) -> String {
    if secret.len() <= 12 {
        return "...".to_string();
    }
    format!("{}...{}", &secret[..8], &secret[secret.len() - 4..])
}

/// Read the AHP hashing pepper from `path`, generating and persisting a new
/// one when absent.
pub fn load_or_generate_pepper(path: &Path) -> Result<Vec<u8>> {
    if path.exists() {
        let encoded = fs::read_to_string(path)
            .with_context(|| format!("failed to read pepper file: {}", path.display()))?;
        let pepper = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .with_context(|| format!("invalid pepper file: {}", path.display()))?;
        return Ok(pepper);
    }

    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate pepper")?;
    let encoded = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create state dir: {}", parent.display()))?;
    }
    fs::write(path, &encoded)
        .with_context(|| format!("failed to write pepper file: {}", path.display()))?;
    Ok(bytes.to_vec())
}

/// Extract a client IP for rate limiting from common proxy headers.
pub fn extract_client_ip(headers: &axum::http::HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(str::to_string);
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue};
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
    }

    #[test]
    fn default_display_name_is_local_part() {
        assert_eq!(default_display_name("alice@example.com"), "alice");
    }

    #[test]
    fn generate_opaque_token_has_full_entropy() {
        let decoded_len = generate_opaque_token()
            .ok()
            .and_then(|token| URL_SAFE_NO_PAD.decode(token.as_bytes()).ok())
            .map(|bytes| bytes.len());
        assert_eq!(decoded_len, Some(32));
    }

    #[test]
    fn generate_ahp_secret_carries_wire_prefix() {
        let secret = generate_ahp_secret().unwrap_or_default();
        assert!(secret.starts_with(AHP_TOKEN_PREFIX));
        assert!(secret.len() > AHP_TOKEN_PREFIX.len() + 40);
    }

    #[test]
    fn hash_opaque_token_stable() {
        let first = hash_opaque_token("token");
        let second = hash_opaque_token("token");
        let different = hash_opaque_token("other");
        assert_eq!(first, second);
        assert_ne!(first, different);
    }

    #[test]
    fn hash_ahp_secret_depends_on_pepper() {
        let one = hash_ahp_secret(b"pepper-a", "ahp_secret");
        let two = hash_ahp_secret(b"pepper-b", "ahp_secret");
        assert_ne!(one, two);
        assert_eq!(one, hash_ahp_secret(b"pepper-a", "ahp_secret"));
    }

    #[test]
    fn mask_secret_keeps_only_edges() {
        let masked = mask_secret("ahp_0123456789abcdef");
        assert_eq!(masked, "ahp_0123...cdef");
        assert_eq!(mask_secret("short"), "...");
    }

    #[test]
    fn pepper_round_trips_through_disk() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("token_pepper");
        let first = load_or_generate_pepper(&path)?;
        let second = load_or_generate_pepper(&path)?;
        assert_eq!(first, second);
        assert_eq!(first.len(), 32);
        Ok(())
    }

    #[test]
    fn extract_client_ip_prefers_forwarded() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("1.2.3.4, 5.6.7.8"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(extract_client_ip(&headers), Some("1.2.3.4".to_string()));
    }

    #[test]
    fn extract_client_ip_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(extract_client_ip(&headers), Some("9.9.9.9".to_string()));
    }

    #[test]
    fn extract_client_ip_none_when_missing() {
        let headers = HeaderMap::new();
        assert_eq!(extract_client_ip(&headers), None);
    }
}
