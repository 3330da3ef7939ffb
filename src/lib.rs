//! # Sigillo (Federated Trust Anchor)
//!
//! `sigillo` authenticates people through passwordless magic-link email
//! flows, issues long-lived opaque bearer credentials (AHP tokens) to
//! authenticated accounts, and exchanges those credentials for short-lived
//! RS256 JWTs that downstream services verify offline against the published
//! JWKS document.
//!
//! ## Credential classes
//!
//! - **Login tokens** are single-use and short-lived: verifying one rotates
//!   the stored value in the same conditional write that checks it.
//! - **Sessions** are cookie-carried, sliding-expiry, and browser-only.
//! - **AHP tokens** (`ahp_` wire prefix) are long-lived, scope-bound, and
//!   stored hash-only; the secret is shown exactly once at creation.
//! - **Access tokens** (JWTs) are stateless by design: no revocation list
//!   exists, so a minted token stays valid until it expires. Bound the blast
//!   radius with the TTL, not with lookups.
//!
//! ## Oracle resistance
//!
//! Login responses never reveal whether an account existed, credential
//! failures collapse to one `invalid_token` shape regardless of cause, and
//! ownership mismatches return the same `404` as genuinely missing
//! entities.

pub mod api;
pub mod auth;
pub mod cli;
pub mod signing;
pub mod store;
