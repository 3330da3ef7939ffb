//! OpenAPI document for the service, driven by `#[utoipa::path]`
//! annotations on the handlers and Cargo package metadata.

use utoipa::openapi::{InfoBuilder, License};
use utoipa::OpenApi;

use super::error::ErrorBody;
use super::handlers::{
    exchange::{ExchangeRequest, ExchangeResponse},
    health::Health,
    login::{LoginAccepted, LoginFormResponse, LoginSubmission},
    session::SessionInfo,
    tokens::{CreateTokenRequest, CreateTokenResponse, TokenMetadata},
    verify::VerifyParams,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::handlers::health::health,
        super::handlers::login::login_form,
        super::handlers::login::login,
        super::handlers::verify::verify_get,
        super::handlers::verify::verify_post,
        super::handlers::session::session_info,
        super::handlers::session::logout,
        super::handlers::tokens::list_tokens,
        super::handlers::tokens::create_token,
        super::handlers::tokens::revoke_token,
        super::handlers::exchange::exchange,
        super::handlers::jwks::jwks,
    ),
    components(schemas(
        ErrorBody,
        Health,
        LoginFormResponse,
        LoginSubmission,
        LoginAccepted,
        VerifyParams,
        SessionInfo,
        TokenMetadata,
        CreateTokenRequest,
        CreateTokenResponse,
        ExchangeRequest,
        ExchangeResponse,
    )),
    tags(
        (name = "auth", description = "Magic-link login and browser sessions"),
        (name = "tokens", description = "Long-lived AHP token management"),
        (name = "jwt", description = "Token exchange and key discovery"),
        (name = "health", description = "Service probes")
    )
)]
struct ApiDoc;

/// The generated spec with info filled from Cargo.toml metadata.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut spec = ApiDoc::openapi();
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();
    info.license = cargo_license();
    spec.info = info;
    spec
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
