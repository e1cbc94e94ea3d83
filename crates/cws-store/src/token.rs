use std::fmt;

use cws_core::OAuthCredentials;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::StoreError;
use crate::executor::ensure_ok;
use crate::transport::{HttpRequest, Method, Transport};

/// Google's OAuth2 token endpoint.
pub const TOKEN_URL: &str = "https://www.googleapis.com/oauth2/v4/token";

const OPERATION: &str = "token refresh";

/// Short-lived bearer credential for the store API.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct AccessToken {
    #[serde(rename = "access_token")]
    pub token: String,
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl AccessToken {
    /// Value of the `Authorization` header, e.g. `Bearer ya29...`.
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.token)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Exchanges a refresh token for a fresh access token.
#[instrument(skip_all, fields(client_id = %credentials.client_id))]
pub fn refresh<T: Transport + ?Sized>(
    transport: &T,
    token_url: &str,
    credentials: &OAuthCredentials,
) -> Result<AccessToken, StoreError> {
    debug!("going to refresh token");
    let form = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("client_id", &credentials.client_id)
        .append_pair("client_secret", &credentials.client_secret)
        .append_pair("refresh_token", &credentials.refresh_token)
        .append_pair("grant_type", "refresh_token")
        .finish();

    let request = HttpRequest::new(Method::Post, token_url)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(form.into_bytes());

    let response = transport
        .send(&request)
        .map_err(|source| StoreError::Transport {
            operation: OPERATION,
            source,
        })?;
    ensure_ok(OPERATION, &response)?;

    let token: AccessToken =
        serde_json::from_slice(&response.body).map_err(|source| StoreError::Decode {
            operation: OPERATION,
            source,
        })?;

    debug!(
        token_type = %token.token_type,
        expires_in = ?token.expires_in,
        "access token refreshed"
    );
    Ok(token)
}
