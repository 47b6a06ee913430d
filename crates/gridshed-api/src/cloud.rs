// Cloud identity service authentication.
//
// Two-step exchange: a form-encoded login establishes an authenticated
// cloud session (cookie in the jar), then the token-issuance endpoint —
// scoped by the gateway serial number — returns the bearer token triple.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::token::CloudToken;
use crate::transport::TransportConfig;

/// Production identity-service base URL.
pub const ENLIGHTEN_BASE: &str = "https://enlighten.enphaseenergy.com";

const LOGIN_PATH: &str = "/login/login";
const TOKEN_PATH: &str = "/entrez-auth-token";

/// Client for the cloud identity service.
///
/// Holds its own cookie jar: the login response sets the session cookie
/// the token-issuance request depends on.
pub struct CloudAuth {
    http: reqwest::Client,
    base_url: Url,
}

impl CloudAuth {
    /// Create a client against the production identity service.
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        let base_url = Url::parse(ENLIGHTEN_BASE)?;
        Self::with_base_url(base_url, transport)
    }

    /// Create a client against an arbitrary base URL (tests, staging).
    pub fn with_base_url(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        // Login needs a cookie jar; add one if the caller didn't.
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let http = config.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Exchange account credentials for a fresh bearer token.
    ///
    /// Step (a): `POST /login/login` with `user[email]` / `user[password]`
    /// form fields; any 2xx means the session cookie is set.
    /// Step (b): `GET /entrez-auth-token?serial_num=<serial>` using that
    /// session; the body is the `{token, generation_time, expires_at}`
    /// triple.
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
        serial: &str,
    ) -> Result<CloudToken, Error> {
        let login_url = self.base_url.join(LOGIN_PATH)?;
        debug!("logging in at {}", login_url);

        let form = [
            ("user[email]", email),
            ("user[password]", password.expose_secret()),
        ];
        let resp = self
            .http
            .post(login_url)
            .form(&form)
            .send()
            .await
            .map_err(Error::CloudTransport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::AuthenticationFailed {
                message: format!("login failed (HTTP {status})"),
            });
        }

        let mut token_url = self.base_url.join(TOKEN_PATH)?;
        token_url
            .query_pairs_mut()
            .append_pair("serial_num", serial);
        debug!("requesting token at {}", token_url);

        let resp = self
            .http
            .get(token_url)
            .send()
            .await
            .map_err(Error::CloudTransport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::AuthenticationFailed {
                message: format!("token issuance failed (HTTP {status})"),
            });
        }

        let body = resp.text().await.map_err(Error::CloudTransport)?;
        let token = CloudToken::parse(&body)?;
        debug!(window = %token.validity_window(), "cloud token issued");
        Ok(token)
    }
}
