use super::token::{ClientSecret, ConsentFlow, StoredToken, TokenResponse, CALENDAR_SCOPE};
use crate::error::{auth_error, other_error, SyncResult};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use tracing::{info, warn};
use url::Url;

/// Installed-app consent: browser + loopback redirect listener
pub struct BrowserConsent {
    port: u16,
    client: Client,
}

impl BrowserConsent {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            client: Client::new(),
        }
    }
}

/// Build the Google authorization URL for the calendar scope
pub fn authorization_url(
    secret: &ClientSecret,
    redirect_uri: &str,
    state: &str,
) -> SyncResult<String> {
    let url = Url::parse_with_params(
        &secret.auth_uri,
        &[
            ("client_id", secret.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("scope", CALENDAR_SCOPE),
            ("state", state),
        ],
    )
    .map_err(|e| auth_error(&format!("Invalid auth_uri: {}", e)))?;
    Ok(url.to_string())
}

/// Block until the browser hits the redirect URI with a code
fn wait_for_code(server: tiny_http::Server, expected_state: &str) -> SyncResult<String> {
    loop {
        let request = server.recv()?;
        let url = Url::parse(&format!("http://localhost{}", request.url()))
            .map_err(|e| auth_error(&format!("Invalid callback URL: {}", e)))?;
        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

        if let Some(error) = params.get("error") {
            let _ = request.respond(tiny_http::Response::from_string("Authorization was denied."));
            return Err(auth_error(&format!("Authorization denied: {}", error)));
        }

        // Favicon and other stray requests
        let Some(code) = params.get("code") else {
            let _ = request.respond(tiny_http::Response::empty(404));
            continue;
        };

        if params.get("state").map(String::as_str) != Some(expected_state) {
            let _ = request.respond(tiny_http::Response::from_string("State mismatch."));
            return Err(auth_error("OAuth state mismatch in callback"));
        }

        let _ = request.respond(tiny_http::Response::from_string(
            "Authorization successful! You can close this window.",
        ));
        return Ok(code.clone());
    }
}

/// Exchange an authorization code for tokens
pub async fn exchange_code(
    client: &Client,
    secret: &ClientSecret,
    code: &str,
    redirect_uri: &str,
) -> SyncResult<StoredToken> {
    let response = client
        .post(&secret.token_uri)
        .form(&[
            ("client_id", secret.client_id.as_str()),
            ("client_secret", secret.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .map_err(|e| auth_error(&format!("Failed to exchange code: {}", e)))?;

    if !response.status().is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(auth_error(&format!("Failed to get token: {}", error_text)));
    }

    let reply: TokenResponse = response
        .json()
        .await
        .map_err(|e| auth_error(&format!("Failed to parse token response: {}", e)))?;

    if reply.refresh_token.is_none() {
        warn!("Token response has no refresh token; the next expiry will need a new grant");
    }
    Ok(reply.into_stored(None).with_client(secret))
}

#[async_trait]
impl ConsentFlow for BrowserConsent {
    async fn authorize(&self, secret: &ClientSecret) -> SyncResult<StoredToken> {
        // Random state guards the callback against forgery
        let state = uuid::Uuid::new_v4().to_string();
        let redirect_uri = format!("http://127.0.0.1:{}", self.port);
        let auth_url = authorization_url(secret, &redirect_uri, &state)?;

        let server = tiny_http::Server::http(("127.0.0.1", self.port))
            .map_err(|e| auth_error(&format!("Cannot listen on port {}: {}", self.port, e)))?;

        info!("Opening browser for Google Calendar authorization...");
        if let Err(e) = webbrowser::open(&auth_url) {
            warn!("Could not open a browser ({}). Open this URL manually: {}", e, auth_url);
        }
        info!("Waiting for authorization callback on {}", redirect_uri);

        let code = tokio::task::spawn_blocking(move || wait_for_code(server, &state))
            .await
            .map_err(|e| other_error(&format!("Callback listener crashed: {}", e)))??;

        exchange_code(&self.client, secret, &code, &redirect_uri).await
    }
}
