use super::auth::BrowserConsent;
use crate::config::Config;
use crate::error::{auth_error, SyncResult};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Full read/write access to calendars
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
pub const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens this close to expiry are treated as expired
const EXPIRY_MARGIN_SECS: i64 = 60;

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

/// OAuth client registration, as downloaded from the Google Cloud console
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    /// Read an `installed` (or `web`) client secret file
    pub fn load(path: &Path) -> SyncResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            auth_error(&format!("Cannot read client secret file {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> SyncResult<Self> {
        let file: ClientSecretFile = serde_json::from_str(content)
            .map_err(|e| auth_error(&format!("Invalid client secret file: {}", e)))?;
        file.installed
            .or(file.web)
            .ok_or_else(|| auth_error("Client secret file has no 'installed' or 'web' section"))
    }
}

/// Token as persisted between runs.
///
/// The client fields let a refresh run without the client secret file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds)
    pub expires_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
}

impl StoredToken {
    pub fn is_valid_at(&self, now: i64) -> bool {
        self.expires_at - EXPIRY_MARGIN_SECS > now
    }

    /// Remember the client this token was issued to
    pub fn with_client(mut self, secret: &ClientSecret) -> Self {
        self.client_id = Some(secret.client_id.clone());
        self.client_secret = Some(secret.client_secret.clone());
        self.token_uri = Some(secret.token_uri.clone());
        self
    }

    /// Client stored alongside the token, if complete
    fn stored_client(&self) -> Option<ClientSecret> {
        Some(ClientSecret {
            client_id: self.client_id.clone()?,
            client_secret: self.client_secret.clone()?,
            auth_uri: GOOGLE_AUTH_URI.to_string(),
            token_uri: self.token_uri.clone().unwrap_or_else(default_token_uri),
        })
    }
}

/// Token endpoint reply
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    /// Turn the reply into a stored token, keeping `previous_refresh` when
    /// the endpoint did not issue a new refresh token
    pub fn into_stored(self, previous_refresh: Option<String>) -> StoredToken {
        StoredToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at: Utc::now().timestamp() + self.expires_in.unwrap_or(3600),
            ..Default::default()
        }
    }
}

/// Interactive grant that yields a fresh token
#[async_trait]
pub trait ConsentFlow: Send + Sync {
    async fn authorize(&self, secret: &ClientSecret) -> SyncResult<StoredToken>;
}

/// Credential lifecycle for one run
#[derive(Debug)]
enum CredentialState {
    NoCreds,
    Loaded(StoredToken),
    Valid(StoredToken),
    ExpiredRefreshable(StoredToken),
    ExpiredUnrefreshable,
    Refreshed(StoredToken),
    ReauthRequired,
    Authenticated(StoredToken),
}

/// Where the OAuth client registration comes from
enum SecretSource {
    Loaded(ClientSecret),
    /// Read only when a refresh or a new grant needs it
    File(PathBuf),
}

/// Loads, refreshes and persists the calendar token
pub struct TokenManager {
    secret: SecretSource,
    token_file: PathBuf,
    client: Client,
    consent: Box<dyn ConsentFlow>,
}

impl TokenManager {
    pub fn new(secret: ClientSecret, token_file: PathBuf, consent: Box<dyn ConsentFlow>) -> Self {
        Self::with_source(SecretSource::Loaded(secret), token_file, consent)
    }

    /// Token manager that reads `credentials_file` only when it is needed
    pub fn from_files(
        credentials_file: PathBuf,
        token_file: PathBuf,
        consent: Box<dyn ConsentFlow>,
    ) -> Self {
        Self::with_source(SecretSource::File(credentials_file), token_file, consent)
    }

    fn with_source(
        secret: SecretSource,
        token_file: PathBuf,
        consent: Box<dyn ConsentFlow>,
    ) -> Self {
        Self {
            secret,
            token_file,
            client: Client::new(),
            consent,
        }
    }

    /// Token manager backed by the configured files and the browser consent flow
    pub fn from_config(config: &Config) -> Self {
        Self::from_files(
            config.credentials_file.clone(),
            config.token_file.clone(),
            Box::new(BrowserConsent::new(config.oauth_redirect_port)),
        )
    }

    fn client_secret(&self) -> SyncResult<ClientSecret> {
        match &self.secret {
            SecretSource::Loaded(secret) => Ok(secret.clone()),
            SecretSource::File(path) => ClientSecret::load(path),
        }
    }

    async fn authorize(&self) -> SyncResult<StoredToken> {
        let secret = self.client_secret()?;
        self.consent.authorize(&secret).await
    }

    /// Get a usable token, refreshing or re-authorizing as needed.
    /// Fails only when re-authorization itself fails.
    pub async fn get_token(&self) -> SyncResult<StoredToken> {
        let mut state = match self.load_token() {
            Ok(Some(token)) => CredentialState::Loaded(token),
            Ok(None) => CredentialState::NoCreds,
            Err(e) => {
                warn!("Ignoring unreadable token file: {}", e);
                CredentialState::NoCreds
            }
        };

        loop {
            state = match state {
                CredentialState::NoCreds => {
                    info!("No stored calendar token");
                    CredentialState::ReauthRequired
                }
                CredentialState::Loaded(token) => {
                    if token.is_valid_at(Utc::now().timestamp()) {
                        CredentialState::Valid(token)
                    } else if token.refresh_token.is_some() {
                        CredentialState::ExpiredRefreshable(token)
                    } else {
                        CredentialState::ExpiredUnrefreshable
                    }
                }
                CredentialState::Valid(token) => return Ok(token),
                CredentialState::ExpiredRefreshable(token) => {
                    match self.refresh_token(&token).await {
                        Ok(fresh) => CredentialState::Refreshed(fresh),
                        Err(e) => {
                            warn!("Token refresh failed: {}", e);
                            CredentialState::ReauthRequired
                        }
                    }
                }
                CredentialState::ExpiredUnrefreshable => {
                    info!("Stored token expired and cannot be refreshed");
                    CredentialState::ReauthRequired
                }
                CredentialState::ReauthRequired => {
                    let token = self.authorize().await.map_err(|e| {
                        auth_error(&format!("Re-authorization failed: {}", e))
                    })?;
                    CredentialState::Authenticated(token)
                }
                CredentialState::Refreshed(token) | CredentialState::Authenticated(token) => {
                    self.save_token(&token)?;
                    return Ok(token);
                }
            };
        }
    }

    /// Run the consent flow unconditionally and persist the result
    pub async fn reauthorize(&self) -> SyncResult<StoredToken> {
        let token = self.authorize().await?;
        self.save_token(&token)?;
        Ok(token)
    }

    fn load_token(&self) -> SyncResult<Option<StoredToken>> {
        if !self.token_file.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.token_file)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save_token(&self, token: &StoredToken) -> SyncResult<()> {
        let content = serde_json::to_string_pretty(token)?;
        fs::write(&self.token_file, content)?;
        info!("Saved calendar token to {}", self.token_file.display());
        Ok(())
    }

    /// Refresh an expired token, preferring the client stored with it
    async fn refresh_token(&self, token: &StoredToken) -> SyncResult<StoredToken> {
        let refresh_token = token
            .refresh_token
            .clone()
            .ok_or_else(|| auth_error("No refresh token in token data"))?;

        let secret = match token.stored_client() {
            Some(secret) => secret,
            None => self.client_secret()?,
        };

        let params = [
            ("client_id", secret.client_id.clone()),
            ("client_secret", secret.client_secret.clone()),
            ("refresh_token", refresh_token.clone()),
            ("grant_type", "refresh_token".to_string()),
        ];

        let response = self
            .client
            .post(&secret.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| auth_error(&format!("Failed to refresh token: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(auth_error(&format!(
                "Failed to refresh token: HTTP {} - {}",
                status, error_body
            )));
        }

        let reply: TokenResponse = response
            .json()
            .await
            .map_err(|e| auth_error(&format!("Failed to parse token response: {}", e)))?;

        info!("Refreshed calendar token");
        Ok(reply.into_stored(Some(refresh_token)).with_client(&secret))
    }
}
