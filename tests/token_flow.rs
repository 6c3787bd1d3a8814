mod common;

use async_trait::async_trait;
use chrono::Utc;
use common::MockServer;
use ftmo_calendar_sync::components::google_calendar::{
    ClientSecret, ConsentFlow, StoredToken, TokenManager,
};
use ftmo_calendar_sync::error::{auth_error, Error, SyncResult};
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Consent flow that never opens a browser
struct FakeConsent {
    result: Option<StoredToken>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ConsentFlow for FakeConsent {
    async fn authorize(&self, _secret: &ClientSecret) -> SyncResult<StoredToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
            .clone()
            .ok_or_else(|| auth_error("user closed the browser"))
    }
}

fn temp_token_file() -> PathBuf {
    std::env::temp_dir().join(format!("ftmo-token-{}.json", uuid::Uuid::new_v4()))
}

fn secret(token_uri: &str) -> ClientSecret {
    ClientSecret::from_json(
        &json!({"installed": {
            "client_id": "client-id",
            "client_secret": "client-secret",
            "token_uri": token_uri
        }})
        .to_string(),
    )
    .unwrap()
}

fn token(access: &str, refresh: Option<&str>, expires_in: i64) -> StoredToken {
    StoredToken {
        access_token: access.to_string(),
        refresh_token: refresh.map(str::to_string),
        expires_at: Utc::now().timestamp() + expires_in,
        ..Default::default()
    }
}

fn write_token(path: &PathBuf, token: &StoredToken) {
    std::fs::write(path, serde_json::to_string(token).unwrap()).unwrap();
}

fn read_token(path: &PathBuf) -> StoredToken {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn token_manager(
    token_uri: &str,
    path: &PathBuf,
    consent_result: Option<StoredToken>,
) -> (TokenManager, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let consent = FakeConsent {
        result: consent_result,
        calls: Arc::clone(&calls),
    };
    (
        TokenManager::new(secret(token_uri), path.clone(), Box::new(consent)),
        calls,
    )
}

#[tokio::test]
async fn test_valid_token_is_used_as_is() {
    let server = MockServer::start(|_| (500, "{}".to_string()));
    let path = temp_token_file();
    let stored = token("still-good", Some("refresh"), 3600);
    write_token(&path, &stored);

    let (manager, consent_calls) = token_manager(&server.url("/token"), &path, None);
    let result = manager.get_token().await.unwrap();

    assert_eq!(result, stored);
    assert!(server.requests().is_empty());
    assert_eq!(consent_calls.load(Ordering::SeqCst), 0);
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_saved() {
    let server = MockServer::start(|_| {
        (
            200,
            json!({"access_token": "fresh", "expires_in": 3599, "token_type": "Bearer"})
                .to_string(),
        )
    });
    let path = temp_token_file();
    write_token(&path, &token("stale", Some("refresh-123"), -10));

    let (manager, consent_calls) = token_manager(&server.url("/token"), &path, None);
    let result = manager.get_token().await.unwrap();

    assert_eq!(result.access_token, "fresh");
    assert_eq!(result.refresh_token.as_deref(), Some("refresh-123"));
    assert_eq!(read_token(&path), result);
    assert_eq!(consent_calls.load(Ordering::SeqCst), 0);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].body.contains("grant_type=refresh_token"));
    assert!(requests[0].body.contains("refresh_token=refresh-123"));
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_failed_refresh_falls_back_to_consent() {
    let server = MockServer::start(|_| (400, json!({"error": "invalid_grant"}).to_string()));
    let path = temp_token_file();
    write_token(&path, &token("stale", Some("revoked"), -10));
    let granted = token("granted", Some("new-refresh"), 3600);

    let (manager, consent_calls) =
        token_manager(&server.url("/token"), &path, Some(granted.clone()));
    let result = manager.get_token().await.unwrap();

    assert_eq!(result, granted);
    assert_eq!(read_token(&path), granted);
    assert_eq!(consent_calls.load(Ordering::SeqCst), 1);
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_missing_or_unrefreshable_token_requires_consent() {
    let server = MockServer::start(|_| (500, "{}".to_string()));
    let granted = token("granted", Some("r"), 3600);

    let path = temp_token_file();
    let (manager, consent_calls) =
        token_manager(&server.url("/token"), &path, Some(granted.clone()));
    assert_eq!(manager.get_token().await.unwrap(), granted);
    assert_eq!(consent_calls.load(Ordering::SeqCst), 1);
    let _ = std::fs::remove_file(&path);

    let path = temp_token_file();
    write_token(&path, &token("stale", None, -10));
    let (manager, consent_calls) =
        token_manager(&server.url("/token"), &path, Some(granted.clone()));
    assert_eq!(manager.get_token().await.unwrap(), granted);
    assert_eq!(consent_calls.load(Ordering::SeqCst), 1);
    assert!(server.requests().is_empty());
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_failed_consent_is_fatal() {
    let server = MockServer::start(|_| (500, "{}".to_string()));
    let path = temp_token_file();

    let (manager, _) = token_manager(&server.url("/token"), &path, None);
    let result = manager.get_token().await;

    assert!(matches!(result, Err(Error::Auth(_))));
    assert!(!path.exists());
}

#[tokio::test]
async fn test_valid_token_needs_no_client_secret_file() {
    let path = temp_token_file();
    let stored = token("still-good", Some("refresh"), 3600);
    write_token(&path, &stored);

    let manager = TokenManager::from_files(
        temp_token_file(),
        path.clone(),
        Box::new(FakeConsent {
            result: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }),
    );

    assert_eq!(manager.get_token().await.unwrap(), stored);
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_refresh_uses_client_stored_with_token() {
    let reply = json!({"access_token": "fresh", "expires_in": 3599}).to_string();
    let server = MockServer::start(move |_| (200, reply.clone()));
    let path = temp_token_file();
    let client = secret(&server.url("/token"));
    let stale = token("stale", Some("refresh-123"), -10).with_client(&client);
    write_token(&path, &stale);

    let manager = TokenManager::from_files(
        temp_token_file(),
        path.clone(),
        Box::new(FakeConsent {
            result: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }),
    );
    let result = manager.get_token().await.unwrap();

    assert_eq!(result.access_token, "fresh");
    assert_eq!(result.client_id.as_deref(), Some("client-id"));
    assert_eq!(read_token(&path), result);
    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].body.contains("client_id=client-id"));
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_missing_client_secret_file_blocks_new_grant() {
    let path = temp_token_file();
    let consent_calls = Arc::new(AtomicUsize::new(0));
    let manager = TokenManager::from_files(
        temp_token_file(),
        path.clone(),
        Box::new(FakeConsent {
            result: Some(token("granted", Some("r"), 3600)),
            calls: Arc::clone(&consent_calls),
        }),
    );

    assert!(matches!(manager.get_token().await, Err(Error::Auth(_))));
    assert_eq!(consent_calls.load(Ordering::SeqCst), 0);
}
