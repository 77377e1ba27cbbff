use std::sync::Arc;
use std::time::Duration;

use seki::{Error, MemoryRepositoryProvider, Seki, SessionConfig, UnauthorisedError};
use serde_json::json;

async fn seki_with(config: SessionConfig) -> Seki<MemoryRepositoryProvider> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    Seki::new(Arc::new(MemoryRepositoryProvider::new()), config)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_verify_jwt_payload_and_change_it_using_session_handle() {
    let seki = seki_with(SessionConfig::default()).await;

    let session = seki
        .create_session("userId", json!({"key": "value"}), json!({"key": "value"}))
        .await
        .unwrap();

    // Payload is proper right after creation.
    assert_eq!(session.user_data_in_jwt, json!({"key": "value"}));
    assert_eq!(
        seki.get_jwt_data(&session.handle).await.unwrap(),
        json!({"key": "value"})
    );

    // Change the JWT payload using the session handle.
    seki.update_session(&session.handle, None, Some(json!({"key": "value2"})), None)
        .await
        .unwrap();

    assert_eq!(
        seki.get_jwt_data(&session.handle).await.unwrap(),
        json!({"key": "value2"})
    );
}

#[tokio::test]
async fn test_change_jwt_payload_to_empty_using_session_handle() {
    let seki = seki_with(SessionConfig::default()).await;

    let session = seki
        .create_session("userId", json!({"key": "value"}), json!({"key": "value"}))
        .await
        .unwrap();
    assert_eq!(session.user_data_in_jwt, json!({"key": "value"}));

    // An explicit empty object clears the payload; it is not "no change".
    seki.update_session(&session.handle, None, Some(json!({})), None)
        .await
        .unwrap();

    assert_eq!(seki.get_jwt_data(&session.handle).await.unwrap(), json!({}));
}

#[tokio::test]
async fn test_none_jwt_payload_leaves_payload_untouched() {
    let seki = seki_with(SessionConfig::default()).await;

    let session = seki
        .create_session("userId", json!({"key": "value"}), json!({"key": "value"}))
        .await
        .unwrap();

    // Update only the database payload; None for the JWT data must leave
    // it exactly as it was.
    seki.update_session(&session.handle, Some(json!({"key": "db2"})), None, None)
        .await
        .unwrap();

    assert_eq!(
        seki.get_jwt_data(&session.handle).await.unwrap(),
        json!({"key": "value"})
    );
    assert_eq!(
        seki.get_session_data(&session.handle).await.unwrap(),
        json!({"key": "db2"})
    );
}

#[tokio::test]
async fn test_update_with_same_payload_is_idempotent() {
    let seki = seki_with(SessionConfig::default()).await;

    let session = seki
        .create_session("userId", json!({"key": "value"}), json!({}))
        .await
        .unwrap();

    for _ in 0..2 {
        seki.update_session(&session.handle, None, Some(json!({"key": "value2"})), None)
            .await
            .unwrap();
    }

    assert_eq!(
        seki.get_jwt_data(&session.handle).await.unwrap(),
        json!({"key": "value2"})
    );
}

#[tokio::test]
async fn test_expired_and_revoked_session_update_is_unauthorised() {
    // 1 second validity for both tokens; refresh validity is configured
    // in minutes.
    let config = SessionConfig::default()
        .with_access_token_validity_secs(1)
        .with_refresh_token_validity_mins(1.0 / 60.0);
    let seki = seki_with(config).await;

    let session = seki
        .create_session("userId", json!({"key": "value"}), json!({"key": "value"}))
        .await
        .unwrap();

    // Let it expire, then remove it from the store.
    tokio::time::sleep(Duration::from_secs(2)).await;
    seki.revoke_sessions(std::slice::from_ref(&session.handle))
        .await
        .unwrap();

    let err = seki
        .update_session(&session.handle, None, Some(json!({"key": "value2"})), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Unauthorised(UnauthorisedError::SessionMissing)
    ));
    assert_eq!(err.to_string(), "Session does not exist.");
}

#[tokio::test]
async fn test_expired_and_revoked_session_get_is_unauthorised() {
    let config = SessionConfig::default()
        .with_access_token_validity_secs(1)
        .with_refresh_token_validity_mins(1.0 / 60.0);
    let seki = seki_with(config).await;

    let session = seki
        .create_session("userId", json!({"key": "value"}), json!({"key": "value"}))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    seki.revoke_sessions(std::slice::from_ref(&session.handle))
        .await
        .unwrap();

    let err = seki.get_jwt_data(&session.handle).await.unwrap_err();
    assert_eq!(err.to_string(), "Session does not exist.");
}

#[tokio::test]
async fn test_expired_but_not_yet_reaped_session_is_also_unauthorised() {
    // Expiry alone must be enough; callers cannot distinguish "expired"
    // from "never existed".
    let config = SessionConfig::default()
        .with_access_token_validity_secs(1)
        .with_refresh_token_validity_mins(1.0 / 60.0);
    let seki = seki_with(config).await;

    let session = seki
        .create_session("userId", json!({"key": "value"}), json!({}))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;

    let err = seki.get_jwt_data(&session.handle).await.unwrap_err();
    assert_eq!(err.to_string(), "Session does not exist.");
}

#[tokio::test]
async fn test_revoke_is_idempotent_over_unknown_handles() {
    let seki = seki_with(SessionConfig::default()).await;

    let session = seki
        .create_session("userId", json!({}), json!({}))
        .await
        .unwrap();

    let handles = vec![session.handle.clone(), "never-existed".into()];
    assert_eq!(seki.revoke_sessions(&handles).await.unwrap(), 1);
    // A second bulk revoke over the same set is not an error.
    assert_eq!(seki.revoke_sessions(&handles).await.unwrap(), 0);
}

#[tokio::test]
async fn test_remove_expired_sessions_reaps_only_expired_records() {
    let short = SessionConfig::default().with_refresh_token_validity_mins(1.0 / 60.0);
    let provider = Arc::new(MemoryRepositoryProvider::new());
    let seki = Seki::new(provider.clone(), short).await.unwrap();

    seki.create_session("userId", json!({}), json!({}))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(seki.remove_expired_sessions().await.unwrap(), 1);
    assert_eq!(seki.remove_expired_sessions().await.unwrap(), 0);
}
