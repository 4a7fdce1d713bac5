use std::fs;
use std::sync::Arc;

use causelist_client::{AuthContext, FileTokenStore, TokenStore, TokenStoreError};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn missing_file_means_no_session() {
    let dir = TempDir::new().unwrap();
    let store = FileTokenStore::new(dir.path().join("session.ron"));
    assert_eq!(store.load().unwrap(), None);
    // Clearing an absent session is not an error.
    store.clear().unwrap();
}

#[test]
fn saved_token_survives_a_new_store() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("session.ron");

    FileTokenStore::new(&path).save("tok-123").unwrap();
    assert!(path.exists());

    let reopened = FileTokenStore::new(&path);
    assert_eq!(reopened.load().unwrap().as_deref(), Some("tok-123"));

    reopened.clear().unwrap();
    assert!(!path.exists());
    assert_eq!(reopened.load().unwrap(), None);
}

#[test]
fn corrupt_file_is_an_error_and_counts_as_logged_out() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.ron");
    fs::write(&path, "not ron at all {").unwrap();

    let store = Arc::new(FileTokenStore::new(&path));
    assert!(matches!(store.load(), Err(TokenStoreError::Format(_))));

    let auth = AuthContext::new(store);
    assert!(!auth.has_token());
    assert_eq!(auth.headers().authorization, None);
}

#[test]
fn auth_context_sees_external_login() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.ron");
    let auth = AuthContext::new(Arc::new(FileTokenStore::new(&path)));
    assert!(!auth.has_token());

    // Another process writes the session file.
    FileTokenStore::new(&path).save("from-elsewhere").unwrap();
    assert_eq!(
        auth.headers().authorization.as_deref(),
        Some("Bearer from-elsewhere")
    );
}
