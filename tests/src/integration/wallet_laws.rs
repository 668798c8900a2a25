//! Wallet laws: session pre-authorization, `:key` resolution, encrypted
//! round-trips, and third-party opacity.

use shared_types::{Node, NodeError, Uri, Value, WriteRequest};
use std::sync::Arc;
use storage_memory::MemoryStore;
use wallet::{ProxyWriteRequest, SessionKeys, Wallet, WalletConfig};

fn json(v: serde_json::Value) -> Value {
    Value::from_json(v)
}

async fn approve_session(store: &MemoryStore, app_key: &str, session: &SessionKeys) {
    store
        .receive(WriteRequest::new(
            Uri::parse(&format!(
                "mutable://accounts/{}/sessions/{}",
                app_key,
                session.public_hex()
            ))
            .unwrap(),
            json(serde_json::json!(1)),
        ))
        .await
        .unwrap();
}

fn signed_body(session: &SessionKeys, app_key: &str, mut fields: serde_json::Value) -> Value {
    fields["sessionPub"] = serde_json::json!(session.public_hex());
    let body = json(fields);
    let signature = session.sign_request(app_key, &body);
    let mut signed = body;
    if let Value::Object(map) = &mut signed {
        map.insert("sessionSignature".into(), Value::String(signature));
    }
    signed
}

#[tokio::test]
async fn scenario_6_unauthorized_session() {
    let store = Arc::new(MemoryStore::new());
    let wallet = Wallet::new(store.clone(), WalletConfig::default());

    // Session keypair generated, public key NOT registered.
    let session = SessionKeys::generate();
    let login = signed_body(
        &session,
        "X",
        serde_json::json!({"type": "password", "username": "alice", "password": "p"}),
    );
    let err = wallet.login("X", login.clone()).await.unwrap_err();
    assert!(matches!(err, NodeError::Auth(_)));

    // Registering the key then retrying passes the session gate; signup
    // first so the account exists.
    approve_session(&store, "X", &session).await;
    let signup = signed_body(
        &session,
        "X",
        serde_json::json!({"type": "password", "username": "alice", "password": "p"}),
    );
    wallet.signup("X", signup).await.unwrap();
    wallet.login("X", login).await.unwrap();
}

#[tokio::test]
async fn scenario_5_wallet_round_trip() {
    let store = Arc::new(MemoryStore::new());
    let wallet = Wallet::new(store.clone(), WalletConfig::default());
    let session = SessionKeys::generate();
    approve_session(&store, "X", &session).await;

    let signup = wallet
        .signup(
            "X",
            signed_body(
                &session,
                "X",
                serde_json::json!({"type": "password", "username": "alice", "password": "p"}),
            ),
        )
        .await
        .unwrap();
    let claims = wallet.verify_bearer(&signup.token).unwrap();

    let write = wallet
        .proxy_write(
            &claims,
            ProxyWriteRequest {
                uri: "mutable://accounts/:key/profile".into(),
                data: json(serde_json::json!({"n": "A"})),
                encrypt: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(
        write.resolved_uri,
        format!("mutable://accounts/{}/profile", claims.principal_pub)
    );

    let read = wallet
        .proxy_read(&claims, "mutable://accounts/:key/profile")
        .await
        .unwrap();
    assert_eq!(read.decrypted, Some(json(serde_json::json!({"n": "A"}))));

    // The raw stored record is auth-wrapped ciphertext.
    let raw = store
        .read(&Uri::parse(&write.resolved_uri).unwrap())
        .await
        .unwrap();
    let auth = raw.data.get("auth").unwrap().as_array().unwrap();
    assert!(auth[0].get("pubkey").is_some());
    assert!(auth[0].get("signature").is_some());
    let payload = raw.data.get("payload").unwrap();
    assert!(payload.get("nonce").is_some());
    assert!(payload.get("ciphertext").is_some());
}

#[tokio::test]
async fn key_resolution_law() {
    let store = Arc::new(MemoryStore::new());
    let wallet = Wallet::new(store.clone(), WalletConfig::default());
    let session = SessionKeys::generate();
    approve_session(&store, "app", &session).await;

    let signup = wallet
        .signup(
            "app",
            signed_body(
                &session,
                "app",
                serde_json::json!({"type": "password", "username": "alice", "password": "p"}),
            ),
        )
        .await
        .unwrap();
    let claims = wallet.verify_bearer(&signup.token).unwrap();

    let response = wallet
        .proxy_write(
            &claims,
            ProxyWriteRequest {
                uri: "mutable://accounts/:key/p".into(),
                data: json(serde_json::json!({"d": 1})),
                encrypt: false,
            },
        )
        .await
        .unwrap();
    assert_eq!(
        response.resolved_uri,
        format!("mutable://accounts/{}/p", claims.principal_pub)
    );
    // The underlying store never saw the placeholder.
    assert!(store
        .read(&Uri::parse("mutable://accounts/:key/p").unwrap())
        .await
        .is_err());
}

#[tokio::test]
async fn identity_signup_and_login() {
    let store = Arc::new(MemoryStore::new());
    let verifier =
        wallet::StaticIdentityVerifier::new().with_token("good-token", "alice@example.com");
    let wallet = Wallet::new(store.clone(), WalletConfig::default())
        .with_identity_verifier(Arc::new(verifier));
    let session = SessionKeys::generate();
    approve_session(&store, "app", &session).await;

    wallet
        .signup(
            "app",
            signed_body(
                &session,
                "app",
                serde_json::json!({"type": "identity", "username": "alice", "idToken": "good-token"}),
            ),
        )
        .await
        .unwrap();

    // The verified identity substitutes for the password at login.
    wallet
        .login(
            "app",
            signed_body(
                &session,
                "app",
                serde_json::json!({"type": "identity", "username": "alice", "idToken": "good-token"}),
            ),
        )
        .await
        .unwrap();

    let err = wallet
        .login(
            "app",
            signed_body(
                &session,
                "app",
                serde_json::json!({"type": "identity", "username": "alice", "idToken": "bad-token"}),
            ),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::Auth(_)));
}

#[tokio::test]
async fn expired_token_is_auth_error() {
    let store = Arc::new(MemoryStore::new());
    let config = WalletConfig {
        session_ttl: std::time::Duration::from_secs(0),
        ..Default::default()
    };
    let wallet = Wallet::new(store.clone(), config);
    let session = SessionKeys::generate();
    approve_session(&store, "app", &session).await;

    let signup = wallet
        .signup(
            "app",
            signed_body(
                &session,
                "app",
                serde_json::json!({"type": "password", "username": "alice", "password": "p"}),
            ),
        )
        .await
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    assert!(matches!(
        wallet.verify_bearer(&signup.token),
        Err(NodeError::Auth(_))
    ));
}
