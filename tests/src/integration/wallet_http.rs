//! Wallet HTTP surface, end-to-end over a real socket.

use shared_types::{Node, Uri, Value, WriteRequest};
use std::sync::Arc;
use storage_memory::MemoryStore;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use wallet::{SessionKeys, Wallet, WalletConfig, WalletServer};

async fn start_wallet(store: Arc<MemoryStore>) -> (String, oneshot::Sender<()>) {
    let wallet = Wallet::new(store, WalletConfig::default());
    let server = WalletServer::new(Arc::new(wallet));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        server
            .serve_on(listener, async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });
    (format!("http://{}", addr), shutdown_tx)
}

fn signed_body(session: &SessionKeys, app_key: &str, mut fields: serde_json::Value) -> serde_json::Value {
    fields["sessionPub"] = serde_json::json!(session.public_hex());
    let value = Value::from_json(fields.clone());
    fields["sessionSignature"] = serde_json::json!(session.sign_request(app_key, &value));
    fields
}

#[tokio::test]
async fn wallet_http_full_flow() {
    let store = Arc::new(MemoryStore::new());
    let session = SessionKeys::generate();
    store
        .receive(WriteRequest::new(
            Uri::parse(&format!(
                "mutable://accounts/X/sessions/{}",
                session.public_hex()
            ))
            .unwrap(),
            Value::from_json(serde_json::json!(1)),
        ))
        .await
        .unwrap();

    let (base, _shutdown) = start_wallet(store).await;
    let client = reqwest::Client::new();

    // Server keys are public.
    let keys: serde_json::Value = client
        .get(format!("{}/api/v1/server-keys", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(keys["signingPub"].is_string());
    assert!(keys["encryptionPub"].is_string());

    // Signup with a pre-approved session.
    let signup: serde_json::Value = client
        .post(format!("{}/api/v1/auth/signup/X", base))
        .json(&signed_body(
            &session,
            "X",
            serde_json::json!({"type": "password", "username": "alice", "password": "p"}),
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(signup["success"], true);
    let token = signup["token"].as_str().unwrap().to_string();
    let principal = signup["principalPub"].as_str().unwrap().to_string();

    // Login works with the same credentials.
    let login = client
        .post(format!("{}/api/v1/auth/login/X", base))
        .json(&signed_body(
            &session,
            "X",
            serde_json::json!({"type": "password", "username": "alice", "password": "p"}),
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), 200);

    // A wrong password is a 401 with the auth kind.
    let bad = client
        .post(format!("{}/api/v1/auth/login/X", base))
        .json(&signed_body(
            &session,
            "X",
            serde_json::json!({"type": "password", "username": "alice", "password": "nope"}),
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status(), 401);
    let body: serde_json::Value = bad.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("auth"));

    // Proxy write resolves :key and returns the stored record.
    let write: serde_json::Value = client
        .post(format!("{}/api/v1/proxy/write", base))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "uri": "mutable://accounts/:key/profile",
            "data": {"n": "A"},
            "encrypt": true
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(write["success"], true);
    assert_eq!(
        write["resolvedUri"],
        format!("mutable://accounts/{}/profile", principal)
    );
    assert!(write["record"]["data"]["payload"]["ciphertext"].is_object());

    // Proxy read decrypts.
    let read: serde_json::Value = client
        .get(format!("{}/api/v1/proxy/read", base))
        .bearer_auth(&token)
        .query(&[("uri", "mutable://accounts/:key/profile")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(read["success"], true);
    assert_eq!(read["decrypted"]["n"], "A");

    // Batched proxy read reports per-URI outcomes.
    let multi: serde_json::Value = client
        .post(format!("{}/api/v1/proxy/read-multi", base))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "uris": ["mutable://accounts/:key/profile", "mutable://accounts/:key/missing"]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(multi["summary"]["total"], 2);
    assert_eq!(multi["summary"]["succeeded"], 1);
    assert_eq!(multi["summary"]["failed"], 1);

    // Bearer-gated endpoints reject missing tokens.
    let unauthorized = client
        .get(format!("{}/api/v1/proxy/read", base))
        .query(&[("uri", "mutable://accounts/:key/profile")])
        .send()
        .await
        .unwrap();
    assert_eq!(unauthorized.status(), 401);

    // Public keys for the authenticated principal.
    let keys: serde_json::Value = client
        .get(format!("{}/api/v1/auth/public-keys/X", base))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(keys["principalPub"], principal);
}
