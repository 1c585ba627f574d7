//! Shared harness for integration tests
//!
//! Provides an identity provider that publishes its JWKS from an ephemeral
//! local axum listener and mints RS256 tokens, plus request helpers for
//! driving routers with `oneshot`.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, Response, header};
use axum::routing::get;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use planner_auth::auth::{AuthConfig, AuthScheme, Authenticator};
use planner_auth::store::{InMemoryKeyStore, InMemoryShareTokenStore, InMemorySourceStore};
use planner_auth::{AppState, SourceService, agent_router, user_router};
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;
use url::Url;
use uuid::Uuid;

pub const TIMEOUT: Duration = Duration::from_secs(10);

pub fn generate_key() -> RsaPrivateKey {
    RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("rsa keygen")
}

pub fn jwk_for_key(kid: &str, key: &RsaPublicKey) -> Value {
    json!({
        "kid": kid,
        "kty": "RSA",
        "alg": "RS256",
        "use": "sig",
        "n": URL_SAFE_NO_PAD.encode(key.n().to_bytes_be()),
        "e": URL_SAFE_NO_PAD.encode(key.e().to_bytes_be()),
    })
}

pub fn sign(key: &RsaPrivateKey, kid: Option<&str>, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    let pem = key.to_pkcs1_pem(LineEnding::LF).expect("pem");
    let encoding = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("encoding key");
    encode(&header, claims, &encoding).expect("sign")
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

type Published = Arc<Mutex<Vec<(String, RsaPrivateKey)>>>;

/// Identity provider serving its key set on a local port
pub struct IdentityProvider {
    keys: Published,
    pub jwks_url: Url,
}

async fn serve_jwks(State(keys): State<Published>) -> axum::Json<Value> {
    let keys = keys.lock().expect("jwks lock");
    let jwks: Vec<Value> = keys
        .iter()
        .map(|(kid, key)| jwk_for_key(kid, &key.to_public_key()))
        .collect();
    axum::Json(json!({ "keys": jwks }))
}

impl IdentityProvider {
    pub async fn start() -> Self {
        let keys: Published = Arc::new(Mutex::new(vec![(
            Uuid::new_v4().to_string(),
            generate_key(),
        )]));

        let app = Router::new()
            .route("/certs", get(serve_jwks))
            .with_state(keys.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind jwks");
        let addr: SocketAddr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let jwks_url = Url::parse(&format!("http://{addr}/certs")).expect("url");
        Self { keys, jwks_url }
    }

    /// Publish an additional signing key and return its kid.
    pub fn rotate(&self) -> String {
        let kid = Uuid::new_v4().to_string();
        self.keys
            .lock()
            .expect("jwks lock")
            .push((kid.clone(), generate_key()));
        kid
    }

    /// Token signed with the published key `kid`, or the first one.
    pub fn token_with_kid(&self, kid: Option<&str>, claims: &Value) -> String {
        let keys = self.keys.lock().expect("jwks lock");
        let (kid, key) = match kid {
            Some(kid) => keys.iter().find(|(k, _)| k == kid).expect("known kid"),
            None => &keys[0],
        };
        sign(key, Some(kid.as_str()), claims)
    }

    /// Token signed with the first published key but naming no kid.
    pub fn token_without_kid(&self, claims: &Value) -> String {
        let keys = self.keys.lock().expect("jwks lock");
        sign(&keys[0].1, None, claims)
    }

    pub fn token(&self, claims: &Value) -> String {
        self.token_with_kid(None, claims)
    }

    /// Token for `username` with standard lifetime claims.
    pub fn user_token(&self, username: &str, org_id: Option<&str>) -> String {
        let mut claims = json!({
            "preferred_username": username,
            "email": format!("{}@example.com", username.split('@').next().unwrap_or(username)),
            "iat": now(),
            "exp": now() + 300,
        });
        if let Some(org) = org_id {
            claims["org_id"] = json!(org);
        }
        self.token(&claims)
    }

    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            scheme: AuthScheme::Rhsso,
            jwks_url: Some(self.jwks_url.clone()),
            ..Default::default()
        }
    }
}

/// Both routers wired over shared in-memory stores
pub struct Planner {
    pub user_api: Router,
    pub agent_api: Router,
    pub user_auth: Authenticator,
}

impl Planner {
    pub async fn with_config(config: &AuthConfig) -> Self {
        let key_store = Arc::new(InMemoryKeyStore::new());
        let service = SourceService::new(
            Arc::new(InMemorySourceStore::new()),
            key_store.clone(),
            Arc::new(InMemoryShareTokenStore::new()),
        );
        let state = AppState::new(service);
        let user_auth = Authenticator::from_config(config, key_store.clone())
            .await
            .expect("authenticator");
        let agent_auth = Authenticator::agent(key_store);

        Self {
            user_api: user_router(state.clone(), user_auth.clone(), TIMEOUT),
            agent_api: agent_router(state, agent_auth, TIMEOUT),
            user_auth,
        }
    }
}

pub async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.clone()
        .oneshot(builder.body(body).expect("request"))
        .await
        .expect("response")
}

pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}
