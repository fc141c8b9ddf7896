//! Fixtures shared by the unit tests: an in-memory database and a local
//! stand-in for the object storage endpoint that verifies SigV4 headers the
//! same way the real endpoint does.

use crate::{
    auth::{
        Authorizer, Credentials, UNSIGNED_PAYLOAD,
        canonical::{canonical_headers, canonical_request},
        signer::{sign, string_to_sign},
    },
    services::user_repository::run_migrations,
};
use axum::{
    Router,
    body::Bytes,
    extract::{OriginalUri, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, percent_encode};
use reqwest::Url;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tokio::net::TcpListener;

pub const TEST_ACCESS_KEY: &str = "AKIDEXAMPLE";
pub const TEST_SECRET_KEY: &str = "test";
pub const TEST_REGION: &str = "kr-standard";

/// Repeated to form the (oversized) body of every failing-storage response.
pub const FAILING_STORAGE_BODY: &str = "SlowDown";

pub fn test_authorizer() -> Authorizer {
    Authorizer::new(Credentials::new(TEST_ACCESS_KEY, TEST_SECRET_KEY), TEST_REGION)
}

/// Single-connection in-memory SQLite with the schema applied.
pub async fn memory_pool() -> Arc<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    Arc::new(pool)
}

#[derive(Clone, Default)]
struct MockState {
    objects: Arc<Mutex<HashMap<String, Bytes>>>,
}

/// Handle on a running mock endpoint.
pub struct MockStorage {
    pub endpoint: Url,
    objects: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl MockStorage {
    /// Whether an object was stored under the raw request path `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.objects.lock().unwrap().contains_key(path)
    }
}

/// Serve PUT/GET on any path, keyed by the raw request path. Requests whose
/// signature does not verify get `403`.
pub async fn spawn_mock_storage() -> MockStorage {
    let state = MockState::default();
    let objects = state.objects.clone();
    let app = Router::new().fallback(handle_object).with_state(state);

    MockStorage {
        endpoint: serve(app).await,
        objects,
    }
}

/// An endpoint that answers `503` to everything.
pub async fn spawn_failing_storage() -> Url {
    let app = Router::new().fallback(|| async {
        (StatusCode::SERVICE_UNAVAILABLE, FAILING_STORAGE_BODY.repeat(2048))
    });
    serve(app).await
}

async fn serve(app: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Url::parse(&format!("http://{addr}")).unwrap()
}

async fn handle_object(
    State(state): State<MockState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(reason) = verify_signature(&method, &uri, &headers) {
        return (StatusCode::FORBIDDEN, reason).into_response();
    }

    let key = uri.path().to_string();
    let mut objects = state.objects.lock().unwrap();
    match method {
        Method::PUT => {
            objects.insert(key, body);
            StatusCode::OK.into_response()
        }
        Method::GET => match objects.get(&key) {
            Some(content) => (StatusCode::OK, content.clone()).into_response(),
            None => (StatusCode::NOT_FOUND, "NoSuchKey").into_response(),
        },
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

/// Path as an S3 server canonicalizes it: every segment decoded, then escaped
/// with the RFC 3986 unreserved set.
fn server_canonical_uri(path: &str) -> String {
    const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
        .remove(b'-')
        .remove(b'_')
        .remove(b'.')
        .remove(b'~');
    path.split('/')
        .map(|segment| {
            let raw: Vec<u8> = percent_decode_str(segment).collect();
            percent_encode(&raw, UNRESERVED).to_string()
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Recompute the signature from what actually arrived on the wire.
fn verify_signature(method: &Method, uri: &Uri, headers: &HeaderMap) -> Result<(), String> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| format!("missing {name}"))
    };

    if header("x-amz-content-sha256")? != UNSIGNED_PAYLOAD {
        return Err("payload must be unsigned".into());
    }
    let timestamp = header("x-amz-date")?;

    let authorization = header("authorization")?;
    let rest = authorization
        .strip_prefix("AWS4-HMAC-SHA256 Credential=")
        .ok_or("unsupported algorithm")?;
    let mut parts = rest.split(", ");
    let credential = parts.next().ok_or("missing credential")?;
    let signed_headers = parts
        .next()
        .and_then(|p| p.strip_prefix("SignedHeaders="))
        .ok_or("missing signed headers")?;
    let signature = parts
        .next()
        .and_then(|p| p.strip_prefix("Signature="))
        .ok_or("missing signature")?;

    let (access_key, scope) = credential.split_once('/').ok_or("malformed credential")?;
    if access_key != TEST_ACCESS_KEY {
        return Err(format!("unknown access key {access_key}"));
    }
    let datestamp = scope.split('/').next().ok_or("malformed scope")?;
    if !timestamp.starts_with(datestamp) {
        return Err("scope date does not match x-amz-date".into());
    }

    let pairs = signed_headers
        .split(';')
        .map(|name| header(name).map(|value| (name, value)))
        .collect::<Result<Vec<_>, _>>()?;
    let canonical = canonical_request(
        method.as_str(),
        &server_canonical_uri(uri.path()),
        uri.query(),
        &canonical_headers(pairs),
    );
    let expected = sign(
        TEST_SECRET_KEY,
        datestamp,
        TEST_REGION,
        &string_to_sign(timestamp, scope, &canonical),
    )
    .map_err(|err| err.to_string())?;

    if expected == signature {
        Ok(())
    } else {
        Err("SignatureDoesNotMatch".into())
    }
}
