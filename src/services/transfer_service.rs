//! src/services/transfer_service.rs
//!
//! ObjectTransferClient: the two object storage calls the service needs:
//! PUT an object and GET it back. Every request is signed with SigV4 right
//! before dispatch and nothing is retried. Callers that need a deadline
//! wrap the call themselves (or rely on the `reqwest::Client` timeout).

use crate::auth::{AuthError, Authorizer};
use bytes::Bytes;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{
    Body, Client, Method, Request, Response, StatusCode, Url,
    header::{CONTENT_LENGTH, HOST, HeaderValue},
};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("cannot authorize request: {0}")]
    Authorization(#[from] AuthError),
    #[error("object storage unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("object storage answered {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },
    #[error("staging failed: {0}")]
    Staging(#[from] io::Error),
    #[error("invalid object path `{bucket}/{key}`")]
    InvalidObjectPath { bucket: String, key: String },
    #[error("invalid endpoint `{0}`")]
    InvalidEndpoint(String),
}

pub type TransferResult<T> = Result<T, TransferError>;

/// Everything except RFC 3986 unreserved characters is escaped.
const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Upper bound on how much of a rejected response is kept for logging.
const ERROR_BODY_LIMIT: usize = 4 * 1024;

/// Signed PUT/GET against `endpoint/{bucket}/{key}`.
///
/// Uploads are staged to a file under `staging_dir` first and streamed from
/// there; the staged file is removed before `store` returns, whatever the
/// outcome.
#[derive(Clone, Debug)]
pub struct ObjectTransferClient {
    http: Client,
    endpoint: Url,
    host: HeaderValue,
    authorizer: Arc<Authorizer>,
    staging_dir: PathBuf,
}

impl ObjectTransferClient {
    pub fn new(
        http: Client,
        endpoint: Url,
        authorizer: Authorizer,
        staging_dir: impl Into<PathBuf>,
    ) -> TransferResult<Self> {
        let host = endpoint
            .host_str()
            .map(|host| match endpoint.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            })
            .and_then(|host| HeaderValue::from_str(&host).ok())
            .ok_or_else(|| TransferError::InvalidEndpoint(endpoint.to_string()))?;

        if endpoint.cannot_be_a_base() {
            return Err(TransferError::InvalidEndpoint(endpoint.to_string()));
        }

        Ok(Self {
            http,
            endpoint,
            host,
            authorizer: Arc::new(authorizer),
            staging_dir: staging_dir.into(),
        })
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Upload `content` as `bucket/object_key`.
    pub async fn store(
        &self,
        bucket: &str,
        object_key: &str,
        content: Bytes,
    ) -> TransferResult<StatusCode> {
        let url = self.object_url(bucket, object_key)?;
        let staged = self.staging_dir.join(format!(".stage-{}", Uuid::new_v4()));

        let result = self.put_staged(url, &staged, content).await;

        match fs::remove_file(&staged).await {
            Ok(_) => debug!("removed staged file {}", staged.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!("failed to remove staged file {}: {}", staged.display(), err),
        }

        match &result {
            Ok(status) => info!(bucket, key = object_key, %status, "PUT object"),
            Err(err) => warn!(bucket, key = object_key, error = %err, "PUT object failed"),
        }
        result
    }

    /// Download `bucket/object_key`, buffering the whole body in memory.
    pub async fn fetch(&self, bucket: &str, object_key: &str) -> TransferResult<Bytes> {
        let result = self.get(bucket, object_key).await;

        match &result {
            Ok(body) => info!(bucket, key = object_key, size = body.len(), "GET object"),
            Err(err) => warn!(bucket, key = object_key, error = %err, "GET object failed"),
        }
        result
    }

    async fn put_staged(
        &self,
        url: Url,
        staged: &Path,
        content: Bytes,
    ) -> TransferResult<StatusCode> {
        let mut file = File::create(staged).await?;
        file.write_all(&content).await?;
        file.flush().await?;
        drop(file);

        let file = File::open(staged).await?;
        let length = file.metadata().await?.len();

        let mut request = Request::new(Method::PUT, url);
        let headers = request.headers_mut();
        headers.insert(HOST, self.host.clone());
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
        *request.body_mut() = Some(Body::wrap_stream(ReaderStream::new(file)));

        self.authorizer.authorize(&mut request)?;

        let response = self.http.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(TransferError::UnexpectedStatus { status, body });
        }

        Ok(status)
    }

    async fn get(&self, bucket: &str, object_key: &str) -> TransferResult<Bytes> {
        let url = self.object_url(bucket, object_key)?;

        let mut request = Request::new(Method::GET, url);
        request.headers_mut().insert(HOST, self.host.clone());

        self.authorizer.authorize(&mut request)?;

        let response = self.http.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(TransferError::UnexpectedStatus { status, body });
        }

        Ok(response.bytes().await?)
    }

    /// `endpoint/{bucket}/{object_key}`.
    ///
    /// Both segments are escaped with the RFC 3986 unreserved set, which is
    /// the form the endpoint re-derives when it checks the signature, so the
    /// path on the wire is already canonical.
    fn object_url(&self, bucket: &str, object_key: &str) -> TransferResult<Url> {
        if bucket.is_empty() || bucket.contains('/') || object_key.is_empty() {
            return Err(TransferError::InvalidObjectPath {
                bucket: bucket.to_string(),
                key: object_key.to_string(),
            });
        }

        let path = format!(
            "{}/{}/{}",
            self.endpoint.path().trim_end_matches('/'),
            utf8_percent_encode(bucket, PATH_SEGMENT_ENCODE_SET),
            utf8_percent_encode(object_key, PATH_SEGMENT_ENCODE_SET),
        );
        let mut url = self.endpoint.clone();
        url.set_path(&path);
        url.set_query(None);
        Ok(url)
    }
}

/// The start of a rejected response's body, at most `ERROR_BODY_LIMIT` bytes.
async fn error_body(mut response: Response) -> String {
    let mut body = Vec::new();
    while body.len() < ERROR_BODY_LIMIT {
        match response.chunk().await {
            Ok(Some(chunk)) => body.extend_from_slice(&chunk),
            Ok(None) => break,
            Err(err) => {
                debug!("stopped reading error body: {}", err);
                break;
            }
        }
    }
    body.truncate(ERROR_BODY_LIMIT);
    String::from_utf8_lossy(&body).into_owned()
}
