//! AWS Signature Version 4 request signing for the object storage endpoint.
//!
//! Signing runs in three stages:
//!
//! - [`canonical`]: serializes method, path, query and headers into the
//!   canonical request string
//! - [`signer`]: derives the signing key through the HMAC-SHA256 chain and
//!   signs the string-to-sign
//! - [`authorizer`]: stamps `x-amz-date` / `x-amz-content-sha256` on an
//!   outbound request and attaches the resulting `Authorization` header
//!
//! The payload is never hashed: every request carries `UNSIGNED-PAYLOAD`.

pub mod authorizer;
pub mod canonical;
pub mod signer;

use thiserror::Error;

pub use authorizer::{Authorizer, Credentials};

/// Signing algorithm identifier used in the string-to-sign and header.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Service name bound into the credential scope.
pub const SERVICE_NAME: &str = "s3";

/// Terminal element of the credential scope.
pub const REQUEST_TYPE: &str = "aws4_request";

/// Payload hash sentinel; the body is not covered by the signature.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Errors that abort a signing attempt. A request that failed to authorize
/// must never be dispatched.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("header `{name}` has a value that cannot be signed")]
    InvalidHeaderValue { name: String },
    #[error("hmac-sha256 failure: {0}")]
    Crypto(String),
}
