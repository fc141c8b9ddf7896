//! Attaches SigV4 headers to an outbound request in place.

use std::fmt;

use chrono::{DateTime, Utc};
use reqwest::{
    Request,
    header::{AUTHORIZATION, HeaderName, HeaderValue},
};
use tracing::trace;

use super::{
    ALGORITHM, AuthError, UNSIGNED_PAYLOAD,
    canonical::canonicalize,
    signer::{credential_scope, sign, string_to_sign},
};

pub const X_AMZ_DATE: HeaderName = HeaderName::from_static("x-amz-date");
pub const X_AMZ_CONTENT_SHA256: HeaderName = HeaderName::from_static("x-amz-content-sha256");

const DATE_FORMAT: &str = "%Y%m%d";
const TIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Access/secret key pair for the storage endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key: String,
    secret_key: String,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Signs requests for one region with one credential pair.
#[derive(Clone, Debug)]
pub struct Authorizer {
    credentials: Credentials,
    region: String,
}

impl Authorizer {
    pub fn new(credentials: Credentials, region: impl Into<String>) -> Self {
        Self {
            credentials,
            region: region.into(),
        }
    }

    /// Sign `request` for the current instant.
    pub fn authorize(&self, request: &mut Request) -> Result<(), AuthError> {
        self.authorize_at(request, Utc::now())
    }

    /// Sign `request` as of `now`.
    ///
    /// `x-amz-date` and `x-amz-content-sha256` are set before canonicalization
    /// so both land in the signed header set. Any header changed after this
    /// returns invalidates the signature. On error the request may carry the
    /// date headers but no `Authorization`; it must not be sent.
    pub fn authorize_at(&self, request: &mut Request, now: DateTime<Utc>) -> Result<(), AuthError> {
        let datestamp = now.format(DATE_FORMAT).to_string();
        let timestamp = now.format(TIME_FORMAT).to_string();

        let headers = request.headers_mut();
        // A stale signature must not end up signing itself.
        headers.remove(AUTHORIZATION);
        headers.insert(X_AMZ_DATE, header_value(X_AMZ_DATE.as_str(), &timestamp)?);
        headers.insert(
            X_AMZ_CONTENT_SHA256,
            HeaderValue::from_static(UNSIGNED_PAYLOAD),
        );

        let canonical = canonicalize(request)?;
        trace!(canonical_request = %canonical.request, "built canonical request");

        let scope = credential_scope(&datestamp, &self.region);
        let string_to_sign = string_to_sign(&timestamp, &scope, &canonical.request);
        trace!(%string_to_sign, "built string to sign");

        let signature = sign(
            &self.credentials.secret_key,
            &datestamp,
            &self.region,
            &string_to_sign,
        )?;

        let authorization = format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={}, Signature={signature}",
            self.credentials.access_key, canonical.signed_headers
        );
        request
            .headers_mut()
            .insert(AUTHORIZATION, header_value(AUTHORIZATION.as_str(), &authorization)?);

        Ok(())
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, AuthError> {
    HeaderValue::from_str(value).map_err(|_| AuthError::InvalidHeaderValue {
        name: name.to_string(),
    })
}
