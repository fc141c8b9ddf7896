//! Signing key derivation and signature computation (HMAC-SHA256 only).

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use super::{ALGORITHM, AuthError, REQUEST_TYPE, SERVICE_NAME};

type HmacSha256 = Hmac<Sha256>;

/// `datestamp/region/s3/aws4_request`
pub fn credential_scope(datestamp: &str, region: &str) -> String {
    format!("{datestamp}/{region}/{SERVICE_NAME}/{REQUEST_TYPE}")
}

/// Build the string-to-sign over the SHA-256 of the canonical request.
pub fn string_to_sign(timestamp: &str, scope: &str, canonical_request: &str) -> String {
    let canonical_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
    format!("{ALGORITHM}\n{timestamp}\n{scope}\n{canonical_hash}")
}

/// Run the four-step key derivation chain:
/// date key → region key → service key → signing key.
pub fn derive_signing_key(
    secret_key: &str,
    datestamp: &str,
    region: &str,
) -> Result<[u8; 32], AuthError> {
    let k_secret = format!("AWS4{secret_key}");
    let k_date = hmac_sha256(k_secret.as_bytes(), datestamp)?;
    let k_region = hmac_sha256(&k_date, region)?;
    let k_service = hmac_sha256(&k_region, SERVICE_NAME)?;
    hmac_sha256(&k_service, REQUEST_TYPE)
}

/// Lowercase hex signature of `string_to_sign`.
pub fn sign(
    secret_key: &str,
    datestamp: &str,
    region: &str,
    string_to_sign: &str,
) -> Result<String, AuthError> {
    let signing_key = derive_signing_key(secret_key, datestamp, region)?;
    Ok(hex::encode(hmac_sha256(&signing_key, string_to_sign)?))
}

fn hmac_sha256(key: &[u8], data: &str) -> Result<[u8; 32], AuthError> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|err| AuthError::Crypto(err.to_string()))?;
    mac.update(data.as_bytes());

    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}
