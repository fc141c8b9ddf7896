//! Represents a user record that may own a profile image.

use serde::Serialize;
use sqlx::FromRow;

/// A user known to the service.
///
/// `profile_img_name` holds the object name of the user's current profile
/// image in the configured bucket, or `None` if nothing was uploaded yet.
#[derive(Serialize, Clone, FromRow, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub profile_img_name: Option<String>,
}
