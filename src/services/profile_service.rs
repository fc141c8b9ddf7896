//! Profile image flow: ties a user record to an object in the bucket.

use crate::{
    models::object::ObjectIdentity,
    services::{
        transfer_service::{ObjectTransferClient, TransferError},
        user_repository::UserRepository,
    },
};
use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("user `{0}` not found")]
    UserNotFound(i64),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type ProfileResult<T> = Result<T, ProfileError>;

/// Uploads and serves profile images stored in one bucket.
#[derive(Clone, Debug)]
pub struct ProfileImageService {
    users: UserRepository,
    transfer: ObjectTransferClient,
    bucket: String,
}

impl ProfileImageService {
    pub fn new(
        users: UserRepository,
        transfer: ObjectTransferClient,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            users,
            transfer,
            bucket: bucket.into(),
        }
    }

    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    pub fn transfer(&self) -> &ObjectTransferClient {
        &self.transfer
    }

    /// Store `content` under a fresh object name and point the user at it.
    ///
    /// The association is written only after the upload succeeded, so a
    /// failed upload leaves the user's previous image in place.
    pub async fn save(
        &self,
        user_id: i64,
        original_filename: &str,
        content: Bytes,
    ) -> ProfileResult<ObjectIdentity> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(ProfileError::UserNotFound(user_id))?;

        let identity = ObjectIdentity::generate(&self.bucket, original_filename);
        self.transfer
            .store(&identity.bucket, &identity.object_name, content)
            .await?;

        if !self
            .users
            .set_profile_img_name(user_id, &identity.object_name)
            .await?
        {
            return Err(ProfileError::UserNotFound(user_id));
        }

        info!(user_id, object = %identity.object_name, "profile image saved");
        Ok(identity)
    }

    /// The user's current profile image; empty if none was ever uploaded.
    pub async fn send(&self, user_id: i64) -> ProfileResult<Bytes> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(ProfileError::UserNotFound(user_id))?;

        let Some(object_name) = user.profile_img_name else {
            debug!(user_id, "no profile image recorded");
            return Ok(Bytes::new());
        };

        Ok(self.transfer.fetch(&self.bucket, &object_name).await?)
    }
}
