//! HTTP handlers for profile image upload and download.
//! Parses the multipart form and delegates to `ProfileImageService`.

use crate::{
    errors::AppError, models::object::ObjectIdentity,
    services::profile_service::ProfileImageService,
};
use axum::{
    Json,
    body::{Body, Bytes},
    extract::{Multipart, Path, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use tracing::debug;

const IMAGE_FIELD: &str = "imgFile";
const USER_ID_FIELD: &str = "userId";

/// `GET /api/hello`: deployment smoke check.
pub async fn hello() -> &'static str {
    "deployed"
}

/// `POST /api/profileImg`: multipart form with `imgFile` and `userId`.
pub async fn upload_profile_image(
    State(service): State<ProfileImageService>,
    mut multipart: Multipart,
) -> Result<Json<ObjectIdentity>, AppError> {
    let mut image: Option<(String, Bytes)> = None;
    let mut user_id: Option<i64> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(err.to_string()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(IMAGE_FIELD) => {
                let filename = field.file_name().unwrap_or_default().to_owned();
                let data = field
                    .bytes()
                    .await
                    .map_err(|err| AppError::bad_request(err.to_string()))?;
                image = Some((filename, data));
            }
            Some(USER_ID_FIELD) => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| AppError::bad_request(err.to_string()))?;
                let id = text
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| AppError::bad_request(format!("invalid userId `{text}`")))?;
                user_id = Some(id);
            }
            other => debug!("ignoring multipart field {:?}", other),
        }
    }

    let (filename, data) =
        image.ok_or_else(|| AppError::bad_request(format!("missing `{IMAGE_FIELD}` field")))?;
    let user_id =
        user_id.ok_or_else(|| AppError::bad_request(format!("missing `{USER_ID_FIELD}` field")))?;

    let identity = service.save(user_id, &filename, data).await?;
    Ok(Json(identity))
}

/// `GET /api/profileImg/{id}`: raw image bytes, empty if none uploaded.
pub async fn download_profile_image(
    State(service): State<ProfileImageService>,
    Path(user_id): Path<i64>,
) -> Result<Response, AppError> {
    let image = service.send(user_id).await?;

    let mut response = Response::new(Body::from(image));
    *response.status_mut() = StatusCode::OK;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    Ok(response)
}
