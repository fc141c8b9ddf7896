//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks DB connectivity and that the
//!   upload staging directory is writable

use crate::services::profile_service::ProfileImageService;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::SqlitePool;
use std::{collections::HashMap, path::Path};
use tokio::fs;
use uuid::Uuid;

const READY_MARKER: &[u8] = b"readyz";

/// `GET /healthz`
///
/// Liveness: always 200 with `{"status":"ok"}`, no I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Checks SQLite (`SELECT 1`) and a write/read/delete round trip in the
/// upload staging directory. 200 when both pass, 503 otherwise, with the
/// per-check outcome in the body.
pub async fn readyz(State(service): State<ProfileImageService>) -> impl IntoResponse {
    let mut checks = HashMap::new();
    checks.insert("sqlite", CheckStatus::from(check_sqlite(service.users().pool()).await));
    checks.insert(
        "staging",
        CheckStatus::from(check_staging(service.transfer().staging_dir()).await),
    );

    let ready = checks.values().all(|check| check.ok);
    let (status, label) = if ready {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "error")
    };
    (
        status,
        Json(ReadyResponse {
            status: label.into(),
            checks,
        }),
    )
}

async fn check_sqlite(pool: &SqlitePool) -> Result<(), String> {
    let value = sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| format!("error: {e}"))?;
    if value != 1 {
        return Err(format!("unexpected result: {value}"));
    }
    Ok(())
}

async fn check_staging(dir: &Path) -> Result<(), String> {
    let path = dir.join(format!(".readyz-{}", Uuid::new_v4()));
    fs::write(&path, READY_MARKER)
        .await
        .map_err(|e| format!("could not write tmp file: {e}"))?;

    let read = fs::read(&path).await;
    let removed = fs::remove_file(&path).await;

    match read {
        Ok(bytes) if bytes == READY_MARKER => {}
        Ok(_) => return Err("file content mismatch".into()),
        Err(e) => return Err(format!("could not read tmp file: {e}")),
    }
    removed.map_err(|e| format!("could not remove tmp file: {e}"))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}

impl From<Result<(), String>> for CheckStatus {
    fn from(result: Result<(), String>) -> Self {
        Self {
            ok: result.is_ok(),
            error: result.err(),
        }
    }
}
