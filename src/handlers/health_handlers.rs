//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks the repository and the object store

use crate::services::video_service::{VideoError, VideoService};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::{collections::HashMap, error::Error as _};

/// `GET /healthz`
///
/// Liveness probe. Always 200 OK with a plain JSON body, no I/O.
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
/// Readiness probe that:
/// 1. Runs a lightweight query against the metadata repository.
/// 2. Probes the object store bucket.
///
/// Returns JSON describing each check. HTTP 200 when all checks pass,
/// HTTP 503 when any check fails.
pub async fn readyz(State(service): State<VideoService>) -> impl IntoResponse {
    let (repository, storage) = tokio::join!(service.probe_repository(), service.probe_storage());

    let mut checks = HashMap::new();
    checks.insert(
        "repository",
        CheckStatus {
            ok: repository.is_ok(),
            error: repository.err().map(|e| describe(&e)),
        },
    );
    checks.insert(
        "storage",
        CheckStatus {
            ok: storage.is_ok(),
            error: storage.err().map(|e| describe(&e)),
        },
    );

    let overall_ok = checks.values().all(|c| c.ok);
    let body = ReadyResponse {
        status: if overall_ok {
            "ok".into()
        } else {
            "error".into()
        },
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

/// The error plus its immediate cause; readiness output is for operators.
fn describe(err: &VideoError) -> String {
    match err.source() {
        Some(source) => format!("{}: {}", err, source),
        None => err.to_string(),
    }
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
