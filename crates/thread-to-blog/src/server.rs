/// HTTP surface of the thread-to-blog service.
///
/// - `POST /api/generate`: rate-limited blog generation
/// - `GET /api/vibes`: the preset vibe vocabulary
/// - `GET /health`: liveness
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use axum::body::{to_bytes, Bytes};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::AppError;
use crate::generator::BlogGenerator;
use crate::model::{GenerationRequest, GenerationResult, Vibe, VibeOption};
use crate::rate_limit::RateLimiter;

/// Request bodies past this size are not read. Like any unreadable body they become an
/// empty request, so the caller sees "Thread text is required." rather than a 413.
const MAX_BODY_BYTES: usize = 1024 * 1024;
const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<BlogGenerator>,
    pub limiter: RateLimiter,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/generate", post(generate_blog))
        .route("/api/vibes", get(list_vibes))
        .route("/health", get(health))
        .with_state(state)
}

async fn generate_blog(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<GenerationResult>, AppError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let key = client_key(request.headers(), peer);
    let client = fingerprint(&key);

    state.limiter.consume(&key).await.inspect_err(|e| {
        warn!(client = %client, retry_after_secs = e.retry_after_secs(), "rate limit exceeded");
    })?;

    // The quota is spent before the body is looked at; an unreadable body is an empty request.
    let body = to_bytes(request.into_body(), MAX_BODY_BYTES)
        .await
        .unwrap_or_else(|e| {
            warn!(
                client = %client,
                error = %e,
                limit_bytes = MAX_BODY_BYTES,
                "failed to read request body, treating it as empty"
            );
            Bytes::new()
        });
    let input = GenerationRequest::from_body(&body);

    if input
        .thread_url
        .as_deref()
        .is_some_and(|url| !url.trim().is_empty())
    {
        info!(client = %client, "rejected thread URL request");
        return Err(AppError::ComingSoon);
    }

    let Some(thread) = input
        .thread_text
        .as_deref()
        .filter(|text| !text.trim().is_empty())
    else {
        info!(client = %client, "rejected request without thread text");
        return Err(AppError::MissingThreadText);
    };

    let started = Instant::now();
    let result = state
        .generator
        .generate(
            thread,
            input.selected_tone.as_deref(),
            input.custom_vibe.as_deref(),
        )
        .await?;
    info!(
        client = %client,
        title = %result.title_text(),
        slug = result.seo_field("slug").and_then(serde_json::Value::as_str).unwrap_or_default(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "blog generated"
    );
    Ok(Json(result))
}

async fn list_vibes() -> Json<Vec<VibeOption>> {
    Json(Vibe::ALL.into_iter().map(VibeOption::from).collect())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Rate-limit key: first `x-forwarded-for` entry, else the peer IP, else `"unknown"`.
///
/// The forwarded entry only counts when it is an IP address (an `ip:port` form is
/// accepted), so arbitrary header text never becomes a key. Every caller without either
/// shares the `"unknown"` bucket.
pub fn client_key(headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|entry| parse_forwarded_ip(entry.trim()));

    match (forwarded, peer) {
        (Some(ip), _) => ip.to_string(),
        (None, Some(ip)) => ip.to_string(),
        (None, None) => UNKNOWN_CLIENT.to_string(),
    }
}

fn parse_forwarded_ip(entry: &str) -> Option<IpAddr> {
    entry
        .parse::<IpAddr>()
        .ok()
        .or_else(|| entry.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}

/// Short stable digest of a client key so raw IPs stay out of the logs.
fn fingerprint(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(12);
    hex
}
