//! Route handlers. Engine calls run on the blocking pool.

use axum::extract::{Form, FromRequest, Path, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use serde_json::{json, Value};
use tracing::debug;

use super::{ApiError, AppState};
use crate::catalog::DeleteReport;
use crate::driver::{NetworkInfo, SignalQuality};
use crate::error::GateError;
use crate::model::message::SmsRecord;
use crate::outbox::SendRequest;

type ApiResult<T> = Result<T, ApiError>;

/// Run gate-holding work on the blocking pool.
async fn blocking<T, F>(work: F) -> ApiResult<T>
where
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

/// Ordinals that are not non-negative integers never name a message.
fn parse_ordinal(raw: &str) -> ApiResult<usize> {
    raw.parse()
        .map_err(|_| GateError::NotFound(format!("Sms with id '{raw}' not found")).into())
}

pub(super) async fn list_sms(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<SmsRecord>>> {
    state.authorize(&headers)?;
    let catalog = state.catalog.clone();
    let messages = blocking(move || catalog.list()).await?;
    debug!(count = messages.len(), "Listed messages");
    Ok(Json(messages.iter().map(SmsRecord::from).collect()))
}

pub(super) async fn send_sms(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
) -> ApiResult<Json<Value>> {
    state.authorize(&headers)?;
    let body = read_send_request(&headers, request).await?;
    let outbox = state.outbox.clone();
    let results = blocking(move || outbox.send(&body)).await?;
    let sent = results.iter().filter(|r| r.is_sent()).count();
    Ok(Json(json!({
        "status": 200,
        "message": format!("Sent {sent} of {} segment(s)", results.len()),
        "results": results,
    })))
}

/// Accept the send body as JSON or as an urlencoded form.
async fn read_send_request(headers: &HeaderMap, request: Request) -> ApiResult<SendRequest> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if is_json {
        let Json(body) = Json::<SendRequest>::from_request(request, &())
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(body)
    } else {
        let Form(body) = Form::<SendRequest>::from_request(request, &())
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(body)
    }
}

pub(super) async fn get_sms(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<SmsRecord>> {
    state.authorize(&headers)?;
    let ordinal = parse_ordinal(&id)?;
    let catalog = state.catalog.clone();
    let message = blocking(move || catalog.get(ordinal)).await?;
    Ok(Json(SmsRecord::from(&message)))
}

// Unauthenticated, like /signal, /network and /reset.
pub(super) async fn delete_sms(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let ordinal = parse_ordinal(&id)?;
    let catalog = state.catalog.clone();
    let report: DeleteReport = blocking(move || catalog.delete_at(ordinal)).await?;
    if report.is_complete() {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::PartialDelete(report))
    }
}

pub(super) async fn pop_sms(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<SmsRecord>> {
    state.authorize(&headers)?;
    let catalog = state.catalog.clone();
    Ok(Json(blocking(move || catalog.pop_oldest()).await?))
}

pub(super) async fn signal(State(state): State<AppState>) -> ApiResult<Json<SignalQuality>> {
    let status = state.status.clone();
    Ok(Json(blocking(move || status.signal()).await?))
}

pub(super) async fn network(State(state): State<AppState>) -> ApiResult<Json<NetworkInfo>> {
    let status = state.status.clone();
    Ok(Json(blocking(move || status.network()).await?))
}

pub(super) async fn reset(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let status = state.status.clone();
    blocking(move || status.reset(false)).await?;
    Ok(Json(json!({ "status": 200, "message": "Reset done" })))
}

pub(super) async fn missed_calls(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    state.authorize(&headers)?;
    let lines: Vec<String> = state.calls.records().iter().map(|r| r.to_line()).collect();
    Ok(Json(json!({ "missedCalls": lines })))
}

pub(super) async fn pop_missed_call(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    state.authorize(&headers)?;
    let calls = state.calls.clone();
    match blocking(move || calls.pop_front()).await? {
        Some(call) => Ok(Json(json!({
            "message": "Last missed call removed",
            "call": call.to_line(),
        }))),
        None => Err(GateError::NotFound("No missed calls to remove".to_string()).into()),
    }
}
