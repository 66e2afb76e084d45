//! HTTP surface of the gateway.
//!
//! Handlers never touch the driver on the async runtime: anything that
//! acquires the modem gate runs on the blocking pool.

pub mod error;
mod handlers;

use std::sync::Arc;

use axum::http::{header, HeaderMap};
use axum::routing::get;
use axum::Router;

use crate::auth::Credentials;
use crate::calls::CallLog;
use crate::catalog::MessageCatalog;
use crate::gate::ModemGate;
use crate::outbox::Outbox;
use crate::status::StatusService;

pub use error::ApiError;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<MessageCatalog>,
    pub outbox: Arc<Outbox>,
    pub status: Arc<StatusService>,
    pub calls: Arc<CallLog>,
    pub credentials: Arc<Credentials>,
}

impl AppState {
    pub fn new(
        gate: Arc<ModemGate>,
        folder: u32,
        credentials: Credentials,
        calls: Arc<CallLog>,
    ) -> Self {
        Self {
            catalog: Arc::new(MessageCatalog::new(Arc::clone(&gate), folder)),
            outbox: Arc::new(Outbox::new(Arc::clone(&gate))),
            status: Arc::new(StatusService::new(gate)),
            calls,
            credentials: Arc::new(credentials),
        }
    }

    /// Fail with 401 unless `headers` carry valid Basic credentials.
    pub(crate) fn authorize(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        let ok = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| self.credentials.verify_header(v));
        if ok {
            Ok(())
        } else {
            Err(ApiError::Unauthorized)
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/sms", get(handlers::list_sms).post(handlers::send_sms))
        .route(
            "/sms/:id",
            get(handlers::get_sms).delete(handlers::delete_sms),
        )
        .route("/getsms", get(handlers::pop_sms))
        .route("/signal", get(handlers::signal))
        .route("/network", get(handlers::network))
        .route("/reset", get(handlers::reset))
        .route(
            "/missedCalls",
            get(handlers::missed_calls).delete(handlers::pop_missed_call),
        )
        .with_state(state)
}
