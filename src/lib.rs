pub mod adapters;
pub mod cache;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod ports;
pub mod response;
pub mod services;
pub mod validation;

use axum::{
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::cache::TransactionCache;
use crate::error::{AppError, SystemErrorPolicy};
use crate::ports::TransactionRepository;
use crate::response::Envelope;
use crate::services::TransactionService;

#[derive(Clone)]
pub struct AppState {
    pub service: TransactionService,
    pub repository: Arc<dyn TransactionRepository>,
    pub system_error_policy: SystemErrorPolicy,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn TransactionRepository>,
        system_error_policy: SystemErrorPolicy,
    ) -> Self {
        Self {
            service: TransactionService::new(repository.clone(), TransactionCache::new()),
            repository,
            system_error_policy,
        }
    }

    /// Wraps an operation outcome in the response envelope.
    pub fn respond<T: Serialize>(&self, result: Result<T, AppError>) -> Response {
        match result {
            Ok(data) => Envelope::succeed(data).into_response(),
            Err(e) => e.into_envelope(self.system_error_policy).into_response(),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .route(
            "/transactions",
            get(handlers::transactions::list_transactions)
                .post(handlers::transactions::create_transaction),
        )
        .route(
            "/transactions/:id",
            get(handlers::transactions::get_transaction)
                .put(handlers::transactions::modify_transaction)
                .delete(handlers::transactions::delete_transaction),
        )
        .layer(axum::middleware::from_fn(middleware::request_logger_middleware))
        .with_state(state)
}
