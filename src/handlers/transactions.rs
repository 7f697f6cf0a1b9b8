use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    response::Response,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::domain::{TransactionModifyPayload, TransactionPayload, TransactionView};
use crate::error::AppError;
use crate::ports::{Page, PageRequest};
use crate::validation::{ValidationError, ValidationErrors};
use crate::AppState;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 2000;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Substring of the transaction number to match.
    pub transaction_no: Option<String>,
    /// 1-based page number, defaults to 1.
    pub page: Option<i64>,
    /// Page size, defaults to 10.
    pub size: Option<i64>,
}

impl ListParams {
    /// Converts the caller's 1-based page number to a 0-based page index.
    /// Sizes above `MAX_PAGE_SIZE` are capped.
    pub fn page_request(&self) -> Result<PageRequest, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let page = self.page.unwrap_or(1);
        let size = self.size.unwrap_or(DEFAULT_PAGE_SIZE);

        if page < 1 {
            errors.add(ValidationError::new("page", "must be greater than or equal to 1"));
        }
        if size < 1 {
            errors.add(ValidationError::new("size", "must be greater than or equal to 1"));
        }

        let size = size.min(MAX_PAGE_SIZE);
        // The row offset (page - 1) * size has to fit in an i64
        if page > 1 && size > 0 && (page - 1).checked_mul(size).is_none() {
            errors.add(ValidationError::new("page", "is out of range"));
        }

        if errors.is_empty() {
            Ok(PageRequest::new(page - 1, size))
        } else {
            Err(errors)
        }
    }
}

fn path_rejection(rejection: PathRejection) -> AppError {
    ValidationError::new("id", format!("must be an integer ({})", rejection.body_text())).into()
}

fn query_rejection(rejection: QueryRejection) -> AppError {
    ValidationError::new("query", rejection.body_text()).into()
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    ValidationError::new("body", rejection.body_text()).into()
}

#[utoipa::path(
    get,
    path = "/transactions",
    params(ListParams),
    responses(
        (status = 200, description = "Envelope whose data is a page of transactions")
    ),
    tag = "Transactions"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Response {
    state.respond(list(&state, params).await)
}

async fn list(
    state: &AppState,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Page<TransactionView>, AppError> {
    let Query(params) = params.map_err(query_rejection)?;
    let request = params.page_request()?;

    state
        .service
        .list(params.transaction_no.as_deref(), request)
        .await
}

#[utoipa::path(
    get,
    path = "/transactions/{id}",
    params(("id" = i64, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Envelope whose data is the transaction, or null when absent", body = TransactionView)
    ),
    tag = "Transactions"
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Response {
    state.respond(get(&state, id).await)
}

async fn get(
    state: &AppState,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Option<TransactionView>, AppError> {
    let Path(id) = id.map_err(path_rejection)?;
    state.service.get_by_id(id).await
}

#[utoipa::path(
    post,
    path = "/transactions",
    request_body = TransactionPayload,
    responses(
        (status = 200, description = "Envelope whose data is the created transaction", body = TransactionView)
    ),
    tag = "Transactions"
)]
pub async fn create_transaction(
    State(state): State<AppState>,
    payload: Result<Json<TransactionPayload>, JsonRejection>,
) -> Response {
    state.respond(create(&state, payload).await)
}

async fn create(
    state: &AppState,
    payload: Result<Json<TransactionPayload>, JsonRejection>,
) -> Result<TransactionView, AppError> {
    let Json(payload) = payload.map_err(json_rejection)?;
    let input = payload.validate()?;
    state.service.create(input).await
}

#[utoipa::path(
    delete,
    path = "/transactions/{id}",
    params(("id" = i64, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Envelope with null data")
    ),
    tag = "Transactions"
)]
pub async fn delete_transaction(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Response {
    state.respond(delete(&state, id).await)
}

async fn delete(state: &AppState, id: Result<Path<i64>, PathRejection>) -> Result<(), AppError> {
    let Path(id) = id.map_err(path_rejection)?;
    state.service.delete(id).await
}

#[utoipa::path(
    put,
    path = "/transactions/{id}",
    params(("id" = i64, Path, description = "Transaction id")),
    request_body = TransactionModifyPayload,
    responses(
        (status = 200, description = "Envelope whose data is the modified transaction", body = TransactionView)
    ),
    tag = "Transactions"
)]
pub async fn modify_transaction(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<TransactionModifyPayload>, JsonRejection>,
) -> Response {
    state.respond(modify(&state, id, payload).await)
}

async fn modify(
    state: &AppState,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<TransactionModifyPayload>, JsonRejection>,
) -> Result<TransactionView, AppError> {
    let Path(id) = id.map_err(path_rejection)?;
    let Json(payload) = payload.map_err(json_rejection)?;
    let input = payload.validate()?;
    state.service.modify(id, input).await
}
