use axum::Json;
use utoipa::OpenApi;

use crate::domain::{TransactionModifyPayload, TransactionPayload, TransactionView};
use crate::handlers::{health, transactions};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        transactions::list_transactions,
        transactions::get_transaction,
        transactions::create_transaction,
        transactions::delete_transaction,
        transactions::modify_transaction,
    ),
    components(schemas(
        TransactionView,
        TransactionPayload,
        TransactionModifyPayload,
        health::HealthStatus,
    )),
    tags(
        (name = "Transactions", description = "Transaction record management"),
        (name = "Health", description = "Service health"),
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
