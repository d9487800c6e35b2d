use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Extension, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthenticatedUser,
    entities::{dispatch, dispatch_line},
    errors::ServiceError,
    services::dispatch::{
        CreateDispatchInput, DeleteDispatchOutcome, DispatchLineInput, UpdateDispatchInput,
    },
    services::reporting::{DispatchLineDetail, DispatchListFilter, DispatchStatsSummary},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

/// Build the dispatch Router scoped under `/api/v1`.
pub fn dispatch_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/dispatches",
            get(list_dispatches).post(create_dispatch),
        )
        .route("/dispatches/details", get(dispatch_details))
        .route("/dispatches/stats/summary", get(dispatch_stats))
        .route(
            "/dispatches/:id",
            get(get_dispatch)
                .put(update_dispatch)
                .delete(delete_dispatch),
        )
}

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DispatchListQuery {
    pub status: Option<String>,
    pub destination: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct DispatchLineRequest {
    /// Inventory item UUID to dispatch
    pub item_id: Uuid,
    /// Advisory item code; the stored snapshot comes from the ledger
    pub item_code: Option<String>,
    /// Advisory item name; the stored snapshot comes from the ledger
    pub item_name: Option<String>,
    /// Advisory ledger kind ("manufacturing" or "bought_out")
    pub item_type: Option<String>,
    /// Units to dispatch (positive)
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "destination": "Pune Plant",
    "customer_name": "Acme Industries",
    "dispatch_date": "2025-06-09",
    "transport_mode": "Road",
    "vehicle_number": "MH12AB1234",
    "items": [{"item_id": "550e8400-e29b-41d4-a716-446655440000", "quantity": 4}]
}))]
pub struct CreateDispatchRequest {
    #[validate(length(min = 1))]
    pub destination: String,
    pub customer_name: Option<String>,
    pub address: Option<String>,
    pub contact_number: Option<String>,
    pub dispatch_date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    pub transport_mode: Option<String>,
    pub vehicle_number: Option<String>,
    pub driver_name: Option<String>,
    pub driver_contact: Option<String>,
    pub dispatched_by: Option<String>,
    pub remarks: Option<String>,
    #[validate(length(min = 1))]
    pub items: Vec<DispatchLineRequest>,
}

/// Metadata-only update; `items`/`quantity` are accepted by the parser so
/// that attempts to change them can be rejected explicitly instead of being
/// silently dropped.
#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct UpdateDispatchRequest {
    pub status: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub vehicle_number: Option<String>,
    pub driver_name: Option<String>,
    pub driver_contact: Option<String>,
    pub remarks: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub items: Option<serde_json::Value>,
    #[schema(value_type = Option<Object>)]
    pub quantity: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DispatchLineSummary {
    pub item_id: Uuid,
    pub item_code: String,
    pub item_name: String,
    pub item_kind: String,
    pub quantity: i32,
}

impl From<dispatch_line::Model> for DispatchLineSummary {
    fn from(model: dispatch_line::Model) -> Self {
        Self {
            item_id: model.item_id,
            item_code: model.item_code,
            item_name: model.item_name,
            item_kind: model.item_kind,
            quantity: model.quantity,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DispatchSummary {
    pub id: Uuid,
    pub destination: String,
    pub customer_name: String,
    pub address: String,
    pub contact_number: String,
    pub dispatch_date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    pub transport_mode: String,
    pub vehicle_number: String,
    pub driver_name: String,
    pub driver_contact: String,
    pub dispatched_by: String,
    pub remarks: String,
    pub status: String,
    pub items: Vec<DispatchLineSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DispatchSummary {
    fn from_parts(header: dispatch::Model, lines: Vec<dispatch_line::Model>) -> Self {
        Self {
            id: header.id,
            destination: header.destination,
            customer_name: header.customer_name,
            address: header.address,
            contact_number: header.contact_number,
            dispatch_date: header.dispatch_date,
            delivery_date: header.delivery_date,
            transport_mode: header.transport_mode,
            vehicle_number: header.vehicle_number,
            driver_name: header.driver_name,
            driver_contact: header.driver_contact,
            dispatched_by: header.dispatched_by,
            remarks: header.remarks,
            status: header.status,
            items: lines.into_iter().map(DispatchLineSummary::from).collect(),
            created_at: header.created_at,
            updated_at: header.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReconciliationWarningResponse {
    pub item_id: Uuid,
    pub item_code: String,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteDispatchResponse {
    pub dispatch_id: Uuid,
    pub restored_items: u32,
    pub total_items: u32,
    pub warnings: Vec<ReconciliationWarningResponse>,
}

impl From<DeleteDispatchOutcome> for DeleteDispatchResponse {
    fn from(outcome: DeleteDispatchOutcome) -> Self {
        Self {
            dispatch_id: outcome.dispatch_id,
            restored_items: outcome.restored_items,
            total_items: outcome.total_items,
            warnings: outcome
                .warnings
                .into_iter()
                .map(|w| ReconciliationWarningResponse {
                    item_id: w.item_id,
                    item_code: w.item_code,
                    quantity: w.quantity,
                })
                .collect(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/dispatches",
    params(DispatchListQuery),
    responses(
        (status = 200, description = "Dispatches listed", body = ApiResponse<PaginatedResponse<DispatchSummary>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "dispatches"
)]
pub async fn list_dispatches(
    State(state): State<AppState>,
    Query(query): Query<DispatchListQuery>,
) -> ApiResult<PaginatedResponse<DispatchSummary>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(100).clamp(1, 500);

    let filter = DispatchListFilter {
        status: query.status,
        destination: query.destination,
        start_date: query.start_date,
        end_date: query.end_date,
        search: query.search,
    };

    let (records, total) = state
        .services
        .reporting
        .list_dispatches(filter, page, limit)
        .await?;

    let items: Vec<DispatchSummary> = records
        .into_iter()
        .map(|(header, lines)| DispatchSummary::from_parts(header, lines))
        .collect();

    let total_pages = if total == 0 { 0 } else { (total + limit - 1) / limit };

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/dispatches/{id}",
    params(("id" = Uuid, Path, description = "Dispatch ID")),
    responses(
        (status = 200, description = "Dispatch fetched", body = ApiResponse<DispatchSummary>),
        (status = 404, description = "Dispatch not found", body = crate::errors::ErrorResponse)
    ),
    tag = "dispatches"
)]
pub async fn get_dispatch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<DispatchSummary> {
    match state.services.dispatches.get_dispatch(id).await? {
        Some((header, lines)) => Ok(Json(ApiResponse::success(DispatchSummary::from_parts(
            header, lines,
        )))),
        None => Err(ServiceError::NotFound(format!("Dispatch {} not found", id))),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/dispatches",
    request_body = CreateDispatchRequest,
    responses(
        (status = 201, description = "Dispatch created and stock reserved", body = ApiResponse<DispatchSummary>),
        (status = 400, description = "Validation or stock failure", body = crate::errors::ErrorResponse),
        (status = 404, description = "Referenced inventory item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "dispatches"
)]
pub async fn create_dispatch(
    State(state): State<AppState>,
    user: Option<Extension<AuthenticatedUser>>,
    Json(payload): Json<CreateDispatchRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DispatchSummary>>), ServiceError> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let dispatched_by = payload
        .dispatched_by
        .filter(|d| !d.trim().is_empty())
        .or_else(|| user.map(|Extension(u)| u.username));

    let input = CreateDispatchInput {
        destination: payload.destination,
        customer_name: payload.customer_name,
        address: payload.address,
        contact_number: payload.contact_number,
        dispatch_date: payload.dispatch_date,
        delivery_date: payload.delivery_date,
        transport_mode: payload.transport_mode,
        vehicle_number: payload.vehicle_number,
        driver_name: payload.driver_name,
        driver_contact: payload.driver_contact,
        dispatched_by,
        remarks: payload.remarks,
        lines: payload
            .items
            .into_iter()
            .map(|line| DispatchLineInput {
                item_id: line.item_id,
                item_code: line.item_code,
                item_name: line.item_name,
                item_type: line.item_type,
                quantity: line.quantity,
            })
            .collect(),
    };

    // Run to completion in a detached task: a client disconnect mid-batch
    // must not cancel the reservation/rollback protocol halfway.
    let service = state.services.dispatches.clone();
    let (header, lines) = tokio::spawn(async move { service.create_dispatch(input).await })
        .await
        .map_err(|e| ServiceError::InternalError(format!("Create task failed: {}", e)))??;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(DispatchSummary::from_parts(
            header, lines,
        ))),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/dispatches/{id}",
    params(("id" = Uuid, Path, description = "Dispatch ID")),
    request_body = UpdateDispatchRequest,
    responses(
        (status = 200, description = "Dispatch updated", body = ApiResponse<DispatchSummary>),
        (status = 400, description = "Invalid update (including line-item mutation attempts)", body = crate::errors::ErrorResponse),
        (status = 404, description = "Dispatch not found", body = crate::errors::ErrorResponse)
    ),
    tag = "dispatches"
)]
pub async fn update_dispatch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDispatchRequest>,
) -> ApiResult<DispatchSummary> {
    let input = UpdateDispatchInput {
        status: payload.status,
        delivery_date: payload.delivery_date,
        vehicle_number: payload.vehicle_number,
        driver_name: payload.driver_name,
        driver_contact: payload.driver_contact,
        remarks: payload.remarks,
        items: payload.items,
        quantity: payload.quantity,
    };

    let (header, lines) = state.services.dispatches.update_dispatch(id, input).await?;

    Ok(Json(ApiResponse::success(DispatchSummary::from_parts(
        header, lines,
    ))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/dispatches/{id}",
    params(("id" = Uuid, Path, description = "Dispatch ID")),
    responses(
        (status = 200, description = "Dispatch deleted and stock restored", body = ApiResponse<DeleteDispatchResponse>),
        (status = 404, description = "Dispatch not found", body = crate::errors::ErrorResponse)
    ),
    tag = "dispatches"
)]
pub async fn delete_dispatch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<DeleteDispatchResponse> {
    // Same disconnect-safety as create: the reversal must not stop halfway.
    let service = state.services.dispatches.clone();
    let outcome = tokio::spawn(async move { service.delete_dispatch(id).await })
        .await
        .map_err(|e| ServiceError::InternalError(format!("Delete task failed: {}", e)))??;

    Ok(Json(ApiResponse::success(DeleteDispatchResponse::from(
        outcome,
    ))))
}

#[utoipa::path(
    get,
    path = "/api/v1/dispatches/details",
    responses(
        (status = 200, description = "Flattened recent dispatch lines", body = ApiResponse<Vec<DispatchLineDetail>>)
    ),
    tag = "dispatches"
)]
pub async fn dispatch_details(
    State(state): State<AppState>,
) -> ApiResult<Vec<DispatchLineDetail>> {
    let details = state.services.reporting.dispatch_details(50).await?;

    Ok(Json(ApiResponse::success(details)))
}

#[utoipa::path(
    get,
    path = "/api/v1/dispatches/stats/summary",
    responses(
        (status = 200, description = "Dispatch statistics", body = ApiResponse<DispatchStatsSummary>)
    ),
    tag = "dispatches"
)]
pub async fn dispatch_stats(State(state): State<AppState>) -> ApiResult<DispatchStatsSummary> {
    let stats = state.services.reporting.stats_summary().await?;

    Ok(Json(ApiResponse::success(stats)))
}
