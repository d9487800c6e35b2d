use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::inventory_item::{self, ItemKind},
    errors::ServiceError,
    services::inventory::CreateInventoryItemInput,
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

/// Build the inventory Router scoped under `/api/v1`.
pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/inventory", get(list_inventory).post(create_inventory))
        .route("/inventory/:id", get(get_inventory))
        .route("/inventory/:id/adjust", post(adjust_inventory))
}

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InventoryListQuery {
    /// Ledger filter: "manufacturing" or "bought_out"
    pub kind: Option<String>,
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInventoryItemRequest {
    #[validate(length(min = 1))]
    pub code: String,
    #[validate(length(min = 1))]
    pub name: String,
    /// Ledger kind: "manufacturing" or "bought_out"
    pub kind: String,
    /// Initial stock level (non-negative)
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustInventoryRequest {
    /// Signed stock adjustment; negative values are bounded by available stock
    pub quantity_change: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryItemSummary {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub kind: String,
    pub available_quantity: i32,
    pub last_updated: DateTime<Utc>,
}

impl From<inventory_item::Model> for InventoryItemSummary {
    fn from(model: inventory_item::Model) -> Self {
        Self {
            id: model.id,
            code: model.code,
            name: model.name,
            kind: model.kind,
            available_quantity: model.available_quantity,
            last_updated: model.last_updated,
        }
    }
}

fn parse_kind(value: &str) -> Result<ItemKind, ServiceError> {
    ItemKind::from_str(value).ok_or_else(|| {
        ServiceError::ValidationError(format!(
            "Unknown item kind '{}'; expected 'manufacturing' or 'bought_out'",
            value
        ))
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory",
    params(InventoryListQuery),
    responses(
        (status = 200, description = "Inventory items listed", body = ApiResponse<PaginatedResponse<InventoryItemSummary>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn list_inventory(
    State(state): State<AppState>,
    Query(query): Query<InventoryListQuery>,
) -> ApiResult<PaginatedResponse<InventoryItemSummary>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(100).clamp(1, 500);

    let kind = query.kind.as_deref().map(parse_kind).transpose()?;

    let (records, total) = state
        .services
        .inventory
        .list_items(page, limit, kind, query.search.as_deref())
        .await?;

    let items: Vec<InventoryItemSummary> = records
        .into_iter()
        .map(InventoryItemSummary::from)
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
    path = "/api/v1/inventory/{id}",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    responses(
        (status = 200, description = "Inventory item fetched", body = ApiResponse<InventoryItemSummary>),
        (status = 404, description = "Inventory item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn get_inventory(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<InventoryItemSummary> {
    match state.services.inventory.lookup(id).await? {
        Some(model) => Ok(Json(ApiResponse::success(InventoryItemSummary::from(model)))),
        None => Err(ServiceError::NotFound(format!(
            "Inventory item {} not found",
            id
        ))),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory",
    request_body = CreateInventoryItemRequest,
    responses(
        (status = 201, description = "Inventory item created", body = ApiResponse<InventoryItemSummary>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn create_inventory(
    State(state): State<AppState>,
    Json(payload): Json<CreateInventoryItemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<InventoryItemSummary>>), ServiceError> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let kind = parse_kind(&payload.kind)?;

    let model = state
        .services
        .inventory
        .create_item(CreateInventoryItemInput {
            code: payload.code,
            name: payload.name,
            kind,
            quantity: payload.quantity,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(InventoryItemSummary::from(model))),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory/{id}/adjust",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    request_body = AdjustInventoryRequest,
    responses(
        (status = 200, description = "Stock adjusted", body = ApiResponse<InventoryItemSummary>),
        (status = 400, description = "Adjustment would drive stock negative", body = crate::errors::ErrorResponse),
        (status = 404, description = "Inventory item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn adjust_inventory(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdjustInventoryRequest>,
) -> ApiResult<InventoryItemSummary> {
    let model = state
        .services
        .inventory
        .adjust_quantity(id, payload.quantity_change)
        .await?;

    Ok(Json(ApiResponse::success(InventoryItemSummary::from(model))))
}
