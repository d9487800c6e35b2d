//! Inventory Record Store
//!
//! Holds current stock per item across both ledgers (manufacturing WIP and
//! bought-out finished stock) behind one kind-tagged interface. Reservation
//! and release are single conditional UPDATE statements, so concurrent
//! callers on the same record serialize at the database and available
//! quantity can never be driven below zero.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::inventory_item::{self, Entity as InventoryItemEntity, ItemKind};
use crate::errors::ServiceError;

/// Input for creating a new inventory record (inventory-management
/// collaborator operation; the reconciliation engine never creates items).
#[derive(Debug, Clone)]
pub struct CreateInventoryItemInput {
    pub code: String,
    pub name: String,
    pub kind: ItemKind,
    pub quantity: i32,
}

/// Service wrapping the inventory records table.
#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DatabaseConnection>,
}

impl InventoryService {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self { db_pool }
    }

    /// Fetches a single inventory record by id.
    #[instrument(skip(self))]
    pub async fn lookup(&self, item_id: Uuid) -> Result<Option<inventory_item::Model>, ServiceError> {
        let db = &*self.db_pool;

        InventoryItemEntity::find_by_id(item_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Atomically reserves `quantity` units: the availability check and the
    /// decrement are one conditional UPDATE, not a read-then-write pair.
    ///
    /// Returns the updated record, `NotFound` if no such item exists, or
    /// `InsufficientStock` carrying the available/requested quantities.
    #[instrument(skip(self))]
    pub async fn try_reserve(
        &self,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<inventory_item::Model, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "Reservation quantity must be positive, got {}",
                quantity
            )));
        }

        let db = &*self.db_pool;
        let now = Utc::now();

        let result = InventoryItemEntity::update_many()
            .col_expr(
                inventory_item::Column::AvailableQuantity,
                Expr::col(inventory_item::Column::AvailableQuantity).sub(quantity),
            )
            .col_expr(inventory_item::Column::LastUpdated, Expr::value(now))
            .filter(inventory_item::Column::Id.eq(item_id))
            .filter(inventory_item::Column::AvailableQuantity.gte(quantity))
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;

        if result.rows_affected == 0 {
            // Zero rows means either the item is gone or stock ran short;
            // a follow-up read tells the two apart.
            return match self.lookup(item_id).await? {
                Some(item) => Err(ServiceError::InsufficientStock {
                    item_code: item.code,
                    available: item.available_quantity,
                    requested: quantity,
                }),
                None => Err(ServiceError::NotFound(format!(
                    "Inventory item {} not found",
                    item_id
                ))),
            };
        }

        let updated = self.lookup(item_id).await?.ok_or_else(|| {
            ServiceError::InternalError(format!(
                "Inventory item {} vanished after reservation",
                item_id
            ))
        })?;

        info!(
            item_id = %item_id,
            item_code = %updated.code,
            quantity,
            available = updated.available_quantity,
            "Reserved stock"
        );

        Ok(updated)
    }

    /// Restores `quantity` units unconditionally. Succeeds whenever the record
    /// exists; there is no upper-capacity bound on stock.
    #[instrument(skip(self))]
    pub async fn release(
        &self,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<inventory_item::Model, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "Release quantity must be positive, got {}",
                quantity
            )));
        }

        let db = &*self.db_pool;
        let now = Utc::now();

        let result = InventoryItemEntity::update_many()
            .col_expr(
                inventory_item::Column::AvailableQuantity,
                Expr::col(inventory_item::Column::AvailableQuantity).add(quantity),
            )
            .col_expr(inventory_item::Column::LastUpdated, Expr::value(now))
            .filter(inventory_item::Column::Id.eq(item_id))
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Inventory item {} not found",
                item_id
            )));
        }

        let updated = self.lookup(item_id).await?.ok_or_else(|| {
            ServiceError::InternalError(format!(
                "Inventory item {} vanished after release",
                item_id
            ))
        })?;

        info!(
            item_id = %item_id,
            item_code = %updated.code,
            quantity,
            available = updated.available_quantity,
            "Released stock"
        );

        Ok(updated)
    }

    /// Creates a new inventory record.
    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_item(
        &self,
        input: CreateInventoryItemInput,
    ) -> Result<inventory_item::Model, ServiceError> {
        if input.code.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Item code is required".to_string(),
            ));
        }
        if input.quantity < 0 {
            return Err(ServiceError::ValidationError(
                "Initial quantity must not be negative".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let now = Utc::now();

        let model = inventory_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(input.code),
            name: Set(input.name),
            kind: Set(input.kind.as_str().to_string()),
            available_quantity: Set(input.quantity),
            created_at: Set(now),
            last_updated: Set(now),
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        info!(item_id = %model.id, code = %model.code, "Created inventory item");

        Ok(model)
    }

    /// Lists inventory records with pagination and optional kind/search filters.
    #[instrument(skip(self))]
    pub async fn list_items(
        &self,
        page: u64,
        limit: u64,
        kind: Option<ItemKind>,
        search: Option<&str>,
    ) -> Result<(Vec<inventory_item::Model>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = InventoryItemEntity::find();

        if let Some(kind) = kind {
            query = query.filter(inventory_item::Column::Kind.eq(kind.as_str()));
        }

        if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(inventory_item::Column::Code.contains(search))
                    .add(inventory_item::Column::Name.contains(search)),
            );
        }

        query = query.order_by_asc(inventory_item::Column::Code);

        let paginator = query.paginate(db, limit);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }

    /// Applies a signed stock adjustment. Negative adjustments are bounded by
    /// the non-negative-stock invariant and fail with `InsufficientStock`.
    #[instrument(skip(self))]
    pub async fn adjust_quantity(
        &self,
        item_id: Uuid,
        quantity_change: i32,
    ) -> Result<inventory_item::Model, ServiceError> {
        match quantity_change {
            0 => self.lookup(item_id).await?.ok_or_else(|| {
                ServiceError::NotFound(format!("Inventory item {} not found", item_id))
            }),
            change if change > 0 => self.release(item_id, change).await,
            change => self.try_reserve(item_id, -change).await,
        }
    }
}
