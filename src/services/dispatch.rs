//! Dispatch–Inventory Reconciliation Engine
//!
//! Orchestrates the paired mutation of the inventory store and the dispatch
//! store across the three lifecycle operations:
//!
//! - create: all-or-nothing reservation of every line, rollback in reverse
//!   order on any failure, then persistence of the dispatch record;
//! - update: metadata only, line items are immutable after creation;
//! - delete: per-line reversal by the kind persisted on the line, with
//!   reconciliation gaps reported as warnings rather than failures.

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::entities::dispatch::{self, DispatchStatus, Entity as DispatchEntity};
use crate::entities::dispatch_line::{self, Entity as DispatchLineEntity};
use crate::entities::inventory_item;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::inventory::InventoryService;

/// A requested dispatch line. `item_code`/`item_name`/`item_type` are
/// advisory: the persisted snapshot always comes from the resolved inventory
/// record, never from the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchLineInput {
    pub item_id: Uuid,
    pub item_code: Option<String>,
    pub item_name: Option<String>,
    pub item_type: Option<String>,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDispatchInput {
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
    pub lines: Vec<DispatchLineInput>,
}

/// Metadata-only update. `items` and `quantity` are trap fields: their
/// presence in the payload means the caller tried to alter the immutable
/// line list, which is rejected rather than silently ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDispatchInput {
    pub status: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub vehicle_number: Option<String>,
    pub driver_name: Option<String>,
    pub driver_contact: Option<String>,
    pub remarks: Option<String>,
    pub items: Option<serde_json::Value>,
    pub quantity: Option<serde_json::Value>,
}

/// A line whose stock could not be restored during deletion because the
/// referenced inventory record no longer exists.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationWarning {
    pub item_id: Uuid,
    pub item_code: String,
    pub quantity: i32,
}

/// Outcome of a delete-with-reversal.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteDispatchOutcome {
    pub dispatch_id: Uuid,
    pub restored_items: u32,
    pub total_items: u32,
    pub warnings: Vec<ReconciliationWarning>,
}

/// Service implementing the reconciliation engine over the dispatch and
/// inventory stores.
#[derive(Clone)]
pub struct DispatchService {
    db_pool: Arc<DatabaseConnection>,
    inventory: InventoryService,
    event_sender: EventSender,
}

impl DispatchService {
    pub fn new(
        db_pool: Arc<DatabaseConnection>,
        inventory: InventoryService,
        event_sender: EventSender,
    ) -> Self {
        Self {
            db_pool,
            inventory,
            event_sender,
        }
    }

    /// Creates a dispatch, reserving stock for every line.
    ///
    /// The batch is all-or-nothing: reservations are made in request order
    /// and recorded in a compensation log; on any line failure or on
    /// persistence failure, previously reserved quantities are released in
    /// reverse order before the error surfaces. Stock is never left
    /// decremented without a persisted dispatch.
    #[instrument(skip(self, input), fields(destination = %input.destination, lines = input.lines.len()))]
    pub async fn create_dispatch(
        &self,
        input: CreateDispatchInput,
    ) -> Result<(dispatch::Model, Vec<dispatch_line::Model>), ServiceError> {
        validate_create(&input)?;

        let dispatch_id = Uuid::new_v4();

        // Phase 1: reserve stock line by line, remembering what succeeded.
        let mut reserved: Vec<(inventory_item::Model, i32)> = Vec::with_capacity(input.lines.len());
        for line in &input.lines {
            match self.inventory.try_reserve(line.item_id, line.quantity).await {
                Ok(item) => reserved.push((item, line.quantity)),
                Err(err) => {
                    warn!(
                        dispatch_id = %dispatch_id,
                        item_id = %line.item_id,
                        error = %err,
                        "Reservation failed; rolling back earlier lines"
                    );
                    self.rollback_reservations(&reserved).await;
                    return Err(err);
                }
            }
        }

        // Phase 2: persist the dispatch header and its lines in one transaction.
        let now = Utc::now();
        let header = dispatch::ActiveModel {
            id: Set(dispatch_id),
            destination: Set(input.destination.trim().to_string()),
            customer_name: Set(input.customer_name.unwrap_or_default()),
            address: Set(input.address.unwrap_or_default()),
            contact_number: Set(input.contact_number.unwrap_or_default()),
            dispatch_date: Set(input.dispatch_date),
            delivery_date: Set(input.delivery_date),
            transport_mode: Set(input
                .transport_mode
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "Road".to_string())),
            vehicle_number: Set(input.vehicle_number.unwrap_or_default()),
            driver_name: Set(input.driver_name.unwrap_or_default()),
            driver_contact: Set(input.driver_contact.unwrap_or_default()),
            dispatched_by: Set(input
                .dispatched_by
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| "Admin".to_string())),
            remarks: Set(input.remarks.unwrap_or_default()),
            status: Set(DispatchStatus::Dispatched.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        // Snapshot item code/name/kind from the resolved inventory records so
        // the stored lines cannot drift from the ledger.
        let line_models: Vec<dispatch_line::ActiveModel> = reserved
            .iter()
            .enumerate()
            .map(|(position, (item, quantity))| dispatch_line::ActiveModel {
                id: Set(Uuid::new_v4()),
                dispatch_id: Set(dispatch_id),
                item_id: Set(item.id),
                item_code: Set(item.code.clone()),
                item_name: Set(item.name.clone()),
                item_kind: Set(item.kind.clone()),
                quantity: Set(*quantity),
                position: Set(position as i32),
            })
            .collect();

        let db = self.db_pool.clone();
        let persisted = db
            .transaction::<_, (dispatch::Model, Vec<dispatch_line::Model>), ServiceError>(
                move |txn| {
                    Box::pin(async move {
                        let header = header.insert(txn).await.map_err(ServiceError::db_error)?;

                        let mut lines = Vec::with_capacity(line_models.len());
                        for line in line_models {
                            lines.push(line.insert(txn).await.map_err(ServiceError::db_error)?);
                        }

                        Ok((header, lines))
                    })
                },
            )
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            });

        let (header, lines) = match persisted {
            Ok(result) => result,
            Err(err) => {
                error!(
                    dispatch_id = %dispatch_id,
                    error = %err,
                    "Failed to persist dispatch after reservation; rolling back stock"
                );
                self.rollback_reservations(&reserved).await;
                return Err(err);
            }
        };

        info!(
            dispatch_id = %dispatch_id,
            destination = %header.destination,
            lines = lines.len(),
            "Dispatch created"
        );

        for line in &lines {
            self.emit(Event::StockReserved {
                item_id: line.item_id,
                quantity: line.quantity,
                dispatch_id,
            })
            .await;
        }
        self.emit(Event::DispatchCreated(dispatch_id)).await;

        Ok((header, lines))
    }

    /// Retrieves a dispatch with its lines in creation order.
    #[instrument(skip(self))]
    pub async fn get_dispatch(
        &self,
        dispatch_id: Uuid,
    ) -> Result<Option<(dispatch::Model, Vec<dispatch_line::Model>)>, ServiceError> {
        let db = &*self.db_pool;

        let header = DispatchEntity::find_by_id(dispatch_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?;

        let Some(header) = header else {
            return Ok(None);
        };

        let lines = DispatchLineEntity::find()
            .filter(dispatch_line::Column::DispatchId.eq(dispatch_id))
            .order_by_asc(dispatch_line::Column::Position)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(Some((header, lines)))
    }

    /// Updates dispatch metadata. Line items and quantities are immutable;
    /// any attempt to change them fails with `UnsupportedOperation`.
    #[instrument(skip(self, input), fields(dispatch_id = %dispatch_id))]
    pub async fn update_dispatch(
        &self,
        dispatch_id: Uuid,
        input: UpdateDispatchInput,
    ) -> Result<(dispatch::Model, Vec<dispatch_line::Model>), ServiceError> {
        if input.items.is_some() || input.quantity.is_some() {
            return Err(ServiceError::UnsupportedOperation(
                "Dispatch line items and quantities are immutable once created".to_string(),
            ));
        }

        let status = input
            .status
            .as_deref()
            .map(|s| {
                DispatchStatus::from_str(s).ok_or_else(|| {
                    ServiceError::ValidationError(format!("Unknown dispatch status '{}'", s))
                })
            })
            .transpose()?;

        let db = &*self.db_pool;

        let existing = DispatchEntity::find_by_id(dispatch_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Dispatch {} not found", dispatch_id))
            })?;

        if let Some(delivery_date) = input.delivery_date {
            if delivery_date < existing.dispatch_date {
                return Err(ServiceError::ValidationError(format!(
                    "Delivery date {} precedes dispatch date {}",
                    delivery_date, existing.dispatch_date
                )));
            }
        }

        let mut active: dispatch::ActiveModel = existing.into();
        if let Some(status) = status {
            active.status = Set(status.as_str().to_string());
        }
        if let Some(delivery_date) = input.delivery_date {
            active.delivery_date = Set(Some(delivery_date));
        }
        if let Some(vehicle_number) = input.vehicle_number {
            active.vehicle_number = Set(vehicle_number);
        }
        if let Some(driver_name) = input.driver_name {
            active.driver_name = Set(driver_name);
        }
        if let Some(driver_contact) = input.driver_contact {
            active.driver_contact = Set(driver_contact);
        }
        if let Some(remarks) = input.remarks {
            active.remarks = Set(remarks);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await.map_err(ServiceError::db_error)?;

        let lines = DispatchLineEntity::find()
            .filter(dispatch_line::Column::DispatchId.eq(dispatch_id))
            .order_by_asc(dispatch_line::Column::Position)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        info!(dispatch_id = %dispatch_id, "Dispatch metadata updated");
        self.emit(Event::DispatchUpdated(dispatch_id)).await;

        Ok((updated, lines))
    }

    /// Deletes a dispatch, restoring every line's quantity to its ledger.
    ///
    /// Lines whose inventory record has vanished are reported as
    /// reconciliation gaps in the outcome; the dispatch record is removed
    /// regardless, so history never becomes undeletable.
    #[instrument(skip(self), fields(dispatch_id = %dispatch_id))]
    pub async fn delete_dispatch(
        &self,
        dispatch_id: Uuid,
    ) -> Result<DeleteDispatchOutcome, ServiceError> {
        let (header, lines) = self
            .get_dispatch(dispatch_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Dispatch {} not found", dispatch_id)))?;

        let total_items = lines.len() as u32;
        let mut restored_items = 0u32;
        let mut warnings = Vec::new();

        for line in &lines {
            match self.inventory.release(line.item_id, line.quantity).await {
                Ok(_) => {
                    restored_items += 1;
                    self.emit(Event::StockReleased {
                        item_id: line.item_id,
                        quantity: line.quantity,
                    })
                    .await;
                }
                Err(ServiceError::NotFound(_)) => {
                    warn!(
                        dispatch_id = %dispatch_id,
                        item_id = %line.item_id,
                        item_code = %line.item_code,
                        quantity = line.quantity,
                        "Inventory record missing; stock not restorable"
                    );
                    warnings.push(ReconciliationWarning {
                        item_id: line.item_id,
                        item_code: line.item_code.clone(),
                        quantity: line.quantity,
                    });
                    self.emit(Event::ReconciliationGap {
                        dispatch_id,
                        item_id: line.item_id,
                        item_code: line.item_code.clone(),
                        quantity: line.quantity,
                    })
                    .await;
                }
                Err(err) => return Err(err),
            }
        }

        let db = self.db_pool.clone();
        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                DispatchLineEntity::delete_many()
                    .filter(dispatch_line::Column::DispatchId.eq(dispatch_id))
                    .exec(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                DispatchEntity::delete_by_id(dispatch_id)
                    .exec(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                Ok(())
            })
        })
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
            TransactionError::Transaction(service_err) => service_err,
        })?;

        info!(
            dispatch_id = %dispatch_id,
            destination = %header.destination,
            restored_items,
            total_items,
            "Dispatch deleted and inventory restored"
        );

        self.emit(Event::DispatchDeleted {
            dispatch_id,
            restored_lines: restored_items,
            total_lines: total_items,
        })
        .await;

        Ok(DeleteDispatchOutcome {
            dispatch_id,
            restored_items,
            total_items,
            warnings,
        })
    }

    /// Releases previously reserved quantities in reverse order of
    /// reservation. Failures are logged and swallowed: rollback runs on an
    /// error path already, and the original error must surface.
    async fn rollback_reservations(&self, reserved: &[(inventory_item::Model, i32)]) {
        for (item, quantity) in reserved.iter().rev() {
            if let Err(err) = self.inventory.release(item.id, *quantity).await {
                error!(
                    item_id = %item.id,
                    item_code = %item.code,
                    quantity,
                    error = %err,
                    "Failed to roll back reservation; stock ledger requires manual correction"
                );
            }
        }
    }

    async fn emit(&self, event: Event) {
        if let Err(err) = self.event_sender.send(event).await {
            warn!(error = %err, "Failed to send event");
        }
    }
}

fn validate_create(input: &CreateDispatchInput) -> Result<(), ServiceError> {
    if input.destination.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "Destination is required".to_string(),
        ));
    }
    if input.lines.is_empty() {
        return Err(ServiceError::ValidationError(
            "At least one dispatch line is required".to_string(),
        ));
    }
    for (index, line) in input.lines.iter().enumerate() {
        if line.item_id.is_nil() {
            return Err(ServiceError::ValidationError(format!(
                "Line {} is missing an item id",
                index + 1
            )));
        }
        if line.quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "Line {} must have a positive quantity, got {}",
                index + 1,
                line.quantity
            )));
        }
    }
    if let Some(delivery_date) = input.delivery_date {
        if delivery_date < input.dispatch_date {
            return Err(ServiceError::ValidationError(format!(
                "Delivery date {} precedes dispatch date {}",
                delivery_date, input.dispatch_date
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_input() -> CreateDispatchInput {
        CreateDispatchInput {
            destination: "Pune Plant".to_string(),
            customer_name: None,
            address: None,
            contact_number: None,
            dispatch_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            delivery_date: None,
            transport_mode: None,
            vehicle_number: None,
            driver_name: None,
            driver_contact: None,
            dispatched_by: None,
            remarks: None,
            lines: vec![DispatchLineInput {
                item_id: Uuid::new_v4(),
                item_code: None,
                item_name: None,
                item_type: None,
                quantity: 3,
            }],
        }
    }

    #[test]
    fn create_validation_accepts_well_formed_input() {
        assert!(validate_create(&base_input()).is_ok());
    }

    #[test]
    fn create_validation_rejects_blank_destination() {
        let mut input = base_input();
        input.destination = "   ".to_string();
        assert!(matches!(
            validate_create(&input),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn create_validation_rejects_empty_lines() {
        let mut input = base_input();
        input.lines.clear();
        assert!(matches!(
            validate_create(&input),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn create_validation_rejects_non_positive_quantity() {
        let mut input = base_input();
        input.lines[0].quantity = 0;
        assert!(validate_create(&input).is_err());
        input.lines[0].quantity = -4;
        assert!(validate_create(&input).is_err());
    }

    #[test]
    fn create_validation_rejects_nil_item_id() {
        let mut input = base_input();
        input.lines[0].item_id = Uuid::nil();
        assert!(validate_create(&input).is_err());
    }

    #[test]
    fn create_validation_rejects_delivery_before_dispatch() {
        let mut input = base_input();
        input.delivery_date = NaiveDate::from_ymd_opt(2025, 5, 1);
        assert!(validate_create(&input).is_err());

        input.delivery_date = NaiveDate::from_ymd_opt(2025, 6, 1);
        assert!(validate_create(&input).is_ok());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn quantity_sign_decides_validation(quantity in -1000i32..1000) {
                let mut input = base_input();
                input.lines[0].quantity = quantity;
                prop_assert_eq!(validate_create(&input).is_ok(), quantity > 0);
            }
        }
    }
}
