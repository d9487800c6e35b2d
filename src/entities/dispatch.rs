use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a dispatch. The set is closed, but transitions within
/// it are unrestricted: operators routinely correct a mis-entered status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchStatus {
    Dispatched,
    InTransit,
    Delivered,
    Cancelled,
}

impl DispatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchStatus::Dispatched => "Dispatched",
            DispatchStatus::InTransit => "In Transit",
            DispatchStatus::Delivered => "Delivered",
            DispatchStatus::Cancelled => "Cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Dispatched" => Some(DispatchStatus::Dispatched),
            "In Transit" | "InTransit" => Some(DispatchStatus::InTransit),
            "Delivered" => Some(DispatchStatus::Delivered),
            "Cancelled" => Some(DispatchStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dispatches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
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
    pub status: String, // stored as string, converted through DispatchStatus
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn dispatch_status(&self) -> Option<DispatchStatus> {
        DispatchStatus::from_str(&self.status)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::dispatch_line::Entity")]
    Lines,
}

impl Related<super::dispatch_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = active_model.id {
                active_model.id = Set(Uuid::new_v4());
            }
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(now);
            }
        }

        active_model.updated_at = Set(now);

        Ok(active_model)
    }
}
