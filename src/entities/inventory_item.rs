use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The two stock ledgers tracked by the system: work-in-progress stock of
/// manufactured items and finished stock of externally procured items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Manufacturing,
    BoughtOut,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Manufacturing => "manufacturing",
            ItemKind::BoughtOut => "bought_out",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "manufacturing" => Some(ItemKind::Manufacturing),
            "bought_out" | "boughtout" => Some(ItemKind::BoughtOut),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub kind: String, // stored as string, converted through ItemKind
    pub available_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Model {
    pub fn item_kind(&self) -> Option<ItemKind> {
        ItemKind::from_str(&self.kind)
    }
}

// Dispatch lines reference inventory items weakly (lookup only), so no
// relation is declared here.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_kind_round_trip() {
        assert_eq!(ItemKind::Manufacturing.as_str(), "manufacturing");
        assert_eq!(ItemKind::BoughtOut.as_str(), "bought_out");
        assert_eq!(
            ItemKind::from_str("manufacturing"),
            Some(ItemKind::Manufacturing)
        );
        assert_eq!(ItemKind::from_str("bought_out"), Some(ItemKind::BoughtOut));
        assert_eq!(ItemKind::from_str("boughtout"), Some(ItemKind::BoughtOut));
        assert_eq!(ItemKind::from_str("finished"), None);
    }
}
