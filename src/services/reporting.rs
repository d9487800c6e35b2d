//! Read-only query layer over the dispatch store: filtered and paginated
//! listing, free-text search, the flattened details view, and the stats
//! summary. Never touches the inventory store.

use chrono::{Datelike, NaiveDate, Utc};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, JoinType, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::dispatch::{self, Entity as DispatchEntity};
use crate::entities::dispatch_line::{self, Entity as DispatchLineEntity};
use crate::errors::ServiceError;

/// Filters for the dispatch listing.
#[derive(Debug, Clone, Default)]
pub struct DispatchListFilter {
    pub status: Option<String>,
    pub destination: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub search: Option<String>,
}

/// Flattened line view consumed by the inventory screen.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DispatchLineDetail {
    pub item_code: String,
    pub product: String,
    pub quantity: i32,
    pub reference: String,
    pub transport_mode: String,
    pub dispatch_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DispatchTotals {
    pub total_dispatches: u64,
    pub total_quantity: i64,
    pub total_items: u64,
    pub unique_destinations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusBucket {
    pub status: String,
    pub count: u64,
    pub total_quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MonthlyBucket {
    pub year: i32,
    pub month: u32,
    pub count: u64,
    pub total_quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DispatchStatsSummary {
    pub summary: DispatchTotals,
    pub status_breakdown: Vec<StatusBucket>,
    pub monthly_trends: Vec<MonthlyBucket>,
}

/// Service producing read-only views over dispatch records.
#[derive(Clone)]
pub struct DispatchReportingService {
    db_pool: Arc<DatabaseConnection>,
}

impl DispatchReportingService {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self { db_pool }
    }

    /// Lists dispatches matching the filter, newest dispatch date first,
    /// with their lines attached.
    #[instrument(skip(self))]
    pub async fn list_dispatches(
        &self,
        filter: DispatchListFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<(dispatch::Model, Vec<dispatch_line::Model>)>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = DispatchEntity::find();

        if let Some(status) = filter.status.filter(|s| !s.trim().is_empty()) {
            query = query.filter(dispatch::Column::Status.eq(status));
        }
        if let Some(destination) = filter.destination.filter(|s| !s.trim().is_empty()) {
            query = query.filter(dispatch::Column::Destination.contains(destination.as_str()));
        }
        if let Some(start_date) = filter.start_date {
            query = query.filter(dispatch::Column::DispatchDate.gte(start_date));
        }
        if let Some(end_date) = filter.end_date {
            query = query.filter(dispatch::Column::DispatchDate.lte(end_date));
        }
        if let Some(search) = filter.search.filter(|s| !s.trim().is_empty()) {
            query = query
                .join(JoinType::LeftJoin, dispatch::Relation::Lines.def())
                .filter(
                    Condition::any()
                        .add(dispatch::Column::Destination.contains(search.as_str()))
                        .add(dispatch::Column::CustomerName.contains(search.as_str()))
                        .add(dispatch::Column::VehicleNumber.contains(search.as_str()))
                        .add(dispatch::Column::DriverName.contains(search.as_str()))
                        .add(dispatch_line::Column::ItemCode.contains(search.as_str()))
                        .add(dispatch_line::Column::ItemName.contains(search.as_str())),
                )
                .distinct();
        }

        query = query
            .order_by_desc(dispatch::Column::DispatchDate)
            .order_by_desc(dispatch::Column::CreatedAt);

        let paginator = query.paginate(db, limit);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let headers = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        let with_lines = self.attach_lines(headers).await?;

        Ok((with_lines, total))
    }

    /// Flattened line view of the most recent dispatches.
    #[instrument(skip(self))]
    pub async fn dispatch_details(
        &self,
        limit: u64,
    ) -> Result<Vec<DispatchLineDetail>, ServiceError> {
        let db = &*self.db_pool;

        let headers = DispatchEntity::find()
            .order_by_desc(dispatch::Column::DispatchDate)
            .order_by_desc(dispatch::Column::CreatedAt)
            .limit(limit)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let with_lines = self.attach_lines(headers).await?;

        let details = with_lines
            .into_iter()
            .flat_map(|(header, lines)| {
                let reference = short_reference(header.id);
                let transport_mode = header.transport_mode.clone();
                let dispatch_date = header.dispatch_date;
                lines.into_iter().map(move |line| DispatchLineDetail {
                    item_code: line.item_code,
                    product: line.item_name,
                    quantity: line.quantity,
                    reference: reference.clone(),
                    transport_mode: transport_mode.clone(),
                    dispatch_date,
                })
            })
            .collect();

        Ok(details)
    }

    /// Aggregate totals, per-status breakdown, and the trailing-12-months
    /// trend. Rollups are folded in memory so SQLite and Postgres behave
    /// identically.
    #[instrument(skip(self))]
    pub async fn stats_summary(&self) -> Result<DispatchStatsSummary, ServiceError> {
        let db = &*self.db_pool;

        let headers = DispatchEntity::find()
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let lines = DispatchLineEntity::find()
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut quantity_by_dispatch: HashMap<Uuid, i64> = HashMap::new();
        for line in &lines {
            *quantity_by_dispatch.entry(line.dispatch_id).or_default() += line.quantity as i64;
        }

        let total_quantity: i64 = quantity_by_dispatch.values().sum();

        let destinations: Vec<String> = headers
            .iter()
            .map(|h| h.destination.clone())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut status_buckets: HashMap<String, (u64, i64)> = HashMap::new();
        for header in &headers {
            let entry = status_buckets.entry(header.status.clone()).or_default();
            entry.0 += 1;
            entry.1 += quantity_by_dispatch.get(&header.id).copied().unwrap_or(0);
        }
        let mut status_breakdown: Vec<StatusBucket> = status_buckets
            .into_iter()
            .map(|(status, (count, total_quantity))| StatusBucket {
                status,
                count,
                total_quantity,
            })
            .collect();
        status_breakdown.sort_by(|a, b| a.status.cmp(&b.status));

        let today = Utc::now().date_naive();
        let mut monthly: HashMap<(i32, u32), (u64, i64)> = HashMap::new();
        for header in &headers {
            if months_between(header.dispatch_date, today) < 12 {
                let key = (header.dispatch_date.year(), header.dispatch_date.month());
                let entry = monthly.entry(key).or_default();
                entry.0 += 1;
                entry.1 += quantity_by_dispatch.get(&header.id).copied().unwrap_or(0);
            }
        }
        let mut monthly_trends: Vec<MonthlyBucket> = monthly
            .into_iter()
            .map(|((year, month), (count, total_quantity))| MonthlyBucket {
                year,
                month,
                count,
                total_quantity,
            })
            .collect();
        monthly_trends.sort_by(|a, b| (b.year, b.month).cmp(&(a.year, a.month)));
        monthly_trends.truncate(12);

        Ok(DispatchStatsSummary {
            summary: DispatchTotals {
                total_dispatches: headers.len() as u64,
                total_quantity,
                total_items: lines.len() as u64,
                unique_destinations: destinations,
            },
            status_breakdown,
            monthly_trends,
        })
    }

    async fn attach_lines(
        &self,
        headers: Vec<dispatch::Model>,
    ) -> Result<Vec<(dispatch::Model, Vec<dispatch_line::Model>)>, ServiceError> {
        let db = &*self.db_pool;

        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
        let lines = DispatchLineEntity::find()
            .filter(dispatch_line::Column::DispatchId.is_in(ids))
            .order_by_asc(dispatch_line::Column::Position)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut by_dispatch: HashMap<Uuid, Vec<dispatch_line::Model>> = HashMap::new();
        for line in lines {
            by_dispatch.entry(line.dispatch_id).or_default().push(line);
        }

        Ok(headers
            .into_iter()
            .map(|header| {
                let lines = by_dispatch.remove(&header.id).unwrap_or_default();
                (header, lines)
            })
            .collect())
    }
}

/// Short human-readable reference derived from a dispatch id, shown in the
/// flattened details view.
fn short_reference(id: Uuid) -> String {
    let simple = id.simple().to_string();
    format!("DSP-{}", &simple[simple.len() - 6..].to_uppercase())
}

/// Number of whole calendar months from `date` up to `today`.
fn months_between(date: NaiveDate, today: NaiveDate) -> i32 {
    (today.year() - date.year()) * 12 + today.month() as i32 - date.month() as i32
}
