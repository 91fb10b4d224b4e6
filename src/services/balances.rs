//! Balance store: the durable map from balance key to on-hand quantity.
//!
//! The locking contract lives here. Every posting transaction sorts the keys
//! it touches into the canonical order defined by [`BalanceKey`]'s `Ord` and
//! acquires row locks in exactly that order; because the order is identical
//! across concurrent transactions, overlapping postings serialize instead of
//! deadlocking, and disjoint postings do not contend at all.

use std::cmp::Ordering;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};

use crate::entities::stock_balance::{self, Entity as StockBalance, NO_LOT};
use crate::errors::ServiceError;
use crate::services::legs::Leg;

/// Identifies one tracked quantity: (article, warehouse, location, lot).
///
/// The `Ord` impl is the canonical lock order: article, then warehouse, then
/// location, then lot with "no lot" sorting last. Posting correctness depends
/// on every transaction using this order; it must never fall back to the
/// iteration order of an unsorted collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BalanceKey {
    pub article_id: i64,
    pub warehouse_id: i64,
    pub location_id: i64,
    pub lot_id: Option<i64>,
}

impl BalanceKey {
    pub fn from_leg(leg: &Leg) -> Self {
        Self {
            article_id: leg.article_id,
            warehouse_id: leg.warehouse_id,
            location_id: leg.location_id,
            lot_id: leg.lot_id,
        }
    }

    /// Lot id as stored on balance rows (`NO_LOT` when absent).
    pub fn lot_column(&self) -> i64 {
        self.lot_id.unwrap_or(NO_LOT)
    }
}

impl Ord for BalanceKey {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.article_id, self.warehouse_id, self.location_id)
            .cmp(&(other.article_id, other.warehouse_id, other.location_id))
            // None sorts last: a present lot compares before "no lot".
            .then_with(|| match (self.lot_id, other.lot_id) {
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
    }
}

impl PartialOrd for BalanceKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Ensures a balance row exists for `key` and returns it locked for update.
///
/// Insert-if-absent first (a race-lost insert is ignored via the unique key
/// conflict), then SELECT ... FOR UPDATE. The caller holds the lock until its
/// transaction ends.
pub async fn ensure_and_lock<C: ConnectionTrait>(
    conn: &C,
    key: &BalanceKey,
) -> Result<stock_balance::Model, ServiceError> {
    let now = Utc::now();
    let fresh = stock_balance::ActiveModel {
        article_id: Set(key.article_id),
        warehouse_id: Set(key.warehouse_id),
        location_id: Set(key.location_id),
        lot_id: Set(key.lot_column()),
        qty_on_hand: Set(Decimal::ZERO),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    StockBalance::insert(fresh)
        .on_conflict(
            OnConflict::columns([
                stock_balance::Column::ArticleId,
                stock_balance::Column::WarehouseId,
                stock_balance::Column::LocationId,
                stock_balance::Column::LotId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .do_nothing()
        .exec(conn)
        .await?;

    StockBalance::find()
        .filter(stock_balance::Column::ArticleId.eq(key.article_id))
        .filter(stock_balance::Column::WarehouseId.eq(key.warehouse_id))
        .filter(stock_balance::Column::LocationId.eq(key.location_id))
        .filter(stock_balance::Column::LotId.eq(key.lot_column()))
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("balance row missing after upsert for {:?}", key))
        })
}

/// Writes a new on-hand quantity for an already-locked balance row.
pub async fn save_qty<C: ConnectionTrait>(
    conn: &C,
    balance: stock_balance::Model,
    qty_after: Decimal,
) -> Result<stock_balance::Model, ServiceError> {
    let mut active = balance.into_active_model();
    active.qty_on_hand = Set(qty_after);
    active.updated_at = Set(Utc::now());
    Ok(active.update(conn).await?)
}

/// Filters for the balance listing read path. `lot_id: Some(None)` selects
/// lot-less stock only; `None` leaves the lot unfiltered.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BalanceFilter {
    pub article_id: Option<i64>,
    pub warehouse_id: Option<i64>,
    pub location_id: Option<i64>,
    pub lot_id: Option<Option<i64>>,
}

/// Lists committed balances matching the filter, in a stable key order.
pub async fn list_balances<C: ConnectionTrait>(
    conn: &C,
    filter: &BalanceFilter,
) -> Result<Vec<stock_balance::Model>, ServiceError> {
    let mut query = StockBalance::find();

    if let Some(article_id) = filter.article_id {
        query = query.filter(stock_balance::Column::ArticleId.eq(article_id));
    }
    if let Some(warehouse_id) = filter.warehouse_id {
        query = query.filter(stock_balance::Column::WarehouseId.eq(warehouse_id));
    }
    if let Some(location_id) = filter.location_id {
        query = query.filter(stock_balance::Column::LocationId.eq(location_id));
    }
    if let Some(lot) = filter.lot_id {
        query = query.filter(stock_balance::Column::LotId.eq(lot.unwrap_or(NO_LOT)));
    }

    Ok(query
        .order_by_asc(stock_balance::Column::ArticleId)
        .order_by_asc(stock_balance::Column::WarehouseId)
        .order_by_asc(stock_balance::Column::LocationId)
        .order_by_asc(stock_balance::Column::LotId)
        .all(conn)
        .await?)
}
