use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lot id stored on balance rows for stock that carries no lot.
///
/// Balances key on (article, warehouse, location, lot). SQL unique indexes
/// treat NULLs as distinct, which would let two racing first-touch inserts
/// create duplicate rows for lot-less stock, so the "no lot" case is stored
/// as 0 instead of NULL and the index stays a plain four-column unique.
pub const NO_LOT: i64 = 0;

/// Current on-hand quantity per balance key. A cached projection of the
/// ledger: `qty_on_hand` always equals the sum of ledger deltas for the key,
/// and never goes negative. Rows are created lazily at zero on first posting
/// and mutated only by the posting engine under a row lock.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_balances")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub article_id: i64,
    pub warehouse_id: i64,
    pub location_id: i64,
    /// `NO_LOT` (0) for stock without a lot.
    pub lot_id: i64,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub qty_on_hand: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn lot(&self) -> Option<i64> {
        (self.lot_id != NO_LOT).then_some(self.lot_id)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::article::Entity",
        from = "Column::ArticleId",
        to = "super::article::Column::Id"
    )]
    Article,
    #[sea_orm(
        belongs_to = "super::stock_location::Entity",
        from = "Column::LocationId",
        to = "super::stock_location::Column::Id"
    )]
    Location,
}

impl Related<super::article::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Article.def()
    }
}

impl Related<super::stock_location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
