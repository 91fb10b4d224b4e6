use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Direction of an ADJUSTMENT line.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
pub enum AdjustmentDirection {
    #[sea_orm(string_value = "IN")]
    #[strum(serialize = "IN")]
    In,
    #[sea_orm(string_value = "OUT")]
    #[strum(serialize = "OUT")]
    Out,
}

/// One requested quantity change inside a movement. Immutable once the parent
/// movement is POSTED or CANCELLED.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_movement_lines")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub movement_id: i64,
    pub line_no: i32,
    pub article_id: i64,
    pub lot_id: Option<i64>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub qty: Decimal,
    /// Pass-through only; copied onto ledger entries, never computed.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub unit_cost: Option<Decimal>,
    pub src_warehouse_id: Option<i64>,
    pub src_location_id: Option<i64>,
    pub dst_warehouse_id: Option<i64>,
    pub dst_location_id: Option<i64>,
    /// Required for ADJUSTMENT lines, absent otherwise.
    pub direction: Option<AdjustmentDirection>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stock_movement::Entity",
        from = "Column::MovementId",
        to = "super::stock_movement::Column::Id"
    )]
    Movement,
    #[sea_orm(
        belongs_to = "super::article::Entity",
        from = "Column::ArticleId",
        to = "super::article::Column::Id"
    )]
    Article,
}

impl Related<super::stock_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Movement.def()
    }
}

impl Related<super::article::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Article.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
