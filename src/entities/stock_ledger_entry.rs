use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One applied leg of a posted movement: a signed quantity delta at one
/// balance key, with the before/after quantities captured at posting time.
///
/// Append-only. Rows are never updated or deleted; for any balance key,
/// `qty_on_hand == Σ delta_qty` over its ledger entries.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub movement_id: i64,
    pub movement_line_id: i64,
    pub leg_no: i32,
    pub article_id: i64,
    pub warehouse_id: i64,
    pub location_id: i64,
    pub lot_id: Option<i64>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub delta_qty: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub qty_before: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub qty_after: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub unit_cost: Option<Decimal>,
    pub effective_at: DateTime<Utc>,
    pub posted_at: DateTime<Utc>,
}

impl Model {
    pub fn is_inbound(&self) -> bool {
        self.delta_qty > Decimal::ZERO
    }

    pub fn is_outbound(&self) -> bool {
        self.delta_qty < Decimal::ZERO
    }
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
        belongs_to = "super::stock_movement_line::Entity",
        from = "Column::MovementLineId",
        to = "super::stock_movement_line::Column::Id"
    )]
    Line,
}

impl Related<super::stock_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Movement.def()
    }
}

impl Related<super::stock_movement_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Line.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
