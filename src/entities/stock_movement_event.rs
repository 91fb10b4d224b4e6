use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum MovementEventType {
    #[sea_orm(string_value = "CREATED")]
    #[strum(serialize = "CREATED")]
    Created,
    #[sea_orm(string_value = "POSTED")]
    #[strum(serialize = "POSTED")]
    Posted,
    #[sea_orm(string_value = "CANCELLED")]
    #[strum(serialize = "CANCELLED")]
    Cancelled,
}

/// Append-only audit trail of movement lifecycle transitions, with the status
/// snapshot before and after and the acting user.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_movement_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub movement_id: i64,
    pub event_type: MovementEventType,
    pub actor: String,
    pub status_before: Option<String>,
    pub status_after: String,
    pub details: Option<Json>,
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
}

impl Related<super::stock_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Movement.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
