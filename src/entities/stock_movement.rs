use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kinds of stock movement.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum MovementType {
    #[sea_orm(string_value = "IN")]
    #[strum(serialize = "IN")]
    In,
    #[sea_orm(string_value = "OUT")]
    #[strum(serialize = "OUT")]
    Out,
    #[sea_orm(string_value = "TRANSFER")]
    #[strum(serialize = "TRANSFER")]
    Transfer,
    #[sea_orm(string_value = "ADJUSTMENT")]
    #[strum(serialize = "ADJUSTMENT")]
    Adjustment,
    #[sea_orm(string_value = "SCRAP")]
    #[strum(serialize = "SCRAP")]
    Scrap,
}

/// Movement lifecycle. Legal transitions are DRAFT→POSTED and
/// DRAFT→CANCELLED; POSTED and CANCELLED are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum MovementStatus {
    #[sea_orm(string_value = "DRAFT")]
    #[strum(serialize = "DRAFT")]
    Draft,
    #[sea_orm(string_value = "POSTED")]
    #[strum(serialize = "POSTED")]
    Posted,
    #[sea_orm(string_value = "CANCELLED")]
    #[strum(serialize = "CANCELLED")]
    Cancelled,
}

/// Movement header. Created in DRAFT by the draft builder, flipped to POSTED
/// by the posting engine or to CANCELLED by the cancel operation; never
/// deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub movement_no: String,
    pub movement_type: MovementType,
    pub status: MovementStatus,
    pub effective_at: DateTime<Utc>,
    /// Client-supplied token; unique when present. A retried create that hits
    /// the uniqueness constraint returns the existing movement.
    pub idempotency_key: Option<String>,
    pub source_document_type: Option<String>,
    pub source_document_id: Option<String>,
    pub reason_code: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
    pub posted_by: Option<String>,
    pub cancelled_by: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn is_draft(&self) -> bool {
        self.status == MovementStatus::Draft
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::stock_movement_line::Entity")]
    Lines,
    #[sea_orm(has_many = "super::stock_ledger_entry::Entity")]
    LedgerEntries,
    #[sea_orm(has_many = "super::stock_movement_event::Entity")]
    Events,
}

impl Related<super::stock_movement_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl Related<super::stock_ledger_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerEntries.def()
    }
}

impl Related<super::stock_movement_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Events.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
