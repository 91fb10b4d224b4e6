use rust_decimal::Decimal;
use sea_orm::error::DbErr;
use serde::Serialize;
use thiserror::Error;

/// Error taxonomy for the posting engine.
///
/// Everything except `Database` and `EventError` is a client-input or
/// state-conflict error; infrastructure failures propagate unchanged and
/// always roll back the surrounding transaction.
#[derive(Error, Debug, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// A line is missing required fields for its movement type, direction is
    /// missing/invalid for an adjustment, or src equals dst for a transfer.
    #[error("Invalid line: {0}")]
    InvalidLine(String),

    /// A referenced location does not exist or does not belong to the stated
    /// warehouse.
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    /// Quantity is not a positive number.
    #[error("Invalid quantity: {0}")]
    InvalidQty(String),

    /// Posting attempted on a movement with zero lines.
    #[error("Movement has no lines")]
    EmptyMovement,

    /// A scrap line supplied a destination location not flagged as scrap.
    #[error("Invalid scrap destination: {0}")]
    InvalidScrapDestination(String),

    /// Applying the movement's legs would drive a balance below zero; the
    /// whole posting is aborted.
    #[error("Negative stock for article {article_id} at warehouse {warehouse_id} location {location_id}: {qty_before} {delta_qty}")]
    NegativeStock {
        article_id: i64,
        warehouse_id: i64,
        location_id: i64,
        lot_id: Option<i64>,
        qty_before: Decimal,
        delta_qty: Decimal,
    },

    /// Post/cancel attempted on a movement not in the required source state.
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Event error: {0}")]
    EventError(String),
}

impl ServiceError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        ServiceError::NotFound(format!("{} {} not found", entity, id))
    }

    /// Stable machine-readable code for event payloads and HTTP adapters.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Database(_) => "DATABASE_ERROR",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::Validation(_) => "VALIDATION_ERROR",
            ServiceError::InvalidLine(_) => "INVALID_LINE",
            ServiceError::InvalidLocation(_) => "INVALID_LOCATION",
            ServiceError::InvalidQty(_) => "INVALID_QTY",
            ServiceError::EmptyMovement => "EMPTY_MOVEMENT",
            ServiceError::InvalidScrapDestination(_) => "INVALID_SCRAP_DESTINATION",
            ServiceError::NegativeStock { .. } => "NEGATIVE_STOCK",
            ServiceError::InvalidStatus(_) => "INVALID_STATUS",
            ServiceError::EventError(_) => "EVENT_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ServiceError::EmptyMovement.code(), "EMPTY_MOVEMENT");
        assert_eq!(
            ServiceError::InvalidStatus("POSTED".into()).code(),
            "INVALID_STATUS"
        );
    }
}
