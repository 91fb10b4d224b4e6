pub mod article;
pub mod lot;
pub mod stock_balance;
pub mod stock_ledger_entry;
pub mod stock_location;
pub mod stock_movement;
pub mod stock_movement_event;
pub mod stock_movement_line;
pub mod warehouse;

pub use stock_movement::{MovementStatus, MovementType};
pub use stock_movement_event::MovementEventType;
pub use stock_movement_line::AdjustmentDirection;
