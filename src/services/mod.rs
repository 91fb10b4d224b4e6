pub mod balances;
pub mod legs;
pub mod movements;

pub use balances::{BalanceFilter, BalanceKey};
pub use legs::{expand_line, Leg, LineInput};
pub use movements::{MovementDetail, MovementPage, MovementService, NewMovement, NewMovementLine};
