//! Stock movement posting engine.
//!
//! Turns draft quantity movements (IN, OUT, TRANSFER, ADJUSTMENT, SCRAP) into
//! an immutable, auditable ledger of inventory changes while guaranteeing
//! that on-hand balances never go negative, that postings are atomic and
//! idempotent, and that concurrent postings against disjoint balance keys do
//! not serialize.
//!
//! The engine is a library invoked in-process by an HTTP layer; the only
//! coordination primitive is the relational engine's row-level locking,
//! acquired in a canonical global order.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod audit;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod logging;
pub mod migrator;
pub mod sequence;
pub mod services;

pub use audit::{AuditSink, TracingAuditSink};
pub use config::AppConfig;
pub use db::DbPool;
pub use errors::ServiceError;
pub use events::{Event, EventSender};
pub use sequence::{MovementNumberGenerator, TimestampSequence};
pub use services::{
    BalanceFilter, BalanceKey, MovementDetail, MovementService, NewMovement, NewMovementLine,
};
