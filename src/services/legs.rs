//! Leg expansion: maps a movement line plus its movement type to the signed
//! quantity deltas ("legs") the posting engine will apply. Pure, no I/O.

use rust_decimal::Decimal;

use crate::entities::{AdjustmentDirection, MovementType};
use crate::errors::ServiceError;

/// The fields of a line that expansion looks at. Built from the create DTO
/// during draft validation and from the persisted line during posting, so the
/// same checks run in both places.
#[derive(Debug, Clone)]
pub struct LineInput {
    pub article_id: i64,
    pub lot_id: Option<i64>,
    pub qty: Decimal,
    pub src_warehouse_id: Option<i64>,
    pub src_location_id: Option<i64>,
    pub dst_warehouse_id: Option<i64>,
    pub dst_location_id: Option<i64>,
    pub direction: Option<AdjustmentDirection>,
}

/// One signed quantity delta at one balance key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leg {
    pub leg_no: i32,
    pub article_id: i64,
    pub lot_id: Option<i64>,
    pub warehouse_id: i64,
    pub location_id: i64,
    pub delta_qty: Decimal,
}

/// Expands one line into its legs, validating the per-type required fields.
///
/// | type | required | legs |
/// |---|---|---|
/// | IN | dst | +qty at dst |
/// | OUT | src | -qty at src |
/// | TRANSFER | src and dst, src != dst | -qty at src, +qty at dst |
/// | SCRAP | src (dst optional) | -qty at src, +qty at dst when present |
/// | ADJUSTMENT | direction; dst for IN, src for OUT | one signed leg |
///
/// The scrap-flag check on a SCRAP destination needs a catalog lookup and is
/// the posting engine's job, not this function's.
pub fn expand_line(movement_type: MovementType, line: &LineInput) -> Result<Vec<Leg>, ServiceError> {
    if line.qty <= Decimal::ZERO {
        return Err(ServiceError::InvalidQty(format!(
            "quantity must be positive, got {}",
            line.qty
        )));
    }

    let src = location_pair(line.src_warehouse_id, line.src_location_id, "src")?;
    let dst = location_pair(line.dst_warehouse_id, line.dst_location_id, "dst")?;

    let legs = match movement_type {
        MovementType::In => {
            let (warehouse_id, location_id) = require(dst, "IN requires dst_warehouse/dst_location")?;
            vec![leg(1, line, warehouse_id, location_id, line.qty)]
        }
        MovementType::Out => {
            let (warehouse_id, location_id) = require(src, "OUT requires src_warehouse/src_location")?;
            vec![leg(1, line, warehouse_id, location_id, -line.qty)]
        }
        MovementType::Transfer => {
            let src = require(src, "TRANSFER requires src_warehouse/src_location")?;
            let dst = require(dst, "TRANSFER requires dst_warehouse/dst_location")?;
            if src == dst {
                return Err(ServiceError::InvalidLine(
                    "TRANSFER source and destination locations must differ".to_string(),
                ));
            }
            vec![
                leg(1, line, src.0, src.1, -line.qty),
                leg(2, line, dst.0, dst.1, line.qty),
            ]
        }
        MovementType::Scrap => {
            let src = require(src, "SCRAP requires src_warehouse/src_location")?;
            let mut legs = vec![leg(1, line, src.0, src.1, -line.qty)];
            // Destination is optional: without one the line is a pure
            // write-off; with one, stock moves into a scrap-flagged location.
            if let Some((warehouse_id, location_id)) = dst {
                legs.push(leg(2, line, warehouse_id, location_id, line.qty));
            }
            legs
        }
        MovementType::Adjustment => match line.direction {
            Some(AdjustmentDirection::In) => {
                let (warehouse_id, location_id) = require(
                    dst,
                    "ADJUSTMENT direction=IN requires dst_warehouse/dst_location",
                )?;
                vec![leg(1, line, warehouse_id, location_id, line.qty)]
            }
            Some(AdjustmentDirection::Out) => {
                let (warehouse_id, location_id) = require(
                    src,
                    "ADJUSTMENT direction=OUT requires src_warehouse/src_location",
                )?;
                vec![leg(1, line, warehouse_id, location_id, -line.qty)]
            }
            None => {
                return Err(ServiceError::InvalidLine(
                    "ADJUSTMENT requires a direction".to_string(),
                ))
            }
        },
    };

    Ok(legs)
}

fn leg(leg_no: i32, line: &LineInput, warehouse_id: i64, location_id: i64, delta_qty: Decimal) -> Leg {
    Leg {
        leg_no,
        article_id: line.article_id,
        lot_id: line.lot_id,
        warehouse_id,
        location_id,
        delta_qty,
    }
}

/// A warehouse/location pair must be supplied together or not at all.
fn location_pair(
    warehouse_id: Option<i64>,
    location_id: Option<i64>,
    side: &str,
) -> Result<Option<(i64, i64)>, ServiceError> {
    match (warehouse_id, location_id) {
        (Some(w), Some(l)) => Ok(Some((w, l))),
        (None, None) => Ok(None),
        _ => Err(ServiceError::InvalidLine(format!(
            "{}_warehouse and {}_location must be supplied together",
            side, side
        ))),
    }
}

fn require(pair: Option<(i64, i64)>, msg: &str) -> Result<(i64, i64), ServiceError> {
    pair.ok_or_else(|| ServiceError::InvalidLine(msg.to_string()))
}
