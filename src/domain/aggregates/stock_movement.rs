//! Stock movements
//!
//! Append-only ledger of quantity changes. Each record snapshots the on-hand
//! count before and after the change so the history can be audited without
//! replaying it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::StockLevel;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType { Receive, Adjust, Damage, Sale, Transfer }

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Receive => "RECEIVE",
            Self::Adjust => "ADJUST",
            Self::Damage => "DAMAGE",
            Self::Sale => "SALE",
            Self::Transfer => "TRANSFER",
        }
    }

    /// Turns the quantity a caller entered into the signed delta applied to stock.
    ///
    /// RECEIVE adds, DAMAGE/SALE/TRANSFER remove, ADJUST keeps the caller's sign.
    pub fn signed_delta(&self, quantity: i32) -> Result<i32, StockError> {
        match self {
            Self::Adjust if quantity == 0 => Err(StockError::ZeroQuantity),
            Self::Adjust => Ok(quantity),
            _ if quantity <= 0 => Err(StockError::NonPositiveQuantity(*self)),
            Self::Receive => Ok(quantity),
            Self::Damage | Self::Sale | Self::Transfer => Ok(-quantity),
        }
    }
}

impl TryFrom<String> for MovementType {
    type Error = StockError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(match value.as_str() {
            "RECEIVE" => Self::Receive,
            "ADJUST" => Self::Adjust,
            "DAMAGE" => Self::Damage,
            "SALE" => Self::Sale,
            "TRANSFER" => Self::Transfer,
            _ => return Err(StockError::UnknownType(value)),
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct StockMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    #[sqlx(try_from = "String")]
    pub movement_type: MovementType,
    pub quantity: i32,
    pub previous_quantity: i32,
    pub new_quantity: i32,
    pub reason: Option<String>,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of applying a movement to a stock level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MovementPlan {
    pub delta: i32,
    pub previous_quantity: i32,
    pub new_quantity: i32,
}

/// Checks a movement against the current level.
///
/// Stock never goes negative, and only a SALE may eat into reserved units
/// (it consumes the reservation it belongs to).
pub fn plan_movement(level: StockLevel, kind: MovementType, quantity: i32) -> Result<MovementPlan, StockError> {
    let delta = kind.signed_delta(quantity)?;
    let new_quantity = level.on_hand.checked_add(delta).ok_or(StockError::Overflow)?;
    if new_quantity < 0 {
        return Err(StockError::BelowZero { on_hand: level.on_hand, delta });
    }
    if delta < 0 && kind != MovementType::Sale && new_quantity < level.reserved {
        return Err(StockError::BelowReserved { reserved: level.reserved, new_quantity });
    }
    Ok(MovementPlan { delta, previous_quantity: level.on_hand, new_quantity })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockError {
    ZeroQuantity,
    NonPositiveQuantity(MovementType),
    BelowZero { on_hand: i32, delta: i32 },
    BelowReserved { reserved: i32, new_quantity: i32 },
    Overflow,
    UnknownType(String),
}
impl std::error::Error for StockError {}
impl std::fmt::Display for StockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroQuantity => write!(f, "Adjustment quantity cannot be zero"),
            Self::NonPositiveQuantity(kind) => write!(f, "{} quantity must be positive", kind.as_str()),
            Self::BelowZero { on_hand, delta } => write!(f, "Stock of {on_hand} cannot absorb a change of {delta}"),
            Self::BelowReserved { reserved, new_quantity } => {
                write!(f, "Stock would drop to {new_quantity}, below the {reserved} units reserved for open orders")
            }
            Self::Overflow => write!(f, "Stock quantity out of range"),
            Self::UnknownType(v) => write!(f, "Unknown movement type: {v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_signs() {
        assert_eq!(MovementType::Receive.signed_delta(5), Ok(5));
        assert_eq!(MovementType::Damage.signed_delta(2), Ok(-2));
        assert_eq!(MovementType::Transfer.signed_delta(2), Ok(-2));
        assert_eq!(MovementType::Adjust.signed_delta(-3), Ok(-3));
        assert_eq!(MovementType::Adjust.signed_delta(0), Err(StockError::ZeroQuantity));
        assert_eq!(MovementType::Receive.signed_delta(-1), Err(StockError::NonPositiveQuantity(MovementType::Receive)));
    }

    #[test]
    fn test_plan_snapshots_quantities() {
        let plan = plan_movement(StockLevel::new(10, 0), MovementType::Receive, 4).unwrap();
        assert_eq!(plan, MovementPlan { delta: 4, previous_quantity: 10, new_quantity: 14 });
    }

    #[test]
    fn test_damage_cannot_touch_reserved_units() {
        let level = StockLevel::new(5, 3);
        assert!(plan_movement(level, MovementType::Damage, 2).is_ok());
        assert_eq!(
            plan_movement(level, MovementType::Damage, 3),
            Err(StockError::BelowReserved { reserved: 3, new_quantity: 2 })
        );
        // A sale consumes its own reservation.
        assert_eq!(plan_movement(level, MovementType::Sale, 3).unwrap().new_quantity, 2);
    }

    #[test]
    fn test_never_below_zero() {
        assert_eq!(
            plan_movement(StockLevel::new(1, 0), MovementType::Adjust, -2),
            Err(StockError::BelowZero { on_hand: 1, delta: -2 })
        );
    }
}
