//! Manual stock movements and ledger housekeeping

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::SellableUnit;
use crate::db::inventory::{self, NewMovement};
use crate::domain::aggregates::{plan_movement, MovementType, StockMovement};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::StockLevel;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MovementRequest {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub movement_type: MovementType,
    /// Magnitude for RECEIVE/DAMAGE/SALE/TRANSFER; signed for ADJUST.
    pub quantity: i32,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
    #[validate(length(max = 120))]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestoreRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LedgerCount {
    pub moved: u64,
}

pub async fn record_movement(state: &AppState, req: MovementRequest) -> AppResult<StockMovement> {
    req.validate()?;
    let mut tx = state.db.begin().await?;
    let unit = SellableUnit::load(&mut tx, req.product_id, req.variant_id).await?;
    let level = inventory::lock_level(&mut *tx, unit.unit()).await?.ok_or_else(|| AppError::not_found("Product"))?;
    let plan = plan_movement(level, req.movement_type, req.quantity)?;

    let movement = NewMovement {
        product_id: req.product_id,
        variant_id: req.variant_id,
        movement_type: req.movement_type,
        quantity: plan.delta,
        previous_quantity: plan.previous_quantity,
        new_quantity: plan.new_quantity,
        reason: req.reason.as_deref(),
        reference: req.reference.as_deref(),
    };
    let movement = inventory::apply_movement(&mut tx, unit.unit(), StockLevel { on_hand: plan.new_quantity, ..level }, &movement).await?;
    tx.commit().await?;

    tracing::info!(sku = %unit.sku(), movement_type = movement.movement_type.as_str(), delta = movement.quantity, new_quantity = movement.new_quantity, "Stock movement recorded");
    state
        .events
        .publish(DomainEvent::StockMoved {
            product_id: movement.product_id,
            variant_id: movement.variant_id,
            movement_type: movement.movement_type.as_str().to_string(),
            delta: movement.quantity,
            new_quantity: movement.new_quantity,
        })
        .await;
    Ok(movement)
}

/// Moves movements older than `older_than_days` (or the configured default) to the archive.
pub async fn archive(state: &AppState, older_than_days: Option<i64>) -> AppResult<LedgerCount> {
    let days = older_than_days.unwrap_or(state.config.movement_archive_after_days);
    let cutoff = archive_cutoff(Utc::now(), days)?;
    let moved = inventory::archive_before(&state.db, cutoff).await?;
    tracing::info!(moved, days, "Stock movements archived");
    Ok(LedgerCount { moved })
}

/// `now` minus `days`; ages below one day or past the calendar range are rejected.
fn archive_cutoff(now: DateTime<Utc>, days: i64) -> AppResult<DateTime<Utc>> {
    if days < 1 {
        return Err(AppError::validation("Archive age must be at least one day"));
    }
    Duration::try_days(days)
        .and_then(|age| now.checked_sub_signed(age))
        .ok_or_else(|| AppError::validation("Archive age is out of range"))
}

pub async fn restore(state: &AppState, req: RestoreRequest) -> AppResult<LedgerCount> {
    if req.ids.is_empty() {
        return Err(AppError::validation("No movement ids given"));
    }
    let moved = inventory::restore(&state.db, &req.ids).await?;
    tracing::info!(moved, requested = req.ids.len(), "Archived stock movements restored");
    Ok(LedgerCount { moved })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_cutoff() {
        let now = Utc::now();
        assert_eq!(archive_cutoff(now, 90).unwrap(), now - Duration::days(90));
        assert!(matches!(archive_cutoff(now, 0), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_archive_cutoff_rejects_huge_ages() {
        let now = Utc::now();
        assert!(matches!(archive_cutoff(now, i64::MAX), Err(AppError::Validation(_))));
        assert!(matches!(archive_cutoff(now, 400_000_000), Err(AppError::Validation(_))));
    }
}
