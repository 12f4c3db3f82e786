//! Consignment stock: sending units to a partner, recording what they sold or
//! sent back, and settling up.

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

use super::SellableUnit;
use crate::db::{consignments, inventory, StockUnit};
use crate::domain::aggregates::{
    plan_movement, validate_commission_rate, Consignment, ConsignmentDetail, ConsignmentError, ConsignmentItem,
    ConsignmentStatus, MovementType, Settlement,
};
use crate::domain::value_objects::StockLevel;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateConsignment {
    #[validate(length(min = 1, max = 60))]
    pub reference: String,
    #[validate(length(min = 1, max = 120))]
    pub partner_name: String,
    #[validate(length(max = 200))]
    pub partner_contact: Option<String>,
    pub commission_rate: Decimal,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    pub items: Vec<ConsignmentLine>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ConsignmentLine {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    /// Price the partner pays per unit sold. Defaults to the catalog price.
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ItemCount {
    pub item_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountsRequest {
    pub items: Vec<ItemCount>,
}

pub async fn detail(state: &AppState, id: Uuid) -> AppResult<ConsignmentDetail> {
    let consignment = consignments::find(&state.db, id).await?.ok_or_else(|| AppError::not_found("Consignment"))?;
    let items = consignments::items(&state.db, id).await?;
    Ok(with_settlement(consignment, items))
}

fn with_settlement(consignment: Consignment, items: Vec<ConsignmentItem>) -> ConsignmentDetail {
    let settlement = Settlement::compute(&items, consignment.commission_rate);
    ConsignmentDetail { consignment, items, settlement }
}

/// Writes the consignment and takes each line out of stock with a TRANSFER movement.
pub async fn create(state: &AppState, req: CreateConsignment) -> AppResult<ConsignmentDetail> {
    req.validate()?;
    validate_commission_rate(req.commission_rate)?;
    if req.items.is_empty() {
        return Err(AppError::validation("A consignment needs at least one item"));
    }
    let reference = req.reference.trim().to_uppercase();

    let mut tx = state.db.begin().await?;
    let consignment = consignments::insert(
        &mut *tx,
        &reference,
        req.partner_name.trim(),
        req.partner_contact.as_deref(),
        req.commission_rate,
        req.notes.as_deref(),
    )
    .await
    .map_err(AppError::unique(format!("Consignment {reference}")))?;

    let mut items = Vec::with_capacity(req.items.len());
    for line in &req.items {
        if line.quantity <= 0 {
            return Err(ConsignmentError::InvalidQuantity.into());
        }
        let unit = SellableUnit::load(&mut tx, line.product_id, line.variant_id).await?;
        move_stock(&mut tx, unit.unit(), unit.product.id, MovementType::Transfer, line.quantity, "Consignment sent", &reference).await?;
        let item = consignments::NewConsignmentItem {
            product_id: unit.product.id,
            variant_id: line.variant_id,
            sku: unit.sku(),
            quantity_sent: line.quantity,
            unit_price: line.unit_price.unwrap_or_else(|| unit.unit_price()),
        };
        items.push(consignments::insert_item(&mut *tx, consignment.id, &item).await?);
    }
    tx.commit().await?;

    tracing::info!(reference = %consignment.reference, partner = %consignment.partner_name, lines = items.len(), "Consignment created");
    Ok(with_settlement(consignment, items))
}

/// Records units the partner reports as sold. Stock already left at creation.
pub async fn record_sales(state: &AppState, id: Uuid, req: CountsRequest) -> AppResult<ConsignmentDetail> {
    update_counts(state, id, req, false).await
}

/// Records units the partner sent back; they return to stock with an ADJUST movement.
pub async fn record_returns(state: &AppState, id: Uuid, req: CountsRequest) -> AppResult<ConsignmentDetail> {
    update_counts(state, id, req, true).await
}

async fn update_counts(state: &AppState, id: Uuid, req: CountsRequest, returned: bool) -> AppResult<ConsignmentDetail> {
    if req.items.is_empty() {
        return Err(AppError::validation("No item counts given"));
    }
    let mut tx = state.db.begin().await?;
    let consignment = consignments::lock(&mut *tx, id).await?.ok_or_else(|| AppError::not_found("Consignment"))?;
    consignment.ensure_open()?;
    let mut items = consignments::items(&mut *tx, id).await?;

    for count in &req.items {
        let item = items.iter_mut().find(|i| i.id == count.item_id).ok_or_else(|| AppError::not_found("Consignment item"))?;
        if returned {
            item.record_returned(count.quantity)?;
            let unit = StockUnit::new(item.product_id, item.variant_id);
            move_stock(&mut tx, unit, item.product_id, MovementType::Adjust, count.quantity, "Consignment return", &consignment.reference).await?;
        } else {
            item.record_sold(count.quantity)?;
        }
        consignments::save_item_counts(&mut *tx, item).await?;
    }
    tx.commit().await?;

    tracing::info!(reference = %consignment.reference, returned, lines = req.items.len(), "Consignment counts updated");
    Ok(with_settlement(consignment, items))
}

pub async fn settle(state: &AppState, id: Uuid) -> AppResult<ConsignmentDetail> {
    close(state, id, ConsignmentStatus::Settled).await
}

/// Cancels the consignment; units still at the partner come back into stock.
pub async fn cancel(state: &AppState, id: Uuid) -> AppResult<ConsignmentDetail> {
    close(state, id, ConsignmentStatus::Cancelled).await
}

async fn close(state: &AppState, id: Uuid, status: ConsignmentStatus) -> AppResult<ConsignmentDetail> {
    let mut tx = state.db.begin().await?;
    let consignment = consignments::lock(&mut *tx, id).await?.ok_or_else(|| AppError::not_found("Consignment"))?;
    consignment.ensure_open()?;
    let mut items = consignments::items(&mut *tx, id).await?;

    if status == ConsignmentStatus::Cancelled {
        for item in items.iter_mut().filter(|i| i.outstanding() > 0) {
            let outstanding = item.outstanding();
            item.record_returned(outstanding)?;
            let unit = StockUnit::new(item.product_id, item.variant_id);
            move_stock(&mut tx, unit, item.product_id, MovementType::Adjust, outstanding, "Consignment cancelled", &consignment.reference).await?;
            consignments::save_item_counts(&mut *tx, item).await?;
        }
    }
    let consignment = consignments::set_status(&mut *tx, id, status).await?;
    tx.commit().await?;

    let detail = with_settlement(consignment, items);
    tracing::info!(reference = %detail.consignment.reference, status = status.as_str(), net_payable = %detail.settlement.net_payable, "Consignment closed");
    Ok(detail)
}

async fn move_stock(
    conn: &mut PgConnection,
    unit: StockUnit,
    product_id: Uuid,
    kind: MovementType,
    quantity: i32,
    reason: &str,
    reference: &str,
) -> AppResult<()> {
    let level = inventory::lock_level(&mut *conn, unit).await?.ok_or_else(|| AppError::not_found("Product"))?;
    let plan = plan_movement(level, kind, quantity)?;
    let movement = inventory::NewMovement {
        product_id,
        variant_id: unit.variant_id(),
        movement_type: kind,
        quantity: plan.delta,
        previous_quantity: plan.previous_quantity,
        new_quantity: plan.new_quantity,
        reason: Some(reason),
        reference: Some(reference),
    };
    inventory::apply_movement(conn, unit, StockLevel { on_hand: plan.new_quantity, ..level }, &movement).await?;
    Ok(())
}
